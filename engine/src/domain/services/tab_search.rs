//! Tab search
//! Filtering, ordering and pagination over the tab table

use crate::domain::constants::PINNED_RELEVANCE_BONUS_MS;
use crate::domain::{SortField, SortOrder, Tab, TabId, TabSearchQuery, TabSearchResults};
use std::cmp::Ordering;
use std::collections::HashSet;

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn matches(tab: &Tab, query: &TabSearchQuery) -> bool {
    if let Some(text) = &query.text {
        let needle = text.to_lowercase();
        let metadata = tab.ai_metadata();
        let hit = contains_ci(tab.title(), &needle)
            || contains_ci(tab.url(), &needle)
            || metadata
                .summary
                .as_deref()
                .is_some_and(|s| contains_ci(s, &needle))
            || metadata.topics.iter().any(|t| contains_ci(t, &needle));
        if !hit {
            return false;
        }
    }
    if let Some(fragment) = &query.url_contains {
        if !contains_ci(tab.url(), &fragment.to_lowercase()) {
            return false;
        }
    }
    if let Some(fragment) = &query.title_contains {
        if !contains_ci(tab.title(), &fragment.to_lowercase()) {
            return false;
        }
    }
    if query.group_id.is_some() && tab.group_id() != query.group_id {
        return false;
    }
    if query.space_id.is_some_and(|space| tab.space_id() != space) {
        return false;
    }
    if query.status.is_some_and(|status| tab.status() != status) {
        return false;
    }
    if query
        .suspended
        .is_some_and(|suspended| tab.is_suspended() != suspended)
    {
        return false;
    }
    if let Some(topic) = &query.ai_topic {
        if !tab.ai_metadata().has_topic(topic) {
            return false;
        }
    }
    if query.sentiment.is_some() && tab.ai_metadata().sentiment != query.sentiment {
        return false;
    }
    if query.security_rating.is_some() && tab.ai_metadata().security_rating != query.security_rating
    {
        return false;
    }
    if query.created_after.is_some_and(|after| tab.created_at() < after) {
        return false;
    }
    if query
        .created_before
        .is_some_and(|before| tab.created_at() > before)
    {
        return false;
    }
    true
}

fn relevance(tab: &Tab, pinned: &HashSet<TabId>) -> i64 {
    let base = tab.last_active().timestamp_millis();
    if pinned.contains(&tab.id()) {
        base.saturating_add(PINNED_RELEVANCE_BONUS_MS)
    } else {
        base
    }
}

fn compare(a: &Tab, b: &Tab, field: SortField, pinned: &HashSet<TabId>) -> Ordering {
    let primary = match field {
        SortField::Title => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
        SortField::Url => a.url().cmp(b.url()),
        SortField::LastActive => a.last_active().cmp(&b.last_active()),
        SortField::Created => a.created_at().cmp(&b.created_at()),
        SortField::Relevance => relevance(a, pinned).cmp(&relevance(b, pinned)),
    };
    // Stable tie-break so pagination is deterministic
    primary.then_with(|| a.id().cmp(&b.id()))
}

/// Run a query over a set of tabs
pub fn search_tabs<'a>(
    tabs: impl IntoIterator<Item = &'a Tab>,
    pinned: &HashSet<TabId>,
    query: &TabSearchQuery,
) -> TabSearchResults {
    let mut hits: Vec<&Tab> = tabs.into_iter().filter(|t| matches(t, query)).collect();
    let total = hits.len();

    hits.sort_by(|a, b| {
        let ordering = compare(a, b, query.sort_by, pinned);
        match query.sort_order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });

    let page = hits
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();

    TabSearchResults { tabs: page, total }
}
