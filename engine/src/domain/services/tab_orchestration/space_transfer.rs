//! Space export and import

use super::TabOrchestrationService;
use crate::domain::ports::{LifecycleEvent, SuspendReason};
use crate::domain::services::space_bundle::{BundledGroup, BundledSpace, BundledTab, SpaceBundle};
use crate::domain::{
    DomainError, GroupId, Result, Space, SpaceId, TabGroup, TabId, TabOptions, TabStatus,
};
use std::collections::HashMap;
use tracing::{info, warn};

impl TabOrchestrationService {
    /// Snapshot a space with its groups and tabs. Grouped tabs come first in
    /// group and member order, then ungrouped tabs oldest first.
    pub fn export_space(&self, id: &SpaceId) -> Result<SpaceBundle> {
        let tables = self.read()?;
        let space = tables.space(id)?;

        let mut bundle = SpaceBundle::new(
            BundledSpace {
                name: space.name().to_string(),
                settings: space.settings().clone(),
            },
            self.clock.now(),
        );

        let mut ordered: Vec<TabId> = Vec::new();
        for group_id in space.group_ids() {
            let group = tables.group(group_id)?;
            bundle.groups.push(BundledGroup {
                id: group.id(),
                name: group.name().to_string(),
                color: group.color().to_string(),
                collapsed: group.is_collapsed(),
                tab_ids: group.tab_ids().to_vec(),
            });
            ordered.extend_from_slice(group.tab_ids());
        }

        let mut ungrouped: Vec<_> = tables
            .tabs
            .values()
            .filter(|t| t.space_id() == *id && t.group_id().is_none())
            .collect();
        ungrouped.sort_by_key(|t| (t.created_at(), t.id()));
        ordered.extend(ungrouped.into_iter().map(|t| t.id()));

        for tab_id in ordered {
            let tab = tables.tab(&tab_id)?;
            bundle.tabs.push(BundledTab {
                id: tab.id(),
                url: tab.url().to_string(),
                title: tab.title().to_string(),
                group_id: tab.group_id(),
                pinned: tables.pinned.contains(&tab.id()),
                suspended: tab.is_suspended(),
                status: tab.status(),
                bookmark_folder: tab.bookmark_folder().map(str::to_string),
                ai_metadata: tab.ai_metadata().clone(),
                page_state: tab.page_state().clone(),
                history: tab.history().to_vec(),
                created_at: tab.created_at(),
            });
        }

        Ok(bundle)
    }

    pub fn export_space_json(&self, id: &SpaceId) -> Result<String> {
        self.export_space(id)?.to_json()
    }

    /// Recreate a bundled space under fresh ids. Every imported tab gets its
    /// own process. A failure part way removes everything imported so far.
    pub async fn import_space(&self, bundle: SpaceBundle) -> Result<Space> {
        bundle.validate()?;

        let now = self.clock.now();
        let space = Space::new(
            SpaceId::generate(),
            bundle.space.name.clone(),
            bundle.space.settings.clone(),
            now,
        )?;
        let space_id = space.id();

        let mut group_ids: HashMap<GroupId, GroupId> = HashMap::new();
        let mut groups = Vec::with_capacity(bundle.groups.len());
        for bundled in &bundle.groups {
            let mut group = TabGroup::new(
                GroupId::generate(),
                space_id,
                bundled.name.clone(),
                bundled.color.clone(),
            )?;
            group.set_collapsed(bundled.collapsed);
            group_ids.insert(bundled.id, group.id());
            groups.push(group);
        }

        {
            let mut tables = self.write()?;
            let mut space = space;
            for group in groups {
                space.add_group(group.id());
                tables.groups.insert(group.id(), group);
            }
            tables.spaces.insert(space_id, space);
        }

        let imported = self
            .import_tabs(space_id, &bundle, &group_ids)
            .await
            .and_then(|tab_ids| {
                self.restore_group_order(&bundle, &group_ids, &tab_ids)?;
                Ok(tab_ids.len())
            });
        match imported {
            Ok(count) => {
                info!(space_id = %space_id, name = %bundle.space.name, tabs = count, "Space imported");
                self.events.publish(LifecycleEvent::SpaceImported {
                    space_id,
                    tab_count: count,
                });
                self.get_space(&space_id)
            }
            Err(e) => {
                warn!(space_id = %space_id, error = %e, "Space import failed, rolling back");
                if let Err(cleanup) = self.delete_space(&space_id).await {
                    warn!(space_id = %space_id, error = %cleanup, "Import rollback failed");
                }
                Err(e)
            }
        }
    }

    pub async fn import_space_json(&self, json: &str) -> Result<Space> {
        self.import_space(SpaceBundle::from_json(json)?).await
    }

    /// Member order comes from each bundled group's `tab_ids`, not from the
    /// order tabs happen to appear in the bundle
    fn restore_group_order(
        &self,
        bundle: &SpaceBundle,
        group_ids: &HashMap<GroupId, GroupId>,
        tab_ids: &HashMap<TabId, TabId>,
    ) -> Result<()> {
        let mut tables = self.write()?;
        for bundled in &bundle.groups {
            let Some(group_id) = group_ids.get(&bundled.id) else {
                continue;
            };
            let order: Vec<TabId> = bundled
                .tab_ids
                .iter()
                .filter_map(|t| tab_ids.get(t).copied())
                .collect();
            tables.group_mut(group_id)?.reorder(&order);
        }
        Ok(())
    }

    /// Returns bundled tab ids mapped to the ids they were imported under
    async fn import_tabs(
        &self,
        space_id: SpaceId,
        bundle: &SpaceBundle,
        group_ids: &HashMap<GroupId, GroupId>,
    ) -> Result<HashMap<TabId, TabId>> {
        let mut imported: HashMap<TabId, TabId> = HashMap::new();

        for bundled in &bundle.tabs {
            if imported.contains_key(&bundled.id) {
                return Err(DomainError::InvalidCommand(format!(
                    "tab {} appears twice in the bundle",
                    bundled.id
                )));
            }

            let mut options = TabOptions::in_space(space_id);
            options.group_id = bundled.group_id.and_then(|g| group_ids.get(&g).copied());
            options.pinned = bundled.pinned;
            let tab = self.create_tab(&bundled.url, options).await?;

            {
                let mut tables = self.write()?;
                let restored = tables.tab_mut(&tab.id())?;
                restored.set_title(bundled.title.clone(), bundled.created_at);
                restored.set_page_state(bundled.page_state.clone());
                restored.set_ai_metadata(bundled.ai_metadata.clone());
                restored.set_bookmark_folder(bundled.bookmark_folder.clone());
                if !bundled.history.is_empty() {
                    restored.set_history(bundled.history.clone());
                }
                restored.set_created_at(bundled.created_at);
                if matches!(bundled.status, TabStatus::Complete | TabStatus::Error) {
                    restored.set_status(bundled.status)?;
                }
            }

            if bundled.suspended {
                self.suspend_tab_with_reason(&tab.id(), SuspendReason::Manual)
                    .await?;
            }
            imported.insert(bundled.id, tab.id());
        }

        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::domain::ports::ProcessRepository;
    use crate::domain::{AiMetadata, PageState, SpaceSettings};

    #[tokio::test]
    async fn test_export_import_preserves_structure() {
        let h = harness();
        let space = h
            .orchestrator
            .create_space(
                "Research",
                Some(SpaceSettings {
                    theme: "dark".to_string(),
                    ..Default::default()
                }),
            )
            .unwrap();
        let papers = h.orchestrator.create_group(&space.id(), "Papers", "blue").unwrap();
        let tools = h.orchestrator.create_group(&space.id(), "Tools", "red").unwrap();
        h.orchestrator.set_group_collapsed(&tools.id(), true).unwrap();

        let first = h
            .orchestrator
            .create_tab("https://arxiv.example", TabOptions::in_group(papers.id()).pinned())
            .await
            .unwrap();
        h.orchestrator
            .create_tab("https://scholar.example", TabOptions::in_group(papers.id()))
            .await
            .unwrap();
        let tool = h
            .orchestrator
            .create_tab("https://tool.example", TabOptions::in_group(tools.id()))
            .await
            .unwrap();
        h.orchestrator
            .create_tab("https://loose.example", TabOptions::in_space(space.id()))
            .await
            .unwrap();

        h.orchestrator
            .set_ai_metadata(
                &first.id(),
                AiMetadata {
                    summary: Some("preprints".to_string()),
                    topics: vec!["ml".to_string()],
                    ..Default::default()
                },
            )
            .unwrap();
        h.orchestrator.bookmark_tab(&first.id(), Some("Reading")).unwrap();
        h.orchestrator
            .update_page_state(
                &tool.id(),
                PageState {
                    scroll_y: 120.0,
                    ..Default::default()
                },
            )
            .unwrap();
        h.orchestrator.suspend_tab(&tool.id()).await.unwrap();

        let json = h.orchestrator.export_space_json(&space.id()).unwrap();
        let imported = h.orchestrator.import_space_json(&json).await.unwrap();

        assert_ne!(imported.id(), space.id());
        assert_eq!(imported.name(), "Research");
        assert_eq!(imported.settings().theme, "dark");

        let groups = h.orchestrator.list_groups(Some(&imported.id())).unwrap();
        let names: Vec<&str> = groups.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["Papers", "Tools"]);
        assert_eq!(groups[0].tab_ids().len(), 2);
        assert!(groups[1].is_collapsed());
        assert!(groups.iter().all(|g| g.id() != papers.id() && g.id() != tools.id()));

        let tabs = h.orchestrator.list_tabs(Some(&imported.id())).unwrap();
        assert_eq!(tabs.len(), 4);

        let copy = h.orchestrator.get_tab(&groups[0].tab_ids()[0]).unwrap();
        assert_ne!(copy.id(), first.id());
        assert_eq!(copy.url(), "https://arxiv.example");
        assert!(copy.ai_metadata().has_topic("ml"));
        assert_eq!(copy.bookmark_folder(), Some("Reading"));
        assert!(h.orchestrator.is_pinned(&copy.id()).unwrap());

        let suspended = h.orchestrator.get_tab(&groups[1].tab_ids()[0]).unwrap();
        assert!(suspended.is_suspended());
        assert_eq!(suspended.page_state().scroll_y, 120.0);

        // Every imported tab owns its own process
        assert_eq!(h.repo.find_all().await.unwrap().len(), 8);
        assert_eq!(h.bus.recent_named("space-imported").len(), 1);
    }

    #[tokio::test]
    async fn test_import_follows_bundled_group_order() {
        let h = harness();
        let space = h.orchestrator.create_space("Queue", None).unwrap();
        let group = h.orchestrator.create_group(&space.id(), "Next", "green").unwrap();
        for i in 0..3 {
            h.orchestrator
                .create_tab(&format!("https://{}.example", i), TabOptions::in_group(group.id()))
                .await
                .unwrap();
        }
        let mut bundle = h.orchestrator.export_space(&space.id()).unwrap();
        bundle.tabs.reverse();

        let imported = h.orchestrator.import_space(bundle).await.unwrap();

        let groups = h.orchestrator.list_groups(Some(&imported.id())).unwrap();
        let urls: Vec<String> = groups[0]
            .tab_ids()
            .iter()
            .map(|id| h.orchestrator.get_tab(id).unwrap().url().to_string())
            .collect();
        assert_eq!(
            urls,
            vec!["https://0.example", "https://1.example", "https://2.example"]
        );
    }

    #[tokio::test]
    async fn test_failed_import_rolls_back() {
        let h = harness();
        let space = h.orchestrator.create_space("Doomed", None).unwrap();
        for i in 0..3 {
            h.orchestrator
                .create_tab(&format!("https://{}.example", i), TabOptions::in_space(space.id()))
                .await
                .unwrap();
        }
        let bundle = h.orchestrator.export_space(&space.id()).unwrap();
        h.orchestrator.delete_space(&space.id()).await.unwrap();

        // The second tab is rejected after the first was already created
        let mut broken = bundle.clone();
        broken.tabs[1].url = String::new();

        assert!(h.orchestrator.import_space(broken).await.is_err());
        assert_eq!(h.orchestrator.list_spaces().unwrap().len(), 1);
        assert_eq!(h.orchestrator.tab_count().unwrap(), 0);
        assert!(h.repo.find_all().await.unwrap().is_empty());
    }
}
