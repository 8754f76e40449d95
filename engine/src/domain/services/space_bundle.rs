//! Space bundle
//! Portable, versioned export format of one space
//!
//! Ids in a bundle are only references between its own records. Importing a
//! bundle always allocates fresh ids.

use crate::domain::constants::SPACE_BUNDLE_VERSION;
use crate::domain::{
    AiMetadata, DomainError, GroupId, PageState, Result, SpaceSettings, TabId, TabStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceBundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub space: BundledSpace,
    #[serde(default)]
    pub groups: Vec<BundledGroup>,
    #[serde(default)]
    pub tabs: Vec<BundledTab>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundledSpace {
    pub name: String,
    pub settings: SpaceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundledGroup {
    pub id: GroupId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub collapsed: bool,
    /// Member order within the group
    #[serde(default)]
    pub tab_ids: Vec<TabId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundledTab {
    pub id: TabId,
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub status: TabStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_folder: Option<String>,
    #[serde(default)]
    pub ai_metadata: AiMetadata,
    #[serde(default)]
    pub page_state: PageState,
    #[serde(default)]
    pub history: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SpaceBundle {
    pub fn new(space: BundledSpace, exported_at: DateTime<Utc>) -> Self {
        Self {
            version: SPACE_BUNDLE_VERSION,
            exported_at,
            space,
            groups: Vec::new(),
            tabs: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a bundle, rejecting unknown format versions before anything else
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let found = value
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| DomainError::Serialization("bundle has no version".to_string()))?;
        let found = u32::try_from(found).unwrap_or(u32::MAX);
        check_version(found)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn validate(&self) -> Result<()> {
        check_version(self.version)?;
        for tab in &self.tabs {
            if let Some(group_id) = tab.group_id {
                if !self.groups.iter().any(|g| g.id == group_id) {
                    return Err(DomainError::GroupNotFound(group_id.to_string()));
                }
            }
        }
        Ok(())
    }
}

fn check_version(found: u32) -> Result<()> {
    if found != SPACE_BUNDLE_VERSION {
        return Err(DomainError::UnsupportedBundleVersion {
            found,
            expected: SPACE_BUNDLE_VERSION,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> SpaceBundle {
        let mut bundle = SpaceBundle::new(
            BundledSpace {
                name: "Research".to_string(),
                settings: SpaceSettings::default(),
            },
            Utc::now(),
        );
        let group_id = GroupId::generate();
        let tab_id = TabId::generate();
        bundle.groups.push(BundledGroup {
            id: group_id,
            name: "Papers".to_string(),
            color: "blue".to_string(),
            collapsed: false,
            tab_ids: vec![tab_id],
        });
        bundle.tabs.push(BundledTab {
            id: tab_id,
            url: "https://arxiv.example".to_string(),
            title: "Arxiv".to_string(),
            group_id: Some(group_id),
            pinned: true,
            suspended: false,
            status: TabStatus::Complete,
            bookmark_folder: None,
            ai_metadata: AiMetadata::default(),
            page_state: PageState::default(),
            history: vec!["https://arxiv.example".to_string()],
            created_at: Utc::now(),
        });
        bundle
    }

    #[test]
    fn test_json_preserves_structure() {
        let original = bundle();
        let parsed = SpaceBundle::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut value = serde_json::to_value(bundle()).unwrap();
        value["version"] = serde_json::json!(2);

        let err = SpaceBundle::from_json(&value.to_string()).unwrap_err();
        assert_eq!(
            err,
            DomainError::UnsupportedBundleVersion {
                found: 2,
                expected: 1
            }
        );
    }

    #[test]
    fn test_dangling_group_reference_is_invalid() {
        let mut bundle = bundle();
        bundle.groups.clear();
        assert!(matches!(bundle.validate(), Err(DomainError::GroupNotFound(_))));
    }
}
