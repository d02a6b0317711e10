//! Work item and backlog definitions plus JSON loading.
//!
//! This module provides:
//! - `WorkItem` struct representing one unit of campaign work
//! - `Backlog` struct owning the ordered items for one campaign
//! - `BacklogFile` struct representing the backlog.json format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of creative work a backlog item asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[default]
    Social,
    Video,
    Design,
    Email,
    Landing,
    #[serde(other)]
    Other,
}

/// Represents a single unit of campaign work (a story).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    /// Stable identifier, unique within a backlog (e.g. "story-03")
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// What the item should produce
    pub description: String,
    /// Kind of creative output
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
    /// Distribution channel (e.g. "instagram", "newsletter")
    #[serde(default)]
    pub channel: String,
    /// Ordered acceptance criteria the artifact must satisfy
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// Estimated effort in hours
    #[serde(default)]
    pub estimated_hours: f64,
    /// Ids of items that must complete before this one starts
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Set by the orchestrator once a passing validation exists
    #[serde(default)]
    pub complete: bool,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
}

impl WorkItem {
    /// Create a new item with no dependencies or criteria.
    pub fn new(id: &str, title: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            item_type: ItemType::default(),
            channel: String::new(),
            acceptance_criteria: Vec::new(),
            estimated_hours: 0.0,
            depends_on: Vec::new(),
            complete: false,
            notes: String::new(),
        }
    }

    /// Set the dependency list.
    pub fn with_dependencies(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Set the acceptance criteria.
    pub fn with_criteria(mut self, criteria: Vec<String>) -> Self {
        self.acceptance_criteria = criteria;
        self
    }

    /// Set the estimated effort hours.
    pub fn with_hours(mut self, hours: f64) -> Self {
        self.estimated_hours = hours;
        self
    }

    /// Set the item type and channel.
    pub fn with_channel(mut self, item_type: ItemType, channel: &str) -> Self {
        self.item_type = item_type;
        self.channel = channel.to_string();
        self
    }
}

/// The ordered collection of work items sharing one campaign goal.
///
/// The backlog exclusively owns its items. Completion flags are flipped only
/// through `mark_complete`, effort only through `set_estimated_hours`; the
/// sequencer reads items but never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backlog {
    /// The campaign goal every item serves
    pub campaign_goal: String,
    items: Vec<WorkItem>,
}

impl Backlog {
    /// Create a backlog from items, preserving their order.
    pub fn new(campaign_goal: &str, items: Vec<WorkItem>) -> Self {
        Self {
            campaign_goal: campaign_goal.to_string(),
            items,
        }
    }

    /// All items in backlog order.
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the backlog has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by id.
    pub fn get(&self, id: &str) -> Option<&WorkItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Number of completed items.
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|i| i.complete).count()
    }

    /// Progress as completed/total in [0, 1]. An empty backlog is complete.
    pub fn progress(&self) -> f64 {
        if self.items.is_empty() {
            return 1.0;
        }
        self.completed_count() as f64 / self.items.len() as f64
    }

    /// Check if every item is complete.
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|i| i.complete)
    }

    /// First incomplete item in backlog order.
    pub fn first_incomplete(&self) -> Option<&WorkItem> {
        self.items.iter().find(|i| !i.complete)
    }

    /// Mark an item complete. Returns false if the id is unknown.
    pub fn mark_complete(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.complete = true;
                true
            }
            None => false,
        }
    }

    /// Update an item's effort estimate. Returns false if the id is unknown.
    pub fn set_estimated_hours(&mut self, id: &str, hours: f64) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.estimated_hours = hours;
                true
            }
            None => false,
        }
    }
}

/// Represents the full backlog.json file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklogFile {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// The campaign goal
    pub campaign_goal: String,
    /// Timestamp when the backlog was generated
    #[serde(default)]
    pub generated_at: String,
    /// Items in backlog order
    pub items: Vec<WorkItem>,
}

fn default_version() -> u32 {
    1
}

impl BacklogFile {
    /// Load a backlog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read backlog file: {}", path.display()))?;

        let file: BacklogFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse backlog JSON: {}", path.display()))?;

        Ok(file)
    }

    /// Save the backlog to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize backlog to JSON")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write backlog file: {}", path.display()))?;

        Ok(())
    }

    /// Convert into a `Backlog`, consuming the file wrapper.
    pub fn into_backlog(self) -> Backlog {
        Backlog::new(&self.campaign_goal, self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn item(id: &str) -> WorkItem {
        WorkItem::new(id, &format!("Item {}", id), "desc")
    }

    #[test]
    fn test_work_item_builders() {
        let item = WorkItem::new("a", "Launch teaser", "Short teaser post")
            .with_dependencies(vec!["b".into()])
            .with_criteria(vec!["Mentions launch date".into()])
            .with_hours(2.5)
            .with_channel(ItemType::Social, "instagram");

        assert_eq!(item.id, "a");
        assert_eq!(item.depends_on, vec!["b"]);
        assert_eq!(item.acceptance_criteria.len(), 1);
        assert_eq!(item.estimated_hours, 2.5);
        assert_eq!(item.item_type, ItemType::Social);
        assert_eq!(item.channel, "instagram");
        assert!(!item.complete);
    }

    #[test]
    fn test_work_item_deserialization_with_defaults() {
        let json = r#"{
            "id": "a",
            "title": "Teaser",
            "description": "A teaser post"
        }"#;

        let item: WorkItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.item_type, ItemType::Social);
        assert!(item.depends_on.is_empty());
        assert!(!item.complete);
        assert_eq!(item.estimated_hours, 0.0);
    }

    #[test]
    fn test_item_type_unknown_maps_to_other() {
        let json = r#"{
            "id": "a",
            "title": "T",
            "description": "D",
            "type": "podcast"
        }"#;

        let item: WorkItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.item_type, ItemType::Other);
    }

    #[test]
    fn test_backlog_progress() {
        let mut backlog = Backlog::new("launch", vec![item("a"), item("b"), item("c"), item("d")]);
        assert_eq!(backlog.progress(), 0.0);
        assert!(!backlog.is_complete());

        assert!(backlog.mark_complete("a"));
        assert_eq!(backlog.progress(), 0.25);

        backlog.mark_complete("b");
        backlog.mark_complete("c");
        backlog.mark_complete("d");
        assert_eq!(backlog.progress(), 1.0);
        assert!(backlog.is_complete());
    }

    #[test]
    fn test_empty_backlog_is_complete() {
        let backlog = Backlog::new("launch", vec![]);
        assert_eq!(backlog.progress(), 1.0);
        assert!(backlog.is_complete());
        assert!(backlog.first_incomplete().is_none());
    }

    #[test]
    fn test_first_incomplete_follows_backlog_order() {
        let mut backlog = Backlog::new("launch", vec![item("a"), item("b"), item("c")]);
        backlog.mark_complete("a");
        assert_eq!(backlog.first_incomplete().unwrap().id, "b");
    }

    #[test]
    fn test_mark_complete_unknown_id() {
        let mut backlog = Backlog::new("launch", vec![item("a")]);
        assert!(!backlog.mark_complete("nope"));
    }

    #[test]
    fn test_set_estimated_hours() {
        let mut backlog = Backlog::new("launch", vec![item("a")]);
        assert!(backlog.set_estimated_hours("a", 6.0));
        assert_eq!(backlog.get("a").unwrap().estimated_hours, 6.0);
    }

    #[test]
    fn test_backlog_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backlog.json");

        let file = BacklogFile {
            version: 1,
            campaign_goal: "Spring launch".to_string(),
            generated_at: "2026-03-01T12:00:00Z".to_string(),
            items: vec![item("a"), item("b").with_dependencies(vec!["a".into()])],
        };
        file.save(&path).unwrap();

        let loaded = BacklogFile::load(&path).unwrap();
        assert_eq!(loaded.campaign_goal, "Spring launch");
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[1].depends_on, vec!["a"]);

        let backlog = loaded.into_backlog();
        assert_eq!(backlog.len(), 2);
        assert_eq!(backlog.campaign_goal, "Spring launch");
    }

    #[test]
    fn test_backlog_file_load_not_found() {
        let result = BacklogFile::load(Path::new("/nonexistent/backlog.json"));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read backlog file")
        );
    }

    #[test]
    fn test_backlog_file_load_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backlog.json");
        fs::write(&path, "{ invalid json }").unwrap();

        let result = BacklogFile::load(&path);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse backlog JSON")
        );
    }

    #[test]
    fn test_backlog_file_version_defaults_to_one() {
        let json = r#"{
            "campaign_goal": "launch",
            "items": []
        }"#;
        let file: BacklogFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.version, 1);
    }
}
