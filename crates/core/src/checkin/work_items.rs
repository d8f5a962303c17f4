//! Work items associated with a pending check-in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A work item as shown in the check-in dialog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i32,
    #[serde(default)]
    pub title: String,
}

impl WorkItem {
    pub fn new(id: i32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// What the check-in does to an associated work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemAction {
    Associate,
    Resolve,
}

/// Per-server work item selections.
///
/// Cloning produces an independent copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemsCheckinParameters {
    actions: BTreeMap<WorkItem, WorkItemAction>,
}

impl WorkItemsCheckinParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `item` with the check-in, replacing any earlier action.
    pub fn set_action(&mut self, item: WorkItem, action: WorkItemAction) {
        self.actions.retain(|existing, _| existing.id != item.id);
        self.actions.insert(item, action);
    }

    /// Drop the association with work item `id`.
    pub fn remove(&mut self, id: i32) -> Option<WorkItemAction> {
        let key = self.actions.keys().find(|item| item.id == id)?.clone();
        self.actions.remove(&key)
    }

    pub fn action(&self, id: i32) -> Option<WorkItemAction> {
        self.actions
            .iter()
            .find(|(item, _)| item.id == id)
            .map(|(_, action)| *action)
    }

    pub fn actions(&self) -> &BTreeMap<WorkItem, WorkItemAction> {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
}
