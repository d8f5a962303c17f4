//! Tracking of unresolved conflicts and the workspace each one came from.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::model::Conflict;
use crate::workspace::Workspace;

/// Arena of unresolved conflicts keyed by server conflict id.
///
/// Workspaces live in a side table; each conflict points at exactly one of
/// them for as long as it is registered.
#[derive(Debug, Default)]
pub struct ConflictRegistry {
    workspaces: Vec<Workspace>,
    conflicts: BTreeMap<i32, Conflict>,
    owners: BTreeMap<i32, usize>,
}

impl ConflictRegistry {
    /// Flatten a workspace → conflicts mapping into the registry.
    ///
    /// A conflict id listed under more than one workspace stays with the
    /// first one; later copies are dropped.
    pub fn new(workspace_conflicts: Vec<(Workspace, Vec<Conflict>)>) -> Self {
        let mut registry = Self::default();
        for (workspace, conflicts) in workspace_conflicts {
            let idx = registry.workspaces.len();
            registry.workspaces.push(workspace);
            for conflict in conflicts {
                if let Some(owner) = registry.owners.get(&conflict.id) {
                    warn!(
                        conflict_id = conflict.id,
                        workspace = %registry.workspaces[idx].name,
                        registered_in = %registry.workspaces[*owner].name,
                        "conflict id already registered, ignoring duplicate"
                    );
                    continue;
                }
                registry.owners.insert(conflict.id, idx);
                registry.conflicts.insert(conflict.id, conflict);
            }
        }
        debug!(
            conflicts = registry.conflicts.len(),
            workspaces = registry.workspaces.len(),
            "conflict registry built"
        );
        registry
    }

    /// All tracked conflicts, ordered by id.
    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.values()
    }

    pub fn get(&self, conflict_id: i32) -> Option<&Conflict> {
        self.conflicts.get(&conflict_id)
    }

    pub fn contains(&self, conflict_id: i32) -> bool {
        self.conflicts.contains_key(&conflict_id)
    }

    /// Workspace that surfaced the conflict.
    pub fn workspace_of(&self, conflict_id: i32) -> Option<&Workspace> {
        self.owners
            .get(&conflict_id)
            .and_then(|idx| self.workspaces.get(*idx))
    }

    /// Forget a conflict. Call only once its resolution fully succeeded.
    pub fn remove(&mut self, conflict_id: i32) -> Option<Conflict> {
        self.owners.remove(&conflict_id);
        self.conflicts.remove(&conflict_id)
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Keep only the conflicts the server still reports as unresolved.
pub fn unresolved_conflicts<'a, I>(conflicts: I) -> Vec<Conflict>
where
    I: IntoIterator<Item = &'a Conflict>,
{
    conflicts
        .into_iter()
        .filter(|c| !c.resolved)
        .inspect(|c| debug_assert_ne!(c.id, 0, "unresolved conflict without an id"))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::model::{ConflictType, ItemType};
    use crate::workspace::ServerInfo;

    fn workspace(name: &str) -> Workspace {
        Workspace {
            name: name.into(),
            owner: "alice".into(),
            server: ServerInfo::new("http://tfs"),
            working_folders: Vec::new(),
        }
    }

    fn conflict(id: i32) -> Conflict {
        Conflict::new(id, ConflictType::Get, ItemType::File)
    }

    #[test]
    fn test_flattens_workspace_mapping() {
        let registry = ConflictRegistry::new(vec![
            (workspace("one"), vec![conflict(3), conflict(1)]),
            (workspace("two"), vec![conflict(2)]),
        ]);

        assert_eq!(registry.len(), 3);
        let ids: Vec<i32> = registry.conflicts().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(registry.workspace_of(1).unwrap().name, "one");
        assert_eq!(registry.workspace_of(2).unwrap().name, "two");
        assert!(registry.workspace_of(9).is_none());
    }

    #[test]
    fn test_duplicate_id_keeps_first_workspace() {
        let first = conflict(4);
        let mut second = conflict(4);
        second.conflict_type = ConflictType::Merge;
        let registry = ConflictRegistry::new(vec![
            (workspace("one"), vec![first]),
            (workspace("two"), vec![second]),
        ]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.workspace_of(4).unwrap().name, "one");
        assert_eq!(registry.get(4).unwrap().conflict_type, ConflictType::Get);
    }

    #[test]
    fn test_remove_drops_workspace_link() {
        let mut registry = ConflictRegistry::new(vec![(workspace("one"), vec![conflict(5)])]);
        assert!(registry.contains(5));

        let removed = registry.remove(5).unwrap();
        assert_eq!(removed.id, 5);
        assert!(!registry.contains(5));
        assert!(registry.workspace_of(5).is_none());
        assert!(registry.is_empty());
        assert!(registry.remove(5).is_none());
    }

    #[test]
    fn test_unresolved_conflicts_filters_resolved() {
        let all = vec![
            conflict(1),
            Conflict {
                resolved: true,
                ..conflict(2)
            },
            conflict(3),
        ];
        let ids: Vec<i32> = unresolved_conflicts(&all).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
