//! Applying server-issued operations and recording what happened to files.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::ApplyError;
use crate::proxy::GetOperation;
use crate::workspace::Workspace;

/// How local modifications are treated when an operation rewrites a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// Overwrite the working copy unconditionally.
    Force,
    /// Keep local edits; the resolver already merged them.
    Merge,
}

/// Buckets of the updated-files report shown after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileGroup {
    Updated,
    Created,
    Removed,
    Merged,
    Skipped,
}

/// Ledger of files touched by an update/resolve session.
///
/// Owned by the caller; the resolver only appends to it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatedFiles {
    groups: BTreeMap<FileGroup, Vec<String>>,
}

impl UpdatedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, group: FileGroup, path: impl Into<String>) {
        self.groups.entry(group).or_default().push(path.into());
    }

    pub fn group(&self, group: FileGroup) -> &[String] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }
}

/// Applies get/undo operations to the local working copy.
///
/// Implementations attempt every operation and report the failures instead
/// of stopping at the first one.
pub trait OperationApplier {
    fn apply(
        &mut self,
        workspace: &Workspace,
        operations: &[GetOperation],
        mode: DownloadMode,
        updated_files: Option<&mut UpdatedFiles>,
    ) -> Vec<ApplyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_groups() {
        let mut ledger = UpdatedFiles::new();
        assert!(ledger.is_empty());

        ledger.add(FileGroup::Skipped, "/ws/a.txt");
        ledger.add(FileGroup::Merged, "/ws/b.txt");
        ledger.add(FileGroup::Skipped, "/ws/c.txt");

        assert_eq!(ledger.group(FileGroup::Skipped), ["/ws/a.txt", "/ws/c.txt"]);
        assert_eq!(ledger.group(FileGroup::Merged), ["/ws/b.txt"]);
        assert!(ledger.group(FileGroup::Updated).is_empty());
        assert!(!ledger.is_empty());
    }
}
