//! Merge strategies used by `accept_merge`.
//!
//! Name and content merges are collaborators: an interactive client plugs in
//! its own dialogs. [`ThreeWayMerger`] is a non-interactive content merger
//! built on `diffy`.

use std::path::Path;

use tracing::{debug, info, warn};

use super::model::Conflict;
use crate::errors::ResolveError;
use crate::workspace::Workspace;

/// Base, local ("yours") and server ("theirs") bytes of a conflicting file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTriplet {
    pub base: Vec<u8>,
    pub yours: Vec<u8>,
    pub theirs: Vec<u8>,
}

/// Picks the merged server path of a renamed item.
pub trait NameMerger {
    /// Returns the merged server path, or `None` when the user cancelled.
    fn merge_name(
        &mut self,
        workspace: &Workspace,
        conflict: &Conflict,
    ) -> Result<Option<String>, ResolveError>;
}

/// Merges conflicting content into the live local file.
pub trait ContentMerger {
    /// Writes the merge result to `local_file`. Returns `true` only when the
    /// merge is complete and the conflict may be reported as resolved.
    fn merge_content(
        &mut self,
        conflict: &Conflict,
        content: &ContentTriplet,
        local_file: &Path,
        local_name: &Path,
    ) -> Result<bool, ResolveError>;
}

/// The result of a three-way text merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Merged text; contains conflict markers when `has_conflicts` is set.
    pub merged_content: String,
    pub has_conflicts: bool,
}

/// Line-based three-way merge of text content.
pub fn three_way_merge(base: &str, yours: &str, theirs: &str) -> MergeResult {
    // Either side unchanged: the other side wins cleanly.
    if yours == base || yours == theirs {
        return MergeResult {
            merged_content: theirs.to_string(),
            has_conflicts: false,
        };
    }
    if theirs == base {
        return MergeResult {
            merged_content: yours.to_string(),
            has_conflicts: false,
        };
    }

    match diffy::merge(base, yours, theirs) {
        Ok(merged) => {
            debug!("clean three-way merge");
            MergeResult {
                merged_content: merged,
                has_conflicts: false,
            }
        }
        Err(with_markers) => {
            debug!("three-way merge left conflict markers");
            MergeResult {
                merged_content: with_markers,
                has_conflicts: true,
            }
        }
    }
}

/// Non-interactive [`ContentMerger`].
///
/// Writes the merged text into the local file. A merge with conflicts still
/// writes the marker-annotated text but reports the conflict as unresolved.
/// Non-UTF-8 content is left untouched and reported as unresolved.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreeWayMerger;

impl ContentMerger for ThreeWayMerger {
    fn merge_content(
        &mut self,
        conflict: &Conflict,
        content: &ContentTriplet,
        local_file: &Path,
        _local_name: &Path,
    ) -> Result<bool, ResolveError> {
        let (Ok(base), Ok(yours), Ok(theirs)) = (
            std::str::from_utf8(&content.base),
            std::str::from_utf8(&content.yours),
            std::str::from_utf8(&content.theirs),
        ) else {
            warn!(
                conflict_id = conflict.id,
                path = %local_file.display(),
                "binary content cannot be merged automatically"
            );
            return Ok(false);
        };

        let result = three_way_merge(base, yours, theirs);
        std::fs::write(local_file, &result.merged_content)?;
        info!(
            conflict_id = conflict.id,
            path = %local_file.display(),
            has_conflicts = result.has_conflicts,
            "merged content written"
        );
        Ok(!result.has_conflicts)
    }
}
