//! Conflict classification and resolution.
//!
//! Conflicts surface from a get, check-in or merge. The subsystem:
//! 1. **Classifies** them -- which can be merged, which are name or content
//!    conflicts.
//! 2. **Tracks** unresolved conflicts per workspace in a registry.
//! 3. **Resolves** them by merging, keeping either side, or skipping, then
//!    applies the operations the server sends back.

pub mod apply;
pub mod classifier;
pub mod merger;
pub mod model;
pub mod registry;
pub mod resolver;

pub use apply::{DownloadMode, FileGroup, OperationApplier, UpdatedFiles};
pub use classifier::{is_content_conflict, is_mergeable, is_name_conflict};
pub use merger::{three_way_merge, ContentMerger, ContentTriplet, MergeResult, NameMerger, ThreeWayMerger};
pub use model::{ChangeType, ChangeTypeMask, Conflict, ConflictType, ItemType, Resolution};
pub use registry::{unresolved_conflicts, ConflictRegistry};
pub use resolver::{ConflictResolver, ResolveOutcome};
