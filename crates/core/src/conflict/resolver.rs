//! Conflict resolution actions.
//!
//! The [`ConflictResolver`] provides the four terminal operations on a
//! registered conflict: merge, accept yours, accept theirs, or skip. Each
//! successful server round-trip is followed by applying the operations the
//! server returns; only then is the conflict dropped from the registry.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::apply::{DownloadMode, FileGroup, OperationApplier, UpdatedFiles};
use super::classifier::{is_content_conflict, is_mergeable, is_name_conflict};
use super::merger::{ContentMerger, ContentTriplet, NameMerger};
use super::model::{Conflict, ConflictType, ItemType, Resolution};
use super::registry::ConflictRegistry;
use crate::cancel::Cancellation;
use crate::errors::{ApplyError, ResolveError};
use crate::proxy::{LockLevel, ResolveConflictParams, ServerProxy, ENCODING_UNCHANGED};
use crate::vcpath;
use crate::workspace::Workspace;

/// What a successful call did to the conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Reported to the server and removed from the registry.
    Resolved,
    /// Content merge finished without resolving everything; still registered.
    MergeIncomplete,
    /// The name merge was cancelled by the user; nothing changed.
    NameMergeCancelled,
    /// Recorded as skipped; still registered.
    Skipped,
}

/// Drives resolution of the conflicts held by a [`ConflictRegistry`].
pub struct ConflictResolver<'a> {
    registry: ConflictRegistry,
    proxy: &'a dyn ServerProxy,
    applier: &'a mut dyn OperationApplier,
    name_merger: &'a mut dyn NameMerger,
    content_merger: &'a mut dyn ContentMerger,
    updated_files: Option<&'a mut UpdatedFiles>,
    cancel: Cancellation,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(
        registry: ConflictRegistry,
        proxy: &'a dyn ServerProxy,
        applier: &'a mut dyn OperationApplier,
        name_merger: &'a mut dyn NameMerger,
        content_merger: &'a mut dyn ContentMerger,
    ) -> Self {
        Self {
            registry,
            proxy,
            applier,
            name_merger,
            content_merger,
            updated_files: None,
            cancel: Cancellation::new(),
        }
    }

    /// Record skipped / merged files into an externally owned ledger.
    pub fn with_updated_files(mut self, updated_files: &'a mut UpdatedFiles) -> Self {
        self.updated_files = Some(updated_files);
        self
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &ConflictRegistry {
        &self.registry
    }

    /// Conflicts still waiting for a resolution.
    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.registry.conflicts()
    }

    pub fn into_registry(self) -> ConflictRegistry {
        self.registry
    }

    fn workspace(&self, conflict: &Conflict) -> Result<Workspace, ResolveError> {
        self.registry
            .workspace_of(conflict.id)
            .cloned()
            .ok_or(ResolveError::UnknownConflict(conflict.id))
    }

    // -----------------------------------------------------------------------
    // Terminal operations
    // -----------------------------------------------------------------------

    /// Merge names and/or content, then report `AcceptMerge`.
    pub fn accept_merge(&mut self, conflict: &Conflict) -> Result<ResolveOutcome, ResolveError> {
        if !is_mergeable(conflict) {
            return Err(ResolveError::NotMergeable(conflict.id));
        }
        let workspace = self.workspace(conflict)?;
        let local_path = conflict
            .source_or_target()
            .map(vcpath::local_path_from_tfs)
            .ok_or(ResolveError::NotMergeable(conflict.id))?;
        let content_conflict = is_content_conflict(conflict);
        let name_conflict = is_name_conflict(conflict);
        info!(
            conflict_id = conflict.id,
            path = %local_path.display(),
            content_conflict,
            name_conflict,
            "resolving conflict: accept merge"
        );

        // Content is only needed when it conflicts.
        let content = if content_conflict {
            self.load_content(&workspace, conflict, &local_path)?
        } else {
            ContentTriplet::default()
        };

        let local_name = if name_conflict {
            let Some(merged_server_path) = self.name_merger.merge_name(&workspace, conflict)?
            else {
                info!(conflict_id = conflict.id, "name merge cancelled by user");
                return Ok(ResolveOutcome::NameMergeCancelled);
            };
            workspace
                .find_local_path_by_server_path(&merged_server_path)
                .ok_or_else(|| {
                    ResolveError::UnmappedServerPath(merged_server_path, workspace.name.clone())
                })?
        } else {
            conflict
                .target_or_source()
                .map(vcpath::local_path_from_tfs)
                .unwrap_or_else(|| local_path.clone())
        };

        let mut resolved = true;
        if content_conflict {
            if conflict.item_type != ItemType::File {
                return Err(ResolveError::NotAFile(conflict.id));
            }
            if !local_path.is_file() {
                return Err(ResolveError::MissingFile(local_path.display().to_string()));
            }
            clear_read_only(&local_path)?;
            resolved =
                self.content_merger
                    .merge_content(conflict, &content, &local_path, &local_name)?;
        }

        if !resolved {
            info!(conflict_id = conflict.id, "content merge incomplete, conflict kept");
            return Ok(ResolveOutcome::MergeIncomplete);
        }

        self.conflict_resolved(
            &workspace,
            conflict,
            Resolution::AcceptMerge,
            &local_name,
            name_conflict,
        )?;
        Ok(ResolveOutcome::Resolved)
    }

    /// Keep the local version. No file is touched.
    pub fn accept_yours(&mut self, conflict: &Conflict) -> Result<ResolveOutcome, ResolveError> {
        let workspace = self.workspace(conflict)?;
        info!(conflict_id = conflict.id, "resolving conflict: accept yours");
        let target = conflict
            .target_local_item
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_default();
        self.conflict_resolved(&workspace, conflict, Resolution::AcceptYours, &target, false)?;

        // The server sends nothing to apply, so record the file explicitly.
        if let (Some(ledger), Some(path)) = (self.updated_files.as_deref_mut(), conflict.source_or_target()) {
            ledger.add(
                FileGroup::Skipped,
                vcpath::local_path_from_tfs(path).display().to_string(),
            );
        }
        Ok(ResolveOutcome::Resolved)
    }

    /// Take the server version, overwriting local changes.
    pub fn accept_theirs(&mut self, conflict: &Conflict) -> Result<ResolveOutcome, ResolveError> {
        let workspace = self.workspace(conflict)?;
        info!(conflict_id = conflict.id, "resolving conflict: accept theirs");
        let local_path = conflict
            .target_or_source()
            .map(vcpath::local_path_from_tfs)
            .unwrap_or_default();
        self.conflict_resolved(
            &workspace,
            conflict,
            Resolution::AcceptTheirs,
            &local_path,
            false,
        )?;
        Ok(ResolveOutcome::Resolved)
    }

    /// Leave the conflict for later. Local only: the server is not contacted
    /// and the conflict stays registered.
    pub fn skip(&mut self, conflict: &Conflict) -> ResolveOutcome {
        debug!(conflict_id = conflict.id, "skipping conflict");
        if let (Some(ledger), Some(path)) = (self.updated_files.as_deref_mut(), conflict.source_or_target()) {
            ledger.add(
                FileGroup::Skipped,
                vcpath::local_path_from_tfs(path).display().to_string(),
            );
        }
        ResolveOutcome::Skipped
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn load_content(
        &self,
        workspace: &Workspace,
        conflict: &Conflict,
        local_path: &Path,
    ) -> Result<ContentTriplet, ResolveError> {
        if conflict.item_type != ItemType::File {
            return Ok(ContentTriplet::default());
        }
        let load_error = |source| ResolveError::ContentLoad {
            path: local_path.display().to_string(),
            source,
        };
        let download = |version: i32, item_id: i32| -> Result<Vec<u8>, ResolveError> {
            self.cancel.check()?;
            match self.proxy.download_content(workspace, version, item_id) {
                Ok(bytes) => Ok(bytes.unwrap_or_default()),
                Err(crate::errors::ProxyError::Cancelled) => Err(ResolveError::Cancelled),
                Err(e) => Err(load_error(e)),
            }
        };

        let (yours, theirs) = if conflict.conflict_type == ConflictType::Merge {
            (
                download(conflict.target_version, conflict.target_item_id)?,
                download(conflict.your_version, conflict.your_item_id)?,
            )
        } else {
            let current = match std::fs::read(local_path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
                Err(e) => return Err(e.into()),
            };
            (
                current,
                download(conflict.target_version, conflict.target_item_id)?,
            )
        };
        let base = download(conflict.base_version, conflict.base_item_id)?;
        self.cancel.check()?;

        debug!(
            conflict_id = conflict.id,
            base = base.len(),
            yours = yours.len(),
            theirs = theirs.len(),
            "merge content loaded"
        );
        Ok(ContentTriplet { base, yours, theirs })
    }

    /// Report the resolution and apply whatever the server sends back.
    fn conflict_resolved(
        &mut self,
        workspace: &Workspace,
        conflict: &Conflict,
        resolution: Resolution,
        new_local_path: &Path,
        send_path: bool,
    ) -> Result<(), ResolveError> {
        let params = ResolveConflictParams {
            conflict_id: conflict.id,
            resolution,
            lock_level: LockLevel::Unchanged,
            encoding: ENCODING_UNCHANGED,
            new_path: send_path.then(|| vcpath::to_tfs_representation(new_local_path)),
        };
        self.cancel.check()?;
        let response = self.proxy.resolve_conflict(workspace, &params)?;

        // Merge results are recorded below; the applier only reports the
        // other resolutions.
        let mut ledger = if resolution == Resolution::AcceptMerge {
            None
        } else {
            self.updated_files.as_deref_mut()
        };

        let mut errors: Vec<ApplyError> = Vec::new();
        if !response.get_operations.is_empty() {
            let mode = if resolution == Resolution::AcceptTheirs {
                DownloadMode::Force
            } else {
                DownloadMode::Merge
            };
            errors.extend(self.applier.apply(
                workspace,
                &response.get_operations,
                mode,
                ledger.as_deref_mut(),
            ));
        }
        if !response.undo_operations.is_empty() {
            errors.extend(self.applier.apply(
                workspace,
                &response.undo_operations,
                DownloadMode::Force,
                ledger.as_deref_mut(),
            ));
        }
        if let Some(err) = ResolveError::from_apply_errors(errors) {
            warn!(conflict_id = conflict.id, error = %err, "applying resolution failed");
            return Err(err);
        }

        if resolution == Resolution::AcceptMerge {
            if let Some(ledger) = self.updated_files.as_deref_mut() {
                ledger.add(FileGroup::Merged, new_local_path.display().to_string());
            }
        }
        self.registry.remove(conflict.id);
        info!(conflict_id = conflict.id, %resolution, "conflict resolved");
        Ok(())
    }
}

/// Make a local file writable by its owner before merged content is
/// written into it.
fn clear_read_only(path: &Path) -> Result<(), ResolveError> {
    let mut permissions = std::fs::metadata(path)?.permissions();
    if permissions.readonly() {
        make_owner_writable(&mut permissions);
        std::fs::set_permissions(path, permissions)?;
        debug!(path = %path.display(), "cleared read-only attribute");
    }
    Ok(())
}

#[cfg(unix)]
fn make_owner_writable(permissions: &mut std::fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
fn make_owner_writable(permissions: &mut std::fs::Permissions) {
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
}
