//! Narrow interface to the version-control server.
//!
//! The wire-level client lives outside this crate; everything here talks to
//! it through [`ServerProxy`]. [`snapshot::SnapshotProxy`] is an offline
//! implementation backed by a JSON document.

pub mod snapshot;

use serde::{Deserialize, Serialize};

use crate::conflict::Resolution;
use crate::errors::ProxyError;
use crate::workspace::{ServerInfo, Workspace};

/// Server-declared check-in note field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinNoteFieldDefinition {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    /// Display order within the check-in dialog.
    #[serde(default)]
    pub display_order: i32,
}

/// Kinds of versioned annotations attached to a team project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Per-project override of the policy compatibility flags.
    Overrides,
    /// Stateless (format A) policy definitions.
    StatelessPolicies,
    /// Stateful (format B) policy definitions carrying configuration.
    StatefulPolicies,
}

impl AnnotationKind {
    /// Annotation name as stored on the server.
    pub fn annotation_name(self) -> &'static str {
        match self {
            Self::Overrides => "CheckinPolicyOverrides",
            Self::StatelessPolicies => "CheckinPolicies",
            Self::StatefulPolicies => "StatefulCheckinPolicies",
        }
    }
}

/// A versioned annotation value attached to a server item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Server path of the annotated item.
    pub item: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Lock level requested together with a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockLevel {
    Unchanged,
    None,
    Checkin,
    CheckOut,
}

/// Encoding sent with a resolution when the item encoding must not change.
pub const ENCODING_UNCHANGED: i32 = -2;

/// Arguments of a resolve-conflict call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveConflictParams {
    pub conflict_id: i32,
    pub resolution: Resolution,
    pub lock_level: LockLevel,
    pub encoding: i32,
    /// Merged local path in TFS representation, sent only for name merges.
    pub new_path: Option<String>,
}

/// Server instruction to fetch or revert an item locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOperation {
    pub item_id: i32,
    #[serde(default)]
    pub source_local_item: Option<String>,
    #[serde(default)]
    pub target_local_item: Option<String>,
    pub server_item: String,
    pub version: i32,
}

/// Operations the server wants applied after a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveResponse {
    pub get_operations: Vec<GetOperation>,
    pub undo_operations: Vec<GetOperation>,
}

/// Synchronous calls to the version-control server.
///
/// Every call may fail with a transport or server error. Implementations
/// that observe a cancelled scope return [`ProxyError::Cancelled`].
pub trait ServerProxy {
    /// Note definitions declared by all of `team_projects`.
    fn query_checkin_note_definitions(
        &self,
        server: &ServerInfo,
        team_projects: &[String],
    ) -> Result<Vec<CheckinNoteFieldDefinition>, ProxyError>;

    /// Annotations of `kind` attached to `team_project`.
    fn query_annotations(
        &self,
        server: &ServerInfo,
        kind: AnnotationKind,
        team_project: &str,
    ) -> Result<Vec<Annotation>, ProxyError>;

    /// Submit a conflict resolution for `workspace`.
    fn resolve_conflict(
        &self,
        workspace: &Workspace,
        params: &ResolveConflictParams,
    ) -> Result<ResolveResponse, ProxyError>;

    /// Content of item `item_id` at `version`, `None` when no blob exists.
    fn download_content(
        &self,
        workspace: &Workspace,
        version: i32,
        item_id: i32,
    ) -> Result<Option<Vec<u8>>, ProxyError>;
}
