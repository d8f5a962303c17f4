//! Error types for the tfvc-core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.
//!
//! Cancellation is never folded into a generic failure: every error type that
//! can observe a cancelled progress scope carries its own `Cancelled` variant
//! and the conversions between them keep it intact.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Checkin(#[from] CheckinError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Server proxy errors
// ---------------------------------------------------------------------------

/// Errors raised by a [`ServerProxy`](crate::proxy::ServerProxy) call.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Network / connectivity issue.
    #[error("transport error talking to '{server}': {detail}")]
    Transport { server: String, detail: String },

    /// The server processed the request and reported a failure.
    #[error("server error: {0}")]
    Server(String),

    /// The operation is not available from this proxy.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// The surrounding progress scope was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Conflict resolution errors
// ---------------------------------------------------------------------------

/// A single failure while applying a server-issued get or undo operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot apply operation to '{path}': {detail}")]
pub struct ApplyError {
    pub path: String,
    pub detail: String,
}

/// Errors from the conflict resolution subsystem.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The conflict is not tracked by the registry (already resolved or never
    /// surfaced by a get).
    #[error("conflict {0} is not registered")]
    UnknownConflict(i32),

    /// `accept_merge` was requested for a conflict that cannot be merged.
    #[error("conflict {0} cannot be merged")]
    NotMergeable(i32),

    /// A content conflict was reported on an item that is not a file.
    #[error("conflict {0} reports a content conflict on a folder")]
    NotAFile(i32),

    /// The merge target is missing from the working copy.
    #[error("File '{0}' is missing")]
    MissingFile(String),

    /// Base / yours / theirs content could not be loaded.
    #[error("cannot load revisions for '{path}': {source}")]
    ContentLoad {
        path: String,
        #[source]
        source: ProxyError,
    },

    /// The merged server path has no local mapping in the workspace.
    #[error("server path '{0}' is not mapped in workspace '{1}'")]
    UnmappedServerPath(String, String),

    /// Server round-trip failed.
    #[error("conflict resolution request failed: {0}")]
    Proxy(ProxyError),

    /// Exactly one get / undo operation failed to apply.
    #[error(transparent)]
    Apply(ApplyError),

    /// Several get / undo operations failed to apply.
    #[error("{} operations failed to apply: {}", .0.len(), join_apply_errors(.0))]
    ApplyAggregated(Vec<ApplyError>),

    /// Reading or writing the local file failed.
    #[error("resolve I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The surrounding progress scope was cancelled.
    #[error("conflict resolution cancelled")]
    Cancelled,
}

impl From<ProxyError> for ResolveError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Cancelled => Self::Cancelled,
            other => Self::Proxy(other),
        }
    }
}

impl ResolveError {
    /// Collapse a batch of apply failures: one failure surfaces as itself,
    /// several as an aggregate. Returns `None` for an empty batch.
    pub fn from_apply_errors(mut errors: Vec<ApplyError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop().map(Self::Apply),
            _ => Some(Self::ApplyAggregated(errors)),
        }
    }
}

fn join_apply_errors(errors: &[ApplyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Check-in validation errors
// ---------------------------------------------------------------------------

/// Fatal errors of a check-in validation attempt. Recoverable discovery
/// problems never show up here; they are collected as text instead.
#[derive(Debug, Error)]
pub enum CheckinError {
    /// None of the files to check in is covered by a workspace mapping.
    #[error("Team Foundation Server mappings not found.")]
    NoMappings,

    /// Querying the server failed in a way that cannot be skipped.
    #[error("check-in validation failed: {0}")]
    Proxy(ProxyError),

    /// The user cancelled the validation.
    #[error("Validation cancelled by user")]
    Cancelled,
}

impl From<ProxyError> for CheckinError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Cancelled => Self::Cancelled,
            other => Self::Proxy(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy plugin errors
// ---------------------------------------------------------------------------

/// Errors returned by a [`CheckinPolicy`](crate::checkin::CheckinPolicy)
/// implementation.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy could not do its job.
    #[error("{0}")]
    Failed(String),

    /// The policy observed a cancelled progress scope.
    #[error("policy evaluation cancelled")]
    Cancelled,
}

/// More than one installed policy claims the same type id.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("several checkin policies with the same id found: '{0}'")]
pub struct DuplicatePolicyId(pub String);

/// A policy or override annotation value could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyParseError {
    /// The expected root element is absent.
    #[error("policy annotation has no <{0}> root element")]
    MissingRoot(String),

    /// A required element or attribute is absent.
    #[error("policy definition is missing '{0}'")]
    MissingField(String),

    /// An attribute value is malformed.
    #[error("invalid value '{value}' for '{field}'")]
    InvalidValue { field: String, value: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
