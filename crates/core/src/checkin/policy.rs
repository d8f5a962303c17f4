//! Check-in policy plugin contract and the registry of installed policies.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::work_items::{WorkItem, WorkItemAction};
use crate::cancel::Cancellation;
use crate::errors::{DuplicatePolicyId, PolicyError};

/// Policy name used for failures not produced by a policy itself.
pub const FRAMEWORK_POLICY_NAME: &str = "Checkin policy framework";

/// Identity of a policy implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub installation_instructions: String,
}

impl PolicyType {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        short_description: impl Into<String>,
        installation_instructions: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            short_description: short_description.into(),
            installation_instructions: installation_instructions.into(),
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// The annotation format a descriptor was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum DescriptorFormat {
    /// No persisted configuration.
    Stateless,
    /// Carries a configuration blob handed to [`CheckinPolicy::load_state`].
    Stateful { configuration: String },
}

/// A policy attached to a team project on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDescriptor {
    pub policy_type: PolicyType,
    pub enabled: bool,
    #[serde(flatten)]
    pub format: DescriptorFormat,
}

impl PolicyDescriptor {
    pub fn stateless(policy_type: PolicyType, enabled: bool) -> Self {
        Self {
            policy_type,
            enabled,
            format: DescriptorFormat::Stateless,
        }
    }

    pub fn stateful(policy_type: PolicyType, enabled: bool, configuration: impl Into<String>) -> Self {
        Self {
            policy_type,
            enabled,
            format: DescriptorFormat::Stateful {
                configuration: configuration.into(),
            },
        }
    }

    pub fn is_stateful(&self) -> bool {
        matches!(self.format, DescriptorFormat::Stateful { .. })
    }
}

/// Why a failure was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Returned by the policy's own evaluation.
    Reported,
    /// No implementation is installed for the descriptor.
    NotInstalled { stateless: bool },
    /// Several installed implementations share the descriptor's id.
    DuplicateId,
    /// The stateful configuration could not be loaded.
    LoadFailed,
    /// The policy failed while evaluating.
    EvaluationFailed,
}

/// A single policy warning shown before check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyFailure {
    pub policy_name: String,
    pub message: String,
    pub tooltip: Option<String>,
    pub kind: FailureKind,
}

impl PolicyFailure {
    /// A failure reported by `policy_type` itself.
    pub fn reported(policy_type: &PolicyType, message: impl Into<String>) -> Self {
        Self {
            policy_name: policy_type.name.clone(),
            message: message.into(),
            tooltip: None,
            kind: FailureKind::Reported,
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub(crate) fn not_installed(descriptor: &PolicyDescriptor) -> Self {
        let policy_type = &descriptor.policy_type;
        let stateless = !descriptor.is_stateful();
        let tooltip = if policy_type.installation_instructions.trim().is_empty() {
            format!(
                "No implementation with id '{}' is installed. Contact the team project administrator.",
                policy_type.id
            )
        } else {
            policy_type.installation_instructions.clone()
        };
        Self {
            policy_name: policy_type.name.clone(),
            message: format!("Checkin policy '{}' is not installed", policy_type.name),
            tooltip: Some(tooltip),
            kind: FailureKind::NotInstalled { stateless },
        }
    }

    pub(crate) fn duplicate_id(err: &DuplicatePolicyId) -> Self {
        Self {
            policy_name: FRAMEWORK_POLICY_NAME.to_string(),
            message: "Duplicate checkin policy id".to_string(),
            tooltip: Some(format!(
                "Several checkin policies with the same id found: '{}'.\nPlease review your extensions.",
                err.0
            )),
            kind: FailureKind::DuplicateId,
        }
    }

    pub(crate) fn load_failed(policy_type: &PolicyType, error: &PolicyError) -> Self {
        Self {
            policy_name: FRAMEWORK_POLICY_NAME.to_string(),
            message: format!(
                "Cannot load configuration of checkin policy '{}'",
                policy_type.name
            ),
            tooltip: Some(format!(
                "The following error occurred while loading: {}",
                error
            )),
            kind: FailureKind::LoadFailed,
        }
    }

    pub(crate) fn evaluation_failed(policy_type: &PolicyType, error: &PolicyError) -> Self {
        Self {
            policy_name: FRAMEWORK_POLICY_NAME.to_string(),
            message: format!("Cannot evaluate checkin policy '{}'", policy_type.name),
            tooltip: Some(format!(
                "The following error occurred while evaluating: {}",
                error
            )),
            kind: FailureKind::EvaluationFailed,
        }
    }
}

/// Read-only view of the pending check-in handed to a policy.
#[derive(Debug, Clone)]
pub struct PolicyContext<'a> {
    files: &'a [PathBuf],
    server_paths: &'a [String],
    commit_message: &'a str,
    work_items: BTreeMap<WorkItem, WorkItemAction>,
}

impl<'a> PolicyContext<'a> {
    pub fn new(
        files: &'a [PathBuf],
        commit_message: &'a str,
        work_items: BTreeMap<WorkItem, WorkItemAction>,
    ) -> Self {
        Self {
            files,
            server_paths: &[],
            commit_message,
            work_items,
        }
    }

    /// Attach the server path of each file, in the order of `files`.
    pub fn with_server_paths(mut self, server_paths: &'a [String]) -> Self {
        self.server_paths = server_paths;
        self
    }

    /// Local files of the check-in that belong to the evaluated server.
    pub fn files(&self) -> &[PathBuf] {
        self.files
    }

    /// Server path of `files()[index]`, when known.
    pub fn server_path(&self, index: usize) -> Option<&str> {
        self.server_paths.get(index).map(String::as_str)
    }

    pub fn commit_message(&self) -> &str {
        self.commit_message
    }

    pub fn work_items(&self) -> &BTreeMap<WorkItem, WorkItemAction> {
        &self.work_items
    }
}

/// A check-in policy implementation.
pub trait CheckinPolicy {
    fn policy_type(&self) -> PolicyType;

    /// Load the configuration of a stateful descriptor. Stateless policies
    /// keep the default, which accepts anything.
    fn load_state(&mut self, _configuration: &str) -> Result<(), PolicyError> {
        Ok(())
    }

    /// Check the pending check-in. Implementations return
    /// [`PolicyError::Cancelled`] when `cancel` fires mid-way.
    fn evaluate(
        &self,
        context: &PolicyContext<'_>,
        cancel: &Cancellation,
    ) -> Result<Vec<PolicyFailure>, PolicyError>;
}

type PolicyFactory = Box<dyn Fn() -> Box<dyn CheckinPolicy> + Send + Sync>;

struct Registration {
    id: String,
    factory: PolicyFactory,
}

/// Installed policy implementations, looked up by type id.
///
/// Registering two implementations with the same id is allowed; looking the
/// id up then fails with [`DuplicatePolicyId`].
#[derive(Default)]
pub struct PolicyRegistry {
    registrations: Vec<Registration>,
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.registrations.iter().map(|r| &r.id))
            .finish()
    }
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in policies.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::builtin::register_builtins(&mut registry);
        registry
    }

    /// Register a policy type; a fresh instance is created per lookup.
    pub fn register<P>(&mut self)
    where
        P: CheckinPolicy + Default + 'static,
    {
        let id = P::default().policy_type().id;
        self.register_factory(id, || Box::new(P::default()));
    }

    pub fn register_factory<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn CheckinPolicy> + Send + Sync + 'static,
    {
        let id = id.into();
        debug!(policy_id = %id, "registering checkin policy");
        self.registrations.push(Registration {
            id,
            factory: Box::new(factory),
        });
    }

    /// A new instance of the policy with `id`, `None` when not installed.
    pub fn find(&self, id: &str) -> Result<Option<Box<dyn CheckinPolicy>>, DuplicatePolicyId> {
        let mut matching = self.registrations.iter().filter(|r| r.id == id);
        let Some(first) = matching.next() else {
            return Ok(None);
        };
        if matching.next().is_some() {
            return Err(DuplicatePolicyId(id.to_string()));
        }
        Ok(Some((first.factory)()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(|r| r.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
