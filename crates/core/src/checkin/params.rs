//! State of one check-in attempt: notes, policies, failures and work items
//! for every server involved, plus the validation message built from them.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::compat::PoliciesCompatibility;
use super::discovery::{discover, Discovery, TeamProjectPolicies};
use super::notes::{empty_note_names, CheckinNote};
use super::policy::{DescriptorFormat, PolicyContext, PolicyFailure, PolicyRegistry};
use super::work_items::WorkItemsCheckinParameters;
use crate::cancel::Cancellation;
use crate::errors::{CheckinError, PolicyError};
use crate::proxy::ServerProxy;
use crate::workspace::{ServerInfo, Workspace};

/// Which problems a validation message should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Both,
}

/// Text shown to the user before committing.
///
/// `severity` is [`Severity::Error`] when a required note is empty and
/// [`Severity::Warning`] otherwise; it is never `Both`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    pub text: String,
    pub severity: Severity,
}

/// Override recorded to commit despite policy failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyOverride {
    pub reason: String,
    /// `(policy name, message)`, first-seen order, last message per policy.
    pub failures: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct ServerData {
    notes: Vec<CheckinNote>,
    empty_notes: Option<Vec<String>>,
    work_items: WorkItemsCheckinParameters,
    failures: Option<Arc<Vec<PolicyFailure>>>,
    files: Arc<Vec<PathBuf>>,
    server_paths: Arc<Vec<String>>,
    policies: Arc<BTreeMap<String, TeamProjectPolicies>>,
}

impl ServerData {
    fn evaluation_enabled(&self) -> bool {
        self.policies
            .values()
            .any(|data| data.compatibility.evaluation_enabled())
    }

    fn has_empty_notes(&self) -> bool {
        self.empty_notes.as_ref().is_some_and(|n| !n.is_empty())
    }

    fn failures(&self) -> &[PolicyFailure] {
        self.failures.as_deref().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Validation state of a pending check-in, one entry per server.
#[derive(Debug)]
pub struct CheckinParameters {
    data: Vec<(ServerInfo, ServerData)>,
    policies_evaluated: bool,
    policies_load_error: Option<String>,
    override_reason: Option<String>,
    commit_message: String,
}

impl CheckinParameters {
    /// Discover notes and policies for `files` and validate the (still empty)
    /// notes. Policies are not evaluated; call [`Self::evaluate_policies`].
    pub fn new(
        files: &[PathBuf],
        workspaces: &[Workspace],
        proxy: &dyn ServerProxy,
        defaults: PoliciesCompatibility,
        cancel: &Cancellation,
    ) -> Result<Self, CheckinError> {
        let discovery = discover(files, workspaces, proxy, defaults, cancel)?;
        let mut params = Self::from_discovery(discovery);
        params.validate_notes();
        Ok(params)
    }

    /// Build the parameters from a finished discovery pass.
    pub fn from_discovery(discovery: Discovery) -> Self {
        if let Some(error) = &discovery.load_error {
            warn!(error = %error, "checkin policies partially loaded");
        }
        let data = discovery
            .servers
            .into_iter()
            .map(|s| {
                (
                    s.server,
                    ServerData {
                        notes: s.notes,
                        empty_notes: None,
                        work_items: WorkItemsCheckinParameters::new(),
                        failures: None,
                        files: Arc::new(s.files),
                        server_paths: Arc::new(s.server_paths),
                        policies: Arc::new(s.team_projects),
                    },
                )
            })
            .collect();
        Self {
            data,
            policies_evaluated: false,
            policies_load_error: discovery.load_error,
            override_reason: None,
            commit_message: String::new(),
        }
    }

    fn server_data(&self, server: &ServerInfo) -> Option<&ServerData> {
        self.data.iter().find(|(s, _)| s == server).map(|(_, d)| d)
    }

    fn server_data_mut(&mut self, server: &ServerInfo) -> Option<&mut ServerData> {
        self.data
            .iter_mut()
            .find(|(s, _)| s == server)
            .map(|(_, d)| d)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Servers in discovery order (sorted by presentable URI).
    pub fn servers(&self) -> Vec<ServerInfo> {
        self.data.iter().map(|(s, _)| s.clone()).collect()
    }

    /// Team projects of `server` touched by the check-in.
    pub fn project_paths(&self, server: &ServerInfo) -> Vec<String> {
        self.server_data(server)
            .map(|d| d.policies.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Effective policy configuration per team project of `server`.
    pub fn team_project_policies(
        &self,
        server: &ServerInfo,
    ) -> Option<&BTreeMap<String, TeamProjectPolicies>> {
        self.server_data(server).map(|d| d.policies.as_ref())
    }

    pub fn files(&self, server: &ServerInfo) -> &[PathBuf] {
        self.server_data(server)
            .map(|d| d.files.as_slice())
            .unwrap_or(&[])
    }

    pub fn checkin_notes(&self, server: &ServerInfo) -> &[CheckinNote] {
        self.server_data(server)
            .map(|d| d.notes.as_slice())
            .unwrap_or(&[])
    }

    /// Set the value of note `name`. Returns `false` for an unknown note.
    /// Call [`Self::validate_notes`] afterwards to refresh empty notes.
    pub fn set_note_value(
        &mut self,
        server: &ServerInfo,
        name: &str,
        value: impl Into<String>,
    ) -> bool {
        let Some(note) = self
            .server_data_mut(server)
            .and_then(|d| d.notes.iter_mut().find(|n| n.name == name))
        else {
            return false;
        };
        note.value = Some(value.into());
        true
    }

    pub fn work_items(&self, server: &ServerInfo) -> Option<&WorkItemsCheckinParameters> {
        self.server_data(server).map(|d| &d.work_items)
    }

    pub fn work_items_mut(&mut self, server: &ServerInfo) -> Option<&mut WorkItemsCheckinParameters> {
        self.server_data_mut(server).map(|d| &mut d.work_items)
    }

    pub fn commit_message(&self) -> &str {
        &self.commit_message
    }

    pub fn set_commit_message(&mut self, message: impl Into<String>) {
        self.commit_message = message.into();
    }

    pub fn policies_evaluated(&self) -> bool {
        self.policies_evaluated
    }

    /// Newline-joined recoverable errors met while loading policies.
    pub fn policies_load_error(&self) -> Option<&str> {
        self.policies_load_error.as_deref()
    }

    // -----------------------------------------------------------------------
    // Notes
    // -----------------------------------------------------------------------

    /// Recompute the empty required notes of every server.
    pub fn validate_notes(&mut self) {
        for (server, data) in &mut self.data {
            let empty = empty_note_names(&data.notes);
            debug!(server = %server, empty = empty.len(), "checkin notes validated");
            data.empty_notes = Some(empty);
        }
    }

    pub fn has_empty_notes(&self, server: &ServerInfo) -> bool {
        self.server_data(server).is_some_and(ServerData::has_empty_notes)
    }

    /// Required notes of `server` without a value, as of the last
    /// [`Self::validate_notes`].
    pub fn empty_notes(&self, server: &ServerInfo) -> &[String] {
        self.server_data(server)
            .and_then(|d| d.empty_notes.as_deref())
            .unwrap_or(&[])
    }

    // -----------------------------------------------------------------------
    // Policies
    // -----------------------------------------------------------------------

    /// Whether any team project of any server enables a policy format.
    pub fn evaluation_enabled(&self) -> bool {
        self.data.iter().any(|(_, d)| d.evaluation_enabled())
    }

    /// Run every discovered policy against the pending check-in.
    ///
    /// Policy problems become [`PolicyFailure`]s; only cancellation aborts
    /// the pass.
    pub fn evaluate_policies(
        &mut self,
        registry: &PolicyRegistry,
        cancel: &Cancellation,
    ) -> Result<(), CheckinError> {
        for (server, data) in &mut self.data {
            info!(server = %server, "evaluating checkin policies");
            let failures = evaluate_server(registry, data, &self.commit_message, cancel)?;
            info!(server = %server, failures = failures.len(), "checkin policies evaluated");
            data.failures = Some(Arc::new(failures));
        }
        self.policies_evaluated = true;
        Ok(())
    }

    /// Failures of `server`; empty until policies were evaluated.
    pub fn failures(&self, server: &ServerInfo) -> &[PolicyFailure] {
        if !self.policies_evaluated {
            return &[];
        }
        self.server_data(server)
            .map(ServerData::failures)
            .unwrap_or(&[])
    }

    /// Failures of all servers in server order.
    pub fn all_failures(&self) -> Vec<PolicyFailure> {
        if !self.policies_evaluated {
            return Vec::new();
        }
        self.data
            .iter()
            .flat_map(|(_, d)| d.failures().iter().cloned())
            .collect()
    }

    /// Whether `server` needs attention on the policy side: evaluation is
    /// enabled and either not done yet or produced failures.
    pub fn has_policy_failures(&self, server: &ServerInfo) -> bool {
        let Some(data) = self.server_data(server) else {
            return false;
        };
        data.evaluation_enabled() && (!self.policies_evaluated || !data.failures().is_empty())
    }

    pub fn set_override_reason(&mut self, reason: Option<String>) {
        self.override_reason = reason;
    }

    /// The override to send with the check-in, `None` without a reason.
    pub fn policy_override(&self, server: &ServerInfo) -> Option<PolicyOverride> {
        let reason = self.override_reason.clone()?;
        let mut failures: Vec<(String, String)> = Vec::new();
        if let Some(data) = self.server_data(server) {
            for failure in data.failures() {
                match failures.iter_mut().find(|(name, _)| *name == failure.policy_name) {
                    Some(entry) => entry.1 = failure.message.clone(),
                    None => failures.push((failure.policy_name.clone(), failure.message.clone())),
                }
            }
        }
        Some(PolicyOverride { reason, failures })
    }

    // -----------------------------------------------------------------------
    // Copy and message
    // -----------------------------------------------------------------------

    /// Copy for editing in a dialog.
    ///
    /// Note values and work items are copied; policy descriptors, files and
    /// failure lists are shared with `self`. The override reason is not
    /// carried over.
    pub fn create_copy(&self) -> Self {
        Self {
            data: self.data.clone(),
            policies_evaluated: self.policies_evaluated,
            policies_load_error: self.policies_load_error.clone(),
            override_reason: None,
            commit_message: self.commit_message.clone(),
        }
    }

    /// Build the message for `severity`, `None` when nothing qualifies.
    pub fn validation_message(&self, severity: Severity) -> Option<ValidationMessage> {
        let check_error = matches!(severity, Severity::Error | Severity::Both);
        let mut check_warning = matches!(severity, Severity::Warning | Severity::Both);
        let mut text = String::new();
        let mut resulting = Severity::Warning;

        if !self.policies_evaluated && check_warning {
            if self.evaluation_enabled() {
                text.push_str("Checkin policies were not evaluated");
            }
            check_warning = false;
        }

        let show_headers = self.data.len() > 1;
        for (server, data) in &self.data {
            let report_notes = check_error && data.has_empty_notes();
            let report_failures = check_warning && !data.failures().is_empty();
            if !report_notes && !report_failures {
                continue;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            if show_headers {
                text.push_str(&server.presentable_uri);
                text.push('\n');
            }
            if report_notes {
                resulting = Severity::Error;
                let names = data.empty_notes.as_deref().unwrap_or(&[]);
                if names.len() > 1 {
                    text.push_str(&format!(
                        "Checkin notes '{}' are required to commit",
                        names.join("', '")
                    ));
                } else {
                    text.push_str(&format!(
                        "Checkin note '{}' is required to commit",
                        names[0]
                    ));
                }
            }
            if report_failures {
                if report_notes {
                    text.push('\n');
                }
                text.push_str("Checkin policy warnings found");
            }
        }

        (!text.is_empty()).then_some(ValidationMessage {
            text,
            severity: resulting,
        })
    }
}

/// Evaluate every descriptor of one server.
fn evaluate_server(
    registry: &PolicyRegistry,
    data: &ServerData,
    commit_message: &str,
    cancel: &Cancellation,
) -> Result<Vec<PolicyFailure>, CheckinError> {
    let context = PolicyContext::new(
        &data.files,
        commit_message,
        data.work_items.actions().clone(),
    )
    .with_server_paths(&data.server_paths);
    let mut failures = Vec::new();

    for (team_project, project) in data.policies.iter() {
        for descriptor in &project.policies {
            cancel.check()?;
            let policy_type = &descriptor.policy_type;
            let mut policy = match registry.find(&policy_type.id) {
                Ok(Some(policy)) => policy,
                Ok(None) => {
                    if project.compatibility.non_installed {
                        warn!(team_project = %team_project, policy_id = %policy_type.id, "checkin policy not installed");
                        failures.push(PolicyFailure::not_installed(descriptor));
                    }
                    continue;
                }
                Err(duplicate) => {
                    warn!(team_project = %team_project, error = %duplicate, "duplicate checkin policy id");
                    failures.push(PolicyFailure::duplicate_id(&duplicate));
                    break;
                }
            };

            let name = policy.policy_type();
            debug!(policy = %name.name, "evaluating checkin policy");
            if let DescriptorFormat::Stateful { configuration } = &descriptor.format {
                match policy.load_state(configuration) {
                    Ok(()) => {}
                    Err(PolicyError::Cancelled) => return Err(CheckinError::Cancelled),
                    Err(err) => {
                        warn!(policy = %name.name, error = %err, "cannot load checkin policy configuration");
                        failures.push(PolicyFailure::load_failed(&name, &err));
                        continue;
                    }
                }
            }

            match policy.evaluate(&context, cancel) {
                Ok(reported) => failures.extend(reported),
                Err(PolicyError::Cancelled) => return Err(CheckinError::Cancelled),
                Err(err) => {
                    warn!(policy = %name.name, error = %err, "checkin policy evaluation failed");
                    failures.push(PolicyFailure::evaluation_failed(&name, &err));
                }
            }
        }
    }
    cancel.check()?;
    Ok(failures)
}
