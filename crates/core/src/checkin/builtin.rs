//! Policies shipped with the client.

use tracing::debug;

use super::policy::{CheckinPolicy, PolicyContext, PolicyFailure, PolicyRegistry, PolicyType};
use super::xml;
use crate::cancel::Cancellation;
use crate::vcpath;
use crate::errors::PolicyError;

pub const CHANGESET_COMMENTS_ID: &str = "tfvc.builtin.changeset-comments";
pub const WORK_ITEMS_ID: &str = "tfvc.builtin.work-items";
pub const FORBIDDEN_PATHS_ID: &str = "tfvc.builtin.forbidden-paths";

pub(crate) fn register_builtins(registry: &mut PolicyRegistry) {
    registry.register::<ChangesetCommentsPolicy>();
    registry.register::<WorkItemsPolicy>();
    registry.register::<ForbiddenPathsPolicy>();
}

/// Requires a non-blank commit message.
#[derive(Debug, Default)]
pub struct ChangesetCommentsPolicy;

impl CheckinPolicy for ChangesetCommentsPolicy {
    fn policy_type(&self) -> PolicyType {
        PolicyType::new(
            CHANGESET_COMMENTS_ID,
            "Changeset Comments Policy",
            "Reminds users to add meaningful comments to their check-ins",
            "Built into the client",
        )
    }

    fn evaluate(
        &self,
        context: &PolicyContext<'_>,
        _cancel: &Cancellation,
    ) -> Result<Vec<PolicyFailure>, PolicyError> {
        if context.commit_message().trim().is_empty() {
            return Ok(vec![PolicyFailure::reported(
                &self.policy_type(),
                "Please provide some comment for your check-in",
            )]);
        }
        Ok(Vec::new())
    }
}

/// Requires at least one associated work item.
#[derive(Debug, Default)]
pub struct WorkItemsPolicy;

impl CheckinPolicy for WorkItemsPolicy {
    fn policy_type(&self) -> PolicyType {
        PolicyType::new(
            WORK_ITEMS_ID,
            "Work Items",
            "Requires that one or more work items be associated with every check-in",
            "Built into the client",
        )
    }

    fn evaluate(
        &self,
        context: &PolicyContext<'_>,
        _cancel: &Cancellation,
    ) -> Result<Vec<PolicyFailure>, PolicyError> {
        if context.work_items().is_empty() {
            return Ok(vec![PolicyFailure::reported(
                &self.policy_type(),
                "Please associate one or more work items with this check-in",
            )]);
        }
        Ok(Vec::new())
    }
}

/// Rejects files matching configured glob patterns.
///
/// Patterns are matched against the path inside the team project
/// (`bin/tool.dll` for `$/Proj/bin/tool.dll`). Files without a known server
/// path are matched by their local path.
///
/// Configuration:
///
/// ```xml
/// <patterns><pattern>**/*.dll</pattern><pattern>bin/**</pattern></patterns>
/// ```
#[derive(Debug, Default)]
pub struct ForbiddenPathsPolicy {
    patterns: Vec<String>,
}

impl ForbiddenPathsPolicy {
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    fn matches(path: &str, pattern: &str) -> bool {
        let path = path.replace('\\', "/");
        let pattern = pattern.replace('\\', "/");
        glob_match::glob_match(&pattern, &path)
    }
}

impl CheckinPolicy for ForbiddenPathsPolicy {
    fn policy_type(&self) -> PolicyType {
        PolicyType::new(
            FORBIDDEN_PATHS_ID,
            "Forbidden Paths",
            "Blocks check-in of files matching forbidden patterns",
            "Built into the client",
        )
    }

    fn load_state(&mut self, configuration: &str) -> Result<(), PolicyError> {
        let root = xml::root(configuration, "patterns")
            .ok_or_else(|| PolicyError::Failed("configuration has no <patterns> element".into()))?;
        let patterns: Vec<String> = root
            .children("pattern")
            .iter()
            .map(|p| p.text())
            .filter(|p| !p.is_empty())
            .collect();
        if patterns.is_empty() {
            return Err(PolicyError::Failed(
                "configuration lists no <pattern> entries".into(),
            ));
        }
        debug!(count = patterns.len(), "forbidden path patterns loaded");
        self.patterns = patterns;
        Ok(())
    }

    fn evaluate(
        &self,
        context: &PolicyContext<'_>,
        cancel: &Cancellation,
    ) -> Result<Vec<PolicyFailure>, PolicyError> {
        let policy_type = self.policy_type();
        let mut failures = Vec::new();
        for (index, file) in context.files().iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PolicyError::Cancelled);
            }
            let path = match context.server_path(index) {
                Some(server_path) => vcpath::relative_to_project(server_path).to_string(),
                None => file.to_string_lossy().into_owned(),
            };
            if let Some(pattern) = self.patterns.iter().find(|p| Self::matches(&path, p)) {
                failures.push(
                    PolicyFailure::reported(
                        &policy_type,
                        format!("File '{}' must not be checked in", file.display()),
                    )
                    .with_tooltip(format!("Matches forbidden pattern '{}'", pattern)),
                );
            }
        }
        Ok(failures)
    }
}
