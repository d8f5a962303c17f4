//! Loading check-in notes and policy definitions from the servers that own
//! the files of a pending check-in.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::compat::PoliciesCompatibility;
use super::notes::{factorize_definitions, CheckinNote};
use super::parser::{parse_stateful_descriptors, parse_stateless_descriptors};
use super::policy::PolicyDescriptor;
use crate::cancel::Cancellation;
use crate::errors::{CheckinError, PolicyParseError, ProxyError};
use crate::proxy::{AnnotationKind, ServerProxy};
use crate::vcpath;
use crate::workspace::{partition_by_workspace, ServerInfo, Workspace};

/// Effective policy configuration of one team project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamProjectPolicies {
    pub compatibility: PoliciesCompatibility,
    /// Enabled descriptors, stateless ones first.
    pub policies: Vec<PolicyDescriptor>,
}

/// Everything discovered for one server.
#[derive(Debug, Clone)]
pub struct DiscoveredServer {
    pub server: ServerInfo,
    pub notes: Vec<CheckinNote>,
    pub files: Vec<PathBuf>,
    /// Server path of each entry of `files`, index for index.
    pub server_paths: Vec<String>,
    pub team_projects: BTreeMap<String, TeamProjectPolicies>,
}

/// Result of a discovery pass.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Servers ordered by presentable URI.
    pub servers: Vec<DiscoveredServer>,
    /// Recoverable problems met while loading policies, one per line.
    pub load_error: Option<String>,
}

/// A failure inside the policy-loading step of one server.
#[derive(Debug, Error)]
enum PolicyLoadError {
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error(transparent)]
    Parse(#[from] PolicyParseError),
}

/// Discover notes and policies for `files`.
///
/// Files outside every workspace mapping are ignored; if none is mapped the
/// pass fails with [`CheckinError::NoMappings`] before any server is
/// contacted. Failing to load note definitions is fatal, failing to load
/// policies is recorded in [`Discovery::load_error`].
pub fn discover(
    files: &[PathBuf],
    workspaces: &[Workspace],
    proxy: &dyn ServerProxy,
    defaults: PoliciesCompatibility,
    cancel: &Cancellation,
) -> Result<Discovery, CheckinError> {
    let mut by_server: BTreeMap<ServerInfo, (BTreeSet<String>, Vec<PathBuf>, Vec<String>)> =
        BTreeMap::new();
    for (idx, items) in partition_by_workspace(workspaces, files) {
        let entry = by_server
            .entry(workspaces[idx].server.clone())
            .or_default();
        for item in items {
            entry.0.insert(vcpath::path_to_project(&item.server_path));
            entry.1.push(item.local_path);
            entry.2.push(item.server_path);
        }
    }

    if by_server.is_empty() {
        warn!(files = files.len(), "no file is mapped in any workspace");
        return Err(CheckinError::NoMappings);
    }
    cancel.check()?;

    let mut sorted: Vec<_> = by_server.into_iter().collect();
    sorted.sort_by(|(a, _), (b, _)| a.presentable_uri.cmp(&b.presentable_uri));

    let mut servers = Vec::with_capacity(sorted.len());
    let mut load_errors: Vec<String> = Vec::new();

    for (server, (projects, server_files, server_paths)) in sorted {
        let projects: Vec<String> = projects.into_iter().collect();
        info!(server = %server, team_projects = projects.len(), "loading checkin notes and policy definitions");

        let definitions = proxy.query_checkin_note_definitions(&server, &projects)?;
        cancel.check()?;
        let notes = factorize_definitions(&definitions);
        debug!(server = %server, notes = notes.len(), "checkin notes loaded");

        let mut team_projects: BTreeMap<String, TeamProjectPolicies> = projects
            .iter()
            .map(|p| {
                (
                    p.clone(),
                    TeamProjectPolicies {
                        compatibility: defaults,
                        policies: Vec::new(),
                    },
                )
            })
            .collect();

        match load_policies(proxy, &server, &projects, defaults, &mut team_projects) {
            Ok(()) => {}
            Err(PolicyLoadError::Proxy(ProxyError::Cancelled)) => return Err(CheckinError::Cancelled),
            Err(err) => {
                warn!(server = %server, error = %err, "failed to load checkin policies");
                load_errors.push(format!("{}: {}", server.presentable_uri, err));
            }
        }
        cancel.check()?;

        servers.push(DiscoveredServer {
            server,
            notes,
            files: server_files,
            server_paths,
            team_projects,
        });
    }

    Ok(Discovery {
        servers,
        load_error: (!load_errors.is_empty()).then(|| load_errors.join("\n")),
    })
}

/// Apply override annotations, then collect enabled descriptors of both
/// formats into `team_projects`. Partial results stay in place on error.
fn load_policies(
    proxy: &dyn ServerProxy,
    server: &ServerInfo,
    projects: &[String],
    defaults: PoliciesCompatibility,
    team_projects: &mut BTreeMap<String, TeamProjectPolicies>,
) -> Result<(), PolicyLoadError> {
    let mut team_explorer_found = defaults.team_explorer;
    let mut teamprise_found = defaults.teamprise;

    for (team_project, value) in annotation_values(proxy, server, projects, AnnotationKind::Overrides)? {
        let Some(data) = team_projects.get_mut(&team_project) else {
            warn!(team_project = %team_project, "override annotation for an unrelated team project");
            continue;
        };
        let compatibility = PoliciesCompatibility::from_overrides_annotation_value(&value)?;
        debug!(team_project = %team_project, ?compatibility, "compatibility overridden");
        data.compatibility = compatibility;
        team_explorer_found |= compatibility.team_explorer;
        teamprise_found |= compatibility.teamprise;
    }

    if team_explorer_found {
        for (team_project, value) in
            annotation_values(proxy, server, projects, AnnotationKind::StatelessPolicies)?
        {
            let Some(data) = team_projects.get_mut(&team_project) else {
                continue;
            };
            if data.compatibility.team_explorer {
                data.policies.extend(
                    parse_stateless_descriptors(&value)?
                        .into_iter()
                        .filter(|d| d.enabled),
                );
            }
        }
    }

    if teamprise_found {
        for (team_project, value) in
            annotation_values(proxy, server, projects, AnnotationKind::StatefulPolicies)?
        {
            let Some(data) = team_projects.get_mut(&team_project) else {
                continue;
            };
            if data.compatibility.teamprise {
                data.policies.extend(
                    parse_stateful_descriptors(&value)?
                        .into_iter()
                        .filter(|d| d.enabled),
                );
            }
        }
    }

    for (team_project, data) in team_projects.iter() {
        debug!(team_project = %team_project, policies = data.policies.len(), "policies discovered");
    }
    Ok(())
}

/// `(team project, value)` of every non-empty annotation of `kind` across
/// `projects`.
fn annotation_values(
    proxy: &dyn ServerProxy,
    server: &ServerInfo,
    projects: &[String],
    kind: AnnotationKind,
) -> Result<Vec<(String, String)>, ProxyError> {
    let mut values = Vec::new();
    for project in projects {
        for annotation in proxy.query_annotations(server, kind, project)? {
            if let Some(value) = annotation.value {
                values.push((vcpath::path_to_project(&annotation.item), value));
            }
        }
    }
    Ok(values)
}
