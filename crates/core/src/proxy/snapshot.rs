//! Offline [`ServerProxy`] backed by a JSON snapshot of server state.
//!
//! Useful for validating a check-in without a live server and for tests.
//! The snapshot maps each server URI to its note definitions and
//! annotations:
//!
//! ```json
//! {
//!   "servers": {
//!     "http://tfs:8080/tfs": {
//!       "note_definitions": [
//!         { "name": "Code Reviewer", "required": true, "display_order": 1 }
//!       ],
//!       "annotations": [
//!         { "kind": "stateless_policies", "item": "$/Proj", "value": "<policy-definitions/>" }
//!       ]
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    Annotation, AnnotationKind, CheckinNoteFieldDefinition, ResolveConflictParams,
    ResolveResponse, ServerProxy,
};
use crate::errors::ProxyError;
use crate::vcpath;
use crate::workspace::{ServerInfo, Workspace};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSnapshot {
    #[serde(default)]
    pub note_definitions: Vec<ProjectNoteDefinition>,
    #[serde(default)]
    pub annotations: Vec<SnapshotAnnotation>,
}

/// A note definition, optionally restricted to one team project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectNoteDefinition {
    #[serde(default)]
    pub team_project: Option<String>,
    #[serde(flatten)]
    pub definition: CheckinNoteFieldDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotAnnotation {
    pub kind: AnnotationKind,
    #[serde(flatten)]
    pub annotation: Annotation,
}

/// Read-only proxy answering queries from a [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotProxy {
    snapshot: Snapshot,
}

impl SnapshotProxy {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ProxyError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading server snapshot");
        let contents = std::fs::read_to_string(path).map_err(|e| ProxyError::Transport {
            server: path.display().to_string(),
            detail: e.to_string(),
        })?;
        let snapshot: Snapshot = serde_json::from_str(&contents)
            .map_err(|e| ProxyError::Server(format!("invalid snapshot: {}", e)))?;
        debug!(servers = snapshot.servers.len(), "snapshot parsed");
        Ok(Self::new(snapshot))
    }

    fn server(&self, server: &ServerInfo) -> Result<&ServerSnapshot, ProxyError> {
        self.snapshot
            .servers
            .get(&server.uri)
            .or_else(|| self.snapshot.servers.get(&server.presentable_uri))
            .ok_or_else(|| ProxyError::Transport {
                server: server.presentable_uri.clone(),
                detail: "server not present in snapshot".into(),
            })
    }
}

impl ServerProxy for SnapshotProxy {
    fn query_checkin_note_definitions(
        &self,
        server: &ServerInfo,
        team_projects: &[String],
    ) -> Result<Vec<CheckinNoteFieldDefinition>, ProxyError> {
        let data = self.server(server)?;
        Ok(data
            .note_definitions
            .iter()
            .filter(|d| match &d.team_project {
                Some(project) => team_projects.iter().any(|p| p.eq_ignore_ascii_case(project)),
                None => true,
            })
            .map(|d| d.definition.clone())
            .collect())
    }

    fn query_annotations(
        &self,
        server: &ServerInfo,
        kind: AnnotationKind,
        team_project: &str,
    ) -> Result<Vec<Annotation>, ProxyError> {
        let data = self.server(server)?;
        Ok(data
            .annotations
            .iter()
            .filter(|a| a.kind == kind && vcpath::is_under(&a.annotation.item, team_project))
            .map(|a| a.annotation.clone())
            .collect())
    }

    fn resolve_conflict(
        &self,
        _workspace: &Workspace,
        _params: &ResolveConflictParams,
    ) -> Result<ResolveResponse, ProxyError> {
        Err(ProxyError::Unsupported(
            "conflict resolution needs a live server".into(),
        ))
    }

    fn download_content(
        &self,
        _workspace: &Workspace,
        _version: i32,
        _item_id: i32,
    ) -> Result<Option<Vec<u8>>, ProxyError> {
        Err(ProxyError::Unsupported(
            "content download needs a live server".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "servers": {
            "http://tfs": {
                "note_definitions": [
                    { "name": "Reviewer", "required": true, "display_order": 2 },
                    { "team_project": "$/Other", "name": "Ticket", "display_order": 1 }
                ],
                "annotations": [
                    { "kind": "overrides", "item": "$/Proj", "value": "<overrides/>" },
                    { "kind": "stateless_policies", "item": "$/Proj", "value": "<policy-definitions/>" }
                ]
            }
        }
    }"#;

    fn proxy() -> SnapshotProxy {
        SnapshotProxy::new(serde_json::from_str(SNAPSHOT).unwrap())
    }

    #[test]
    fn test_note_definitions_filtered_by_project() {
        let defs = proxy()
            .query_checkin_note_definitions(&ServerInfo::new("http://tfs"), &["$/Proj".into()])
            .unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "Reviewer");
        assert!(defs[0].required);
    }

    #[test]
    fn test_annotations_filtered_by_kind() {
        let annotations = proxy()
            .query_annotations(&ServerInfo::new("http://tfs"), AnnotationKind::Overrides, "$/Proj")
            .unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].value.as_deref(), Some("<overrides/>"));
    }

    #[test]
    fn test_unknown_server_is_transport_error() {
        let err = proxy()
            .query_checkin_note_definitions(&ServerInfo::new("http://other"), &[])
            .unwrap_err();
        assert!(matches!(err, ProxyError::Transport { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, SNAPSHOT).unwrap();
        let proxy = SnapshotProxy::load_from_file(&path).unwrap();
        assert!(proxy
            .query_annotations(
                &ServerInfo::new("http://tfs"),
                AnnotationKind::StatefulPolicies,
                "$/Proj"
            )
            .unwrap()
            .is_empty());
    }
}
