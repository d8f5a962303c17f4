//! End-to-end check-in validation against an offline server snapshot.
//!
//! Workspaces come from a TOML config, server state from a JSON snapshot;
//! the tests run discovery, policy evaluation and message building the way
//! the `checkin` command does.

use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;

use tfvc_core::cancel::Cancellation;
use tfvc_core::checkin::builtin::{CHANGESET_COMMENTS_ID, FORBIDDEN_PATHS_ID, WORK_ITEMS_ID};
use tfvc_core::checkin::{
    CheckinParameters, FailureKind, PolicyRegistry, Severity, WorkItem, WorkItemAction,
};
use tfvc_core::config::AppConfig;
use tfvc_core::errors::CheckinError;
use tfvc_core::proxy::snapshot::SnapshotProxy;
use tfvc_core::workspace::{ServerInfo, Workspace};

// ===========================================================================
// Helpers
// ===========================================================================

const CONFIG: &str = r#"
[policies]
team_explorer = true
teamprise = true
non_installed = true

[[workspaces]]
name = "main"
owner = "alice"
server = "http://tfs-a:8080/tfs/"

[[workspaces.folders]]
server_path = "$/Proj"
local_path = "ws/proj"

[[workspaces]]
name = "tools"
owner = "alice"
server = "http://tfs-b"

[[workspaces.folders]]
server_path = "$/Tools"
local_path = "ws/tools"
"#;

fn stateless_definitions() -> String {
    format!(
        r#"<policy-definitions>
  <policy-definition enabled="true">
    <policy-type id="{}" name="Changeset Comments Policy"/>
  </policy-definition>
  <policy-definition>
    <policy-type id="{}" name="Work Items"/>
  </policy-definition>
  <policy-definition enabled="false">
    <policy-type id="acme.disabled" name="Disabled"/>
  </policy-definition>
</policy-definitions>"#,
        CHANGESET_COMMENTS_ID, WORK_ITEMS_ID
    )
}

fn stateful_definitions() -> String {
    format!(
        r#"<policy-annotation version="1">
  <policy-definition enabled="true">
    <policy-type id="{}" name="Forbidden Paths"/>
    <configuration><patterns><pattern>**/*.dll</pattern></patterns></configuration>
  </policy-definition>
</policy-annotation>"#,
        FORBIDDEN_PATHS_ID
    )
}

/// Write config and snapshot into a temp dir and load both back.
fn setup(snapshot: serde_json::Value) -> (TempDir, Vec<Workspace>, AppConfig, SnapshotProxy) {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, CONFIG).unwrap();
    let snapshot_path = dir.path().join("snapshot.json");
    std::fs::write(&snapshot_path, snapshot.to_string()).unwrap();

    let config = AppConfig::load_from_file(&config_path).unwrap();
    config.validate().unwrap();
    let proxy = SnapshotProxy::load_from_file(&snapshot_path).unwrap();
    (dir, config.workspaces(), config, proxy)
}

fn two_server_snapshot() -> serde_json::Value {
    json!({
        "servers": {
            "http://tfs-a:8080/tfs/": {
                "note_definitions": [
                    { "name": "Ticket", "required": false, "display_order": 2 },
                    { "name": "Reviewer", "required": true, "display_order": 1 }
                ],
                "annotations": [
                    { "kind": "stateless_policies", "item": "$/Proj", "value": stateless_definitions() },
                    { "kind": "stateful_policies", "item": "$/Proj", "value": stateful_definitions() }
                ]
            },
            "http://tfs-b": {
                "annotations": [
                    {
                        "kind": "overrides",
                        "item": "$/Tools",
                        "value": "<overrides><compatibility teamExplorer=\"false\" teamprise=\"false\"/></overrides>"
                    },
                    { "kind": "stateless_policies", "item": "$/Tools", "value": stateless_definitions() }
                ]
            }
        }
    })
}

fn files() -> Vec<PathBuf> {
    vec![
        PathBuf::from("ws/proj/src/lib.rs"),
        PathBuf::from("ws/proj/bin/tool.dll"),
        PathBuf::from("ws/tools/build.sh"),
        PathBuf::from("elsewhere/readme.txt"),
    ]
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn test_full_validation_flow() {
    let (_dir, workspaces, config, proxy) = setup(two_server_snapshot());
    let cancel = Cancellation::new();
    let registry = PolicyRegistry::with_builtins();

    let mut params =
        CheckinParameters::new(&files(), &workspaces, &proxy, config.policies, &cancel).unwrap();

    let a = ServerInfo::new("http://tfs-a:8080/tfs/");
    let b = ServerInfo::new("http://tfs-b");
    assert_eq!(params.servers(), vec![a.clone(), b.clone()]);
    assert_eq!(params.project_paths(&a), vec!["$/Proj".to_string()]);
    assert_eq!(params.files(&b), &[PathBuf::from("ws/tools/build.sh")]);
    assert!(params.policies_load_error().is_none());

    let notes: Vec<_> = params.checkin_notes(&a).iter().map(|n| n.name.as_str()).collect();
    assert_eq!(notes, vec!["Reviewer", "Ticket"]);
    assert!(params.checkin_notes(&b).is_empty());

    // Overrides switch both formats off for $/Tools.
    let tools = &params.team_project_policies(&b).unwrap()["$/Tools"];
    assert!(!tools.compatibility.evaluation_enabled());
    assert!(tools.policies.is_empty());
    assert_eq!(params.team_project_policies(&a).unwrap()["$/Proj"].policies.len(), 3);

    // Nothing evaluated yet and a required note is empty.
    let message = params.validation_message(Severity::Both).unwrap();
    assert_eq!(message.severity, Severity::Error);
    assert_eq!(
        message.text,
        "Checkin policies were not evaluated\nhttp://tfs-a:8080/tfs\nCheckin note 'Reviewer' is required to commit"
    );
    assert!(params.has_policy_failures(&a));
    assert!(!params.has_policy_failures(&b));

    // First evaluation: no comment, no work items, a forbidden file.
    params.evaluate_policies(&registry, &cancel).unwrap();
    let failures = params.failures(&a);
    let names: Vec<_> = failures.iter().map(|f| f.policy_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Changeset Comments Policy", "Work Items", "Forbidden Paths"]
    );
    assert!(params.failures(&b).is_empty());

    let warning = params.validation_message(Severity::Warning).unwrap();
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.text, "http://tfs-a:8080/tfs\nCheckin policy warnings found");

    // Fill in what the policies asked for.
    assert!(params.set_note_value(&a, "Reviewer", "bob"));
    params.validate_notes();
    params.set_commit_message("Add build tool");
    params
        .work_items_mut(&a)
        .unwrap()
        .set_action(WorkItem::new(7, "Ship the tool"), WorkItemAction::Resolve);
    params.evaluate_policies(&registry, &cancel).unwrap();

    assert!(params.validation_message(Severity::Error).is_none());
    let remaining = params.all_failures();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].message, "File 'ws/proj/bin/tool.dll' must not be checked in");

    params.set_override_reason(Some("Vendored binary".into()));
    let policy_override = params.policy_override(&a).unwrap();
    assert_eq!(policy_override.reason, "Vendored binary");
    assert_eq!(
        policy_override.failures,
        vec![(
            "Forbidden Paths".to_string(),
            "File 'ws/proj/bin/tool.dll' must not be checked in".to_string()
        )]
    );

    // A copy for the dialog does not inherit the override.
    let copy = params.create_copy();
    assert!(copy.policy_override(&a).is_none());
    assert_eq!(copy.all_failures(), params.all_failures());
}

#[test]
fn test_missing_policy_reported_when_flag_set() {
    let snapshot = json!({
        "servers": {
            "http://tfs-a:8080/tfs": {
                "annotations": [{
                    "kind": "stateless_policies",
                    "item": "$/Proj",
                    "value": "<policy-definitions><policy-definition><policy-type id=\"acme.custom\" name=\"Custom\" installation-instructions=\"Install the Acme pack\"/></policy-definition></policy-definitions>"
                }]
            }
        }
    });
    let (_dir, workspaces, config, proxy) = setup(snapshot);
    let cancel = Cancellation::new();

    let mut params = CheckinParameters::new(
        &[PathBuf::from("ws/proj/a.txt")],
        &workspaces,
        &proxy,
        config.policies,
        &cancel,
    )
    .unwrap();
    params
        .evaluate_policies(&PolicyRegistry::with_builtins(), &cancel)
        .unwrap();

    let failures = params.all_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].message, "Checkin policy 'Custom' is not installed");
    assert_eq!(failures[0].tooltip.as_deref(), Some("Install the Acme pack"));
    assert_eq!(failures[0].kind, FailureKind::NotInstalled { stateless: true });
}

#[test]
fn test_broken_annotation_is_recoverable() {
    let snapshot = json!({
        "servers": {
            "http://tfs-a:8080/tfs": {
                "note_definitions": [{ "name": "Reviewer", "required": true }],
                "annotations": [
                    { "kind": "stateless_policies", "item": "$/Proj", "value": "<not-policies/>" }
                ]
            }
        }
    });
    let (_dir, workspaces, config, proxy) = setup(snapshot);

    let params = CheckinParameters::new(
        &[PathBuf::from("ws/proj/a.txt")],
        &workspaces,
        &proxy,
        config.policies,
        &Cancellation::new(),
    )
    .unwrap();

    let error = params.policies_load_error().unwrap();
    assert!(error.starts_with("http://tfs-a:8080/tfs: "), "got {}", error);
    assert_eq!(params.checkin_notes(&params.servers()[0]).len(), 1);
}

#[test]
fn test_unmapped_files_fail_discovery() {
    let (_dir, workspaces, config, proxy) = setup(two_server_snapshot());
    let result = CheckinParameters::new(
        &[PathBuf::from("elsewhere/readme.txt")],
        &workspaces,
        &proxy,
        config.policies,
        &Cancellation::new(),
    );
    assert!(matches!(result, Err(CheckinError::NoMappings)));
}

#[test]
fn test_cancelled_discovery() {
    let (_dir, workspaces, config, proxy) = setup(two_server_snapshot());
    let cancel = Cancellation::new();
    cancel.cancel();
    let result = CheckinParameters::new(&files(), &workspaces, &proxy, config.policies, &cancel);
    assert!(matches!(result, Err(CheckinError::Cancelled)));
}

#[test]
fn test_forbidden_patterns_match_below_absolute_mapping() {
    let config: AppConfig = toml::from_str(
        r#"
[[workspaces]]
name = "main"
server = "http://tfs-a:8080/tfs/"

[[workspaces.folders]]
server_path = "$/Proj"
local_path = "/home/u/ws/proj"
"#,
    )
    .unwrap();
    let definitions = format!(
        r#"<policy-annotation version="1">
  <policy-definition enabled="true">
    <policy-type id="{}" name="Forbidden Paths"/>
    <configuration><patterns><pattern>bin/**</pattern></patterns></configuration>
  </policy-definition>
</policy-annotation>"#,
        FORBIDDEN_PATHS_ID
    );
    let snapshot = json!({
        "servers": {
            "http://tfs-a:8080/tfs/": {
                "annotations": [{
                    "kind": "stateful_policies",
                    "item": "$/Proj",
                    "value": definitions
                }]
            }
        }
    });
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("snapshot.json");
    std::fs::write(&snapshot_path, snapshot.to_string()).unwrap();
    let proxy = SnapshotProxy::load_from_file(&snapshot_path).unwrap();
    let cancel = Cancellation::new();

    let mut params = CheckinParameters::new(
        &[
            PathBuf::from("/home/u/ws/proj/bin/tool.dll"),
            PathBuf::from("/home/u/ws/proj/src/bin.rs"),
        ],
        &config.workspaces(),
        &proxy,
        config.policies,
        &cancel,
    )
    .unwrap();
    params
        .evaluate_policies(&PolicyRegistry::with_builtins(), &cancel)
        .unwrap();

    let failures = params.all_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].message,
        "File '/home/u/ws/proj/bin/tool.dll' must not be checked in"
    );
}
