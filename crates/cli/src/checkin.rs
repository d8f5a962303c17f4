//! `tfvc checkin`: validate a pending check-in against a server snapshot.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;
use tracing::debug;

use tfvc_core::cancel::Cancellation;
use tfvc_core::checkin::{
    CheckinNote, CheckinParameters, PolicyFailure, PolicyOverride, PolicyRegistry, Severity,
    ValidationMessage, WorkItem, WorkItemAction,
};
use tfvc_core::config::AppConfig;
use tfvc_core::proxy::snapshot::SnapshotProxy;
use tfvc_core::workspace::ServerInfo;

use super::style;

#[derive(Args, Debug)]
pub struct CheckinArgs {
    /// JSON snapshot of server notes and policy annotations.
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Commit message.
    #[arg(short, long, default_value = "")]
    pub message: String,

    /// Check-in note value; applies to every server declaring the note.
    #[arg(long = "note", value_name = "NAME=VALUE")]
    pub notes: Vec<String>,

    /// Work item to associate with the check-in.
    #[arg(long = "work-item", value_name = "ID[:TITLE]")]
    pub work_items: Vec<String>,

    /// Resolve the work items instead of only associating them.
    #[arg(long)]
    pub resolve: bool,

    /// Reason for committing despite policy warnings.
    #[arg(long)]
    pub override_reason: Option<String>,

    /// Print the result as JSON instead of tables.
    #[arg(long)]
    pub json: bool,

    /// Local files of the pending check-in.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Serialize)]
struct ServerReport<'a> {
    server: &'a ServerInfo,
    team_projects: Vec<String>,
    notes: &'a [CheckinNote],
    failures: &'a [PolicyFailure],
    policy_override: Option<PolicyOverride>,
}

#[derive(Serialize)]
struct Report<'a> {
    servers: Vec<ServerReport<'a>>,
    load_error: Option<&'a str>,
    message: Option<ValidationMessage>,
}

/// Run validation. Exits with failure when a required note is missing.
pub fn run_checkin(config: &AppConfig, args: CheckinArgs) -> Result<ExitCode> {
    let proxy =
        SnapshotProxy::load_from_file(&args.snapshot).context("failed to load server snapshot")?;
    let workspaces = config.workspaces();
    let cancel = Cancellation::new();

    let notes = args
        .notes
        .iter()
        .map(|raw| parse_note(raw))
        .collect::<Result<Vec<_>>>()?;
    let work_items = args
        .work_items
        .iter()
        .map(|raw| parse_work_item(raw))
        .collect::<Result<Vec<_>>>()?;

    let spinner = style::spinner("Loading checkin notes and policies...");
    let params = CheckinParameters::new(&args.files, &workspaces, &proxy, config.policies, &cancel);
    spinner.finish_and_clear();
    let mut params = params.context("failed to load checkin notes and policies")?;

    let servers = params.servers();
    for (name, value) in &notes {
        let applied = servers
            .iter()
            .filter(|server| params.set_note_value(server, name, value.as_str()))
            .count();
        if applied == 0 {
            eprintln!("{}", style::warn(&format!("No server declares checkin note '{}'", name)));
        }
    }
    params.validate_notes();
    params.set_commit_message(args.message);

    let action = if args.resolve {
        WorkItemAction::Resolve
    } else {
        WorkItemAction::Associate
    };
    for server in &servers {
        if let Some(items) = params.work_items_mut(server) {
            for item in &work_items {
                items.set_action(item.clone(), action);
            }
        }
    }

    let spinner = style::spinner("Evaluating checkin policies...");
    let evaluated = params.evaluate_policies(&PolicyRegistry::with_builtins(), &cancel);
    spinner.finish_and_clear();
    evaluated.context("failed to evaluate checkin policies")?;
    params.set_override_reason(args.override_reason);

    let message = params.validation_message(Severity::Both);
    debug!(?message, "checkin validated");
    let blocked = message
        .as_ref()
        .is_some_and(|m| m.severity == Severity::Error);

    if args.json {
        let report = Report {
            servers: servers
                .iter()
                .map(|server| ServerReport {
                    server,
                    team_projects: params.project_paths(server),
                    notes: params.checkin_notes(server),
                    failures: params.failures(server),
                    policy_override: params.policy_override(server),
                })
                .collect(),
            load_error: params.policies_load_error(),
            message,
        };
        let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{}", json);
    } else {
        print_report(&params, &servers, message.as_ref());
    }

    Ok(if blocked {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_report(
    params: &CheckinParameters,
    servers: &[ServerInfo],
    message: Option<&ValidationMessage>,
) {
    for server in servers {
        println!();
        println!("{}", style::header(&server.presentable_uri));
        println!(
            "{}",
            style::dim(&format!(
                "{} file(s) in {}",
                params.files(server).len(),
                params.project_paths(server).join(", ")
            ))
        );

        let notes = params.checkin_notes(server);
        if !notes.is_empty() {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Checkin note", "Required", "Value"]);
            for note in notes {
                table.add_row(vec![
                    Cell::new(&note.name),
                    Cell::new(style::flag(note.required)),
                    Cell::new(note.value.as_deref().unwrap_or("—")),
                ]);
            }
            println!("{}", table);
        }

        let failures = params.failures(server);
        if !failures.is_empty() {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Policy", "Message", "Details"]);
            for failure in failures {
                table.add_row(vec![
                    Cell::new(&failure.policy_name),
                    Cell::new(&failure.message),
                    Cell::new(failure.tooltip.as_deref().unwrap_or("")),
                ]);
            }
            println!("{}", table);
        }

        if let Some(policy_override) = params.policy_override(server) {
            if !policy_override.failures.is_empty() {
                println!(
                    "{}",
                    style::dim(&format!(
                        "Overriding {} policy warning(s): {}",
                        policy_override.failures.len(),
                        policy_override.reason
                    ))
                );
            }
        }
    }

    if let Some(load_error) = params.policies_load_error() {
        println!();
        println!("{}", style::warn("Some checkin policies could not be loaded:"));
        for line in load_error.lines() {
            println!("  {}", line);
        }
    }

    println!();
    match message {
        None => println!("{}", style::success("Ready to check in")),
        Some(m) if m.severity == Severity::Error => println!("{}", style::error(&m.text)),
        Some(m) => println!("{}", style::warn(&m.text)),
    }
    println!();
}

fn parse_note(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("invalid note '{}': expected NAME=VALUE", raw))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("invalid note '{}': empty name", raw);
    }
    Ok((name.to_string(), value.to_string()))
}

fn parse_work_item(raw: &str) -> Result<WorkItem> {
    let (id, title) = raw.split_once(':').unwrap_or((raw, ""));
    let id: i32 = id
        .trim()
        .parse()
        .with_context(|| format!("invalid work item '{}': expected ID[:TITLE]", raw))?;
    Ok(WorkItem::new(id, title.trim()))
}
