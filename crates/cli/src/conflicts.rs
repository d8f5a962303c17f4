//! `tfvc conflicts`: classify a conflict dump and merge text files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::{Deserialize, Serialize};

use tfvc_core::config::AppConfig;
use tfvc_core::conflict::{
    is_content_conflict, is_mergeable, is_name_conflict, three_way_merge, unresolved_conflicts,
    Conflict, ConflictRegistry,
};
use tfvc_core::vcpath;

use super::style;

#[derive(Subcommand, Debug)]
pub enum ConflictsAction {
    /// Classify the unresolved conflicts in a JSON dump.
    List(ListArgs),
    /// Three-way merge of text files.
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// JSON file: `[{"workspace": "<name>", "conflicts": [...]}]`.
    pub dump: PathBuf,

    /// Print the classification as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    pub base: PathBuf,
    pub yours: PathBuf,
    pub theirs: PathBuf,

    /// Write the merged text here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceConflicts {
    workspace: String,
    #[serde(default)]
    conflicts: Vec<Conflict>,
}

#[derive(Debug, Serialize)]
struct Classified<'a> {
    id: i32,
    workspace: &'a str,
    local_item: Option<String>,
    mergeable: bool,
    name_conflict: bool,
    content_conflict: bool,
}

/// List unresolved conflicts with their classification.
pub fn run_list(config: &AppConfig, args: &ListArgs) -> Result<()> {
    let registry = load_registry(config, &args.dump)?;

    let rows: Vec<Classified<'_>> = registry
        .conflicts()
        .map(|c| Classified {
            id: c.id,
            workspace: registry
                .workspace_of(c.id)
                .map(|ws| ws.name.as_str())
                .unwrap_or("-"),
            local_item: c
                .source_or_target()
                .map(|p| vcpath::local_path_from_tfs(p).display().to_string()),
            mergeable: is_mergeable(c),
            name_conflict: is_name_conflict(c),
            content_conflict: is_content_conflict(c),
        })
        .collect();

    if args.json {
        let json = serde_json::to_string_pretty(&rows).context("failed to serialize conflicts")?;
        println!("{}", json);
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!("{}", style::success("No unresolved conflicts"));
        println!();
        return Ok(());
    }

    println!();
    println!("{}", style::header(&format!("Unresolved Conflicts ({})", rows.len())));
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "ID", "Workspace", "Type", "Local item", "Your change", "Mergeable", "Name", "Content",
    ]);

    for row in &rows {
        let Some(conflict) = registry.get(row.id) else {
            continue;
        };
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(row.workspace),
            Cell::new(conflict.conflict_type),
            Cell::new(row.local_item.as_deref().unwrap_or("—")),
            Cell::new(conflict.your_change),
            Cell::new(style::flag(row.mergeable)),
            Cell::new(style::flag(row.name_conflict)),
            Cell::new(style::flag(row.content_conflict)),
        ]);
    }

    println!("{}", table);
    println!();

    Ok(())
}

fn load_registry(config: &AppConfig, dump: &Path) -> Result<ConflictRegistry> {
    let contents = std::fs::read_to_string(dump)
        .with_context(|| format!("failed to read {}", dump.display()))?;
    let entries: Vec<WorkspaceConflicts> =
        serde_json::from_str(&contents).context("invalid conflict dump")?;

    let workspaces = config.workspaces();
    let mut grouped = Vec::with_capacity(entries.len());
    for entry in entries {
        let workspace = workspaces
            .iter()
            .find(|ws| ws.name.eq_ignore_ascii_case(&entry.workspace))
            .with_context(|| format!("workspace '{}' is not configured", entry.workspace))?;
        grouped.push((workspace.clone(), unresolved_conflicts(&entry.conflicts)));
    }
    Ok(ConflictRegistry::new(grouped))
}

/// Merge `yours` and `theirs` against `base`. Fails when markers remain.
pub fn run_merge(args: &MergeArgs) -> Result<ExitCode> {
    let read = |path: &Path| {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    };
    let result = three_way_merge(&read(&args.base)?, &read(&args.yours)?, &read(&args.theirs)?);

    match &args.output {
        Some(path) => {
            std::fs::write(path, &result.merged_content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{}", style::success(&format!("Merged into {}", path.display())));
        }
        None => print!("{}", result.merged_content),
    }

    if result.has_conflicts {
        eprintln!("{}", style::warn("Merge left conflict markers; edit the result by hand"));
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[[workspaces]]
name = "main"
server = "http://tfs"

[[workspaces.folders]]
server_path = "$/Proj"
local_path = "/ws"
"#;

    #[test]
    fn test_load_registry_skips_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("conflicts.json");
        std::fs::write(
            &dump,
            r#"[{"workspace": "MAIN", "conflicts": [
                {"id": 1, "your_change": ["edit"], "target_local_item": "\\ws\\a.txt"},
                {"id": 2, "resolved": true}
            ]}]"#,
        )
        .unwrap();
        let config: AppConfig = toml::from_str(CONFIG).unwrap();

        let registry = load_registry(&config, &dump).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.workspace_of(1).unwrap().name, "main");
    }

    #[test]
    fn test_load_registry_unknown_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("conflicts.json");
        std::fs::write(&dump, r#"[{"workspace": "other"}]"#).unwrap();
        let config: AppConfig = toml::from_str(CONFIG).unwrap();
        assert!(load_registry(&config, &dump).is_err());
    }

    #[test]
    fn test_merge_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, text: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, text).unwrap();
            path
        };
        let args = MergeArgs {
            base: write("base", "a\nb\nc\nd\ne\n"),
            yours: write("yours", "A\nb\nc\nd\ne\n"),
            theirs: write("theirs", "a\nb\nc\nd\nE\n"),
            output: Some(dir.path().join("out")),
        };
        run_merge(&args).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out")).unwrap(),
            "A\nb\nc\nd\nE\n"
        );
    }
}
