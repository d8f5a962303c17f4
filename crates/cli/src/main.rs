//! `tfvc` command-line tool.
//!
//! Provides subcommands for generating and validating the workspace
//! configuration, validating a pending check-in against an offline server
//! snapshot, and triaging conflicts.

mod checkin;
mod conflicts;
mod init;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing_subscriber::EnvFilter;

use tfvc_core::config::{default_config_path, AppConfig};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Check-in validation and conflict triage for TFVC workspaces.
#[derive(Parser, Debug)]
#[command(
    name = "tfvc",
    version,
    about = "Validate check-ins and triage conflicts for TFVC workspaces"
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults to the user config
    /// directory.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive setup wizard; writes a configuration file.
    Init {
        /// Output path for the config file. Defaults to `--config`.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a sample configuration without asking any questions.
        #[arg(long)]
        defaults: bool,
    },

    /// Validate a configuration file.
    Validate,

    /// Check notes and policies of a pending check-in.
    Checkin(checkin::CheckinArgs),

    /// Inspect and merge conflicts.
    Conflicts {
        #[command(subcommand)]
        action: conflicts::ConflictsAction,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()
            .context("no configuration directory on this platform; pass --config")?,
    };

    match cli.command {
        Commands::Init { output, defaults } => {
            init_logging("warn");
            let output = output.unwrap_or(config_path);
            init::run_init(&output, defaults)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            init_logging("warn");
            cmd_validate(&config_path)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Conflicts {
            action: conflicts::ConflictsAction::Merge(args),
        } => {
            init_logging("warn");
            conflicts::run_merge(&args)
        }
        Commands::Checkin(args) => {
            let config = load_config(&config_path)?;
            init_logging(&config.logging.level);
            checkin::run_checkin(&config, args)
        }
        Commands::Conflicts {
            action: conflicts::ConflictsAction::List(args),
        } => {
            let config = load_config(&config_path)?;
            init_logging(&config.logging.level);
            conflicts::run_list(&config, &args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Install the log subscriber. `RUST_LOG` wins over `level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    let config = AppConfig::load_from_file(path).context("failed to load configuration file")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  {}", style::success("TOML structure is valid"));

    match config.validate() {
        Ok(()) => println!("  {}", style::success("All fields are valid")),
        Err(e) => {
            println!("  {}", style::error(&format!("Validation error: {}", e)));
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("{}", style::header("Policy compatibility"));
    println!("  Team Explorer policies : {}", style::flag(config.policies.team_explorer));
    println!("  Teamprise policies     : {}", style::flag(config.policies.teamprise));
    println!("  Report missing policies: {}", style::flag(config.policies.non_installed));
    println!("  Log level              : {}", config.logging.level);
    println!();

    if config.workspaces.is_empty() {
        println!("{}", style::warn("No workspaces configured"));
        return Ok(());
    }

    println!(
        "{}",
        style::header(&format!("Workspaces ({})", config.workspaces.len()))
    );
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Owner", "Server", "Working folders"]);
    for ws in config.workspaces() {
        let folders = ws
            .working_folders
            .iter()
            .map(|wf| format!("{} → {}", wf.server_path, wf.local_path.display()))
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            Cell::new(&ws.name),
            Cell::new(if ws.owner.is_empty() { "-" } else { ws.owner.as_str() }),
            Cell::new(&ws.server),
            Cell::new(folders),
        ]);
    }
    println!("{}", table);
    println!();
    println!("{}", style::success("Configuration is valid."));

    Ok(())
}
