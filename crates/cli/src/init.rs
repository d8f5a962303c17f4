//! Interactive init wizard.
//!
//! Walks the user through the policy defaults and workspace mappings and
//! writes the resulting TOML configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::Style;
use dialoguer::{Confirm, Input, Select};

use tfvc_core::checkin::PoliciesCompatibility;
use tfvc_core::config::{AppConfig, FolderMapping, LoggingConfig, WorkspaceConfig};
use tfvc_core::vcpath;

use super::style;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Run the wizard (or write a sample with `defaults`) and save to `output`.
pub fn run_init(output: &Path, defaults: bool) -> Result<()> {
    if output.exists() {
        if defaults {
            anyhow::bail!(
                "file already exists: {}. Use a different path or remove the existing file.",
                output.display()
            );
        }
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", output.display()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;

        if !overwrite {
            println!(
                "{}",
                style::warn("Init cancelled. Existing file was not modified.")
            );
            return Ok(());
        }
    }

    let config = if defaults {
        sample_config()
    } else {
        run_wizard()?
    };
    config.validate().context("generated configuration is invalid")?;
    config
        .save_to_file(output)
        .context("failed to write config file")?;

    println!();
    println!(
        "{}",
        style::success(&format!("Configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Review the working folder mappings");
    println!("  2. Validate with: tfvc validate --config {}", output.display());
    println!(
        "  3. Check a change: tfvc checkin --config {} --snapshot server.json <files>",
        output.display()
    );
    println!();

    Ok(())
}

/// Configuration written by `init --defaults`.
fn sample_config() -> AppConfig {
    AppConfig {
        logging: LoggingConfig::default(),
        policies: PoliciesCompatibility::default(),
        workspaces: vec![WorkspaceConfig {
            name: "default".into(),
            owner: String::new(),
            server: "http://tfs.example.com:8080/tfs/DefaultCollection".into(),
            folders: vec![FolderMapping {
                server_path: "$/Project".into(),
                local_path: PathBuf::from("project"),
            }],
        }],
    }
}

// ---------------------------------------------------------------------------
// Wizard
// ---------------------------------------------------------------------------

fn run_wizard() -> Result<AppConfig> {
    let accent = Style::new().cyan().bold();
    println!();
    println!("{}", accent.apply_to("=== tfvc Setup Wizard ==="));
    println!();
    println!("This wizard creates the configuration used by `tfvc checkin` and `tfvc conflicts`.");
    println!();

    // -----------------------------------------------------------------
    // 1. Logging
    // -----------------------------------------------------------------
    println!("{}", style::header("1/3  Logging"));
    println!();

    let level_idx = Select::new()
        .with_prompt("Log level")
        .items(&LOG_LEVELS[..])
        .default(1)
        .interact()
        .context("failed to read log level")?;

    println!();

    // -----------------------------------------------------------------
    // 2. Policy compatibility
    // -----------------------------------------------------------------
    println!("{}", style::header("2/3  Checkin Policies"));
    println!();

    let team_explorer = Confirm::new()
        .with_prompt("Evaluate Team Explorer (stateless) policies?")
        .default(true)
        .interact()
        .context("failed to read Team Explorer preference")?;

    let teamprise = Confirm::new()
        .with_prompt("Evaluate Teamprise (stateful) policies?")
        .default(true)
        .interact()
        .context("failed to read Teamprise preference")?;

    let non_installed = Confirm::new()
        .with_prompt("Report policies that are not installed locally?")
        .default(false)
        .interact()
        .context("failed to read missing-policy preference")?;

    println!();

    // -----------------------------------------------------------------
    // 3. Workspaces
    // -----------------------------------------------------------------
    println!("{}", style::header("3/3  Workspaces"));
    println!();

    let mut workspaces: Vec<WorkspaceConfig> = Vec::new();
    loop {
        workspaces.push(prompt_workspace(&workspaces)?);

        let more = Confirm::new()
            .with_prompt("Add another workspace?")
            .default(false)
            .interact()
            .context("failed to read confirmation")?;
        if !more {
            break;
        }
        println!();
    }

    Ok(AppConfig {
        logging: LoggingConfig {
            level: LOG_LEVELS[level_idx].to_string(),
        },
        policies: PoliciesCompatibility::new(team_explorer, teamprise, non_installed),
        workspaces,
    })
}

fn prompt_workspace(existing: &[WorkspaceConfig]) -> Result<WorkspaceConfig> {
    let taken: Vec<String> = existing.iter().map(|ws| ws.name.to_lowercase()).collect();
    let name: String = Input::new()
        .with_prompt("Workspace name")
        .validate_with(move |input: &String| -> Result<(), String> {
            if input.trim().is_empty() {
                Err("Name must not be empty".into())
            } else if taken.contains(&input.to_lowercase()) {
                Err("A workspace with this name already exists".into())
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("failed to read workspace name")?;

    let owner: String = Input::new()
        .with_prompt("Workspace owner")
        .allow_empty(true)
        .interact_text()
        .context("failed to read workspace owner")?;

    let server: String = Input::new()
        .with_prompt("Server URI (e.g. http://tfs:8080/tfs/DefaultCollection)")
        .interact_text()
        .context("failed to read server URI")?;

    let mut folders = Vec::new();
    loop {
        let server_path: String = Input::new()
            .with_prompt("Server folder")
            .default("$/".into())
            .validate_with(|input: &String| -> Result<(), String> {
                if input.starts_with(vcpath::ROOT) {
                    Ok(())
                } else {
                    Err(format!("Server paths start with '{}'", vcpath::ROOT))
                }
            })
            .interact_text()
            .context("failed to read server folder")?;

        let local_path: String = Input::new()
            .with_prompt("Local folder")
            .interact_text()
            .context("failed to read local folder")?;

        folders.push(FolderMapping {
            server_path,
            local_path: PathBuf::from(local_path),
        });

        let more = Confirm::new()
            .with_prompt("Map another folder?")
            .default(false)
            .interact()
            .context("failed to read confirmation")?;
        if !more {
            break;
        }
    }

    Ok(WorkspaceConfig {
        name,
        owner,
        server,
        folders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_is_valid() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_defaults_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfvc").join("config.toml");
        run_init(&path, true).unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.workspaces[0].name, "default");
        assert!(run_init(&path, true).is_err());
    }
}
