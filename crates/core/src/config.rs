//! TOML-based configuration for the TFVC client.
//!
//! The file lists the local workspaces (with their working-folder mappings),
//! the default policy compatibility flags and the log level.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checkin::PoliciesCompatibility;
use crate::errors::ConfigError;
use crate::vcpath;
use crate::workspace::{ServerInfo, WorkingFolder, Workspace};

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Default check-in policy compatibility for every team project.
    #[serde(default)]
    pub policies: PoliciesCompatibility,

    /// Local workspaces.
    #[serde(default)]
    pub workspaces: Vec<WorkspaceConfig>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Workspaces
// ---------------------------------------------------------------------------

/// A workspace as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub name: String,

    #[serde(default)]
    pub owner: String,

    /// Server URI, e.g. `http://tfs:8080/tfs/DefaultCollection`.
    pub server: String,

    #[serde(default)]
    pub folders: Vec<FolderMapping>,
}

/// One `server path = local path` working folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderMapping {
    pub server_path: String,
    pub local_path: PathBuf,
}

impl From<&WorkspaceConfig> for Workspace {
    fn from(config: &WorkspaceConfig) -> Self {
        Workspace {
            name: config.name.clone(),
            owner: config.owner.clone(),
            server: ServerInfo::new(config.server.clone()),
            working_folders: config
                .folders
                .iter()
                .map(|f| WorkingFolder {
                    server_path: f.server_path.clone(),
                    local_path: f.local_path.clone(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!(workspaces = config.workspaces.len(), "configuration parsed successfully");
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, contents)?;
        info!(path = %path.display(), "configuration written");
        Ok(())
    }

    /// Validate the configuration for obvious errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for (idx, ws) in self.workspaces.iter().enumerate() {
            if ws.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("workspaces[{}].name", idx),
                    detail: "workspace name must not be empty".into(),
                });
            }
            if !names.insert(ws.name.to_lowercase()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("workspaces[{}].name", idx),
                    detail: format!("duplicate workspace name '{}'", ws.name),
                });
            }
            if ws.server.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("workspaces[{}].server", idx),
                    detail: "server URI must not be empty".into(),
                });
            }
            for (fidx, folder) in ws.folders.iter().enumerate() {
                if !folder.server_path.starts_with(vcpath::ROOT) {
                    return Err(ConfigError::InvalidValue {
                        field: format!("workspaces[{}].folders[{}].server_path", idx, fidx),
                        detail: format!("server path must start with '{}'", vcpath::ROOT),
                    });
                }
                if folder.local_path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("workspaces[{}].folders[{}].local_path", idx, fidx),
                        detail: "local path must not be empty".into(),
                    });
                }
            }
        }
        if self.logging.level.trim().parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".into(),
                detail: format!("unknown level '{}'", self.logging.level),
            });
        }
        Ok(())
    }

    /// Workspaces in the form the rest of the library works with.
    pub fn workspaces(&self) -> Vec<Workspace> {
        self.workspaces.iter().map(Workspace::from).collect()
    }
}

/// `<config dir>/tfvc/config.toml`, `None` when the platform has no config
/// directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tfvc").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[logging]
level = "debug"

[policies]
team_explorer = true
teamprise = false
non_installed = true

[[workspaces]]
name = "main"
owner = "alice"
server = "http://tfs:8080/tfs/DefaultCollection/"

[[workspaces.folders]]
server_path = "$/Project"
local_path = "/home/alice/project"

[[workspaces]]
name = "tools"
server = "http://other:8080/tfs"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.policies, PoliciesCompatibility::new(true, false, true));
        assert_eq!(config.workspaces.len(), 2);
        assert_eq!(config.workspaces[0].folders[0].server_path, "$/Project");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.workspaces[1].name, "tools");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.policies, config.policies);
        assert_eq!(loaded.workspaces[0].folders.len(), 1);
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[[workspaces]]\nname = 3\n").unwrap();
        assert!(matches!(
            AppConfig::load_from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_server_path() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.workspaces[0].folders[0].server_path = "Project".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "workspaces[0].folders[0].server_path"
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.workspaces[1].name = "MAIN".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "workspaces[1].name"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_name_and_level() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.workspaces[0].name = " ".into();
        assert!(config.validate().is_err());

        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.logging.level = "loud".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "logging.level"
        ));
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.policies, PoliciesCompatibility::default());
        assert!(config.workspaces.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_workspaces_conversion() {
        let config: AppConfig = toml::from_str(sample_toml()).unwrap();
        let workspaces = config.workspaces();
        assert_eq!(workspaces[0].server.presentable_uri, "http://tfs:8080/tfs/DefaultCollection");
        assert_eq!(
            workspaces[0].working_folders[0].local_path,
            PathBuf::from("/home/alice/project")
        );
        assert!(workspaces[1].working_folders.is_empty());
    }
}
