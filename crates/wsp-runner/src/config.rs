use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub state: StateConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub id: String,
    /// Page metadata + sync status, relative to the repo root.
    pub metadata_file: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateConfig {
    /// SQLite file for device-local state. `~` is expanded; relative paths hang off the repo root.
    pub db_path: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub filter: Option<String>,
}

impl Config {
    pub fn default_for_repo(workspace_id: &str) -> Self {
        Self {
            workspace: WorkspaceConfig {
                id: workspace_id.to_string(),
                metadata_file: ".wsp/workspace.json".to_string(),
            },
            state: StateConfig { db_path: ".wsp/state.db".to_string() },
            log: LogConfig { filter: Some("warn".to_string()) },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse wsp.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Config at the usual location, or the defaults when there is none yet.
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let path = Self::config_path(repo_root);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default_for_repo(&default_workspace_id(repo_root)))
        }
    }

    pub fn metadata_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.workspace.metadata_file)
    }

    pub fn db_path(&self, repo_root: &Path) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&self.state.db_path).to_string());
        if expanded.is_absolute() {
            expanded
        } else {
            repo_root.join(expanded)
        }
    }

    pub fn config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(".wsp").join("wsp.toml")
    }
}

pub fn default_workspace_id(repo_root: &Path) -> String {
    repo_root.file_name().and_then(|s| s.to_str()).unwrap_or("workspace").to_string()
}
