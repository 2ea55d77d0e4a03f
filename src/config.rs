use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compare::engine::DEFAULT_CONCURRENCY;
use crate::compare::normalize::DEFAULT_ROOT_PREFIX;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_BRANCH: &str = "main";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct GhsyncConfig {
    pub backend_url: String,
    pub request_timeout: Duration,
    pub root_prefix: String,
    pub concurrency: usize,
    /// Last selected repository (`owner/name`).
    pub repository: Option<String>,
    pub branch: String,
}

impl Default for GhsyncConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            repository: None,
            branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct BackendSection {
    url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkspaceSection {
    root_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CompareSection {
    concurrency: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    backend: BackendSection,
    #[serde(default)]
    workspace: WorkspaceSection,
    #[serde(default)]
    compare: CompareSection,
    #[serde(default)]
    repository: Option<String>,
    #[serde(default)]
    branch: Option<String>,
}

pub fn config_path() -> PathBuf {
    let mut path = dirs_home().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("ghsync");
    path.push("config.toml");
    path
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Load config from `path`, falling back to defaults for anything missing.
/// An unreadable or malformed file yields the full default config.
pub fn load_config(path: &Path) -> GhsyncConfig {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return GhsyncConfig::default(),
    };

    let file: ConfigFile = match toml::from_str(&contents) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
            return GhsyncConfig::default();
        }
    };

    let defaults = GhsyncConfig::default();
    GhsyncConfig {
        backend_url: file.backend.url.unwrap_or(defaults.backend_url),
        request_timeout: file
            .backend
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout),
        root_prefix: file.workspace.root_prefix.unwrap_or(defaults.root_prefix),
        concurrency: file
            .compare
            .concurrency
            .filter(|n| *n > 0)
            .unwrap_or(defaults.concurrency),
        repository: file.repository.filter(|r| !r.is_empty()),
        branch: file.branch.unwrap_or(defaults.branch),
    }
}

/// Persist the selected repository and branch.
/// Reads the existing file (if any), updates only those two keys, and writes
/// back so other settings and unknown fields survive.
pub fn save_selection(path: &Path, repository: Option<&str>, branch: &str) -> anyhow::Result<()> {
    let mut table = if let Ok(contents) = std::fs::read_to_string(path) {
        contents
            .parse::<toml::Table>()
            .unwrap_or_else(|_| toml::Table::new())
    } else {
        toml::Table::new()
    };

    match repository {
        Some(repo) => {
            table.insert(
                "repository".to_string(),
                toml::Value::String(repo.to_string()),
            );
        }
        None => {
            table.remove("repository");
        }
    }
    table.insert("branch".to_string(), toml::Value::String(branch.to_string()));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml_string = toml::to_string_pretty(&table)?;
    std::fs::write(path, toml_string)?;
    Ok(())
}
