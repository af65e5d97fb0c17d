//! Configuration types and loading

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{NotifyError, Result};

/// Name of the project-local config file
pub const CONFIG_FILE: &str = "config.json";

/// Environment variable holding the issue-tracker token
pub const TOKEN_ENV: &str = "POST_TOKEN";

/// How detected changes are turned into issues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyMode {
    /// One issue covering every changed file
    #[default]
    Aggregated,
    /// One issue per changed file
    PerPath,
}

/// Which line differ produces the diff text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffTool {
    #[default]
    InProcess,
    External,
}

/// Main configuration, built once at startup
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the hgweb repository, e.g. `https://hg.mozilla.org/mozilla-central/`
    pub hg_api_url: String,

    /// Base URL of the issue repository, e.g. `https://api.github.com/repos/owner/name/`
    pub github_api_url: String,

    /// Bugzilla base URL used to linkify bug references
    #[serde(default)]
    pub bmo_url: Option<String>,

    /// Tracked paths, checked in this order
    pub files: Vec<String>,

    /// Path that always leads the aggregated issue title when it changed
    #[serde(default)]
    pub priority_path: Option<String>,

    #[serde(default)]
    pub mode: NotifyMode,

    /// Write the state file back after detection
    #[serde(default = "default_true")]
    pub persist_state: bool,

    #[serde(default)]
    pub diff_tool: DiffTool,

    /// Program used when `diff_tool` is `external`
    #[serde(default = "default_diff_program")]
    pub diff_program: String,

    /// Directory for the external differ's input files
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_true() -> bool {
    true
}

fn default_diff_program() -> String {
    "diff".to_string()
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_state_path() -> PathBuf {
    PathBuf::from("status.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("hgnotify/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// An explicit path wins; otherwise `./config.json`, then
    /// `~/.config/hgnotify/config.json`. Having none of them is an error.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        debug!(?config_path, "Config::load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let candidates = [
            Some(PathBuf::from(CONFIG_FILE)),
            dirs::config_dir().map(|p| p.join("hgnotify").join(CONFIG_FILE)),
        ];

        for path in candidates.iter().flatten() {
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        Err(NotifyError::Config(format!(
            "no {} found in the working directory or user config directory",
            CONFIG_FILE
        )))
    }

    /// Load and validate a config file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| NotifyError::file_access(path, e))?;
        let config = Self::from_json(&content).map_err(|e| match e {
            NotifyError::Config(msg) => NotifyError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;

        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parse and validate config from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| NotifyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration before use
    ///
    /// URLs are joined by plain concatenation, so each must end with `/`.
    pub fn validate(&self) -> Result<()> {
        check_base_url("hg_api_url", &self.hg_api_url)?;
        check_base_url("github_api_url", &self.github_api_url)?;
        if let Some(bmo_url) = &self.bmo_url {
            check_base_url("bmo_url", bmo_url)?;
        }

        if self.files.is_empty() {
            return Err(NotifyError::Config("files must list at least one path".to_string()));
        }
        if let Some(bad) = self.files.iter().find(|f| !f.starts_with('/')) {
            return Err(NotifyError::Config(format!("tracked path must start with '/': {}", bad)));
        }
        if self.timeout_ms == 0 {
            return Err(NotifyError::Config("timeout_ms must be greater than zero".to_string()));
        }
        Ok(())
    }
}

fn check_base_url(key: &str, url: &str) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(NotifyError::Config(format!("{} must start with http:// or https://", key)));
    }
    if !url.ends_with('/') {
        return Err(NotifyError::Config(format!("{} must end with '/'", key)));
    }
    Ok(())
}

#[derive(Deserialize)]
struct TokenFile {
    post_token: Option<String>,
}

/// Resolve the issue-tracker token
///
/// The `POST_TOKEN` environment variable takes precedence over the token file.
/// A missing token file means no authentication.
pub fn load_token(token_path: &Path) -> Result<Option<String>> {
    debug!(?token_path, "load_token: called");
    resolve_token(std::env::var(TOKEN_ENV).ok(), token_path)
}

fn resolve_token(env_token: Option<String>, token_path: &Path) -> Result<Option<String>> {
    if let Some(token) = env_token.filter(|t| !t.is_empty()) {
        debug!("resolve_token: using {}", TOKEN_ENV);
        return Ok(Some(token));
    }

    if !token_path.exists() {
        debug!("resolve_token: no token file, posting unauthenticated");
        return Ok(None);
    }

    let content = fs::read_to_string(token_path).map_err(|e| NotifyError::file_access(token_path, e))?;
    let file: TokenFile = serde_json::from_str(&content).map_err(|e| NotifyError::parse(token_path, e))?;
    Ok(file.post_token.filter(|t| !t.is_empty()))
}
