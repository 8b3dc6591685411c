//! Application configuration for LeadSync.
//!
//! User config lives at `~/.leadsync/leadsync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadSyncError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadsync";

// ---------------------------------------------------------------------------
// Config structs (matching leadsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Destination spreadsheet.
    #[serde(default)]
    pub sheet: SheetConfig,

    /// Upstream lead feeds.
    #[serde(default)]
    pub feeds: FeedsConfig,

    /// Sync loop timing.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// `[sheet]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Spreadsheet ID. When unset the spreadsheet is looked up by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,

    /// Spreadsheet title, used when no ID is configured.
    #[serde(default = "default_spreadsheet_name")]
    pub spreadsheet_name: String,

    /// Worksheet (tab) holding the leads.
    #[serde(default = "default_worksheet")]
    pub worksheet: String,

    /// Google service-account key file.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// Env var holding a ready-made OAuth access token. Takes precedence
    /// over the service-account key when set and non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_env: Option<String>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            spreadsheet_name: default_spreadsheet_name(),
            worksheet: default_worksheet(),
            credentials_file: default_credentials_file(),
            access_token_env: None,
        }
    }
}

fn default_spreadsheet_name() -> String {
    "Expo-Sales-Management".into()
}
fn default_worksheet() -> String {
    "exhibitors-1".into()
}
fn default_credentials_file() -> PathBuf {
    PathBuf::from("/etc/secrets/service_account.json")
}

/// `[feeds]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Floor Plan request endpoint.
    #[serde(default = "default_floorplan_url")]
    pub floorplan_url: String,

    /// Show Guide request endpoint.
    #[serde(default = "default_showguide_url")]
    pub showguide_url: String,

    /// Name of the env var holding the bearer token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Timeout for every outbound HTTP request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            floorplan_url: default_floorplan_url(),
            showguide_url: default_showguide_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_floorplan_url() -> String {
    "https://b2bgrowthexpo.com/wp-json/custom-api/v1/protected/floorplan-form-data".into()
}
fn default_showguide_url() -> String {
    "https://b2bgrowthexpo.com/wp-json/custom-api/v1/protected/showguide-form-data".into()
}
fn default_token_env() -> String {
    "LEADSYNC_FEED_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[schedule]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Pause between the end of one run and the start of the next.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    15 * 60
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadsync/leadsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadSyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadSyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the feed bearer token from the env var named in the config.
pub fn resolve_feed_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.feeds.token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(LeadSyncError::config(format!(
            "feed bearer token not found. Set the {var_name} environment variable."
        ))),
    }
}
