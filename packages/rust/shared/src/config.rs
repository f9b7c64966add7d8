//! Application configuration for entsoe.
//!
//! User config lives at `~/.entsoe/entsoe.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EntsoeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "entsoe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".entsoe";

// ---------------------------------------------------------------------------
// Config structs (matching entsoe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Outbound call budget.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Fuzzy-matching cutoffs.
    #[serde(default)]
    pub matching: MatchConfig,

    /// Where the parameter/dataset catalog comes from.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Endpoint that data requests are issued against.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the security token (never store the token itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://web-api.tp.entsoe.eu/api".into()
}
fn default_api_key_env() -> String {
    "ENTSOE_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[rate_limit]` section.
///
/// The remote service bans clients for ten minutes past 400 calls per minute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum calls admitted within one window.
    #[serde(default = "default_max_calls")]
    pub max_calls: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Window length as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

fn default_max_calls() -> u32 {
    399
}
fn default_window_secs() -> u64 {
    60
}

/// `[matching]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Cutoff for parameter-type names (small closed vocabulary).
    #[serde(default = "default_type_cutoff")]
    pub type_cutoff: f32,

    /// Cutoff for catalog values and codes.
    #[serde(default = "default_value_cutoff")]
    pub value_cutoff: f32,

    /// Cutoff for dataset names.
    #[serde(default = "default_dataset_cutoff")]
    pub dataset_cutoff: f32,

    /// How many candidates a lookup asks for.
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            type_cutoff: default_type_cutoff(),
            value_cutoff: default_value_cutoff(),
            dataset_cutoff: default_dataset_cutoff(),
            max_matches: default_max_matches(),
        }
    }
}

fn default_type_cutoff() -> f32 {
    0.4
}
fn default_value_cutoff() -> f32 {
    0.9
}
fn default_dataset_cutoff() -> f32 {
    0.4
}
fn default_max_matches() -> usize {
    1
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Published API guide scraped for datasets and parameter tables.
    #[serde(default = "default_guide_url")]
    pub guide_url: String,

    /// JSON catalog snapshot to load instead of scraping the guide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            guide_url: default_guide_url(),
            path: None,
        }
    }
}

fn default_guide_url() -> String {
    "https://transparency.entsoe.eu/content/static_content/Static%20content/web%20api/Guide.html"
        .into()
}

// ---------------------------------------------------------------------------
// Client config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime client configuration: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint that data requests are issued against.
    pub base_url: String,
    /// Security token; `None` until resolved from the environment.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Outbound call budget.
    pub rate_limit: RateLimitConfig,
    /// Fuzzy-matching cutoffs.
    pub matching: MatchConfig,
}

impl From<&AppConfig> for ClientConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            api_key: std::env::var(&config.api.api_key_env)
                .ok()
                .filter(|key| !key.is_empty()),
            timeout: Duration::from_secs(config.api.timeout_secs),
            rate_limit: config.rate_limit,
            matching: config.matching,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.entsoe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EntsoeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.entsoe/entsoe.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| EntsoeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| EntsoeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EntsoeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EntsoeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EntsoeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.api.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(EntsoeError::config(format!(
            "API key not found. Set the {var_name} environment variable.\n\
             Request a token from the Transparency Platform account settings."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("ENTSOE_API_KEY"));
        assert!(toml_str.contains("max_calls = 399"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.rate_limit.window_secs, 60);
        assert_eq!(parsed.matching, MatchConfig::default());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[matching]
value_cutoff = 0.8

[catalog]
path = "/tmp/catalog.json"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.matching.value_cutoff, 0.8);
        assert_eq!(config.matching.type_cutoff, 0.4);
        assert_eq!(config.catalog.path.as_deref(), Some("/tmp/catalog.json"));
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn client_config_from_app_config() {
        let mut app = AppConfig::default();
        app.api.api_key_env = "ENTSOE_TEST_NONEXISTENT_KEY_98765".into();
        let client = ClientConfig::from(&app);
        assert!(client.api_key.is_none());
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(client.rate_limit.max_calls, 399);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.api.api_key_env = "ENTSOE_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
