//! Application configuration for Phonescout.
//!
//! User config lives at `~/.phonescout/phonescout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PhonescoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "phonescout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".phonescout";

// ---------------------------------------------------------------------------
// Config structs (matching phonescout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// WebDriver endpoint and browser settings.
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// Page-interaction timing policy.
    #[serde(default)]
    pub lookup: LookupPolicyConfig,

    /// Batch processing settings.
    #[serde(default)]
    pub batch: BatchConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[webdriver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDriverConfig {
    /// WebDriver endpoint URL (chromedriver listens on 9515 by default).
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// Run the browser headless.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Browser window size as `WIDTH,HEIGHT`.
    #[serde(default = "default_window_size")]
    pub window_size: String,

    /// Session acquisition attempts before giving up.
    #[serde(default = "default_session_attempts")]
    pub session_attempts: u32,

    /// Seconds between session acquisition attempts.
    #[serde(default = "default_session_backoff_secs")]
    pub session_backoff_secs: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            headless: true,
            window_size: default_window_size(),
            session_attempts: default_session_attempts(),
            session_backoff_secs: default_session_backoff_secs(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_window_size() -> String {
    "1920,1080".into()
}
fn default_session_attempts() -> u32 {
    3
}
fn default_session_backoff_secs() -> u64 {
    2
}
fn default_true() -> bool {
    true
}

/// `[lookup]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupPolicyConfig {
    /// The external lookup page.
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Cap on locating the input field / submit button (whole chain).
    #[serde(default = "default_element_timeout_ms")]
    pub element_timeout_ms: u64,

    /// Cap on waiting for the results panel after submission.
    #[serde(default = "default_results_timeout_ms")]
    pub results_timeout_ms: u64,

    /// Cap on each individual field read once results are present.
    #[serde(default = "default_extract_timeout_ms")]
    pub extract_timeout_ms: u64,

    /// Fixed settle after filling the input.
    #[serde(default = "default_fill_settle_ms")]
    pub fill_settle_ms: u64,

    /// Interval between selector-chain polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LookupPolicyConfig {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
            element_timeout_ms: default_element_timeout_ms(),
            results_timeout_ms: default_results_timeout_ms(),
            extract_timeout_ms: default_extract_timeout_ms(),
            fill_settle_ms: default_fill_settle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_target_url() -> String {
    "https://www.phonevalidator.com/".into()
}
fn default_element_timeout_ms() -> u64 {
    10_000
}
fn default_results_timeout_ms() -> u64 {
    15_000
}
fn default_extract_timeout_ms() -> u64 {
    5_000
}
fn default_fill_settle_ms() -> u64 {
    500
}
fn default_poll_interval_ms() -> u64 {
    250
}

/// `[batch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Fixed delay between items. A rate limit against the target page,
    /// not a tunable for throughput.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Directory for CSV report artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit_ms(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_rate_limit_ms() -> u64 {
    1_000
}
fn default_output_dir() -> String {
    "~/phonescout-reports".into()
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP server.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".into()
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime lookup configuration — everything one lookup needs.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// WebDriver endpoint URL.
    pub webdriver_url: String,
    /// Run the browser headless.
    pub headless: bool,
    /// Browser window size as `WIDTH,HEIGHT`.
    pub window_size: String,
    /// Session acquisition attempts.
    pub session_attempts: u32,
    /// Backoff between acquisition attempts.
    pub session_backoff: Duration,
    /// The external lookup page.
    pub target_url: String,
    /// Chain-location cap per step.
    pub element_timeout: Duration,
    /// Results-panel cap after submission.
    pub results_timeout: Duration,
    /// Per-field read cap.
    pub extract_timeout: Duration,
    /// Fixed settle after filling the input.
    pub fill_settle: Duration,
    /// Selector-chain poll interval.
    pub poll_interval: Duration,
}

impl From<&AppConfig> for LookupConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            webdriver_url: config.webdriver.url.clone(),
            headless: config.webdriver.headless,
            window_size: config.webdriver.window_size.clone(),
            session_attempts: config.webdriver.session_attempts,
            session_backoff: Duration::from_secs(config.webdriver.session_backoff_secs),
            target_url: config.lookup.target_url.clone(),
            element_timeout: Duration::from_millis(config.lookup.element_timeout_ms),
            results_timeout: Duration::from_millis(config.lookup.results_timeout_ms),
            extract_timeout: Duration::from_millis(config.lookup.extract_timeout_ms),
            fill_settle: Duration::from_millis(config.lookup.fill_settle_ms),
            poll_interval: Duration::from_millis(config.lookup.poll_interval_ms),
        }
    }
}

/// Runtime batch options.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Fixed inter-item delay.
    pub rate_limit: Duration,
    /// Directory for CSV report artifacts.
    pub output_dir: PathBuf,
}

impl From<&AppConfig> for BatchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            rate_limit: Duration::from_millis(config.batch.rate_limit_ms),
            output_dir: expand_home(&config.batch.output_dir),
        }
    }
}

/// Expand a leading `~/` against the user's home directory. Paths without
/// the prefix (and `~/` paths when no home is known) pass through as-is.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.phonescout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PhonescoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.phonescout/phonescout.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PhonescoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PhonescoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PhonescoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PhonescoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PhonescoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("http://localhost:9515"));
        assert!(toml_str.contains("phonevalidator.com"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.webdriver.session_attempts, 3);
        assert_eq!(parsed.batch.rate_limit_ms, 1_000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[webdriver]
url = "http://127.0.0.1:4444"

[batch]
rate_limit_ms = 0
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.webdriver.url, "http://127.0.0.1:4444");
        assert!(config.webdriver.headless);
        assert_eq!(config.batch.rate_limit_ms, 0);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn lookup_config_from_app_config() {
        let app = AppConfig::default();
        let lookup = LookupConfig::from(&app);
        assert_eq!(lookup.session_attempts, 3);
        assert_eq!(lookup.session_backoff, Duration::from_secs(2));
        assert_eq!(lookup.fill_settle, Duration::from_millis(500));
        assert_eq!(lookup.target_url, "https://www.phonevalidator.com/");
    }

    #[test]
    fn batch_options_from_app_config() {
        let app = AppConfig::default();
        let options = BatchOptions::from(&app);
        assert_eq!(options.rate_limit, Duration::from_secs(1));
        assert!(!options.output_dir.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn expand_home_passes_absolute_through() {
        assert_eq!(expand_home("/tmp/reports"), PathBuf::from("/tmp/reports"));
    }
}
