//! Gateway configuration.
//!
//! Lives in the `[gateway]` table of the same `trainboard.toml` the report
//! configuration is read from.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Names of the backend tables each record set is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    #[serde(default = "default_profiles")]
    pub profiles: String,
    #[serde(default = "default_modules")]
    pub modules: String,
    #[serde(default = "default_progress")]
    pub progress: String,
    #[serde(default = "default_answers")]
    pub answers: String,
    #[serde(default = "default_feedback")]
    pub feedback: String,
    #[serde(default = "default_classes")]
    pub classes: String,
}

fn default_profiles() -> String {
    "profiles".to_string()
}
fn default_modules() -> String {
    "modules".to_string()
}
fn default_progress() -> String {
    "user_module_progress".to_string()
}
fn default_answers() -> String {
    "user_quiz_answers".to_string()
}
fn default_feedback() -> String {
    "module_feedbacks".to_string()
}
fn default_classes() -> String {
    "classes".to_string()
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            profiles: default_profiles(),
            modules: default_modules(),
            progress: default_progress(),
            answers: default_answers(),
            feedback: default_feedback(),
            classes: default_classes(),
        }
    }
}

/// Connection settings of the PostgREST gateway.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Project URL, without the `/rest/v1` suffix.
    #[serde(default)]
    pub base_url: String,
    /// Service or anon key. `${VAR}` references are resolved at load time.
    #[serde(default)]
    pub api_key: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Database schema sent as `Accept-Profile`.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Rows requested per page; the backend may cap this lower.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub tables: TableNames,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .field("schema", &self.schema)
            .field("page_size", &self.page_size)
            .field("tables", &self.tables)
            .finish()
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_schema() -> String {
    "public".to_string()
}
fn default_page_size() -> usize {
    1000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            schema: default_schema(),
            page_size: default_page_size(),
            tables: TableNames::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    gateway: Option<GatewayConfig>,
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load gateway configuration from well-known paths.
///
/// Search order:
/// 1. `trainboard.toml` in the current directory
/// 2. `~/.config/trainboard/config.toml`
///
/// Environment variable overrides: `TRAINBOARD_BASE_URL`, `TRAINBOARD_API_KEY`.
pub fn load_gateway_config() -> Result<GatewayConfig> {
    load_gateway_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_gateway_config_from(path: Option<&Path>) -> Result<GatewayConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("trainboard.toml");
        if local.exists() {
            Some(local)
        } else {
            config_home()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ConfigFile>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
                .gateway
                .unwrap_or_default()
        }
        None => GatewayConfig::default(),
    };

    if let Ok(url) = std::env::var("TRAINBOARD_BASE_URL") {
        config.base_url = url;
    }
    if let Ok(key) = std::env::var("TRAINBOARD_API_KEY") {
        config.api_key = key;
    }

    config.base_url = resolve_env_vars(&config.base_url);
    config.api_key = resolve_env_vars(&config.api_key);

    Ok(config)
}

fn config_home() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("trainboard"))
}
