//! Report configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// How a missing score is shown in report tables.
///
/// Metrics always carry `0` plus `has_scores = false`; this only changes the
/// rendered cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyScore {
    /// Render as `0%`.
    #[default]
    Zero,
    /// Render as the configured placeholder text.
    Placeholder,
}

impl fmt::Display for EmptyScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyScore::Zero => write!(f, "zero"),
            EmptyScore::Placeholder => write!(f, "placeholder"),
        }
    }
}

impl FromStr for EmptyScore {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(EmptyScore::Zero),
            "placeholder" => Ok(EmptyScore::Placeholder),
            other => Err(ReportError::InvalidConfig {
                key: "empty_score".into(),
                message: format!("expected zero or placeholder, got {other}"),
            }),
        }
    }
}

/// Top-level report configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rendering of students or modules without any score.
    #[serde(default)]
    pub empty_score: EmptyScore,
    /// Text used when `empty_score = "placeholder"`.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    /// Directory exported files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Rows per page of paginated table views.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_placeholder() -> String {
    "-".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./relatorios")
}
fn default_page_size() -> usize {
    25
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            empty_score: EmptyScore::default(),
            placeholder: default_placeholder(),
            output_dir: default_output_dir(),
            page_size: default_page_size(),
        }
    }
}

impl ReportConfig {
    /// Reject values no report could be rendered with.
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.page_size == 0 {
            return Err(ReportError::InvalidConfig {
                key: "page_size".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `trainboard.toml` in the current directory
/// 2. `~/.config/trainboard/config.toml`
///
/// Environment variable override: `TRAINBOARD_OUTPUT_DIR`.
pub fn load_config() -> Result<ReportConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ReportConfig> {
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
            toml::from_str::<ReportConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ReportConfig::default(),
    };

    if let Ok(dir) = std::env::var("TRAINBOARD_OUTPUT_DIR") {
        if !dir.is_empty() {
            config.output_dir = PathBuf::from(dir);
        }
    }

    config.validate()?;
    Ok(config)
}

fn config_home() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("trainboard"))
}
