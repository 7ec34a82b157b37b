//! Application configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::SectionType;

/// Top-level assessor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessorConfig {
    /// JSON file holding first-attempt records.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Apply section and component countdowns.
    #[serde(default = "default_true")]
    pub enforce_time_limits: bool,
    /// Section used when a command does not name one.
    #[serde(default = "default_section")]
    pub default_section: SectionType,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./assessor-data/store.json")
}
fn default_true() -> bool {
    true
}
fn default_section() -> SectionType {
    SectionType::Reading
}

impl Default for AssessorConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            enforce_time_limits: true,
            default_section: default_section(),
        }
    }
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

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `assessor.toml` in the current directory
/// 2. `~/.config/assessor/config.toml`
///
/// Environment variable overrides: `ASSESSOR_STORE_PATH`,
/// `ASSESSOR_ENFORCE_TIME_LIMITS`.
pub fn load_config() -> Result<AssessorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AssessorConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("assessor.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AssessorConfig::default(),
    };

    if let Ok(store) = std::env::var("ASSESSOR_STORE_PATH") {
        config.store_path = PathBuf::from(store);
    }
    if let Ok(flag) = std::env::var("ASSESSOR_ENFORCE_TIME_LIMITS") {
        config.enforce_time_limits = !matches!(flag.trim(), "false" | "0" | "no");
    }

    config.store_path = PathBuf::from(resolve_env_vars(&config.store_path.to_string_lossy()));
    tracing::debug!("loaded config: {config:?}");
    Ok(config)
}

/// Parse a TOML config string.
pub fn parse_config(content: &str) -> Result<AssessorConfig> {
    toml::from_str(content).context("invalid assessor config")
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("assessor"))
}
