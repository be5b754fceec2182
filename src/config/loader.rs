//! Multi-source config loading.
//!
//! Priority (later wins): built-in defaults, YAML file, environment.
//! The YAML file is the explicit path if given, else `$STATELESSOR_CONFIG`,
//! else `config.yaml` in the per-user config directory when it exists.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::ConfigError;

use super::schema::StatelessorConfig;

/// Overrides `api.baseUrl`.
pub const ENV_API_URL: &str = "STATELESSOR_API_URL";
/// Overrides `api.timeoutMs`.
pub const ENV_TIMEOUT_MS: &str = "STATELESSOR_TIMEOUT_MS";
/// Points at a YAML config file.
pub const ENV_CONFIG_PATH: &str = "STATELESSOR_CONFIG";

/// Load the process configuration.
///
/// An explicit path that cannot be read is an error; a missing default user
/// config file is not.
pub fn load_config(explicit: Option<&Path>) -> Result<StatelessorConfig, ConfigError> {
    let file = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from))
        .or_else(|| user_config_path().filter(|p| p.is_file()));

    let config = match file {
        Some(path) => read_config_file(&path)?,
        None => StatelessorConfig::default(),
    };

    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

/// Parse a YAML config file.
pub fn read_config_file(path: &Path) -> Result<StatelessorConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: StatelessorConfig =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(mut config: StatelessorConfig, lookup: F) -> StatelessorConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
        config.api.base_url = url.trim().to_string();
    }
    if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
        match raw.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => config.api.timeout_ms = ms,
            _ => tracing::warn!(value = %raw, "ignoring invalid {}", ENV_TIMEOUT_MS),
        }
    }
    config
}

/// `config.yaml` inside the platform's per-user config directory.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "statelessor", "statelessor-mcp")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}
