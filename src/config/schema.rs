//! Configuration data structures for the Statelessor MCP server.
//!
//! Defines the YAML config format: where the remote analysis service lives,
//! how long to wait for it, and how the server identifies itself.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default location of the Statelessor API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Default per-request timeout. Repository analysis clones and scans
/// remotely, so this is generous.
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration, loaded once at process start.
///
/// Sources are merged by [`crate::config::loader::load_config`]: built-in
/// defaults, then a YAML file, then environment variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatelessorConfig {
    /// Remote API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Identity advertised to MCP clients.
    #[serde(default)]
    pub server: ServerConfig,
}

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

/// Settings for the outbound API client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// `User-Agent` header sent on every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Config pointing at `base_url` with every other field defaulted.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL without trailing slashes, ready for `format!("{base}{path}")`.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Name and version reported in the MCP `initialize` handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_name")]
    pub name: String,

    #[serde(default = "default_server_version")]
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_user_agent() -> String {
    format!("Statelessor-MCP/{}", env!("CARGO_PKG_VERSION"))
}

fn default_server_name() -> String {
    "statelessor".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
