//! Startup configuration: schema and multi-source loader.

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{ApiConfig, ServerConfig, StatelessorConfig};
