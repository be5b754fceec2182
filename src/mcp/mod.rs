//! MCP server — Model Context Protocol implementation over stdio and HTTP.
//!
//! Tool handler logic is split into modules by concern:
//! - [`tools_analysis`] — repository and local project analysis
//! - [`tools_reports`] — offline scripts, historical findings, remediation
//! - [`registry`] — tool names, failure prefixes, argument validation
//! - [`server`] — rmcp handler and stdio entry point
//! - [`http`] — HTTP transport (streamable HTTP via axum)

pub mod http;
pub mod registry;
pub mod server;
pub mod tools_analysis;
pub mod tools_reports;

pub use server::{run_server, StatelessorServer};
