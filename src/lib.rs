//! Statelessor MCP — bridges AI assistants to the Statelessor analysis
//! service.
//!
//! Exposes tools that scan Git repositories or local .NET and Java projects
//! for stateful code patterns, render the results as Markdown, and explain
//! how to remediate each pattern category.

pub mod client;
pub mod config;
pub mod error;
pub mod formatter;
pub mod mcp;
pub mod observability;
pub mod packager;
pub mod remediation;
pub mod types;
