//! Discover MCP servers declared in Claude-style config files and list the
//! tools each one advertises, namespaced as `mcp__<server>__<tool>`.

pub mod config;
pub mod error;
pub mod mcp;

pub use error::{QueryError, QueryResult};
pub use mcp::{
    DiscoverySettings, MergedConfig, ServerDescriptor, ServerOutcome, ToolInfo,
    discover_all_tools, discover_all_tools_with, discover_from_sources,
};
