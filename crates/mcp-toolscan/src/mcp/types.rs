//! Shared types for MCP server discovery and tool enumeration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Fixed prefix of every namespaced tool name.
pub const TOOL_PREFIX: &str = "mcp";

/// One configured MCP server, as read from a `mcpServers` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerDescriptor {
    pub name: String,
    pub url: Option<String>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    /// Transport hint (`type` or `transport` key) as written in the config.
    pub transport: Option<String>,
    /// File this entry was loaded from, when known.
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

impl ServerDescriptor {
    /// Resolve the query target. `url` wins over `command`.
    pub fn target(&self) -> McpTarget {
        if let Some(url) = self.url.as_ref() {
            McpTarget::Http {
                url: url.clone(),
                headers: self.headers.clone(),
            }
        } else if let Some(command) = self.command.as_ref() {
            McpTarget::Stdio {
                command: command.clone(),
                args: self.args.clone(),
                env: self.env.clone(),
            }
        } else {
            McpTarget::Invalid
        }
    }

    /// Transport label: explicit hint, else inferred from the descriptor shape.
    pub fn transport_kind(&self) -> &str {
        match (&self.transport, &self.command, &self.url) {
            (Some(t), _, _) => t.as_str(),
            (None, Some(_), _) => "stdio",
            (None, None, Some(_)) => "http",
            (None, None, None) => "unknown",
        }
    }
}

/// How a server is reached. Resolved once per descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpTarget {
    Http {
        url: String,
        headers: HashMap<String, String>,
    },
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    Invalid,
}

/// A tool advertised by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
}

impl ToolInfo {
    pub fn new(server: &str, name: impl Into<String>, description: Option<String>) -> Self {
        let name = name.into();
        Self {
            full_name: full_tool_name(server, &name),
            name,
            description,
        }
    }
}

/// Compose `mcp__<server>__<tool>`.
pub fn full_tool_name(server: &str, tool: &str) -> String {
    format!("{TOOL_PREFIX}__{server}__{tool}")
}

/// Result of querying one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerOutcome {
    pub name: String,
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
}

impl ServerOutcome {
    pub fn connected(name: impl Into<String>, tools: Vec<ToolInfo>) -> Self {
        Self {
            name: name.into(),
            connected: true,
            error: None,
            tools,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connected: false,
            error: Some(error.into()),
            tools: Vec::new(),
        }
    }
}

/// Server descriptors keyed by name, kept in first-seen order.
///
/// Re-inserting a name replaces the whole descriptor but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedConfig {
    entries: Vec<ServerDescriptor>,
}

impl MergedConfig {
    pub fn insert(&mut self, server: ServerDescriptor) {
        match self.entries.iter_mut().find(|s| s.name == server.name) {
            Some(slot) => *slot = server,
            None => self.entries.push(server),
        }
    }

    /// Insert only when the name has not been seen yet.
    pub fn insert_if_absent(&mut self, server: ServerDescriptor) -> bool {
        if self.contains(&server.name) {
            return false;
        }
        self.entries.push(server);
        true
    }

    pub fn extend(&mut self, other: MergedConfig) {
        for srv in other.entries {
            self.insert(srv);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ServerDescriptor> {
        self.entries.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerDescriptor> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|s| s.name.as_str()).collect()
    }
}

impl IntoIterator for MergedConfig {
    type Item = ServerDescriptor;
    type IntoIter = std::vec::IntoIter<ServerDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn named(name: &str, url: &str) -> ServerDescriptor {
        ServerDescriptor {
            name: name.to_string(),
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn target_prefers_url_over_command() {
        let srv = ServerDescriptor {
            name: "both".to_string(),
            url: Some("http://localhost:1/mcp".to_string()),
            command: Some("npx".to_string()),
            ..Default::default()
        };
        assert!(matches!(srv.target(), McpTarget::Http { .. }));
        assert_eq!(srv.transport_kind(), "stdio");
    }

    #[test]
    fn target_without_url_or_command_is_invalid() {
        let srv = ServerDescriptor {
            name: "empty".to_string(),
            ..Default::default()
        };
        assert_eq!(srv.target(), McpTarget::Invalid);
        assert_eq!(srv.transport_kind(), "unknown");
    }

    #[test]
    fn merged_config_replaces_in_place() {
        let mut merged = MergedConfig::default();
        merged.insert(named("a", "A"));
        merged.insert(named("b", "B"));
        merged.insert(named("a", "A2"));
        assert_eq!(merged.names(), vec!["a", "b"]);
        assert_eq!(merged.get("a").and_then(|s| s.url.as_deref()), Some("A2"));
        assert!(!merged.insert_if_absent(named("b", "B2")));
        assert_eq!(merged.get("b").and_then(|s| s.url.as_deref()), Some("B"));
    }

    #[test]
    fn failed_outcome_serializes_error_and_empty_tools() {
        let out = ServerOutcome::failed("x", "boom");
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["connected"], false);
        assert_eq!(v["error"], "boom");
        assert_eq!(v["tools"], serde_json::json!([]));
        let ok = serde_json::to_value(ServerOutcome::connected("y", vec![])).unwrap();
        assert!(ok.get("error").is_none());
    }

    proptest! {
        #[test]
        fn full_name_is_prefix_server_tool(server in "[a-zA-Z0-9_-]{1,16}", tool in "[a-zA-Z0-9_.-]{1,24}") {
            let info = ToolInfo::new(&server, tool.clone(), None);
            prop_assert_eq!(info.full_name, format!("mcp__{}__{}", server, tool));
            prop_assert_eq!(info.name, tool);
        }
    }
}
