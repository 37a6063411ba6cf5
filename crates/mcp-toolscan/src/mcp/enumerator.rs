//! Concurrent tool enumeration across every configured MCP server.
//!
//! Each server is queried on its own task under the supervisor's timeout.
//! Results come back in the merged config's order whatever the completion
//! order was, and a failing server is reported, never dropped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::discovery::{default_global_config, load_sources};
use super::supervisor::{DEFAULT_QUERY_TIMEOUT, query_with_timeout_for};
use super::types::{MergedConfig, ServerOutcome};

/// Knobs for a discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Lower-precedence user config. `None` disables it.
    pub global_config: Option<PathBuf>,
    /// Per-server budget.
    pub timeout: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            global_config: default_global_config(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

/// Discover tools from the user config merged with `config_path`.
pub async fn discover_all_tools(config_path: &Path) -> Vec<ServerOutcome> {
    discover_all_tools_with(&DiscoverySettings::default(), config_path).await
}

pub async fn discover_all_tools_with(
    settings: &DiscoverySettings,
    config_path: &Path,
) -> Vec<ServerOutcome> {
    discover_from_sources(settings, std::slice::from_ref(&config_path.to_path_buf())).await
}

/// Discover tools across several project-level sources, each server name
/// queried once (first source to declare it wins).
pub async fn discover_from_sources(
    settings: &DiscoverySettings,
    sources: &[PathBuf],
) -> Vec<ServerOutcome> {
    let servers = load_sources(settings.global_config.as_deref(), sources);
    query_all(servers, settings.timeout).await
}

/// Query every server concurrently and return outcomes in config order.
pub async fn query_all(servers: MergedConfig, timeout: Duration) -> Vec<ServerOutcome> {
    if servers.is_empty() {
        return Vec::new();
    }
    tracing::info!(
        "enumerating MCP servers: count={}, timeout_ms={}",
        servers.len(),
        timeout.as_millis()
    );

    let names: Vec<String> = servers.iter().map(|s| s.name.clone()).collect();
    let mut set = tokio::task::JoinSet::new();
    for (idx, srv) in servers.into_iter().enumerate() {
        set.spawn(async move { (idx, query_with_timeout_for(&srv, timeout).await) });
    }

    let mut slots: Vec<Option<ServerOutcome>> = vec![None; names.len()];
    while let Some(res) = set.join_next().await {
        match res {
            Ok((idx, outcome)) => slots[idx] = Some(outcome),
            Err(e) => tracing::warn!("enumeration task join error: {}", e),
        }
    }

    slots
        .into_iter()
        .zip(names)
        .map(|(slot, name)| {
            slot.unwrap_or_else(|| ServerOutcome::failed(name, "Query task aborted"))
        })
        .collect()
}
