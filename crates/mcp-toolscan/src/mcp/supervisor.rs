//! Per-server query supervision: transport dispatch, timeout, and conversion
//! of every failure into a [`ServerOutcome`].

use std::time::Duration;

use crate::error::{QueryError, QueryResult};

use super::types::{McpTarget, ServerDescriptor, ServerOutcome, ToolInfo};
use super::{http, stdio};

/// Default per-server budget.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Query one server with the default timeout. Never fails.
pub async fn query_with_timeout(server: &ServerDescriptor) -> ServerOutcome {
    query_with_timeout_for(server, DEFAULT_QUERY_TIMEOUT).await
}

/// Query one server within `timeout`. Never fails.
///
/// On expiry the in-flight query future is dropped, which closes its HTTP
/// client and kills any child process it spawned.
pub async fn query_with_timeout_for(server: &ServerDescriptor, timeout: Duration) -> ServerOutcome {
    let result = match tokio::time::timeout(timeout, dispatch(server)).await {
        Ok(result) => result,
        Err(_) => Err(QueryError::Timeout {
            secs: whole_secs(timeout),
        }),
    };
    match result {
        Ok(tools) => {
            tracing::info!(
                "server '{}' ({}) listed {} tool(s)",
                server.name,
                server.transport_kind(),
                tools.len()
            );
            ServerOutcome::connected(server.name.clone(), tools)
        }
        Err(e) => {
            tracing::warn!("error querying MCP server {}: {}", server.name, e);
            ServerOutcome::failed(server.name.clone(), e.to_string())
        }
    }
}

/// Seconds for the timeout message, rounded up so sub-second budgets never read as 0.
fn whole_secs(timeout: Duration) -> u64 {
    timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
}

async fn dispatch(server: &ServerDescriptor) -> QueryResult<Vec<ToolInfo>> {
    match server.target() {
        McpTarget::Http { url, headers } => {
            tracing::debug!("querying '{}' over HTTP at {}", server.name, url);
            http::query_http(&server.name, &url, &headers).await
        }
        McpTarget::Stdio { command, args, env } => {
            tracing::debug!("querying '{}' over stdio: {} {:?}", server.name, command, args);
            stdio::query_stdio(&server.name, &command, &args, &env).await
        }
        McpTarget::Invalid => Err(QueryError::NoTarget),
    }
}
