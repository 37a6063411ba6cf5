//! Per-server query failures.
//!
//! The `Display` text of each variant is what ends up in
//! `ServerOutcome::error`, so messages are written for the end user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("No command or url specified")]
    NoTarget,

    #[error("Timeout after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("HTTP error: status {status}")]
    HttpStatus { status: reqwest::StatusCode },

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("SSE HTTP error: status {status}")]
    SseStatus { status: reqwest::StatusCode },

    #[error("SSE error: {0}")]
    Sse(#[source] reqwest::Error),

    #[error("Could not get SSE endpoint")]
    SseEndpointMissing,

    #[error("SSE error: invalid endpoint '{endpoint}': {source}")]
    SseEndpointInvalid {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to communicate with server")]
    NoResponse,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON-RPC response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MCP server returned error: code={code}, message={message}")]
    Rpc { code: i64, message: String },
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
