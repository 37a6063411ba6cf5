//! SSE fallback transport.
//!
//! Opens the event stream only long enough to learn the session message
//! endpoint, then speaks JSON-RPC over POST to that endpoint.

use std::collections::HashMap;

use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use serde_json::Value;

use crate::error::{QueryError, QueryResult};

use super::http::build_headers;
use super::rpc::{self, JsonRpcRequest};
use super::types::ToolInfo;

/// Line-oriented scanner that picks the message endpoint out of an SSE stream.
///
/// A `data:` line is taken as the endpoint when the last `event:` was
/// `endpoint`. As a compatibility shim for servers that skip the event name,
/// data that mentions `sessionId` or starts with `/` is accepted too; this is
/// a heuristic, not something the protocol guarantees.
///
/// The stream is held open, unread, until both POSTs finish, since legacy SSE
/// servers drop the session when it closes. Servers that deliver replies
/// only as stream events (empty POST bodies) are not supported.
#[derive(Debug, Default)]
pub struct EndpointScanner {
    event: Option<String>,
}

impl EndpointScanner {
    pub fn feed(&mut self, line: &str) -> Option<String> {
        if let Some(event) = line.strip_prefix("event:") {
            self.event = Some(event.trim().to_string());
            return None;
        }
        let data = line.strip_prefix("data:")?.trim();
        if data.is_empty() {
            return None;
        }
        let announced = self.event.as_deref() == Some("endpoint");
        if announced || data.contains("sessionId") || data.starts_with('/') {
            Some(data.to_string())
        } else {
            None
        }
    }
}

/// Read the stream until an endpoint shows up or the stream ends.
pub async fn read_endpoint<S, B>(mut stream: S) -> QueryResult<Option<String>>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut scanner = EndpointScanner::default();
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(QueryError::Sse)?;
        buf.extend_from_slice(chunk.as_ref());
        while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            if let Some(endpoint) = scanner.feed(line.trim_end_matches(['\r', '\n'])) {
                return Ok(Some(endpoint));
            }
        }
    }
    let tail = String::from_utf8_lossy(&buf);
    Ok(scanner.feed(tail.trim_end_matches('\r')))
}

/// Resolve an endpoint path against the SSE URL.
pub fn resolve_endpoint(base: &str, endpoint: &str) -> QueryResult<url::Url> {
    let invalid = |source| QueryError::SseEndpointInvalid {
        endpoint: endpoint.to_string(),
        source,
    };
    url::Url::parse(base)
        .map_err(invalid)?
        .join(endpoint)
        .map_err(invalid)
}

pub async fn query_http_sse(
    url: &str,
    name: &str,
    headers: &HashMap<String, String>,
) -> QueryResult<Vec<ToolInfo>> {
    let client = reqwest::Client::new();
    let stream_headers = build_headers(&[(ACCEPT, "text/event-stream")], headers)?;
    let resp = client
        .get(url)
        .headers(stream_headers)
        .send()
        .await
        .map_err(QueryError::Sse)?;
    if !resp.status().is_success() {
        return Err(QueryError::SseStatus {
            status: resp.status(),
        });
    }
    let mut events = Box::pin(resp.bytes_stream());
    let endpoint = read_endpoint(events.by_ref())
        .await?
        .ok_or(QueryError::SseEndpointMissing)?;
    let message_url = resolve_endpoint(url, &endpoint)?;
    tracing::debug!("server '{}' SSE message endpoint: {}", name, message_url);

    let post_headers = build_headers(&[(CONTENT_TYPE, "application/json")], headers)?;
    post_rpc(&client, &message_url, &post_headers, &rpc::initialize_request()).await?;
    let body = post_rpc(&client, &message_url, &post_headers, &rpc::tools_list_request()).await?;
    drop(events);
    let tools = rpc::parse_tools(body)?;
    Ok(rpc::to_tool_infos(name, tools))
}

async fn post_rpc(
    client: &reqwest::Client,
    url: &url::Url,
    headers: &HeaderMap,
    request: &JsonRpcRequest,
) -> QueryResult<Value> {
    let resp = client
        .post(url.clone())
        .headers(headers.clone())
        .json(request)
        .send()
        .await
        .map_err(QueryError::Sse)?;
    if !resp.status().is_success() {
        return Err(QueryError::SseStatus {
            status: resp.status(),
        });
    }
    resp.json::<Value>().await.map_err(QueryError::Sse)
}
