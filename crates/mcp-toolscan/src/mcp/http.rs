//! Plain HTTP transport: JSON-RPC over POST, one request per method.
//!
//! A `406 Not Acceptable` on `initialize` means the server wants a streaming
//! transport; the query is then retried once through [`super::sse`].

use std::collections::HashMap;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::error::{QueryError, QueryResult};

use super::rpc::{self, JsonRpcRequest};
use super::types::ToolInfo;

/// Build request headers: defaults, then caller headers on top.
///
/// Caller headers are applied in key order, so when one name is configured
/// under several spellings (`Accept`, `accept`) the last key in byte order
/// wins, the same way on every run.
pub fn build_headers(
    defaults: &[(HeaderName, &'static str)],
    custom: &HashMap<String, String>,
) -> QueryResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in defaults {
        map.insert(name.clone(), HeaderValue::from_static(value));
    }
    let mut custom: Vec<(&String, &String)> = custom.iter().collect();
    custom.sort();
    for (k, v) in custom {
        let name = HeaderName::from_bytes(k.as_bytes()).map_err(|e| QueryError::InvalidHeader {
            name: k.clone(),
            reason: e.to_string(),
        })?;
        let value = HeaderValue::from_str(v).map_err(|e| QueryError::InvalidHeader {
            name: k.clone(),
            reason: e.to_string(),
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Query an HTTP MCP server, falling back to SSE on 406.
pub async fn query_http(
    name: &str,
    url: &str,
    headers: &HashMap<String, String>,
) -> QueryResult<Vec<ToolInfo>> {
    let client = reqwest::Client::new();
    let header_map = build_headers(
        &[(CONTENT_TYPE, "application/json"), (ACCEPT, "application/json")],
        headers,
    )?;

    let init = client
        .post(url)
        .headers(header_map.clone())
        .json(&rpc::initialize_request())
        .send()
        .await
        .map_err(QueryError::Http)?;
    if init.status() == StatusCode::NOT_ACCEPTABLE {
        tracing::info!("server '{}' answered 406; retrying over SSE", name);
        drop(init);
        return super::sse::query_http_sse(url, name, headers).await;
    }
    check_status(init.status())?;

    let body = post_rpc(&client, url, &header_map, &rpc::tools_list_request()).await?;
    let tools = rpc::parse_tools(body)?;
    Ok(rpc::to_tool_infos(name, tools))
}

async fn post_rpc(
    client: &reqwest::Client,
    url: &str,
    headers: &HeaderMap,
    request: &JsonRpcRequest,
) -> QueryResult<Value> {
    let resp = client
        .post(url)
        .headers(headers.clone())
        .json(request)
        .send()
        .await
        .map_err(QueryError::Http)?;
    check_status(resp.status())?;
    resp.json::<Value>().await.map_err(QueryError::Http)
}

fn check_status(status: StatusCode) -> QueryResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(QueryError::HttpStatus { status })
    }
}
