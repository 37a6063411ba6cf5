//! Stdio transport: spawn the server, exchange two newline-delimited JSON-RPC
//! messages, shut the process down.
//!
//! Pipes are driven by the tokio reactor, so a slow or silent server never
//! holds up sibling queries. The child is spawned with `kill_on_drop`, which
//! covers the paths where the query future is abandoned (timeout) before the
//! explicit shutdown runs.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::error::{QueryError, QueryResult};

use super::rpc::{self, JsonRpcRequest, RawTool};
use super::types::ToolInfo;

/// How long a server gets to exit on its own after stdin closes.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(1);

/// Query a stdio MCP server.
///
/// A server that closes stdout before answering yields
/// [`QueryError::NoResponse`].
pub async fn query_stdio(
    name: &str,
    command: &str,
    args: &[String],
    env: &HashMap<String, String>,
) -> QueryResult<Vec<ToolInfo>> {
    match exchange(command, args, env).await? {
        Some(tools) => Ok(rpc::to_tool_infos(name, tools)),
        None => Err(QueryError::NoResponse),
    }
}

/// Run the handshake and return raw tool records, or `None` when the server
/// went silent.
pub async fn exchange(
    command: &str,
    args: &[String],
    env: &HashMap<String, String>,
) -> QueryResult<Option<Vec<RawTool>>> {
    let mut session = StdioSession::spawn(command, args, env)?;
    let result = session.list_tools().await;
    session.shutdown().await;
    result
}

/// Consume server stderr until it closes, logging each line at trace.
async fn drain_stderr(command: String, stderr: ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => tracing::trace!("[{}] {}", command, String::from_utf8_lossy(&line).trim_end()),
            Err(e) => {
                tracing::debug!("stopped reading stderr of '{}': {}", command, e);
                break;
            }
        }
    }
}

struct StdioSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl StdioSession {
    fn spawn(command: &str, args: &[String], env: &HashMap<String, String>) -> QueryResult<Self> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| QueryError::Spawn {
                command: command.to_string(),
                source,
            })?;
        tracing::debug!("spawned '{}' (pid={:?})", command, child.id());

        // Unread stderr fills the pipe and stalls the server mid-handshake.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(command.to_string(), stderr));
        }
        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or_else(|| {
            QueryError::Io(std::io::Error::other("child stdout not captured"))
        })?;
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    async fn list_tools(&mut self) -> QueryResult<Option<Vec<RawTool>>> {
        if !self.send(&rpc::initialize_request()).await? {
            return Ok(None);
        }
        let Some(init) = self.recv().await? else {
            return Ok(None);
        };
        tracing::trace!("initialize response: {}", init.trim());

        if !self.send(&rpc::tools_list_request()).await? {
            return Ok(None);
        }
        let Some(line) = self.recv().await? else {
            return Ok(None);
        };
        rpc::parse_tools_line(&line).map(Some)
    }

    /// Write one request line. `false` when the server already hung up.
    async fn send(&mut self, request: &JsonRpcRequest) -> QueryResult<bool> {
        let line = rpc::to_line(request)?;
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(false);
        };
        let written = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!("server closed stdin before '{}'", request.method);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read one response line. `None` on EOF.
    async fn recv(&mut self) -> QueryResult<Option<String>> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line).await?;
        Ok((n > 0).then_some(line))
    }

    /// Close stdin, give the server [`TERMINATE_GRACE`] to exit, then kill it.
    async fn shutdown(mut self) {
        drop(self.stdin.take());
        match tokio::time::timeout(TERMINATE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!("stdio server exited: {}", status),
            Ok(Err(e)) => tracing::warn!("failed to wait for stdio server: {}", e),
            Err(_) => {
                tracing::debug!("stdio server still running after grace period; killing");
                if let Err(e) = self.child.kill().await {
                    tracing::warn!("failed to kill stdio server: {}", e);
                }
            }
        }
    }
}
