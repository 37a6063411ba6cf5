//! MCP tool discovery: config loading, transports, and concurrent enumeration.
//!
//! Three transports are supported: plain HTTP JSON-RPC, SSE-negotiated HTTP
//! (used when a server answers 406), and newline-delimited stdio.

pub mod discovery;
pub mod enumerator;
pub mod http;
pub mod rpc;
pub mod sse;
pub mod stdio;
pub mod supervisor;
pub mod types;

pub use discovery::*;
pub use enumerator::*;
pub use supervisor::*;
pub use types::*;
