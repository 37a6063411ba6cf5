use std::path::{Path, PathBuf};
use std::time::Duration;

use env_flags::env_flags;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

use mcp_toolscan::config::{UserConfig, load_user_config, toolscan_home};
use mcp_toolscan::mcp::{DEFAULT_QUERY_TIMEOUT, default_global_config, expand_home};
use mcp_toolscan::{DiscoverySettings, ServerOutcome, discover_from_sources};

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
enum LogStyle {
    Json,
    Compact,
    Pretty,
    Plain,
}

fn env_set(k: &str) -> bool {
    std::env::var_os(k).is_some()
}

fn fmt_layer<W>(style: LogStyle, ansi: bool, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    match style {
        LogStyle::Json => base.json().boxed(),
        LogStyle::Compact => base.compact().boxed(),
        LogStyle::Pretty => base.pretty().boxed(),
        LogStyle::Plain => base.boxed(),
    }
}

fn init_tracing(home: &Path, user_cfg: Option<&UserConfig>) {
    env_flags! {
        /// Tracing filter, e.g. "info", "debug", or targets format.
        RUST_LOG: &str = "info";
        /// Preferred filter env (alias). If set, overrides RUST_LOG.
        TRACING_FILTER: &str = "";
        /// Pretty formatting for logs (ignored if TRACING_JSON=true)
        TRACING_PRETTY: bool = false;
        /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
        TRACING_COMPACT: bool = true;
        /// JSON formatting for logs
        TRACING_JSON: bool = false;
        /// If true, also log to file under <MCP_TOOLSCAN_HOME>/logs or LOG_DIR
        LOG_TO_FILE: bool = false;
        /// Optional explicit log directory. Defaults to <MCP_TOOLSCAN_HOME>/logs
        LOG_DIR: &str = "";
    }

    let mut rust_log = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut json = *TRACING_JSON;
    let mut compact = *TRACING_COMPACT;
    let mut pretty = *TRACING_PRETTY;
    let mut to_file = *LOG_TO_FILE;
    let mut log_dir = (!(*LOG_DIR).is_empty()).then(|| PathBuf::from(*LOG_DIR));

    if let Some(cfg) = user_cfg.and_then(|c| c.logging.as_ref()) {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            rust_log = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(expand_home(dir));
        }
    }

    let style = if json {
        LogStyle::Json
    } else if compact {
        LogStyle::Compact
    } else if pretty {
        LogStyle::Pretty
    } else {
        LogStyle::Plain
    };
    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    // stderr only: stdout carries the report.
    let mut layers = vec![fmt_layer(style, true, std::io::stderr)];
    let mut dir_error = None;
    if to_file {
        let dir = log_dir.unwrap_or_else(|| home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "mcp-toolscan.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(fmt_layer(style, false, nb));
            }
            Err(e) => dir_error = Some((dir, e)),
        }
    }

    if let Err(e) = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
    {
        tracing::debug!("tracing already set: {:?}", e);
    }
    if let Some((dir, e)) = dir_error {
        tracing::warn!("failed to create log dir {}: {}", dir.display(), e);
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[derive(Serialize)]
struct Report<'a> {
    servers: &'a [ServerOutcome],
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_flags! {
        /// Project directory. If empty, defaults to the current execution directory.
        WORKSPACE_DIR: &str = "";
        /// Project-level MCP config. Defaults to <workspace>/.mcp.json
        MCP_CONFIG: &str = "";
        /// User-level config merged underneath the project one. Defaults to ~/.claude.json
        MCP_GLOBAL_CONFIG: &str = "";
        /// Per-server query budget in seconds
        MCP_QUERY_TIMEOUT_SECS: u64 = 10;
        /// Also read .mcp.json from the current directory when it differs from the project config
        MCP_INCLUDE_CWD: bool = true;
        /// Pretty-print the JSON report
        REPORT_PRETTY: bool = true;
        /// Tool home directory (config.toml, logs). Defaults to $HOME/.mcp-toolscan
        MCP_TOOLSCAN_HOME: &str = "";
    }

    let home = toolscan_home(*MCP_TOOLSCAN_HOME);
    let (user_cfg, cfg_error) = match load_user_config(&home) {
        Ok(cfg) => (cfg, None),
        Err(e) => (None, Some(e)),
    };
    init_tracing(&home, user_cfg.as_ref());
    if let Some(e) = cfg_error {
        tracing::warn!("ignoring {}/config.toml: {:#}", home.display(), e);
    }
    let discovery_cfg = user_cfg.as_ref().and_then(|c| c.discovery.as_ref());

    let cwd = std::env::current_dir()?;
    let workspace_dir = if !(*WORKSPACE_DIR).is_empty() {
        expand_home(*WORKSPACE_DIR)
    } else {
        cwd.clone()
    };
    tracing::info!("workspace_dir={}", workspace_dir.display());

    let global_config = if env_set("MCP_GLOBAL_CONFIG") && !(*MCP_GLOBAL_CONFIG).is_empty() {
        Some(expand_home(*MCP_GLOBAL_CONFIG))
    } else {
        discovery_cfg
            .and_then(|d| d.global_config.as_deref())
            .map(expand_home)
            .or_else(default_global_config)
    };
    let timeout_secs = if env_set("MCP_QUERY_TIMEOUT_SECS") {
        *MCP_QUERY_TIMEOUT_SECS
    } else {
        discovery_cfg
            .and_then(|d| d.timeout_secs)
            .unwrap_or(*MCP_QUERY_TIMEOUT_SECS)
    };
    let timeout = if timeout_secs == 0 {
        tracing::warn!(
            "query timeout of 0 seconds ignored; using {}s",
            DEFAULT_QUERY_TIMEOUT.as_secs()
        );
        DEFAULT_QUERY_TIMEOUT
    } else {
        Duration::from_secs(timeout_secs)
    };
    let include_cwd = if env_set("MCP_INCLUDE_CWD") {
        *MCP_INCLUDE_CWD
    } else {
        discovery_cfg
            .and_then(|d| d.include_cwd)
            .unwrap_or(*MCP_INCLUDE_CWD)
    };

    let project_config = if !(*MCP_CONFIG).is_empty() {
        expand_home(*MCP_CONFIG)
    } else {
        workspace_dir.join(".mcp.json")
    };
    let mut sources = vec![project_config];
    let cwd_config = cwd.join(".mcp.json");
    if include_cwd && !same_file(&sources[0], &cwd_config) {
        sources.push(cwd_config);
    }

    let settings = DiscoverySettings {
        global_config,
        timeout,
    };
    tracing::debug!(
        "discovery: global={:?}, sources={:?}, timeout={:?}",
        settings.global_config,
        sources,
        settings.timeout
    );

    let servers = discover_from_sources(&settings, &sources).await;
    tracing::info!(
        "{} of {} MCP server(s) connected",
        servers.iter().filter(|s| s.connected).count(),
        servers.len()
    );

    let report = Report { servers: &servers };
    let out = if *REPORT_PRETTY {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");
    Ok(())
}
