//! Optional `<home>/config.toml` for the CLI. Every field is optional; an
//! explicitly set environment variable beats the file, the file beats the
//! built-in default.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub discovery: Option<DiscoveryCfg>,
}

/// `[logging]`: same knobs as the `TRACING_*` / `LOG_*` variables.
#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

/// `[discovery]`: defaults for a discovery pass.
#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryCfg {
    /// Per-server budget. 0 falls back to the built-in 10 seconds.
    pub timeout_secs: Option<u64>,
    /// Replaces `~/.claude.json` as the user-level MCP config.
    pub global_config: Option<String>, // `~/` is expanded
    /// Also read `.mcp.json` from the working directory.
    pub include_cwd: Option<bool>,
}

/// `Ok(None)` when the file does not exist; parse errors are returned.
pub fn load_user_config(home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)?;
    let cfg: UserConfig = toml::from_str(&s)?;
    Ok(Some(cfg))
}

/// Tool home: `explicit` when non-empty, else `$HOME/.mcp-toolscan`, else
/// `./.mcp-toolscan`.
pub fn toolscan_home(explicit: &str) -> PathBuf {
    if !explicit.is_empty() {
        return PathBuf::from(explicit);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".mcp-toolscan");
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".mcp-toolscan")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_user_config(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn parses_logging_and_discovery_tables() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            r#"
[logging]
level = "debug"
json = true

[discovery]
timeout_secs = 3
global_config = "~/.claude.json"
include_cwd = false
"#,
        )
        .unwrap();
        let cfg = load_user_config(tmp.path()).unwrap().expect("config");
        let logging = cfg.logging.expect("logging");
        assert_eq!(logging.level.as_deref(), Some("debug"));
        assert_eq!(logging.json, Some(true));
        let discovery = cfg.discovery.expect("discovery");
        assert_eq!(discovery.timeout_secs, Some(3));
        assert_eq!(discovery.include_cwd, Some(false));
    }

    #[test]
    fn explicit_home_wins() {
        assert_eq!(toolscan_home("/opt/toolscan"), PathBuf::from("/opt/toolscan"));
        assert!(toolscan_home("").ends_with(".mcp-toolscan"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("config.toml"), "[logging\nlevel=").unwrap();
        assert!(load_user_config(tmp.path()).is_err());
    }
}
