//! Load MCP server definitions from Claude-style config files.
//!
//! Sources, lowest precedence first:
//! - user `~/.claude.json`: top-level `mcpServers`, then the entries scoped to
//!   the project directory under `projects.<dir>.mcpServers`.
//! - project `.mcp.json` (or any file with a top-level `mcpServers` table).
//!
//! Absent or malformed files contribute nothing; they never fail the load.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use super::{MergedConfig, ServerDescriptor};

pub fn expand_home(p: &str) -> PathBuf {
    if let Some(stripped) = p.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(p)
}

/// Well-known per-user config, `~/.claude.json`.
pub fn default_global_config() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".claude.json"))
}

/// Merge the global source with a single project source.
pub fn load_merged(global: Option<&Path>, project: &Path) -> MergedConfig {
    load_sources(global, std::slice::from_ref(&project.to_path_buf()))
}

/// Merge the global source with several project-level sources.
///
/// Project sources override global entries wholesale. Among project sources
/// the first one to declare a name keeps it. A project path that resolves to
/// the global file is ignored.
pub fn load_sources(global: Option<&Path>, projects: &[PathBuf]) -> MergedConfig {
    let mut merged = MergedConfig::default();
    let global_key = global.map(canonical);

    if let Some(path) = global
        && let Some(root) = read_json(path)
    {
        merged.extend(servers_from(&root, path));
        for project in projects {
            if let Some(dir) = project.parent() {
                merged.extend(project_scoped_servers(&root, path, dir));
            }
        }
    }

    let mut project_layer = MergedConfig::default();
    for path in projects {
        if global_key.as_ref() == Some(&canonical(path)) {
            tracing::debug!("skipping {}: same file as global config", path.display());
            continue;
        }
        let Some(root) = read_json(path) else {
            continue;
        };
        for srv in servers_from(&root, path) {
            if !project_layer.insert_if_absent(srv) {
                tracing::debug!("{}: server already declared by an earlier source", path.display());
            }
        }
    }
    merged.extend(project_layer);

    tracing::debug!(
        "merged {} MCP server(s): [{}]",
        merged.len(),
        merged.names().join(", ")
    );
    merged
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn read_json(path: &Path) -> Option<JsonValue> {
    let content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("MCP config not found: {}", path.display());
            return None;
        }
        Err(e) => {
            tracing::warn!("failed to read MCP config {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str::<JsonValue>(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("failed to parse MCP config {}: {}", path.display(), e);
            None
        }
    }
}

/// Top-level `mcpServers` entries of one source.
fn servers_from(root: &JsonValue, path: &Path) -> MergedConfig {
    let mut out = MergedConfig::default();
    let Some(map) = root.get("mcpServers").and_then(|m| m.as_object()) else {
        return out;
    };
    for (key, def) in map {
        if let Some(srv) = parse_server(key, def, path) {
            out.insert(srv);
        }
    }
    out
}

/// `projects.<dir>.mcpServers` entries of the user config.
fn project_scoped_servers(root: &JsonValue, path: &Path, project_dir: &Path) -> MergedConfig {
    let mut out = MergedConfig::default();
    let Some(projects) = root.get("projects").and_then(|p| p.as_object()) else {
        return out;
    };
    let dir_key = canonical(project_dir);
    let Some(map) = projects
        .get(dir_key.to_string_lossy().as_ref())
        .and_then(|p| p.get("mcpServers"))
        .and_then(|m| m.as_object())
    else {
        return out;
    };
    for (key, def) in map {
        if let Some(srv) = parse_server(key, def, path) {
            out.insert(srv);
        }
    }
    out
}

/// Parse one `{ url?, command?, args?, env?, headers?, type?|transport? }` entry.
///
/// Entries with neither `url` nor `command` are skipped.
fn parse_server(key: &str, def: &JsonValue, path: &Path) -> Option<ServerDescriptor> {
    let url = def.get("url").and_then(|v| v.as_str()).map(str::to_string);
    let command = def
        .get("command")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    if url.is_none() && command.is_none() {
        tracing::warn!(
            "skipping MCP server '{}' in {}: no url or command",
            key,
            path.display()
        );
        return None;
    }
    let args: Vec<String> = def
        .get("args")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|x| x.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let transport = def
        .get("type")
        .or_else(|| def.get("transport"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    Some(ServerDescriptor {
        name: key.to_string(),
        url,
        command,
        args,
        env: string_map(def.get("env")),
        headers: string_map(def.get("headers")),
        transport,
        origin: Some(path.to_path_buf()),
    })
}

fn string_map(v: Option<&JsonValue>) -> HashMap<String, String> {
    v.and_then(|v| v.as_object())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(path: &Path, content: &str) {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).unwrap();
        }
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.sync_all().ok();
    }

    #[test]
    fn project_overrides_global_entry_wholesale() {
        let tmp = tempfile::tempdir().unwrap();
        let global = tmp.path().join("home/.claude.json");
        let project = tmp.path().join("proj/.mcp.json");
        write_file(
            &global,
            r#"{"mcpServers": {
                "s": {"url": "A", "headers": {"API_KEY": "global-key"}},
                "global-only": {"command": "g"}
            }}"#,
        );
        write_file(&project, r#"{"mcpServers": {"s": {"url": "B"}}}"#);

        let merged = load_merged(Some(&global), &project);
        let s = merged.get("s").expect("s present");
        assert_eq!(s.url.as_deref(), Some("B"));
        assert!(s.headers.is_empty(), "no field-level merge");
        assert_eq!(s.origin.as_deref(), Some(project.as_path()));
        assert_eq!(merged.names(), vec!["s", "global-only"]);
    }

    #[test]
    fn missing_sources_yield_empty_config() {
        let tmp = tempfile::tempdir().unwrap();
        let merged = load_merged(
            Some(&tmp.path().join("nope.json")),
            &tmp.path().join("missing.json"),
        );
        assert!(merged.is_empty());
    }

    #[test]
    fn malformed_source_does_not_hide_the_other() {
        let tmp = tempfile::tempdir().unwrap();
        let global = tmp.path().join(".claude.json");
        let project = tmp.path().join("proj/.mcp.json");
        write_file(&global, r#"{"mcpServers": {"g": {"url": "http://g"}}}"#);
        write_file(&project, "{ not json");

        let merged = load_merged(Some(&global), &project);
        assert_eq!(merged.names(), vec!["g"]);
    }

    #[test]
    fn entries_without_url_or_command_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join(".mcp.json");
        write_file(
            &project,
            r#"{"mcpServers": {
                "broken": {"args": ["x"]},
                "stdio": {"command": "python", "args": ["-m", "srv", 3], "env": {"TEST_VAR": "value"}, "type": "stdio"},
                "http": {"url": "http://localhost:8080/mcp", "headers": {"CONTEXT7_API_KEY": "k"}}
            }}"#,
        );
        let merged = load_merged(None, &project);
        assert_eq!(merged.names(), vec!["stdio", "http"]);

        let stdio = merged.get("stdio").unwrap();
        assert_eq!(stdio.command.as_deref(), Some("python"));
        assert_eq!(stdio.args, vec!["-m".to_string(), "srv".to_string()]);
        assert_eq!(stdio.env.get("TEST_VAR").map(|s| s.as_str()), Some("value"));
        assert_eq!(stdio.transport.as_deref(), Some("stdio"));

        let http = merged.get("http").unwrap();
        assert_eq!(http.headers.get("CONTEXT7_API_KEY").map(|s| s.as_str()), Some("k"));
        assert_eq!(http.transport_kind(), "http");
    }

    #[test]
    fn first_project_source_wins_among_projects() {
        let tmp = tempfile::tempdir().unwrap();
        let global = tmp.path().join(".claude.json");
        let first = tmp.path().join("proj/.mcp.json");
        let second = tmp.path().join("cwd/.mcp.json");
        write_file(&global, r#"{"mcpServers": {"s": {"url": "G"}, "g": {"url": "G2"}}}"#);
        write_file(&first, r#"{"mcpServers": {"s": {"url": "P1"}}}"#);
        write_file(&second, r#"{"mcpServers": {"s": {"url": "P2"}, "c": {"command": "c"}}}"#);

        let merged = load_sources(Some(&global), &[first, second]);
        assert_eq!(merged.get("s").and_then(|s| s.url.as_deref()), Some("P1"));
        assert_eq!(merged.names(), vec!["s", "g", "c"]);
    }

    #[test]
    fn project_path_equal_to_global_is_loaded_once() {
        let tmp = tempfile::tempdir().unwrap();
        let global = tmp.path().join(".claude.json");
        write_file(&global, r#"{"mcpServers": {"g": {"url": "G"}}}"#);
        let merged = load_sources(Some(&global), std::slice::from_ref(&global));
        assert_eq!(merged.names(), vec!["g"]);
    }

    #[test]
    fn project_scoped_user_entries_sit_between_global_and_project() {
        let tmp = tempfile::tempdir().unwrap();
        let proj_dir = tmp.path().join("proj");
        std::fs::create_dir_all(&proj_dir).unwrap();
        let key = proj_dir.canonicalize().unwrap();
        let global = tmp.path().join(".claude.json");
        let project = proj_dir.join(".mcp.json");
        let user = serde_json::json!({
            "mcpServers": {"a": {"url": "global"}, "b": {"url": "global"}},
            "projects": {
                (key.to_string_lossy().to_string()): {"mcpServers": {"a": {"url": "scoped"}, "b": {"url": "scoped"}}}
            }
        });
        write_file(&global, &user.to_string());
        write_file(&project, r#"{"mcpServers": {"b": {"url": "project"}}}"#);

        let merged = load_merged(Some(&global), &project);
        assert_eq!(merged.get("a").and_then(|s| s.url.as_deref()), Some("scoped"));
        assert_eq!(merged.get("b").and_then(|s| s.url.as_deref()), Some("project"));
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/etc/x.json"), PathBuf::from("/etc/x.json"));
    }
}
