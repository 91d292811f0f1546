use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::ConvoyConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["convoy.toml", "convoy.yaml", "convoy.yml", "convoy.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ConvoyConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ConvoyConfig> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let cfg = match ext {
        "toml" => toml::from_str(raw)?,
        "yaml" | "yml" => serde_yaml::from_str(raw)?,
        "json" => serde_json::from_str(raw)?,
        other => anyhow::bail!("unsupported config format: .{other}"),
    };
    Ok(cfg)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./convoy.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/convoy/convoy.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ConvoyConfig::default()` if no config file is found.
pub fn discover_and_load() -> ConvoyConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ConvoyConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/convoy/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "convoy").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory for the SQLite database and friends.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "convoy")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml() {
        let cfg = parse_config(
            "[server]\nbind = \"0.0.0.0\"\nport = 9000\n",
            Path::new("convoy.toml"),
        )
        .unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.server.port, 9000);
    }

    #[test]
    fn parses_json() {
        let cfg = parse_config(
            r#"{"server": {"port": 9100}}"#,
            Path::new("convoy.json"),
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.bind, "127.0.0.1");
    }

    #[test]
    fn parses_yaml() {
        let cfg = parse_config("server:\n  port: 9200\n", Path::new("convoy.yaml")).unwrap();
        assert_eq!(cfg.server.port, 9200);
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(parse_config("", Path::new("convoy.ini")).is_err());
    }
}
