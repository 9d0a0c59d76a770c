use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::TalkShopConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "talkshop.toml",
    "talkshop.yaml",
    "talkshop.yml",
    "talkshop.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<TalkShopConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply
/// `TALKSHOP_*` environment overrides.
///
/// Search order:
/// 1. `./talkshop.{toml,yaml,yml,json}`
/// 2. `~/.config/talkshop/talkshop.{toml,yaml,yml,json}`
///
/// Falls back to `TalkShopConfig::default()` when nothing is found or the
/// file does not parse.
pub fn discover_and_load() -> TalkShopConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                TalkShopConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            TalkShopConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Apply `TALKSHOP_BIND`, `TALKSHOP_PORT`, `TALKSHOP_CATALOG_URL` and
/// `TALKSHOP_OFFLINE` on top of a loaded config.
pub fn apply_env_overrides(config: &mut TalkShopConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(bind) = lookup("TALKSHOP_BIND").filter(|v| !v.trim().is_empty()) {
        config.server.bind = bind;
    }
    if let Some(port) = lookup("TALKSHOP_PORT") {
        match port.trim().parse() {
            Ok(port) => config.server.port = port,
            Err(_) => warn!(value = %port, "ignoring invalid TALKSHOP_PORT"),
        }
    }
    if let Some(url) = lookup("TALKSHOP_CATALOG_URL").filter(|v| !v.trim().is_empty()) {
        config.catalog.base_url = url;
    }
    if let Some(offline) = lookup("TALKSHOP_OFFLINE") {
        config.catalog.offline = matches!(offline.trim(), "1" | "true" | "yes");
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/talkshop/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "talkshop").map(|d| d.config_dir().to_path_buf())
}

/// Render the effective config as TOML.
pub fn to_toml_string(config: &TalkShopConfig) -> anyhow::Result<String> {
    toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<TalkShopConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
