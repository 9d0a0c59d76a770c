//! Configuration loading, env substitution and overrides.
//!
//! Config files: `talkshop.toml`, `talkshop.yaml`, `talkshop.yml` or
//! `talkshop.json`, searched in `./` then `~/.config/talkshop/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in the raw
//! file before parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config, to_toml_string},
    schema::{
        CatalogConfig, MetricsConfig, RelayConfig, ServerConfig, ShowcaseConfig, TalkShopConfig,
    },
};
