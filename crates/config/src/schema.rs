use serde::{Deserialize, Serialize};

/// Root of `talkshop.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TalkShopConfig {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub catalog: CatalogConfig,
    pub showcase: ShowcaseConfig,
    pub metrics: MetricsConfig,
}

/// Relay HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3001,
        }
    }
}

/// Webhook relay behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Seconds between `{"type":"ping"}` keep-alives on event streams.
    pub keepalive_secs: u64,
    /// Answer tool-call webhooks with a mock execution result.
    pub execute_tools: bool,
    /// Trust `X-Forwarded-For` style headers when throttling.
    pub behind_proxy: bool,
    /// Requests per minute per client IP on the webhook and event routes
    /// (0 disables throttling).
    pub throttle_per_minute: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: 30,
            execute_tools: true,
            behind_proxy: false,
            throttle_per_minute: 600,
        }
    }
}

/// Product catalog client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the Fake-Store-style catalog API.
    pub base_url: String,
    /// In-memory cache TTL in minutes (0 to disable).
    pub cache_ttl_minutes: u64,
    pub timeout_seconds: u64,
    /// Serve the built-in sample catalog instead of calling the API.
    pub offline: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fakestoreapi.com".into(),
            cache_ttl_minutes: 15,
            timeout_seconds: 10,
            offline: false,
        }
    }
}

/// Dispatcher timings and synthesis defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowcaseConfig {
    pub perception_throttle_ms: u64,
    pub focus_clear_ms: u64,
    pub cart_success_ms: u64,
    /// `concurrent` (last write wins) or `sequenced` (one call at a time).
    pub dispatch_mode: String,
    /// Gender assumed by product synthesis when the request carries no signal:
    /// `female`, `male` or `neutral`.
    pub default_gender: String,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            perception_throttle_ms: 5_000,
            focus_clear_ms: 5_000,
            cart_success_ms: 2_000,
            dispatch_mode: "concurrent".into(),
            default_gender: "female".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}
