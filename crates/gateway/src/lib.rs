//! Webhook relay.
//!
//! Provider webhooks arrive at `POST /tavus-webhook`; the relay pushes them
//! to every browser subscribed at `GET /events/{conversation_id}` as
//! server-sent events. Subscriptions live in process memory only: a webhook
//! handled by a different relay instance than the one holding the stream is
//! lost.

pub mod events;
#[cfg(feature = "prometheus")]
pub mod metrics_routes;
pub mod request_throttle;
pub mod server;
pub mod state;
pub mod webhook;

pub use {
    server::{AppState, build_relay_app, start_relay},
    state::{RelaySettings, RelayState, Subscription},
};
