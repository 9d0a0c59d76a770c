use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        body::Bytes,
        extract::State,
        http::{Method, StatusCode, Uri},
        response::{IntoResponse, Json, Response},
        routing::{get, post},
    },
    serde_json::json,
    talkshop_config::TalkShopConfig,
    talkshop_metrics::MetricsHandle,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::info,
};

use crate::{
    events::events_handler,
    request_throttle::{RequestThrottle, is_webhook_path, throttle_gate},
    state::{RelaySettings, RelayState},
    webhook::webhook_handler,
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayState>,
    /// `None` when throttling is disabled.
    pub throttle: Option<RequestThrottle>,
    pub metrics_handle: Option<MetricsHandle>,
}

impl AppState {
    pub fn from_config(config: &TalkShopConfig, metrics_handle: Option<MetricsHandle>) -> Self {
        Self {
            relay: RelayState::new(RelaySettings::from_config(&config.relay)),
            throttle: RequestThrottle::per_minute(config.relay.throttle_per_minute),
            metrics_handle,
        }
    }
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the relay router (shared between production startup and tests).
pub fn build_relay_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/tavus-webhook", post(webhook_handler))
        .route("/events/{conversation_id}", get(events_handler));

    #[cfg(feature = "prometheus")]
    let router = router.route(
        "/metrics",
        get(crate::metrics_routes::prometheus_metrics_handler),
    );

    router
        .fallback(fallback_handler)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            throttle_gate,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c. Open event streams are closed on the way out
/// so clients see a clean end of stream.
pub async fn start_relay(
    config: &TalkShopConfig,
    metrics_handle: Option<MetricsHandle>,
) -> anyhow::Result<()> {
    let state = AppState::from_config(config, metrics_handle);
    let relay = Arc::clone(&state.relay);
    let app = build_relay_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        throttle_per_minute = config.relay.throttle_per_minute,
        execute_tools = config.relay.execute_tools,
        "relay listening"
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(relay))
    .await?;
    Ok(())
}

async fn shutdown_signal(relay: Arc<RelayState>) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    let closed = relay.close_all();
    info!(closed, "shutting down relay");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "active_connections": state.relay.active_connections(),
    }))
}

/// Webhook deliveries may arrive under a path prefix; anything else is 404.
async fn fallback_handler(
    state: State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if method == Method::POST && is_webhook_path(uri.path()) {
        return webhook_handler(state, body).await;
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "not found" })),
    )
        .into_response()
}
