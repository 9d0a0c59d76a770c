use std::{
    net::{IpAddr, SocketAddr},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    axum::{
        extract::{ConnectInfo, State},
        http::{HeaderMap, Method, StatusCode},
        middleware::Next,
        response::{IntoResponse, Json, Response},
    },
    dashmap::{DashMap, mapref::entry::Entry},
    talkshop_metrics::{counter, labels, relay as relay_metrics},
    talkshop_protocol::WEBHOOK_PATH_SEGMENT,
    tracing::debug,
};

use crate::server::AppState;

const CLEANUP_EVERY_REQUESTS: u64 = 512;
const WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window per-IP limiter for the relay's public endpoints.
#[derive(Clone)]
pub struct RequestThrottle {
    limit: RateLimit,
    buckets: Arc<DashMap<ThrottleKey, WindowState>>,
    requests_seen: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ThrottleScope {
    Webhook,
    Events,
}

impl ThrottleScope {
    fn from_request(method: &Method, path: &str) -> Option<Self> {
        if *method == Method::POST && is_webhook_path(path) {
            return Some(Self::Webhook);
        }
        if *method == Method::GET && path.starts_with("/events/") {
            return Some(Self::Events);
        }
        None
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Events => "events",
        }
    }
}

/// Webhook deliveries are accepted on any path whose last segment is the
/// webhook segment, so a reverse proxy may mount the relay under a prefix.
pub fn is_webhook_path(path: &str) -> bool {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .is_some_and(|segment| segment == WEBHOOK_PATH_SEGMENT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ThrottleKey {
    ip: IpAddr,
    scope: ThrottleScope,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    started_at: Instant,
    count: usize,
}

#[derive(Debug, Clone, Copy)]
struct RateLimit {
    max_requests: usize,
    window: Duration,
}

enum ThrottleDecision {
    Allowed,
    Denied { retry_after: Duration },
}

impl RequestThrottle {
    /// `None` when `per_minute` is zero, which turns throttling off.
    pub fn per_minute(per_minute: usize) -> Option<Self> {
        (per_minute > 0).then(|| {
            Self::with_limit(RateLimit {
                max_requests: per_minute,
                window: WINDOW,
            })
        })
    }

    fn with_limit(limit: RateLimit) -> Self {
        Self {
            limit,
            buckets: Arc::new(DashMap::new()),
            requests_seen: Arc::new(AtomicU64::new(0)),
        }
    }

    fn check(&self, ip: IpAddr, scope: ThrottleScope) -> ThrottleDecision {
        self.check_at(ip, scope, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, scope: ThrottleScope, now: Instant) -> ThrottleDecision {
        let limit = self.limit;
        let key = ThrottleKey { ip, scope };
        let decision = match self.buckets.entry(key) {
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();
                let elapsed = now.duration_since(state.started_at);
                if elapsed >= limit.window {
                    state.started_at = now;
                    state.count = 1;
                    ThrottleDecision::Allowed
                } else if state.count < limit.max_requests {
                    state.count += 1;
                    ThrottleDecision::Allowed
                } else {
                    ThrottleDecision::Denied {
                        retry_after: limit.window.saturating_sub(elapsed),
                    }
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(WindowState {
                    started_at: now,
                    count: 1,
                });
                ThrottleDecision::Allowed
            },
        };

        self.cleanup_if_needed(now);
        decision
    }

    fn cleanup_if_needed(&self, now: Instant) {
        let seen = self.requests_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if !seen.is_multiple_of(CLEANUP_EVERY_REQUESTS) {
            return;
        }
        let stale_after = self.limit.window.saturating_mul(3);
        self.buckets
            .retain(|_, state| now.duration_since(state.started_at) <= stale_after);
    }
}

pub async fn throttle_gate(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(throttle) = state.throttle.as_ref() else {
        return next.run(request).await;
    };
    let Some(scope) = ThrottleScope::from_request(request.method(), request.uri().path()) else {
        return next.run(request).await;
    };

    let client_ip = resolve_client_ip(request.headers(), addr, state.relay.settings.behind_proxy);
    match throttle.check(client_ip, scope) {
        ThrottleDecision::Allowed => next.run(request).await,
        ThrottleDecision::Denied { retry_after } => {
            debug!(%client_ip, scope = scope.as_str(), "request throttled");
            counter!(relay_metrics::THROTTLED_TOTAL, labels::REASON => scope.as_str())
                .increment(1);
            rate_limited_response(retry_after)
        },
    }
}

fn rate_limited_response(retry_after: Duration) -> Response {
    let retry_after_secs = retry_after.as_secs().max(1);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "success": false,
            "error": "too many requests",
            "retry_after_seconds": retry_after_secs
        })),
    )
        .into_response();

    if let Ok(value) = retry_after_secs.to_string().parse() {
        response
            .headers_mut()
            .insert(axum::http::header::RETRY_AFTER, value);
    }
    response
}

fn resolve_client_ip(headers: &HeaderMap, addr: SocketAddr, behind_proxy: bool) -> IpAddr {
    if behind_proxy && let Some(ip) = extract_forwarded_ip(headers) {
        return ip;
    }
    addr.ip()
}

fn extract_forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let xff = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());
    if let Some(xff) = xff
        && let Some(ip) = xff
            .split(',')
            .find_map(|candidate| parse_ip(candidate.trim()))
    {
        return Some(ip);
    }

    let xri = headers.get("x-real-ip").and_then(|v| v.to_str().ok());
    if let Some(xri) = xri
        && let Some(ip) = parse_ip(xri.trim())
    {
        return Some(ip);
    }

    None
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    if value.is_empty() {
        return None;
    }
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    None
}
