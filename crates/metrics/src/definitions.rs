//! Metric name and label definitions.

/// Webhook relay metrics
pub mod relay {
    /// Webhook envelopes received, labelled by `event_type`
    pub const WEBHOOKS_TOTAL: &str = "talkshop_relay_webhooks_total";
    /// Frames written to event streams
    pub const EVENTS_DELIVERED_TOTAL: &str = "talkshop_relay_events_delivered_total";
    /// Webhook events for a conversation with no open stream
    pub const EVENTS_UNROUTED_TOTAL: &str = "talkshop_relay_events_unrouted_total";
    /// Event streams opened
    pub const STREAMS_OPENED_TOTAL: &str = "talkshop_relay_streams_opened_total";
    /// Currently open event streams
    pub const STREAMS_ACTIVE: &str = "talkshop_relay_streams_active";
    /// Requests rejected by the per-IP throttle
    pub const THROTTLED_TOTAL: &str = "talkshop_relay_throttled_total";
}

/// Tool-call dispatch metrics
pub mod dispatch {
    /// Tool calls dispatched, labelled by `tool` and `outcome`
    pub const CALLS_TOTAL: &str = "talkshop_dispatch_calls_total";
    /// Messages the normalizer dropped, labelled by `reason`
    pub const DROPPED_TOTAL: &str = "talkshop_dispatch_dropped_total";
    /// Handler duration in seconds
    pub const DURATION_SECONDS: &str = "talkshop_dispatch_duration_seconds";
}

/// Catalog client metrics
pub mod catalog {
    pub const CACHE_HITS_TOTAL: &str = "talkshop_catalog_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "talkshop_catalog_cache_misses_total";
    /// Failed catalog HTTP fetches
    pub const FETCH_ERRORS_TOTAL: &str = "talkshop_catalog_fetch_errors_total";
}

/// Common label keys
pub mod labels {
    pub const EVENT_TYPE: &str = "event_type";
    pub const TOOL: &str = "tool";
    pub const OUTCOME: &str = "outcome";
    pub const REASON: &str = "reason";
}

/// Histogram buckets for dispatch durations (seconds)
pub mod buckets {
    pub const DISPATCH_DURATION: [f64; 10] = [
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
    ];
}
