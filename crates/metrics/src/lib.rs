//! Metrics collection and export for talkshop.
//!
//! Call sites record through the `metrics` facade macros re-exported here.
//! With the `prometheus` feature the relay serves the recorded values at
//! `/metrics`; without it every macro is a no-op.
//!
//! ```rust,ignore
//! use talkshop_metrics::{counter, relay};
//!
//! counter!(relay::WEBHOOKS_TOTAL, "event_type" => "conversation.tool_call").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
