//! The shopping assistant's client-side core.
//!
//! Inbound data-channel and relay messages go through the [`Normalizer`],
//! canonical tool calls through the [`Dispatcher`], and every visible effect
//! lands in the [`ViewStore`] that renderers watch. Tools the dispatcher does
//! not own are forwarded to a [`ToolForwarder`], normally the [`ShopSession`].

pub mod assistant;
pub mod cart;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod normalize;
pub mod queue;
pub mod session;
pub mod state;
pub mod subscriber;
pub mod synthesis;

#[cfg(test)]
mod test_support;

pub use {
    assistant::{Assistant, Received},
    cart::{Cart, CartItem, CheckoutSummary},
    dispatch::{DispatchOutcome, Dispatcher, DispatcherConfig, LoggingForwarder, ToolForwarder},
    error::{Error, Result},
    gate::{PerceptionGate, PerceptionState, StagedStyle},
    normalize::{AppMessage, DropReason, Normalizer},
    queue::{DispatchMode, DispatchRunner, DispatchTicket},
    session::ShopSession,
    state::{ShowcaseState, ViewState, ViewStore},
    subscriber::{RelaySubscriber, SseParser},
    synthesis::{Gender, SynthesisDefaults, SynthesisRequest, synthesize_product},
};
