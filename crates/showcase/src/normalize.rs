//! Converges every inbound message shape on the canonical [`ToolCall`].
//!
//! Accepted tool-call shapes:
//! - direct data-channel message `{type: "conversation-toolcall", tool_call}`
//!   (also what the relay writes on its event stream)
//! - webhook-shaped `{event_type: "conversation.tool_call", properties}`
//! - perception events `{event_type: "conversation.perception_tool_call",
//!   properties}`, globally throttled; `detected_user_style` is staged in the
//!   [`PerceptionGate`] instead of being returned

use std::{sync::Mutex, time::Duration};

use {
    serde_json::Value,
    talkshop_metrics::{counter, dispatch as dispatch_metrics, labels},
    talkshop_protocol::{ToolCall, ToolCallProperties, ToolName, event_types, message_types},
    tokio::time::Instant,
    tracing::{debug, warn},
};

use crate::gate::PerceptionGate;

/// Why a message produced no tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Throttled,
    MalformedArguments,
    UnknownShape,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Throttled => "throttled",
            Self::MalformedArguments => "malformed_arguments",
            Self::UnknownShape => "unknown_shape",
        }
    }
}

/// A classified data-channel or relay message.
#[derive(Debug, Clone, PartialEq)]
pub enum AppMessage {
    ToolCall(ToolCall),
    /// A style detection was staged for confirmation.
    Staged,
    Utterance {
        role: Option<String>,
        text: String,
    },
    ReplicaSpeaking(bool),
    /// `connected` and `ping` frames written by the relay itself.
    RelayControl,
    Dropped(DropReason),
}

impl AppMessage {
    pub fn into_tool_call(self) -> Option<ToolCall> {
        match self {
            Self::ToolCall(call) => Some(call),
            _ => None,
        }
    }
}

pub struct Normalizer {
    gate: PerceptionGate,
    throttle_window: Duration,
    last_perception: Mutex<Option<Instant>>,
}

impl Normalizer {
    pub fn new(gate: PerceptionGate, throttle_window: Duration) -> Self {
        Self {
            gate,
            throttle_window,
            last_perception: Mutex::new(None),
        }
    }

    /// The canonical call carried by `message`, if any.
    pub fn normalize(&self, message: &Value) -> Option<ToolCall> {
        self.classify(message).into_tool_call()
    }

    pub fn classify(&self, message: &Value) -> AppMessage {
        self.classify_at(message, Instant::now())
    }

    pub fn classify_at(&self, message: &Value, now: Instant) -> AppMessage {
        let classified = self.classify_inner(message, now);
        if let AppMessage::Dropped(reason) = &classified {
            counter!(dispatch_metrics::DROPPED_TOTAL, labels::REASON => reason.as_str())
                .increment(1);
        }
        classified
    }

    fn classify_inner(&self, message: &Value, now: Instant) -> AppMessage {
        let Some(object) = message.as_object() else {
            debug!("ignoring non-object message");
            return AppMessage::Dropped(DropReason::UnknownShape);
        };

        match object.get("event_type").and_then(Value::as_str) {
            Some(event_types::TOOL_CALL) => return webhook_tool_call(object.get("properties")),
            Some(event_types::PERCEPTION_TOOL_CALL) => {
                return self.perception_tool_call(object.get("properties"), now);
            },
            _ => {},
        }

        match object.get("type").and_then(Value::as_str) {
            Some(message_types::TOOL_CALL) => direct_tool_call(object.get("tool_call")),
            Some(message_types::UTTERANCE) => utterance(object),
            Some(message_types::REPLICA_SPEAKING) => {
                let speaking = object
                    .get("is_speaking")
                    .or_else(|| object.get("properties").and_then(|p| p.get("is_speaking")))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                AppMessage::ReplicaSpeaking(speaking)
            },
            Some(message_types::CONNECTED | message_types::PING) => AppMessage::RelayControl,
            other => {
                let event_type = object
                    .get("event_type")
                    .and_then(Value::as_str)
                    .unwrap_or("-");
                debug!(
                    message_type = other.unwrap_or("-"),
                    event_type,
                    "ignoring unrecognised message"
                );
                AppMessage::Dropped(DropReason::UnknownShape)
            },
        }
    }

    fn perception_tool_call(&self, properties: Option<&Value>, now: Instant) -> AppMessage {
        let call = match parse_properties(properties) {
            Ok(call) => call,
            Err(reason) => return AppMessage::Dropped(reason),
        };

        {
            let Ok(mut last) = self.last_perception.lock() else {
                return AppMessage::Dropped(DropReason::Throttled);
            };
            if let Some(previous) = *last
                && now.saturating_duration_since(previous) < self.throttle_window
            {
                debug!(tool = call.name(), "perception event throttled");
                return AppMessage::Dropped(DropReason::Throttled);
            }
            *last = Some(now);
        }

        if call.tool() == ToolName::DetectedUserStyle {
            self.gate.stage(call.function.arguments);
            return AppMessage::Staged;
        }
        AppMessage::ToolCall(call)
    }
}

fn parse_properties(properties: Option<&Value>) -> Result<ToolCall, DropReason> {
    let Some(properties) = properties else {
        warn!("tool call event without properties");
        return Err(DropReason::MalformedArguments);
    };
    let properties: ToolCallProperties =
        serde_json::from_value(properties.clone()).map_err(|error| {
            warn!(%error, "tool call event with unreadable properties");
            DropReason::MalformedArguments
        })?;
    let name = properties.name.clone();
    properties.into_tool_call().map_err(|error| {
        warn!(tool = %name, %error, "dropping tool call with malformed arguments");
        DropReason::MalformedArguments
    })
}

fn webhook_tool_call(properties: Option<&Value>) -> AppMessage {
    match parse_properties(properties) {
        Ok(call) => AppMessage::ToolCall(call),
        Err(reason) => AppMessage::Dropped(reason),
    }
}

fn direct_tool_call(tool_call: Option<&Value>) -> AppMessage {
    let Some(tool_call) = tool_call else {
        warn!("tool call message without tool_call");
        return AppMessage::Dropped(DropReason::UnknownShape);
    };
    match serde_json::from_value::<ToolCall>(tool_call.clone()) {
        Ok(call) => AppMessage::ToolCall(call),
        Err(error) => {
            warn!(%error, "dropping malformed direct tool call");
            AppMessage::Dropped(DropReason::MalformedArguments)
        },
    }
}

fn utterance(object: &serde_json::Map<String, Value>) -> AppMessage {
    let body = object.get("utterance").or_else(|| object.get("properties"));
    let text = body
        .and_then(|b| b.get("text").or_else(|| b.get("speech")))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let role = body
        .and_then(|b| b.get("role"))
        .and_then(Value::as_str)
        .map(str::to_string);
    AppMessage::Utterance { role, text }
}
