//! `POST /tavus-webhook`: provider events in, relay frames out.

use {
    axum::{
        body::Bytes,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json, Response},
    },
    serde::Serialize,
    serde_json::{Value, json},
    talkshop_metrics::{counter, labels, relay as relay_metrics},
    talkshop_protocol::{
        RelayFrame, ToolCall, ToolCallProperties, ToolName, WebhookEnvelope, event_types,
    },
    tracing::{debug, info, warn},
};

use crate::{events::frame_json, server::AppState, state::RelayState};

/// Result of the mock tool executor reported back to the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolExecution {
    pub success: bool,
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Acknowledge a tool call on behalf of the browser. Known tools succeed with
/// a short description; unknown tools get a typed failure.
pub fn execute_tool(call: &ToolCall) -> ToolExecution {
    let tool = call.tool();
    let product = || call.id_arg("product_id").unwrap_or_else(|| "product".into());
    let message = match &tool {
        ToolName::Other(name) => {
            return ToolExecution {
                success: false,
                tool: name.clone(),
                message: None,
                error: Some(format!("unknown tool: {name}")),
            };
        },
        ToolName::AddToCart => {
            let quantity = call.f64_arg("quantity").unwrap_or(1.0).max(1.0);
            format!("added {quantity} x {} to cart", product())
        },
        ToolName::ProactivelyAddToCart => format!("added {} to cart", product()),
        ToolName::ShowProduct => format!("showing {}", product()),
        ToolName::Show360View => format!("opening 360 view of {}", product()),
        ToolName::HighlightOffer => format!("offer highlighted on {}", product()),
        ToolName::CompareProducts => format!(
            "comparing {} products",
            call.list_arg("product_ids").len()
        ),
        ToolName::SearchProducts => match call.str_arg("query") {
            Some(query) => format!("searching for {query}"),
            None => "searching catalog".to_string(),
        },
        ToolName::InitiateCheckout => "checkout started".to_string(),
        ToolName::DetectedUserStyle => "style detection staged".to_string(),
        known => format!("{known} acknowledged"),
    };
    ToolExecution {
        success: true,
        tool: tool.as_str().to_string(),
        message: Some(message),
        error: None,
    }
}

/// What the relay did with one envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookOutcome {
    pub event_type: String,
    pub delivered: usize,
    pub execution: Option<ToolExecution>,
}

/// Route one envelope. Tool calls are reshaped into the canonical frame;
/// everything else, including tool calls whose arguments do not parse, is
/// republished verbatim. A shutdown event is forwarded before the
/// conversation's streams are closed.
pub fn process_envelope(relay: &RelayState, raw: &Value) -> Result<WebhookOutcome, String> {
    if !raw.is_object() {
        return Err("webhook body must be a JSON object".to_string());
    }
    let envelope: WebhookEnvelope =
        serde_json::from_value(raw.clone()).map_err(|e| format!("invalid envelope: {e}"))?;
    let event_type = envelope.kind().unwrap_or("unknown").to_string();
    counter!(relay_metrics::WEBHOOKS_TOTAL, labels::EVENT_TYPE => event_type.clone()).increment(1);

    let Some(conversation_id) = envelope.conversation_id.as_deref() else {
        warn!(%event_type, "webhook without conversation_id, nothing to route");
        counter!(relay_metrics::EVENTS_UNROUTED_TOTAL).increment(1);
        return Ok(WebhookOutcome {
            event_type,
            delivered: 0,
            execution: None,
        });
    };

    let mut execution = None;
    let delivered = match event_type.as_str() {
        event_types::TOOL_CALL => match tool_call_of(&envelope) {
            Some(call) => {
                info!(conversation_id, tool = call.name(), "relaying tool call");
                if relay.settings.execute_tools {
                    execution = Some(execute_tool(&call));
                }
                let frame = frame_json(&RelayFrame::ToolCall {
                    conversation_id: conversation_id.to_string(),
                    tool_call: call,
                });
                relay.publish(conversation_id, &frame)
            },
            None => relay.publish(conversation_id, &raw.to_string()),
        },
        event_types::SHUTDOWN => {
            let delivered = relay.publish(conversation_id, &raw.to_string());
            let closed = relay.close_conversation(conversation_id);
            info!(conversation_id, closed, "conversation shut down");
            delivered
        },
        _ => {
            debug!(conversation_id, %event_type, "relaying event verbatim");
            relay.publish(conversation_id, &raw.to_string())
        },
    };

    Ok(WebhookOutcome {
        event_type,
        delivered,
        execution,
    })
}

fn tool_call_of(envelope: &WebhookEnvelope) -> Option<ToolCall> {
    let properties = envelope.properties.clone()?;
    let properties: ToolCallProperties = match serde_json::from_value(properties) {
        Ok(properties) => properties,
        Err(error) => {
            warn!(%error, "tool call webhook with unreadable properties");
            return None;
        },
    };
    let name = properties.name.clone();
    match properties.into_tool_call() {
        Ok(call) => Some(call),
        Err(error) => {
            warn!(tool = %name, %error, "tool call arguments did not parse, relaying raw envelope");
            None
        },
    }
}

pub async fn webhook_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(error) => return bad_request(format!("invalid JSON: {error}")),
    };
    match process_envelope(&state.relay, &raw) {
        Ok(outcome) => {
            let mut body = json!({
                "success": true,
                "event_type": outcome.event_type,
                "delivered": outcome.delivered,
            });
            if let Some(execution) = outcome.execution {
                body["result"] = json!(execution);
            }
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(error) => bad_request(error),
    }
}

fn bad_request(error: String) -> Response {
    warn!(%error, "rejected webhook");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": error })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::state::{RelaySettings, RelayState},
    };

    fn tool_call_envelope(arguments: Value) -> Value {
        json!({
            "event_type": "conversation.tool_call",
            "conversation_id": "c1",
            "properties": {"name": "add_to_cart", "arguments": arguments}
        })
    }

    #[tokio::test]
    async fn tool_call_is_reshaped() {
        let relay = RelayState::new(RelaySettings::default());
        let mut stream = relay.subscribe("c1");
        let envelope = tool_call_envelope(json!("{\"product_id\":\"7\"}"));
        let outcome = process_envelope(&relay, &envelope).unwrap();
        assert_eq!(outcome.delivered, 1);
        assert!(outcome.execution.unwrap().success);

        let frame: Value = serde_json::from_str(&stream.recv().await.unwrap()).unwrap();
        assert_eq!(
            frame,
            json!({
                "type": "conversation-toolcall",
                "conversation_id": "c1",
                "tool_call": {"function": {"name": "add_to_cart", "arguments": {"product_id": "7"}}}
            })
        );
    }

    #[tokio::test]
    async fn unparsable_arguments_are_relayed_raw() {
        let relay = RelayState::new(RelaySettings::default());
        let mut stream = relay.subscribe("c1");
        let envelope = tool_call_envelope(json!("{broken"));
        let outcome = process_envelope(&relay, &envelope).unwrap();
        assert!(outcome.execution.is_none());
        let frame: Value = serde_json::from_str(&stream.recv().await.unwrap()).unwrap();
        assert_eq!(frame, envelope);
    }

    #[tokio::test]
    async fn other_events_are_verbatim_and_shutdown_closes() {
        let relay = RelayState::new(RelaySettings::default());
        let mut stream = relay.subscribe("c1");
        let utterance = json!({
            "event_type": "application.transcription_ready",
            "conversation_id": "c1",
            "properties": {"transcript": []}
        });
        process_envelope(&relay, &utterance).unwrap();
        let shutdown = json!({"event_type": "system.shutdown", "conversation_id": "c1"});
        assert_eq!(process_envelope(&relay, &shutdown).unwrap().delivered, 1);

        let first: Value = serde_json::from_str(&stream.recv().await.unwrap()).unwrap();
        assert_eq!(first, utterance);
        let second: Value = serde_json::from_str(&stream.recv().await.unwrap()).unwrap();
        assert_eq!(second, shutdown);
        assert_eq!(stream.recv().await, None);
        assert_eq!(relay.active_connections(), 0);
    }

    #[test]
    fn missing_conversation_is_not_an_error() {
        let relay = RelayState::new(RelaySettings::default());
        let envelope = json!({"event_type": "conversation.tool_call"});
        let outcome = process_envelope(&relay, &envelope).unwrap();
        assert_eq!(outcome.delivered, 0);
        assert!(process_envelope(&relay, &json!([1])).is_err());
    }

    #[test]
    fn unknown_tool_fails_typed() {
        let execution = execute_tool(&ToolCall::from_json("teleport", json!({})));
        assert!(!execution.success);
        assert_eq!(execution.error.as_deref(), Some("unknown tool: teleport"));

        let execution = execute_tool(&ToolCall::from_json(
            "add_to_cart",
            json!({"product_id": 4, "quantity": 2}),
        ));
        assert_eq!(execution.message.as_deref(), Some("added 2 x 4 to cart"));
    }
}
