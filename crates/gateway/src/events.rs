//! `GET /events/{conversation_id}`: the browser's server-sent event stream.

use std::convert::Infallible;

use {
    axum::{
        extract::{Path, State},
        response::sse::{Event, Sse},
    },
    futures::Stream,
    talkshop_protocol::RelayFrame,
    tokio::time::{Instant, MissedTickBehavior, interval_at},
    tracing::info,
};

use crate::server::AppState;

/// Serialize a relay-originated frame.
pub fn frame_json(frame: &RelayFrame) -> String {
    serde_json::to_string(frame).unwrap_or_else(|_| "{}".to_string())
}

/// Emits a `connected` frame, then every frame published for the
/// conversation, with a `ping` frame each keep-alive interval. The stream ends
/// when the relay closes the conversation.
pub async fn events_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.relay.subscribe(&conversation_id);
    let keepalive = state.relay.settings.keepalive;
    info!(%conversation_id, "client subscribed");

    let connected = frame_json(&RelayFrame::Connected { conversation_id });
    let ping = frame_json(&RelayFrame::Ping);

    let stream = async_stream::stream! {
        yield Ok(Event::default().data(connected));

        let mut ticker = interval_at(Instant::now() + keepalive, keepalive);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let next = tokio::select! {
                frame = subscription.recv() => frame,
                _ = ticker.tick() => Some(ping.clone()),
            };
            match next {
                Some(data) => yield Ok(Event::default().data(data)),
                None => {
                    info!(
                        conversation_id = subscription.conversation_id(),
                        "event stream closed by relay"
                    );
                    break;
                },
            }
        }
    };

    Sse::new(stream)
}

#[cfg(test)]
mod tests {
    use {super::*, talkshop_protocol::ToolCall};

    #[test]
    fn frames_serialize_with_type_tag() {
        assert_eq!(frame_json(&RelayFrame::Ping), r#"{"type":"ping"}"#);
        let frame = frame_json(&RelayFrame::ToolCall {
            conversation_id: "c1".into(),
            tool_call: ToolCall::new("show_categories", Default::default()),
        });
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "conversation-toolcall");
        assert_eq!(value["tool_call"]["function"]["name"], "show_categories");
    }
}
