//! The relay served over a real socket.

use std::{collections::VecDeque, net::SocketAddr, pin::Pin, sync::Arc, time::Duration};

use {
    axum::body::Bytes,
    futures::{Stream, StreamExt},
    serde_json::{Value, json},
    talkshop_catalog::StaticCatalog,
    talkshop_config::{RelayConfig, ShowcaseConfig, TalkShopConfig},
    talkshop_gateway::{AppState, build_relay_app},
    talkshop_showcase::{Assistant, RelaySubscriber, ShowcaseState, SseParser},
    tokio::time::timeout,
};

const WAIT: Duration = Duration::from_secs(5);

async fn spawn_relay(relay: RelayConfig) -> (String, AppState) {
    let config = TalkShopConfig {
        relay,
        ..Default::default()
    };
    let state = AppState::from_config(&config, None);
    let app = build_relay_app(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (format!("http://{addr}"), state)
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

struct EventStream {
    bytes: ByteStream,
    parser: SseParser,
    pending: VecDeque<String>,
}

async fn open_events(base: &str, conversation_id: &str) -> EventStream {
    let response = reqwest::get(format!("{base}/events/{conversation_id}"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
    EventStream {
        bytes: Box::pin(response.bytes_stream()),
        parser: SseParser::new(),
        pending: VecDeque::new(),
    }
}

impl EventStream {
    /// Next data payload, or `None` once the relay ends the stream.
    async fn next(&mut self) -> Option<Value> {
        loop {
            if let Some(payload) = self.pending.pop_front() {
                return Some(serde_json::from_str(&payload).unwrap());
            }
            let chunk = timeout(WAIT, self.bytes.next())
                .await
                .expect("timed out waiting for an event")?;
            self.pending.extend(self.parser.feed(&chunk.unwrap()));
        }
    }

    /// Payload arriving within `window`, if any.
    async fn next_within(&mut self, window: Duration) -> Option<Value> {
        timeout(window, self.next()).await.ok().flatten()
    }
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

async fn active_connections(base: &str) -> u64 {
    let health: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    health["active_connections"].as_u64().unwrap()
}

async fn wait_for_connections(base: &str, expected: u64) {
    timeout(WAIT, async {
        while active_connections(base).await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection count never settled");
}

#[tokio::test]
async fn tool_call_webhook_reaches_the_subscriber() {
    let (base, _) = spawn_relay(RelayConfig::default()).await;
    let mut events = open_events(&base, "conv-1").await;
    assert_eq!(
        events.next().await,
        Some(json!({"type": "connected", "conversation_id": "conv-1"}))
    );
    assert_eq!(active_connections(&base).await, 1);

    let (status, body) = post(&base, "/tavus-webhook", json!({
        "event_type": "conversation.tool_call",
        "conversation_id": "conv-1",
        "properties": {
            "name": "search_products",
            "arguments": "{\"query\":\"blazer\",\"max_price\":150}"
        }
    }))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["delivered"], 1);
    assert_eq!(body["result"]["success"], true);

    assert_eq!(
        events.next().await,
        Some(json!({
            "type": "conversation-toolcall",
            "conversation_id": "conv-1",
            "tool_call": {"function": {
                "name": "search_products",
                "arguments": {"query": "blazer", "max_price": 150}
            }}
        }))
    );
    // Exactly one frame per webhook; a keep-alive is the only thing allowed
    // to follow.
    if let Some(extra) = events.next_within(Duration::from_millis(300)).await {
        assert_eq!(extra, json!({"type": "ping"}));
    }
}

#[tokio::test]
async fn events_are_scoped_to_their_conversation() {
    let (base, _) = spawn_relay(RelayConfig::default()).await;
    let mut first = open_events(&base, "a").await;
    let mut second = open_events(&base, "b").await;
    first.next().await;
    second.next().await;
    assert_eq!(active_connections(&base).await, 2);

    let utterance = json!({
        "event_type": "application.transcription_ready",
        "conversation_id": "b",
        "properties": {"replica_id": "r1"}
    });
    let (_, body) = post(&base, "/tavus-webhook", utterance.clone()).await;
    assert_eq!(body["delivered"], 1);
    assert_eq!(second.next().await, Some(utterance));

    let (_, body) = post(&base, "/tavus-webhook", json!({
        "event_type": "system.shutdown",
        "conversation_id": "a"
    }))
    .await;
    assert_eq!(body["delivered"], 1);
    assert_eq!(first.next().await.unwrap()["event_type"], "system.shutdown");
    assert_eq!(first.next().await, None);
    wait_for_connections(&base, 1).await;
}

#[tokio::test]
async fn unknown_tool_is_acknowledged_with_a_failure() {
    let (base, _) = spawn_relay(RelayConfig::default()).await;
    let (status, body) = post(&base, "/tavus-webhook", json!({
        "event_type": "conversation.tool_call",
        "conversation_id": "nobody-listening",
        "properties": {"name": "teleport", "arguments": {}}
    }))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["delivered"], 0);
    assert_eq!(body["result"]["success"], false);
    assert_eq!(body["result"]["tool"], "teleport");
}

#[tokio::test]
async fn webhook_path_may_carry_a_prefix() {
    let (base, state) = spawn_relay(RelayConfig {
        execute_tools: false,
        ..Default::default()
    })
    .await;
    let mut events = open_events(&base, "c").await;
    events.next().await;

    let (status, body) = post(&base, "/api/relay/tavus-webhook", json!({
        "event_type": "conversation.tool_call",
        "conversation_id": "c",
        "properties": {"name": "show_categories", "arguments": "{}"}
    }))
    .await;
    assert_eq!(status, 200);
    assert!(body.get("result").is_none());
    assert_eq!(
        events.next().await.unwrap()["tool_call"]["function"]["name"],
        "show_categories"
    );
    assert_eq!(state.relay.conversation_count(), 1);

    let (status, _) = post(&base, "/api/elsewhere", json!({})).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (base, _) = spawn_relay(RelayConfig::default()).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/tavus-webhook"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn throttle_answers_429_with_retry_after() {
    let (base, _) = spawn_relay(RelayConfig {
        throttle_per_minute: 2,
        ..Default::default()
    })
    .await;
    let envelope = json!({"event_type": "system.heartbeat", "conversation_id": "x"});
    for _ in 0..2 {
        assert_eq!(post(&base, "/tavus-webhook", envelope.clone()).await.0, 200);
    }
    let response = reqwest::Client::new()
        .post(format!("{base}/tavus-webhook"))
        .json(&envelope)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
    assert!(response.headers().contains_key("retry-after"));

    // Health is never throttled.
    for _ in 0..3 {
        active_connections(&base).await;
    }
}

#[tokio::test]
async fn assistant_follows_the_relay() {
    let (base, _) = spawn_relay(RelayConfig::default()).await;
    let assistant = Arc::new(Assistant::new(
        Arc::new(StaticCatalog::sample()),
        &ShowcaseConfig::default(),
    ));
    let mut view = assistant.view().subscribe();

    let listener = {
        let assistant = Arc::clone(&assistant);
        let subscriber = RelaySubscriber::new(&base, "live");
        tokio::spawn(async move {
            subscriber
                .run(|event| {
                    assistant.handle_message(&event);
                })
                .await
        })
    };
    wait_for_connections(&base, 1).await;

    post(&base, "/tavus-webhook", json!({
        "event_type": "conversation.tool_call",
        "conversation_id": "live",
        "properties": {"name": "search_products", "arguments": "{\"query\":\"blazer\"}"}
    }))
    .await;

    let state = timeout(
        WAIT,
        view.wait_for(|state| matches!(state.showcase, ShowcaseState::ProductGrid(_))),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    match state.showcase {
        ShowcaseState::ProductGrid(grid) => {
            assert_eq!(grid.title, "Results for \"blazer\"");
            assert!(grid.products.iter().any(|p| p.id == "2"));
        },
        other => panic!("expected grid, got {}", other.kind()),
    }

    post(&base, "/tavus-webhook", json!({
        "event_type": "system.shutdown",
        "conversation_id": "live"
    }))
    .await;
    let delivered = timeout(WAIT, listener).await.unwrap().unwrap().unwrap();
    // connected, the tool call and the shutdown envelope
    assert_eq!(delivered, 3);
}
