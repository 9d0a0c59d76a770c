//! Client side of the relay's event stream.

use {
    futures::StreamExt,
    serde_json::Value,
    tracing::{debug, info, warn},
};

use crate::error::{Error, Result};

/// Incremental `text/event-stream` parser. Only `data:` fields matter here;
/// comments and other fields are skipped.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    data: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the payload of every event completed by them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        events
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let rest = String::from_utf8_lossy(&rest).into_owned();
            let mut events = Vec::new();
            self.line(rest.trim_end_matches('\r'), &mut events);
        }
        (!self.data.is_empty()).then(|| std::mem::take(&mut self.data))
    }

    fn line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                events.push(std::mem::take(&mut self.data));
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
}

/// Subscribes to `GET {relay}/events/{conversation_id}`.
pub struct RelaySubscriber {
    client: reqwest::Client,
    url: String,
}

impl RelaySubscriber {
    pub fn new(relay_url: &str, conversation_id: &str) -> Self {
        Self::with_client(reqwest::Client::new(), relay_url, conversation_id)
    }

    pub fn with_client(client: reqwest::Client, relay_url: &str, conversation_id: &str) -> Self {
        let url = format!(
            "{}/events/{}",
            relay_url.trim_end_matches('/'),
            urlencoding::encode(conversation_id)
        );
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Read the stream until the relay closes it, handing every JSON payload
    /// to `on_event`. Returns the number of payloads delivered. Connection
    /// failures are returned, not retried.
    pub async fn run<F>(&self, mut on_event: F) -> Result<usize>
    where
        F: FnMut(Value) + Send,
    {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;
        if !is_event_stream(&response) {
            return Err(Error::message(format!(
                "{} did not answer with an event stream",
                self.url
            )));
        }
        info!(url = %self.url, "subscribed to relay");

        let mut parser = SseParser::new();
        let mut delivered = 0usize;
        let mut deliver = |payload: String| match serde_json::from_str::<Value>(&payload) {
            Ok(value) => {
                delivered += 1;
                on_event(value);
            },
            Err(error) => warn!(%error, "skipping non-JSON relay event"),
        };

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            for payload in parser.feed(&chunk?) {
                deliver(payload);
            }
        }
        if let Some(payload) = parser.finish() {
            deliver(payload);
        }
        debug!(url = %self.url, delivered, "relay stream ended");
        Ok(delivered)
    }
}

fn is_event_stream(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            ct.split(';')
                .next()
                .is_some_and(|base| base.trim() == "text/event-stream")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_handles_split_chunks_and_comments() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b": keep-alive\n\ndata: {\"type\":").is_empty());
        let events = parser.feed(b"\"ping\"}\r\n\r\ndata: a\ndata: b\n\n");
        assert_eq!(events, vec!["{\"type\":\"ping\"}", "a\nb"]);
        assert!(parser.finish().is_none());
    }

    #[test]
    fn parser_flushes_unterminated_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: message\ndata: last").is_empty());
        assert_eq!(parser.finish().as_deref(), Some("last"));
    }

    #[test]
    fn url_encodes_conversation_id() {
        let subscriber = RelaySubscriber::new("http://relay.local/", "conv 1");
        assert_eq!(subscriber.url(), "http://relay.local/events/conv%201");
    }

    #[tokio::test]
    async fn run_delivers_json_payloads() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/events/c1")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(
                "data: {\"type\":\"connected\",\"conversation_id\":\"c1\"}\n\n\
                 data: not json\n\n\
                 data: {\"type\":\"ping\"}\n\n",
            )
            .create_async()
            .await;

        let mut seen = Vec::new();
        let delivered = RelaySubscriber::new(&server.url(), "c1")
            .run(|value| seen.push(value["type"].as_str().unwrap_or_default().to_string()))
            .await
            .unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(seen, vec!["connected", "ping"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn run_rejects_non_stream_responses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/events/c1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;
        assert!(RelaySubscriber::new(&server.url(), "c1").run(|_| {}).await.is_err());

        let missing = RelaySubscriber::new(&server.url(), "c2").run(|_| {}).await;
        assert!(missing.is_err());
    }
}
