use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    dashmap::DashMap,
    talkshop_metrics::{counter, gauge, relay as relay_metrics},
    tokio::sync::mpsc,
    tracing::debug,
};

/// Relay behaviour knobs, taken from `[relay]` in the config.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub keepalive: Duration,
    pub execute_tools: bool,
    pub behind_proxy: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from_config(&talkshop_config::RelayConfig::default())
    }
}

impl RelaySettings {
    pub fn from_config(config: &talkshop_config::RelayConfig) -> Self {
        Self {
            keepalive: Duration::from_secs(config.keepalive_secs.max(1)),
            execute_tools: config.execute_tools,
            behind_proxy: config.behind_proxy,
        }
    }
}

struct StreamSender {
    id: u64,
    sender: mpsc::UnboundedSender<String>,
}

/// Open event streams, keyed by conversation id.
///
/// Each stream owns one unbounded channel; frames published for a
/// conversation reach its streams in publish order.
pub struct RelayState {
    streams: DashMap<String, Vec<StreamSender>>,
    next_stream_id: AtomicU64,
    pub settings: RelaySettings,
}

impl RelayState {
    pub fn new(settings: RelaySettings) -> Arc<Self> {
        Arc::new(Self {
            streams: DashMap::new(),
            next_stream_id: AtomicU64::new(1),
            settings,
        })
    }

    /// Open a stream for `conversation_id`. The stream is unregistered when
    /// the returned [`Subscription`] is dropped.
    pub fn subscribe(self: &Arc<Self>, conversation_id: &str) -> Subscription {
        let id = self.next_stream_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.streams
            .entry(conversation_id.to_string())
            .or_default()
            .push(StreamSender { id, sender });
        counter!(relay_metrics::STREAMS_OPENED_TOTAL).increment(1);
        self.record_active();
        debug!(conversation_id, stream_id = id, "event stream opened");
        Subscription {
            id,
            conversation_id: conversation_id.to_string(),
            receiver,
            state: Arc::clone(self),
        }
    }

    /// Send a serialized frame to every stream of a conversation. Returns the
    /// number of streams that accepted it.
    pub fn publish(&self, conversation_id: &str, frame: &str) -> usize {
        let Some(mut senders) = self.streams.get_mut(conversation_id) else {
            counter!(relay_metrics::EVENTS_UNROUTED_TOTAL).increment(1);
            debug!(conversation_id, "no open stream for conversation");
            return 0;
        };
        senders.retain(|s| s.sender.send(frame.to_string()).is_ok());
        let delivered = senders.len();
        drop(senders);
        self.streams.remove_if(conversation_id, |_, s| s.is_empty());
        counter!(relay_metrics::EVENTS_DELIVERED_TOTAL).increment(delivered as u64);
        self.record_active();
        delivered
    }

    /// Drop every stream of a conversation, ending them. Returns how many
    /// were open.
    pub fn close_conversation(&self, conversation_id: &str) -> usize {
        let closed = self
            .streams
            .remove(conversation_id)
            .map(|(_, senders)| senders.len())
            .unwrap_or(0);
        self.record_active();
        closed
    }

    /// End every stream. Used on shutdown.
    pub fn close_all(&self) -> usize {
        let closed = self.active_connections();
        self.streams.clear();
        self.record_active();
        closed
    }

    pub fn active_connections(&self) -> usize {
        self.streams.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn conversation_count(&self) -> usize {
        self.streams.len()
    }

    fn unregister(&self, conversation_id: &str, id: u64) {
        if let Some(mut senders) = self.streams.get_mut(conversation_id) {
            senders.retain(|s| s.id != id);
        }
        self.streams.remove_if(conversation_id, |_, s| s.is_empty());
        self.record_active();
        debug!(conversation_id, stream_id = id, "event stream closed");
    }

    fn record_active(&self) {
        gauge!(relay_metrics::STREAMS_ACTIVE).set(self.active_connections() as f64);
    }
}

/// Receiving end of one event stream.
pub struct Subscription {
    id: u64,
    conversation_id: String,
    receiver: mpsc::UnboundedReceiver<String>,
    state: Arc<RelayState>,
}

impl Subscription {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Next frame, or `None` once the relay closed this stream.
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.state.unregister(&self.conversation_id, self.id);
    }
}
