//! Submission of tool calls to the [`Dispatcher`].
//!
//! In [`DispatchMode::Concurrent`] every call runs on its own task and the
//! last one to finish owns the showcase. [`DispatchMode::Sequenced`] feeds a
//! single consumer, so calls apply in arrival order.

use {
    talkshop_protocol::ToolCall,
    tokio::sync::{mpsc, oneshot},
    tracing::warn,
};

use crate::dispatch::{DispatchOutcome, Dispatcher};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    #[default]
    Concurrent,
    Sequenced,
}

impl DispatchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "concurrent" | "last_write_wins" | "last-write-wins" => Some(Self::Concurrent),
            "sequenced" | "sequential" | "queued" => Some(Self::Sequenced),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concurrent => "concurrent",
            Self::Sequenced => "sequenced",
        }
    }
}

type Job = (ToolCall, oneshot::Sender<DispatchOutcome>);

/// Resolves to the call's outcome. Dropping it does not cancel the call.
pub type DispatchTicket = oneshot::Receiver<DispatchOutcome>;

#[derive(Clone)]
pub struct DispatchRunner {
    dispatcher: Dispatcher,
    queue: Option<mpsc::UnboundedSender<Job>>,
}

impl DispatchRunner {
    /// Must be called from within a Tokio runtime when `mode` is sequenced.
    pub fn new(dispatcher: Dispatcher, mode: DispatchMode) -> Self {
        let queue = match mode {
            DispatchMode::Concurrent => None,
            DispatchMode::Sequenced => {
                let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
                let worker = dispatcher.clone();
                tokio::spawn(async move {
                    while let Some((call, reply)) = rx.recv().await {
                        let outcome = worker.dispatch(call).await;
                        let _ = reply.send(outcome);
                    }
                });
                Some(tx)
            },
        };
        Self { dispatcher, queue }
    }

    pub fn mode(&self) -> DispatchMode {
        if self.queue.is_some() {
            DispatchMode::Sequenced
        } else {
            DispatchMode::Concurrent
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn submit(&self, call: ToolCall) -> DispatchTicket {
        let (reply, ticket) = oneshot::channel();
        match &self.queue {
            Some(queue) => {
                if let Err(mpsc::error::SendError((call, _))) = queue.send((call, reply)) {
                    warn!(tool = call.name(), "dispatch queue closed, call dropped");
                }
            },
            None => {
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let outcome = dispatcher.dispatch(call).await;
                    let _ = reply.send(outcome);
                });
            },
        }
        ticket
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use {
        super::*,
        crate::{
            state::ShowcaseState,
            test_support::{DelayedCatalog, dispatcher},
        },
        serde_json::json,
    };

    fn search(text: &str) -> ToolCall {
        ToolCall::from_json("search_products", json!({ "query": text }))
    }

    fn first_grid_id(runner: &DispatchRunner) -> String {
        match runner.dispatcher().view().showcase() {
            ShowcaseState::ProductGrid(grid) => grid.products[0].id.clone(),
            other => panic!("expected grid, got {}", other.kind()),
        }
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(DispatchMode::parse("Sequenced"), Some(DispatchMode::Sequenced));
        assert_eq!(DispatchMode::parse("concurrent"), Some(DispatchMode::Concurrent));
        assert_eq!(DispatchMode::parse("fifo"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_mode_lets_slow_call_win() {
        let (dispatcher, _) = dispatcher(Arc::new(DelayedCatalog {
            delay: Duration::from_millis(200),
        }));
        let runner = DispatchRunner::new(dispatcher, DispatchMode::Concurrent);
        let slow = runner.submit(search("slow"));
        let fast = runner.submit(search("fast"));
        assert_eq!(fast.await.unwrap(), DispatchOutcome::Handled);
        assert_eq!(slow.await.unwrap(), DispatchOutcome::Handled);
        assert_eq!(first_grid_id(&runner), "slow");
    }

    #[tokio::test(start_paused = true)]
    async fn sequenced_mode_applies_in_arrival_order() {
        let (dispatcher, _) = dispatcher(Arc::new(DelayedCatalog {
            delay: Duration::from_millis(200),
        }));
        let runner = DispatchRunner::new(dispatcher, DispatchMode::Sequenced);
        assert_eq!(runner.mode(), DispatchMode::Sequenced);
        let slow = runner.submit(search("slow"));
        let fast = runner.submit(search("fast"));
        assert_eq!(slow.await.unwrap(), DispatchOutcome::Handled);
        assert_eq!(fast.await.unwrap(), DispatchOutcome::Handled);
        assert_eq!(first_grid_id(&runner), "fast");
    }
}
