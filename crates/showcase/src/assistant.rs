//! The in-app assistant: one conversation's normalizer, dispatcher, shop
//! session and view, wired together.

use std::{sync::Arc, time::Duration};

use {
    serde_json::Value,
    talkshop_catalog::CatalogSearch,
    talkshop_config::ShowcaseConfig,
    tracing::{debug, warn},
};

use crate::{
    dispatch::{Dispatcher, DispatcherConfig},
    normalize::{AppMessage, Normalizer},
    queue::{DispatchMode, DispatchRunner, DispatchTicket},
    session::ShopSession,
    state::ViewStore,
};

/// What became of one inbound message.
#[derive(Debug)]
pub struct Received {
    pub message: AppMessage,
    /// Present when the message carried a dispatchable tool call.
    pub ticket: Option<DispatchTicket>,
}

pub struct Assistant {
    view: ViewStore,
    session: Arc<ShopSession>,
    normalizer: Normalizer,
    runner: DispatchRunner,
}

impl Assistant {
    /// Must be called from within a Tokio runtime.
    pub fn new(catalog: Arc<dyn CatalogSearch>, config: &ShowcaseConfig) -> Self {
        let view = ViewStore::new();
        let session = Arc::new(ShopSession::new(Arc::clone(&catalog), view.clone()));
        let dispatcher = Dispatcher::new(
            catalog,
            session.clone(),
            view.clone(),
            DispatcherConfig::from_showcase(config),
        );
        let normalizer = Normalizer::new(
            dispatcher.gate().clone(),
            Duration::from_millis(config.perception_throttle_ms),
        );
        let mode = DispatchMode::parse(&config.dispatch_mode).unwrap_or_else(|| {
            warn!(value = %config.dispatch_mode, "unknown dispatch_mode, using concurrent");
            DispatchMode::Concurrent
        });
        Self {
            view,
            session,
            normalizer,
            runner: DispatchRunner::new(dispatcher, mode),
        }
    }

    pub fn view(&self) -> &ViewStore {
        &self.view
    }

    pub fn session(&self) -> &ShopSession {
        &self.session
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.runner.dispatcher()
    }

    pub fn mode(&self) -> DispatchMode {
        self.runner.mode()
    }

    /// Classify a data-channel or relay message and act on it.
    pub fn handle_message(&self, message: &Value) -> Received {
        let message = self.normalizer.classify(message);
        let ticket = match &message {
            AppMessage::ToolCall(call) => Some(self.runner.submit(call.clone())),
            AppMessage::Utterance { role, text } => {
                debug!(role = role.as_deref().unwrap_or("-"), "utterance");
                let text = text.clone();
                self.view.update(|state| state.last_utterance = Some(text));
                None
            },
            AppMessage::ReplicaSpeaking(speaking) => {
                let speaking = *speaking;
                self.view
                    .update(|state| state.replica_speaking = speaking);
                None
            },
            AppMessage::Staged | AppMessage::RelayControl | AppMessage::Dropped(_) => None,
        };
        Received { message, ticket }
    }

    /// "Analyze" on the style card.
    pub fn confirm_style(&self) -> Option<DispatchTicket> {
        let call = self.dispatcher().gate().analyze()?;
        Some(self.runner.submit(call))
    }

    /// "Dismiss" on the style card.
    pub fn dismiss_style(&self) -> bool {
        self.dispatcher().dismiss_style()
    }
}
