use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    talkshop_catalog::{CatalogSearch, Product, SearchQuery},
    talkshop_protocol::ToolCall,
};

use crate::{
    dispatch::{DispatchTimings, Dispatcher, DispatcherConfig, ToolForwarder},
    error::Result,
    state::ViewStore,
    synthesis::SynthesisDefaults,
};

/// Catalog whose every call fails.
pub struct FailingCatalog;

#[async_trait]
impl CatalogSearch for FailingCatalog {
    async fn all_products(&self) -> talkshop_catalog::Result<Vec<Product>> {
        Err(talkshop_catalog::Error::fetch("catalog unavailable"))
    }

    async fn search(&self, _query: &SearchQuery) -> talkshop_catalog::Result<Vec<Product>> {
        Err(talkshop_catalog::Error::fetch("catalog unavailable"))
    }
}

/// Catalog that answers a text query `"slow"` after a delay and anything else
/// immediately, each with one product named after the query.
pub struct DelayedCatalog {
    pub delay: Duration,
}

#[async_trait]
impl CatalogSearch for DelayedCatalog {
    async fn all_products(&self) -> talkshop_catalog::Result<Vec<Product>> {
        Ok(Vec::new())
    }

    async fn search(&self, query: &SearchQuery) -> talkshop_catalog::Result<Vec<Product>> {
        let text = query.query.clone().unwrap_or_default();
        if text == "slow" {
            tokio::time::sleep(self.delay).await;
        }
        Ok(vec![Product {
            id: text.clone(),
            title: text,
            ..Default::default()
        }])
    }
}

/// Records the names of forwarded calls.
#[derive(Default)]
pub struct RecordingForwarder {
    pub calls: Mutex<Vec<ToolCall>>,
}

impl RecordingForwarder {
    pub fn names(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ToolForwarder for RecordingForwarder {
    async fn forward(&self, call: &ToolCall) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }
        Ok(())
    }
}

pub fn dispatcher(catalog: Arc<dyn CatalogSearch>) -> (Dispatcher, Arc<RecordingForwarder>) {
    let forwarder = Arc::new(RecordingForwarder::default());
    let dispatcher = Dispatcher::new(
        catalog,
        forwarder.clone(),
        ViewStore::new(),
        DispatcherConfig {
            timings: DispatchTimings::default(),
            defaults: SynthesisDefaults::default(),
        },
    );
    (dispatcher, forwarder)
}
