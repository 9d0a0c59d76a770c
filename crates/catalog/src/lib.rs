//! Product catalog access for the showcase.
//!
//! [`CatalogService`] talks to a Fake-Store-style HTTP API and keeps a
//! TTL cache keyed by query shape; [`StaticCatalog`] serves a fixed product
//! list for offline runs and tests. Both implement [`CatalogSearch`].

pub mod decorate;
pub mod error;
pub mod memory;
pub mod query;
pub mod service;
pub mod traits;
pub mod types;

pub use {
    error::{Error, Result},
    memory::StaticCatalog,
    query::SearchQuery,
    service::CatalogService,
    traits::CatalogSearch,
    types::{Product, Rating},
};

use std::sync::Arc;

/// Build the catalog selected by config.
pub fn from_config(config: &talkshop_config::CatalogConfig) -> Result<Arc<dyn CatalogSearch>> {
    if config.offline {
        tracing::info!("using built-in sample catalog");
        return Ok(Arc::new(StaticCatalog::sample()));
    }
    Ok(Arc::new(CatalogService::from_config(config)?))
}
