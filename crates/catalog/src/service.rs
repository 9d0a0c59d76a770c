use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    futures::{
        FutureExt,
        future::{BoxFuture, Shared},
    },
    talkshop_metrics::{catalog as catalog_metrics, counter},
    tracing::{debug, warn},
};

use crate::{
    decorate::decorate,
    error::{Error, Result},
    query::SearchQuery,
    traits::CatalogSearch,
    types::Product,
};

const ALL_PRODUCTS_KEY: &str = "all";
const CATEGORIES_KEY: &str = "categories";
const MAX_CACHE_ENTRIES: usize = 100;

#[derive(Clone)]
enum Cached {
    Products(Vec<Product>),
    Categories(Vec<String>),
}

struct CacheEntry {
    value: Cached,
    expires_at: Instant,
}

/// In-flight "all products" fetch shared by every concurrent caller.
type SharedFetch = Shared<BoxFuture<'static, std::result::Result<Arc<Vec<Product>>, String>>>;

/// HTTP catalog client with a query-shape keyed TTL cache.
///
/// `all_products` is coalesced: callers arriving while a fetch is running
/// await the same request. Parameterised searches are cached but not
/// coalesced, so identical concurrent searches each hit the network.
pub struct CatalogService {
    client: reqwest::Client,
    base_url: String,
    cache_ttl: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
    all_in_flight: Mutex<Option<SharedFetch>>,
}

impl CatalogService {
    pub fn new(base_url: impl Into<String>, cache_ttl: Duration, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("talkshop/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_ttl,
            cache: Mutex::new(HashMap::new()),
            all_in_flight: Mutex::new(None),
        })
    }

    pub fn from_config(config: &talkshop_config::CatalogConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.cache_ttl_minutes * 60),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Drop every cached entry.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    fn cache_get(&self, key: &str) -> Option<Cached> {
        let cache = self.cache.lock().ok()?;
        let hit = cache
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.value.clone());
        if hit.is_some() {
            counter!(catalog_metrics::CACHE_HITS_TOTAL).increment(1);
        } else {
            counter!(catalog_metrics::CACHE_MISSES_TOTAL).increment(1);
        }
        hit
    }

    fn cache_set(&self, key: String, value: Cached) {
        if self.cache_ttl.is_zero() {
            return;
        }
        if let Ok(mut cache) = self.cache.lock() {
            if cache.len() > MAX_CACHE_ENTRIES {
                let now = Instant::now();
                cache.retain(|_, e| e.expires_at > now);
            }
            cache.insert(key, CacheEntry {
                value,
                expires_at: Instant::now() + self.cache_ttl,
            });
        }
    }

    async fn fetch_products(client: reqwest::Client, url: String) -> Result<Vec<Product>> {
        debug!(%url, "fetching catalog products");
        let mut products: Vec<Product> = client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        products.iter_mut().for_each(decorate);
        Ok(products)
    }

    fn products_url(&self, category: Option<&str>) -> String {
        match category {
            Some(category) => format!(
                "{}/products/category/{}",
                self.base_url,
                urlencoding::encode(category)
            ),
            None => format!("{}/products", self.base_url),
        }
    }

    fn join_or_start_all_fetch(&self) -> Result<SharedFetch> {
        let mut slot = self
            .all_in_flight
            .lock()
            .map_err(|_| Error::message("catalog fetch lock poisoned"))?;
        if let Some(fetch) = slot.as_ref() {
            debug!("joining in-flight catalog fetch");
            return Ok(fetch.clone());
        }
        let client = self.client.clone();
        let url = self.products_url(None);
        let fetch = async move {
            Self::fetch_products(client, url)
                .await
                .map(Arc::new)
                .map_err(|e| e.to_string())
        }
        .boxed()
        .shared();
        *slot = Some(fetch.clone());
        Ok(fetch)
    }

    /// Clear the in-flight slot, unless a newer fetch already replaced the
    /// one this caller awaited.
    fn finish_all_fetch(&self, fetch: &SharedFetch) {
        if let Ok(mut slot) = self.all_in_flight.lock()
            && slot.as_ref().is_some_and(|current| current.ptr_eq(fetch))
        {
            slot.take();
        }
    }
}

#[async_trait]
impl CatalogSearch for CatalogService {
    async fn all_products(&self) -> Result<Vec<Product>> {
        if let Some(Cached::Products(products)) = self.cache_get(ALL_PRODUCTS_KEY) {
            return Ok(products);
        }

        let fetch = self.join_or_start_all_fetch()?;
        let result = fetch.clone().await;

        let outcome = match result {
            Ok(products) => {
                let products = products.as_ref().clone();
                self.cache_set(
                    ALL_PRODUCTS_KEY.to_string(),
                    Cached::Products(products.clone()),
                );
                Ok(products)
            },
            Err(message) => {
                counter!(catalog_metrics::FETCH_ERRORS_TOTAL).increment(1);
                warn!(error = %message, "catalog fetch failed");
                Err(Error::fetch(message))
            },
        };
        self.finish_all_fetch(&fetch);
        outcome
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>> {
        let key = query.cache_key();
        if let Some(Cached::Products(products)) = self.cache_get(&key) {
            debug!(%key, "catalog cache hit");
            return Ok(products);
        }

        let url = self.products_url(query.upstream_category().as_deref());
        let fetched = Self::fetch_products(self.client.clone(), url)
            .await
            .inspect_err(|e| {
                counter!(catalog_metrics::FETCH_ERRORS_TOTAL).increment(1);
                warn!(%key, error = %e, "catalog search failed");
            })?;
        let products = query.apply(fetched);
        debug!(%key, hits = products.len(), "catalog search complete");
        self.cache_set(key, Cached::Products(products.clone()));
        Ok(products)
    }

    async fn categories(&self) -> Result<Vec<String>> {
        if let Some(Cached::Categories(categories)) = self.cache_get(CATEGORIES_KEY) {
            return Ok(categories);
        }
        let url = format!("{}/products/categories", self.base_url);
        let categories: Vec<String> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        self.cache_set(
            CATEGORIES_KEY.to_string(),
            Cached::Categories(categories.clone()),
        );
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CatalogService {
        CatalogService::new(
            "http://127.0.0.1:9",
            Duration::from_secs(60),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn late_waiter_keeps_newer_fetch_in_flight() {
        let service = service();
        let first = service.join_or_start_all_fetch().unwrap();
        assert!(service.join_or_start_all_fetch().unwrap().ptr_eq(&first));
        service.finish_all_fetch(&first);

        let second = service.join_or_start_all_fetch().unwrap();
        assert!(!second.ptr_eq(&first));

        // A waiter on the first fetch finishing now must not clear the second.
        service.finish_all_fetch(&first);
        assert!(service.join_or_start_all_fetch().unwrap().ptr_eq(&second));

        service.finish_all_fetch(&second);
        assert!(service.all_in_flight.lock().unwrap().is_none());
    }
}
