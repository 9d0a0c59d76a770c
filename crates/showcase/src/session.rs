//! The shop session: the parent collaborator behind [`ToolForwarder`].
//!
//! Owns the cart and the offers the host made, and handles the tools the
//! dispatcher forwards: cart mutation, spotlight, comparison, offers,
//! checkout and the 360° viewer. Session memory only.

use std::sync::{Arc, Mutex};

use {
    async_trait::async_trait,
    serde_json::Value,
    talkshop_catalog::{CatalogSearch, Product, SearchQuery},
    talkshop_protocol::{ToolCall, ToolName},
    tracing::{debug, info, warn},
};

use crate::{
    cart::{Cart, CheckoutSummary},
    dispatch::ToolForwarder,
    error::{Error, Result},
    state::{Comparison, Offer, ShowcaseState, Spotlight, ViewStore},
};

pub struct ShopSession {
    catalog: Arc<dyn CatalogSearch>,
    view: ViewStore,
    cart: Mutex<Cart>,
    offers: Mutex<Vec<Offer>>,
}

impl ShopSession {
    pub fn new(catalog: Arc<dyn CatalogSearch>, view: ViewStore) -> Self {
        Self {
            catalog,
            view,
            cart: Mutex::new(Cart::new()),
            offers: Mutex::new(Vec::new()),
        }
    }

    pub fn cart(&self) -> Cart {
        self.cart.lock().map(|cart| cart.clone()).unwrap_or_default()
    }

    pub fn offers(&self) -> Vec<Offer> {
        self.offers
            .lock()
            .map(|offers| offers.clone())
            .unwrap_or_default()
    }

    /// Add a product by id; returns the line's new quantity.
    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) -> Result<u32> {
        let product = self.resolve(Some(product_id), None).await?;
        self.add_product(product, quantity)
    }

    pub fn remove_from_cart(&self, product_id: &str) -> Result<bool> {
        let removed = self.with_cart(|cart| cart.remove(product_id).is_some())?;
        Ok(removed)
    }

    pub fn set_quantity(&self, product_id: &str, quantity: u32) -> Result<bool> {
        self.with_cart(|cart| cart.set_quantity(product_id, quantity))
    }

    pub fn checkout(&self) -> Result<CheckoutSummary> {
        let offers = self.offers();
        let summary = self.with_cart(|cart| cart.summary(&offers))?;
        if summary.items.is_empty() {
            return Err(Error::message("cannot check out an empty cart"));
        }
        info!(
            items = summary.item_count,
            total = summary.total,
            "checkout initiated"
        );
        let shown = summary.clone();
        self.view.update(|state| state.checkout = Some(shown));
        Ok(summary)
    }

    fn add_product(&self, product: Product, quantity: u32) -> Result<u32> {
        let id = product.id.clone();
        let line = self.with_cart(|cart| cart.add(product, quantity))?;
        info!(product_id = %id, quantity = line, "added to cart");
        Ok(line)
    }

    /// Run `f` on the cart and publish the new item count.
    fn with_cart<T>(&self, f: impl FnOnce(&mut Cart) -> T) -> Result<T> {
        let (result, count) = {
            let mut cart = self
                .cart
                .lock()
                .map_err(|_| Error::message("cart lock poisoned"))?;
            let result = f(&mut cart);
            (result, cart.count())
        };
        self.view.update(|state| state.cart_count = count);
        Ok(result)
    }

    /// Find a product on screen, in the catalog by id, or by name.
    async fn resolve(&self, id: Option<&str>, name: Option<&str>) -> Result<Product> {
        if let Some(id) = id {
            if let Some(product) = self.view.displayed_product(id) {
                return Ok(product);
            }
            if let Some(product) = self.catalog.product(id).await? {
                return Ok(product);
            }
        }
        if let Some(name) = name {
            let hits = self
                .catalog
                .search(&SearchQuery::text(name).with_limit(1))
                .await?;
            if let Some(product) = hits.into_iter().next() {
                return Ok(product);
            }
        }
        Err(Error::product_not_found(id.or(name).unwrap_or("<none>")))
    }

    async fn show_product(&self, call: &ToolCall) -> Result<()> {
        let id = call.id_arg("product_id");
        let product = self.resolve(id.as_deref(), call.str_arg("product_name")).await?;
        let mut highlight_features = call.list_arg("highlight_features");
        if highlight_features.is_empty() {
            highlight_features = product.features.clone();
        }
        let offer = self
            .offers()
            .into_iter()
            .find(|o| o.product_id == product.id);
        self.view.set_showcase(ShowcaseState::Spotlight(Spotlight {
            product,
            highlight_features,
            offer,
        }));
        Ok(())
    }

    async fn compare_products(&self, call: &ToolCall) -> Result<()> {
        let ids = call.list_arg("product_ids");
        let mut products = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.resolve(Some(id), None).await {
                Ok(product) => products.push(product),
                Err(Error::ProductNotFound { .. }) => warn!(product_id = %id, "compare: product not found"),
                Err(error) => return Err(error),
            }
        }
        if products.len() < 2 {
            return Err(Error::message(format!(
                "comparison needs two known products, got {} of {:?}",
                products.len(),
                ids
            )));
        }
        self.view.set_showcase(ShowcaseState::Comparison(Comparison {
            products,
            aspect: call.str_arg("comparison_aspect").map(str::to_string),
        }));
        Ok(())
    }

    fn highlight_offer(&self, call: &ToolCall) -> Result<()> {
        let product_id = call
            .id_arg("product_id")
            .ok_or_else(|| Error::missing_argument(call.name(), "product_id"))?;
        let discount_percent = call
            .f64_arg("discount_percent")
            .ok_or_else(|| Error::missing_argument(call.name(), "discount_percent"))?;
        let offer = Offer {
            product_id: product_id.clone(),
            discount_percent: discount_percent.clamp(0.0, 100.0),
            message: call.str_arg("message").map(str::to_string),
        };

        {
            let mut offers = self
                .offers
                .lock()
                .map_err(|_| Error::message("offers lock poisoned"))?;
            offers.retain(|o| o.product_id != product_id);
            offers.push(offer.clone());
        }
        info!(%product_id, discount_percent, "offer recorded");

        self.view.update(|state| {
            if let ShowcaseState::Spotlight(spot) = &mut state.showcase
                && spot.product.id == product_id
            {
                spot.offer = Some(offer);
            }
        });
        Ok(())
    }

    async fn initiate_checkout(&self, call: &ToolCall) -> Result<()> {
        if self.cart().is_empty()
            && let Some(Value::Array(items)) = call.arguments().get("cart_items")
        {
            // Resolve every item before touching the cart so a missing
            // product leaves it unchanged.
            let mut lines = Vec::with_capacity(items.len());
            for item in items {
                let (id, quantity) = match item {
                    Value::Object(map) => (
                        map.get("product_id").or_else(|| map.get("id")).and_then(id_of),
                        map.get("quantity")
                            .and_then(Value::as_u64)
                            .map(|q| q.min(u64::from(u32::MAX)) as u32)
                            .unwrap_or(1),
                    ),
                    other => (id_of(other), 1),
                };
                match id {
                    Some(id) => lines.push((self.resolve(Some(&id), None).await?, quantity)),
                    None => debug!("skipping unreadable cart item"),
                }
            }
            self.with_cart(|cart| {
                for (product, quantity) in lines {
                    cart.add(product, quantity);
                }
            })?;
        }
        self.checkout().map(|_| ())
    }

    async fn handle(&self, call: &ToolCall) -> Result<()> {
        match call.tool() {
            ToolName::AddToCart => {
                let id = call
                    .id_arg("product_id")
                    .ok_or_else(|| Error::missing_argument(call.name(), "product_id"))?;
                let quantity = call
                    .f64_arg("quantity")
                    .map(|q| q.clamp(1.0, f64::from(u32::MAX)) as u32)
                    .unwrap_or(1);
                self.add_to_cart(&id, quantity).await.map(|_| ())
            },
            ToolName::ProactivelyAddToCart => {
                let id = call.id_arg("product_id");
                let product = self.resolve(id.as_deref(), call.str_arg("product_name")).await?;
                if let Some(speech) = call.str_arg("confirmation_speech") {
                    info!(product_id = %product.id, speech, "host added item proactively");
                }
                self.add_product(product, 1).map(|_| ())
            },
            ToolName::ShowProduct => self.show_product(call).await,
            ToolName::CompareProducts => self.compare_products(call).await,
            ToolName::HighlightOffer => self.highlight_offer(call),
            ToolName::InitiateCheckout => self.initiate_checkout(call).await,
            ToolName::Show360View => {
                let id = call
                    .id_arg("product_id")
                    .ok_or_else(|| Error::missing_argument(call.name(), "product_id"))?;
                info!(product_id = %id, "opening 360 view");
                self.view
                    .update(|state| state.rotating_product_id = Some(id));
                Ok(())
            },
            other => {
                warn!(tool = %other, "no handler for forwarded tool call");
                Ok(())
            },
        }
    }
}

fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ToolForwarder for ShopSession {
    async fn forward(&self, call: &ToolCall) -> Result<()> {
        self.handle(call).await
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json, talkshop_catalog::StaticCatalog};

    fn session() -> ShopSession {
        ShopSession::new(Arc::new(StaticCatalog::sample()), ViewStore::new())
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall::from_json(name, arguments)
    }

    #[tokio::test]
    async fn add_to_cart_resolves_catalog_products() {
        let session = session();
        session
            .forward(&call("add_to_cart", json!({"product_id": 5, "quantity": 2})))
            .await
            .unwrap();
        session
            .forward(&call("add_to_cart", json!({"product_id": "5"})))
            .await
            .unwrap();
        let cart = session.cart();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.count(), 3);
        assert_eq!(cart.total(), 147.0);
        assert_eq!(session.view.snapshot().cart_count, 3);
    }

    #[tokio::test]
    async fn add_to_cart_finds_displayed_dynamic_product() {
        let session = session();
        let product = Product {
            id: "dyn-abc".into(),
            title: "Custom Scarf".into(),
            price: 30.0,
            dynamic: true,
            ..Default::default()
        };
        session.view.set_showcase(ShowcaseState::Spotlight(Spotlight {
            product,
            highlight_features: Vec::new(),
            offer: None,
        }));
        assert_eq!(session.add_to_cart("dyn-abc", 1).await.unwrap(), 1);
        assert!(session.add_to_cart("missing", 1).await.is_err());
    }

    #[tokio::test]
    async fn proactive_add_falls_back_to_name() {
        let session = session();
        session
            .forward(&call(
                "proactively_add_to_cart",
                json!({"product_name": "silver locket", "confirmation_speech": "I've added it"}),
            ))
            .await
            .unwrap();
        assert_eq!(session.cart().items()[0].product.id, "8");
    }

    #[tokio::test]
    async fn show_product_and_offer() {
        let session = session();
        session
            .forward(&call(
                "show_product",
                json!({"product_id": "2", "highlight_features": ["Structured wool"]}),
            ))
            .await
            .unwrap();
        session
            .forward(&call(
                "highlight_offer",
                json!({"product_id": "2", "discount_percent": "20", "message": "Today only"}),
            ))
            .await
            .unwrap();
        match session.view.showcase() {
            ShowcaseState::Spotlight(spot) => {
                assert_eq!(spot.product.id, "2");
                assert_eq!(spot.highlight_features, vec!["Structured wool"]);
                let offer = spot.offer.unwrap();
                assert_eq!(offer.discount_percent, 20.0);
                assert_eq!(offer.apply(spot.product.price), 103.2);
            },
            other => panic!("expected spotlight, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn compare_needs_two_products() {
        let session = session();
        session
            .forward(&call(
                "compare_products",
                json!({"product_ids": ["4", "9", "404"], "comparison_aspect": "price"}),
            ))
            .await
            .unwrap();
        match session.view.showcase() {
            ShowcaseState::Comparison(cmp) => {
                assert_eq!(cmp.products.len(), 2);
                assert_eq!(cmp.aspect.as_deref(), Some("price"));
            },
            other => panic!("expected comparison, got {}", other.kind()),
        }

        let err = session
            .forward(&call("compare_products", json!({"product_ids": "4"})))
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn checkout_uses_cart_items_when_cart_is_empty() {
        let session = session();
        session
            .forward(&call(
                "highlight_offer",
                json!({"product_id": "7", "discount_percent": 10}),
            ))
            .await
            .unwrap();
        session
            .forward(&call(
                "initiate_checkout",
                json!({"cart_items": [{"product_id": "7", "quantity": 2}, "5"]}),
            ))
            .await
            .unwrap();
        let summary = session.view.snapshot().checkout.unwrap();
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal, 119.0);
        assert_eq!(summary.discount, 7.0);
        assert_eq!(summary.total, 112.0);
    }

    #[tokio::test]
    async fn checkout_with_unknown_item_leaves_cart_untouched() {
        let session = session();
        let result = session
            .forward(&call(
                "initiate_checkout",
                json!({"cart_items": ["7", {"product_id": "404"}]}),
            ))
            .await;
        assert!(matches!(result, Err(Error::ProductNotFound { .. })));
        assert!(session.cart().is_empty());
        assert!(session.view.snapshot().checkout.is_none());
    }

    #[tokio::test]
    async fn oversized_quantities_keep_the_cart_usable() {
        let session = session();
        session
            .forward(&call("add_to_cart", json!({"product_id": "1", "quantity": 4294967295u64})))
            .await
            .unwrap();
        session
            .forward(&call("add_to_cart", json!({"product_id": "2", "quantity": 1})))
            .await
            .unwrap();
        session
            .forward(&call("add_to_cart", json!({"product_id": "3"})))
            .await
            .unwrap();
        assert_eq!(session.cart().items().len(), 3);
        assert_eq!(
            session.view.snapshot().cart_count,
            crate::cart::MAX_LINE_QUANTITY + 2
        );
    }

    #[tokio::test]
    async fn empty_checkout_fails() {
        let session = session();
        assert!(session.forward(&call("initiate_checkout", json!({}))).await.is_err());
        assert!(session.view.snapshot().checkout.is_none());
    }

    #[tokio::test]
    async fn cart_edits_publish_count() {
        let session = session();
        session.add_to_cart("1", 2).await.unwrap();
        assert!(session.set_quantity("1", 5).unwrap());
        assert_eq!(session.view.snapshot().cart_count, 5);
        assert!(session.remove_from_cart("1").unwrap());
        assert_eq!(session.view.snapshot().cart_count, 0);
    }

    #[tokio::test]
    async fn unknown_tools_are_ignored() {
        let session = session();
        session
            .forward(&call("negotiate_price", json!({"product_id": "1"})))
            .await
            .unwrap();
        session
            .forward(&call("show_360_view", json!({"product_id": "3"})))
            .await
            .unwrap();
        assert_eq!(session.view.snapshot().rotating_product_id.as_deref(), Some("3"));
    }
}
