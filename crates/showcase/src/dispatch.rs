//! Tool-call dispatcher.
//!
//! Every handler replaces view state wholesale; nothing accumulates. Catalog
//! lookups complete before the view is touched, so a failed lookup leaves
//! the showcase exactly as it was. Two calls in flight at once race and the
//! last to finish wins; see [`crate::queue`] for the sequenced alternative.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    talkshop_catalog::{CatalogSearch, Product, SearchQuery},
    talkshop_common::text::{contains_word, title_case},
    talkshop_metrics::{counter, dispatch as dispatch_metrics, histogram, labels},
    talkshop_protocol::{CART_SUCCESS_MS, FOCUS_CLEAR_MS, ToolCall, ToolName},
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    gate::{PerceptionGate, curation_title},
    state::{ProductGrid, ShowcaseState, Spotlight, ViewStore},
    synthesis::{
        OutfitRequest, SynthesisDefaults, SynthesisRequest, synthesize_outfit, synthesize_product,
        synthesize_style_matches,
    },
};

const SEARCH_LIMIT: usize = 12;
const STYLE_MATCH_LIMIT: usize = 8;
const STYLE_FALLBACK_COUNT: usize = 4;
const COMPLEMENT_LIMIT: usize = 8;

/// Shown when the catalog cannot list its categories.
pub const FALLBACK_CATEGORIES: [&str; 4] = [
    "electronics",
    "jewelery",
    "men's clothing",
    "women's clothing",
];

// ── Forwarding ───────────────────────────────────────────────────────────────

/// The parent collaborator that handles every tool the dispatcher does not
/// own (cart mutation, spotlight, comparison, offers, checkout).
#[async_trait]
pub trait ToolForwarder: Send + Sync {
    async fn forward(&self, call: &ToolCall) -> Result<()>;
}

/// Forwarder that only logs. Used when nothing owns the cart.
pub struct LoggingForwarder;

#[async_trait]
impl ToolForwarder for LoggingForwarder {
    async fn forward(&self, call: &ToolCall) -> Result<()> {
        info!(tool = call.name(), "forwarded tool call (no handler)");
        Ok(())
    }
}

// ── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTimings {
    pub focus_clear: Duration,
    pub cart_success: Duration,
}

impl Default for DispatchTimings {
    fn default() -> Self {
        Self {
            focus_clear: Duration::from_millis(FOCUS_CLEAR_MS),
            cart_success: Duration::from_millis(CART_SUCCESS_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub timings: DispatchTimings,
    pub defaults: SynthesisDefaults,
}

impl DispatcherConfig {
    pub fn from_showcase(config: &talkshop_config::ShowcaseConfig) -> Self {
        Self {
            timings: DispatchTimings {
                focus_clear: Duration::from_millis(config.focus_clear_ms),
                cart_success: Duration::from_millis(config.cart_success_ms),
            },
            defaults: SynthesisDefaults::from_config(config),
        }
    }
}

// ── Outcome ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A local handler updated the view.
    Handled,
    /// Passed to the [`ToolForwarder`].
    Forwarded,
    /// Staged in the perception gate.
    Staged,
    /// The handler failed; the showcase was left unchanged.
    Failed,
}

impl DispatchOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handled => "handled",
            Self::Forwarded => "forwarded",
            Self::Staged => "staged",
            Self::Failed => "failed",
        }
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────────────

/// Routes canonical tool calls to their effects. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    catalog: Arc<dyn CatalogSearch>,
    forwarder: Arc<dyn ToolForwarder>,
    view: ViewStore,
    gate: PerceptionGate,
    config: DispatcherConfig,
    /// Pending cart-success reset. Replaced (and the old one aborted) on
    /// every add-to-cart.
    cart_timer: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DispatcherInner {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.cart_timer.lock()
            && let Some(handle) = slot.take()
        {
            handle.abort();
        }
    }
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<dyn CatalogSearch>,
        forwarder: Arc<dyn ToolForwarder>,
        view: ViewStore,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                catalog,
                forwarder,
                gate: PerceptionGate::new(view.clone()),
                view,
                config,
                cart_timer: Mutex::new(None),
            }),
        }
    }

    pub fn view(&self) -> &ViewStore {
        &self.inner.view
    }

    pub fn gate(&self) -> &PerceptionGate {
        &self.inner.gate
    }

    pub async fn dispatch(&self, call: ToolCall) -> DispatchOutcome {
        let tool = call.tool();
        let started = Instant::now();

        let outcome = match self.route(&tool, &call).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(tool = %tool, %error, "tool call failed, showcase unchanged");
                DispatchOutcome::Failed
            },
        };

        let tool_label = if tool.is_known() {
            tool.as_str().to_string()
        } else {
            "other".to_string()
        };
        counter!(
            dispatch_metrics::CALLS_TOTAL,
            labels::TOOL => tool_label.clone(),
            labels::OUTCOME => outcome.as_str()
        )
        .increment(1);
        histogram!(dispatch_metrics::DURATION_SECONDS, labels::TOOL => tool_label)
            .record(started.elapsed().as_secs_f64());
        debug!(tool = %tool, outcome = outcome.as_str(), "tool call dispatched");
        outcome
    }

    async fn route(&self, tool: &ToolName, call: &ToolCall) -> Result<DispatchOutcome> {
        let handled = |_: ()| DispatchOutcome::Handled;
        match tool {
            ToolName::AddToCart | ToolName::ProactivelyAddToCart => {
                self.celebrate_add_to_cart();
                self.forward(call).await
            },
            ToolName::SearchProducts => self.search_products(call).await.map(handled),
            ToolName::ShowProductGrid => self.show_product_grid(call).await.map(handled),
            ToolName::ShowCategories => {
                self.show_categories().await;
                Ok(DispatchOutcome::Handled)
            },
            ToolName::CreateDynamicProduct => {
                self.create_dynamic_product(call);
                Ok(DispatchOutcome::Handled)
            },
            ToolName::FindAndDisplayStyleMatches => self.find_style_matches(call).await.map(handled),
            ToolName::CreateCompleteOutfit => {
                self.create_complete_outfit(call);
                Ok(DispatchOutcome::Handled)
            },
            ToolName::AnalyzeObjectInView => self.analyze_object_in_view(call).await.map(handled),
            ToolName::FocusOnProduct => self.focus_on_product(call).map(handled),
            ToolName::DetectedUserStyle => {
                self.inner.gate.stage(call.arguments().clone());
                Ok(DispatchOutcome::Staged)
            },
            ToolName::ShowProduct
            | ToolName::CompareProducts
            | ToolName::InitiateCheckout
            | ToolName::HighlightOffer
            | ToolName::Show360View
            | ToolName::Other(_) => self.forward(call).await,
        }
    }

    async fn forward(&self, call: &ToolCall) -> Result<DispatchOutcome> {
        self.inner.forwarder.forward(call).await?;
        Ok(DispatchOutcome::Forwarded)
    }

    // ── Direct UI actions ────────────────────────────────────────────────────

    /// The user picked a category tile.
    pub async fn select_category(&self, category: &str) -> DispatchOutcome {
        self.dispatch(ToolCall::from_json(
            ToolName::SearchProducts.as_str(),
            json!({ "category": category }),
        ))
        .await
    }

    pub fn clear_showcase(&self) {
        self.inner.view.set_showcase(ShowcaseState::Empty);
    }

    /// The user accepted the style notification card.
    pub async fn confirm_style(&self) -> Option<DispatchOutcome> {
        let call = self.inner.gate.analyze()?;
        Some(self.dispatch(call).await)
    }

    /// The user closed the style notification card.
    pub fn dismiss_style(&self) -> bool {
        self.inner.gate.dismiss()
    }

    // ── Handlers ─────────────────────────────────────────────────────────────

    fn celebrate_add_to_cart(&self) {
        let view = &self.inner.view;
        let flight = view.showcase().spotlight_product().map(|p| p.id.clone());
        view.update(|state| {
            state.cart_success = true;
            state.cart_flight = flight;
        });

        let Ok(mut slot) = self.inner.cart_timer.lock() else {
            return;
        };
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let view = view.clone();
        let delay = self.inner.config.timings.cart_success;
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            view.update(|state| {
                state.cart_success = false;
                state.cart_flight = None;
            });
        }));
    }

    async fn search_products(&self, call: &ToolCall) -> Result<()> {
        let query = SearchQuery {
            query: call.str_arg("query").map(str::to_string),
            category: call.str_arg("category").map(str::to_string),
            color: call.str_arg("color").map(str::to_string),
            style: call.str_arg("style").map(str::to_string),
            min_price: call.f64_arg("min_price"),
            max_price: call.f64_arg("max_price"),
            limit: Some(SEARCH_LIMIT),
        };
        let products = self.inner.catalog.search(&query).await?;
        let title = match (&query.query, &query.category) {
            (Some(text), _) => format!("Results for \"{text}\""),
            (None, Some(category)) => title_case(category),
            (None, None) => "All products".to_string(),
        };
        info!(count = products.len(), %title, "search results");
        self.inner.view.set_showcase(ShowcaseState::ProductGrid(ProductGrid {
            title,
            products,
            narrative: None,
        }));
        Ok(())
    }

    async fn show_product_grid(&self, call: &ToolCall) -> Result<()> {
        let mut products = Vec::new();
        if let Some(Value::Array(items)) = call.arguments().get("products") {
            for item in items {
                match item {
                    Value::Object(_) => match serde_json::from_value::<Product>(item.clone()) {
                        Ok(product) if !product.id.is_empty() || !product.title.is_empty() => {
                            products.push(product);
                        },
                        Ok(_) => debug!("skipping empty grid entry"),
                        Err(error) => debug!(%error, "skipping unreadable grid entry"),
                    },
                    Value::String(_) | Value::Number(_) => {
                        let id = match item {
                            Value::String(s) => s.trim().to_string(),
                            other => other.to_string(),
                        };
                        match self.lookup(&id).await? {
                            Some(product) => products.push(product),
                            None => debug!(product_id = %id, "grid product not found"),
                        }
                    },
                    _ => debug!("skipping unreadable grid entry"),
                }
            }
        }

        let title = call
            .str_arg("collection_title")
            .or_else(|| call.str_arg("title"))
            .unwrap_or("Curated for you")
            .to_string();
        self.inner.view.set_showcase(ShowcaseState::ProductGrid(ProductGrid {
            title,
            products,
            narrative: call.str_arg("style_narrative").map(str::to_string),
        }));
        Ok(())
    }

    async fn show_categories(&self) {
        let categories = match self.inner.catalog.categories().await {
            Ok(categories) if !categories.is_empty() => categories,
            Ok(_) => fallback_categories(),
            Err(error) => {
                warn!(%error, "category lookup failed, showing fallback list");
                fallback_categories()
            },
        };
        self.inner
            .view
            .set_showcase(ShowcaseState::Categories(categories));
    }

    fn create_dynamic_product(&self, call: &ToolCall) {
        let request = SynthesisRequest::from_call(call);
        let product = synthesize_product(&request, &self.inner.config.defaults);
        let mut highlight_features = call.list_arg("highlight_features");
        if highlight_features.is_empty() {
            highlight_features = product.features.clone();
        }
        info!(product_id = %product.id, title = %product.title, "synthesized product");
        self.inner.view.set_showcase(ShowcaseState::Spotlight(Spotlight {
            product,
            highlight_features,
            offer: None,
        }));
    }

    async fn find_style_matches(&self, call: &ToolCall) -> Result<()> {
        let color = call.str_arg("dominant_color");
        let style = call.str_arg("style_category");
        let title = call
            .str_arg("curation_title")
            .map(str::to_string)
            .unwrap_or_else(|| curation_title(color, style));

        let mut query = SearchQuery::default().with_limit(STYLE_MATCH_LIMIT);
        if let Some(color) = color {
            query = query.with_color(color);
        }
        if let Some(style) = style {
            query = query.with_style(style);
        }
        let mut products = self.inner.catalog.search(&query).await?;
        if products.is_empty() {
            products = synthesize_style_matches(
                color.unwrap_or_default(),
                style.unwrap_or_default(),
                &self.inner.config.defaults,
                STYLE_FALLBACK_COUNT,
            );
            info!(count = products.len(), "no catalog style matches, synthesized fallback");
        }

        let narrative = match (color, style) {
            (Some(color), Some(style)) => Some(format!("Picked for your {style} style in {color}")),
            _ => None,
        };
        self.inner.view.set_showcase(ShowcaseState::ProductGrid(ProductGrid {
            title,
            products,
            narrative,
        }));
        Ok(())
    }

    fn create_complete_outfit(&self, call: &ToolCall) {
        let request = OutfitRequest::from_call(call);
        let products = synthesize_outfit(&request, &self.inner.config.defaults);
        let title = match &request.occasion {
            Some(occasion) => format!("Your {occasion} outfit"),
            None => "Your complete outfit".to_string(),
        };
        let narrative = match (&request.style_preference, request.base_item.is_empty()) {
            (Some(style), false) => Some(format!(
                "A {style} look built around your {}",
                request.base_item
            )),
            (None, false) => Some(format!("Built around your {}", request.base_item)),
            (Some(style), true) => Some(format!("A {style} look")),
            (None, true) => None,
        };
        self.inner.view.set_showcase(ShowcaseState::ProductGrid(ProductGrid {
            title,
            products,
            narrative,
        }));
    }

    async fn analyze_object_in_view(&self, call: &ToolCall) -> Result<()> {
        let color = call.str_arg("dominant_color");
        let category = call.str_arg("object_category");
        let description = call.str_arg("object_description");

        let mut query = SearchQuery::default().with_limit(COMPLEMENT_LIMIT);
        if let Some(color) = color {
            query = query.with_color(color);
        }
        let complement = complementary_category(
            &format!("{} {}", category.unwrap_or_default(), description.unwrap_or_default()),
        );
        if let Some(complement) = complement {
            query = query.with_category(complement);
        }

        let mut products = self.inner.catalog.search(&query).await?;
        if products.is_empty() && query.category.is_some() {
            let colour_only = SearchQuery {
                category: None,
                ..query
            };
            products = self.inner.catalog.search(&colour_only).await?;
        }
        if products.is_empty() {
            info!(
                color = color.unwrap_or("-"),
                category = category.unwrap_or("-"),
                "no complementary products"
            );
            return Ok(());
        }

        let subject = description.or(category).unwrap_or("your look");
        self.inner.view.set_showcase(ShowcaseState::ProductGrid(ProductGrid {
            title: format!("Pairs well with {subject}"),
            products,
            narrative: color.map(|c| format!("Chosen to go with {c}")),
        }));
        Ok(())
    }

    /// Set the focused product and schedule its clear. Earlier clears are not
    /// cancelled, so an older timer may clear a newer focus.
    fn focus_on_product(&self, call: &ToolCall) -> Result<()> {
        let product_id = call
            .id_arg("product_id")
            .or_else(|| call.id_arg("item_id"))
            .ok_or_else(|| Error::missing_argument(call.name(), "product_id"))?;
        debug!(%product_id, "focusing product");
        self.inner
            .view
            .update(|state| state.focused_product_id = Some(product_id));

        let view = self.inner.view.clone();
        let delay = self.inner.config.timings.focus_clear;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            view.update(|state| state.focused_product_id = None);
        });
        Ok(())
    }

    /// A product on screen, else a catalog lookup.
    async fn lookup(&self, id: &str) -> Result<Option<Product>> {
        if let Some(product) = self.inner.view.displayed_product(id) {
            return Ok(Some(product));
        }
        Ok(self.inner.catalog.product(id).await?)
    }
}

fn fallback_categories() -> Vec<String> {
    FALLBACK_CATEGORIES.iter().map(|c| (*c).to_string()).collect()
}

/// The catalog category that complements an object seen on camera.
fn complementary_category(object: &str) -> Option<&'static str> {
    const JEWELRY: &[&str] = &["jewelry", "jewellery", "jewelery", "necklace", "ring", "earrings", "bracelet"];
    const APPAREL: &[&str] = &[
        "clothing", "apparel", "shirt", "dress", "jacket", "top", "sweater", "coat", "blouse", "hoodie",
    ];
    const ELECTRONICS: &[&str] = &["electronics", "phone", "laptop", "headphones", "tablet", "camera"];

    let has = |words: &[&str]| words.iter().any(|w| contains_word(object, w));
    if has(JEWELRY) {
        Some("women's clothing")
    } else if has(APPAREL) {
        Some("jewelery")
    } else if has(ELECTRONICS) {
        Some("electronics")
    } else {
        None
    }
}
