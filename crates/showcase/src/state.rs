//! Observable view state.
//!
//! Everything a renderer draws from the dispatcher lives in one [`ViewState`]
//! held by a `tokio::sync::watch` channel. Writers go through [`ViewStore`];
//! renderers call [`ViewStore::subscribe`] and redraw on every change.

use std::sync::Arc;

use {
    serde::Serialize,
    talkshop_catalog::Product,
    tokio::sync::watch,
};

use crate::{cart::CheckoutSummary, gate::PerceptionState};

// ── Showcase ─────────────────────────────────────────────────────────────────

/// What the product panel currently renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ShowcaseState {
    #[default]
    Empty,
    ProductGrid(ProductGrid),
    Categories(Vec<String>),
    Spotlight(Spotlight),
    Comparison(Comparison),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductGrid {
    pub title: String,
    pub products: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spotlight {
    pub product: Product,
    pub highlight_features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<Offer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub products: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect: Option<String>,
}

/// A discount the host offered on one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offer {
    pub product_id: String,
    pub discount_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Offer {
    pub fn apply(&self, price: f64) -> f64 {
        let pct = self.discount_percent.clamp(0.0, 100.0);
        ((price * (100.0 - pct)) / 100.0 * 100.0).round() / 100.0
    }
}

impl ShowcaseState {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::ProductGrid(_) => "product_grid",
            Self::Categories(_) => "categories",
            Self::Spotlight(_) => "spotlight",
            Self::Comparison(_) => "comparison",
        }
    }

    /// Products currently on screen, in display order.
    pub fn products(&self) -> Vec<&Product> {
        match self {
            Self::ProductGrid(grid) => grid.products.iter().collect(),
            Self::Spotlight(spot) => vec![&spot.product],
            Self::Comparison(cmp) => cmp.products.iter().collect(),
            Self::Empty | Self::Categories(_) => Vec::new(),
        }
    }

    pub fn find_product(&self, id: &str) -> Option<&Product> {
        self.products().into_iter().find(|p| p.id == id)
    }

    pub fn spotlight_product(&self) -> Option<&Product> {
        match self {
            Self::Spotlight(spot) => Some(&spot.product),
            _ => None,
        }
    }
}

// ── View ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub showcase: ShowcaseState,
    pub focused_product_id: Option<String>,
    pub cart_success: bool,
    /// Product whose image is flying to the cart icon.
    pub cart_flight: Option<String>,
    pub cart_count: u32,
    pub perception: PerceptionState,
    pub checkout: Option<CheckoutSummary>,
    /// Product shown in the 360° viewer.
    pub rotating_product_id: Option<String>,
    pub last_utterance: Option<String>,
    pub replica_speaking: bool,
}

/// Shared handle to the view state. Cloning is cheap; all clones write the
/// same channel.
#[derive(Debug, Clone)]
pub struct ViewStore {
    tx: Arc<watch::Sender<ViewState>>,
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ViewState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    pub fn showcase(&self) -> ShowcaseState {
        self.tx.borrow().showcase.clone()
    }

    pub fn focused_product_id(&self) -> Option<String> {
        self.tx.borrow().focused_product_id.clone()
    }

    pub fn cart_success(&self) -> bool {
        self.tx.borrow().cart_success
    }

    /// Look a product up among the ones currently displayed.
    pub fn displayed_product(&self, id: &str) -> Option<Product> {
        self.tx.borrow().showcase.find_product(id).cloned()
    }

    /// Mutate the state in place and notify observers.
    pub fn update(&self, f: impl FnOnce(&mut ViewState)) {
        self.tx.send_modify(f);
    }

    pub fn set_showcase(&self, showcase: ShowcaseState) {
        tracing::debug!(kind = showcase.kind(), "showcase updated");
        self.update(|view| view.showcase = showcase);
    }
}
