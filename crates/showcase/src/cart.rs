use {serde::Serialize, talkshop_catalog::Product};

use crate::state::Offer;

/// Units allowed on one cart line.
pub const MAX_LINE_QUANTITY: u32 = 999;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

/// Session cart. Lives only as long as the session.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` of a product, merging with an existing line. Each line
    /// holds at most [`MAX_LINE_QUANTITY`] units.
    pub fn add(&mut self, product: Product, quantity: u32) -> u32 {
        let quantity = quantity.clamp(1, MAX_LINE_QUANTITY);
        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            item.quantity = item
                .quantity
                .saturating_add(quantity)
                .min(MAX_LINE_QUANTITY);
            return item.quantity;
        }
        self.items.push(CartItem { product, quantity });
        quantity
    }

    pub fn remove(&mut self, product_id: &str) -> Option<CartItem> {
        let index = self.items.iter().position(|i| i.product.id == product_id)?;
        Some(self.items.remove(index))
    }

    /// Set a line's quantity; zero removes the line. Returns false when the
    /// product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id).is_some();
        }
        match self.items.iter_mut().find(|i| i.product.id == product_id) {
            Some(item) => {
                item.quantity = quantity.min(MAX_LINE_QUANTITY);
                true
            },
            None => false,
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Total number of units.
    pub fn count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn summary(&self, offers: &[Offer]) -> CheckoutSummary {
        let subtotal = round_cents(self.total());
        let discount = round_cents(
            self.items
                .iter()
                .filter_map(|item| {
                    let offer = offers.iter().find(|o| o.product_id == item.product.id)?;
                    let discounted = offer.apply(item.product.price) * f64::from(item.quantity);
                    Some(item.line_total() - discounted)
                })
                .sum(),
        );
        CheckoutSummary {
            items: self.items.clone(),
            item_count: self.count(),
            subtotal,
            discount,
            total: round_cents(subtotal - discount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSummary {
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
