use async_trait::async_trait;

use crate::{error::Result, query::SearchQuery, types::Product};

/// Read access to a product catalog.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Every product in the catalog.
    async fn all_products(&self) -> Result<Vec<Product>>;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>>;

    async fn product(&self, id: &str) -> Result<Option<Product>> {
        Ok(self.all_products().await?.into_iter().find(|p| p.id == id))
    }

    /// Distinct category names in first-seen order.
    async fn categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = Vec::new();
        for product in self.all_products().await? {
            if !product.category.is_empty() && !categories.contains(&product.category) {
                categories.push(product.category);
            }
        }
        Ok(categories)
    }
}
