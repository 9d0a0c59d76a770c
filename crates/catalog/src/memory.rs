use async_trait::async_trait;

use crate::{
    decorate::decorate,
    error::Result,
    query::SearchQuery,
    traits::CatalogSearch,
    types::{Product, Rating},
};

/// Fixed in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    /// Products are decorated on construction, like fetched ones.
    pub fn new(products: Vec<Product>) -> Self {
        let products = products
            .into_iter()
            .map(|mut p| {
                decorate(&mut p);
                p
            })
            .collect();
        Self { products }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A small built-in assortment for offline demos.
    pub fn sample() -> Self {
        let item = |id: &str, title: &str, price: f64, category: &str, description: &str| Product {
            id: id.into(),
            title: title.into(),
            price,
            category: category.into(),
            description: description.into(),
            image: format!("https://picsum.photos/seed/talkshop-{id}/400/400"),
            rating: Rating {
                rate: 4.2,
                count: 120,
            },
            size_options: if category.contains("clothing") {
                vec!["S".into(), "M".into(), "L".into(), "XL".into()]
            } else {
                Vec::new()
            },
            ..Default::default()
        };
        Self::new(vec![
            item("1", "Red Bohemian Maxi Dress", 64.0, "women's clothing", "Flowy tiered cotton dress with a romantic neckline"),
            item("2", "Navy Minimalist Blazer", 129.0, "women's clothing", "Clean single-button blazer in structured wool"),
            item("3", "Cream Silk Blouse", 79.5, "women's clothing", "Elegant silk blouse with a relaxed drape"),
            item("4", "Black Leather Biker Jacket", 189.0, "men's clothing", "Edgy leather jacket with asymmetric zip"),
            item("5", "Blue Oxford Shirt", 49.0, "men's clothing", "Classic cotton oxford for casual and formal days"),
            item("6", "Olive Chino Trousers", 58.0, "men's clothing", "Casual slim chinos in stretch cotton"),
            item("7", "Gold Minimalist Hoop Earrings", 35.0, "jewelery", "Minimalist gold hoops for everyday wear"),
            item("8", "Silver Vintage Locket", 72.0, "jewelery", "Vintage silver locket on a fine chain"),
            item("9", "White Sporty Sneakers", 95.0, "men's clothing", "Sporty white leather sneakers"),
            item("10", "Wireless Noise Cancelling Headphones", 199.0, "electronics", "Black over-ear headphones with 30h battery"),
        ])
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[async_trait]
impl CatalogSearch for StaticCatalog {
    async fn all_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.clone())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>> {
        Ok(query.apply(self.products.iter().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sample_catalog_supports_style_search() {
        let catalog = StaticCatalog::sample();
        let hits = catalog
            .search(&SearchQuery::default().with_color("red").with_style("bohemian"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
    }

    #[tokio::test]
    async fn default_lookups_use_all_products() {
        let catalog = StaticCatalog::sample();
        assert_eq!(
            catalog.product("4").await.unwrap().map(|p| p.title),
            Some("Black Leather Biker Jacket".to_string())
        );
        assert!(catalog.product("404").await.unwrap().is_none());
        assert_eq!(
            catalog.categories().await.unwrap(),
            vec!["women's clothing", "men's clothing", "jewelery", "electronics"]
        );
    }

    #[tokio::test]
    async fn empty_catalog_finds_nothing() {
        let catalog = StaticCatalog::empty();
        assert!(catalog.is_empty());
        let hits = catalog.search(&SearchQuery::text("dress")).await.unwrap();
        assert!(hits.is_empty());
    }
}
