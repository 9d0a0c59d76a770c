use {
    serde::{Deserialize, Serialize},
    talkshop_common::text::{contains_word, normalize},
};

use crate::types::Product;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "some", "any", "show", "me", "find", "looking",
];

/// Parameters of a catalog search. Every field is optional; unset fields do
/// not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub style: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_max_price(mut self, max_price: f64) -> Self {
        self.max_price = Some(max_price);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Cache key describing the query shape. Equivalent queries (case,
    /// surrounding whitespace) share a key.
    pub fn cache_key(&self) -> String {
        let field = |v: &Option<String>| v.as_deref().map(normalize).unwrap_or_default();
        let price = |v: Option<f64>| v.map(|p| format!("{p:.2}")).unwrap_or_default();
        format!(
            "search:q={}|cat={}|color={}|style={}|min={}|max={}|limit={}",
            field(&self.query),
            field(&self.category),
            field(&self.color),
            field(&self.style),
            price(self.min_price),
            price(self.max_price),
            self.limit.map(|l| l.to_string()).unwrap_or_default(),
        )
    }

    /// The category to narrow the upstream fetch to, if any.
    pub fn upstream_category(&self) -> Option<String> {
        self.category
            .as_deref()
            .map(normalize)
            .filter(|c| !c.is_empty())
    }

    fn query_terms(&self) -> Vec<String> {
        self.query
            .as_deref()
            .map(|q| {
                q.split(|c: char| !c.is_alphanumeric() && c != '\'')
                    .map(normalize)
                    .filter(|t| t.len() >= 3 && !STOPWORDS.contains(&t.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn matches(&self, product: &Product) -> bool {
        let text = product.search_text();

        let terms = self.query_terms();
        if !terms.is_empty() && !terms.iter().any(|t| contains_word(&text, t)) {
            return false;
        }

        if let Some(category) = self.category.as_deref().map(normalize)
            && !category.is_empty()
            && product.category.to_lowercase() != category
            && !contains_word(&product.category, &category)
        {
            return false;
        }

        if let Some(color) = self.color.as_deref().map(normalize)
            && !color.is_empty()
            && !product.color_options.iter().any(|c| normalize(c) == color)
            && !contains_word(&text, &color)
        {
            return false;
        }

        if let Some(style) = self.style.as_deref().map(normalize)
            && !style.is_empty()
            && !product.style_tags.iter().any(|s| normalize(s) == style)
            && !contains_word(&text, &style)
        {
            return false;
        }

        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }

    /// Filter and truncate a product list.
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let matched = products.into_iter().filter(|p| self.matches(p));
        match self.limit {
            Some(limit) => matched.take(limit).collect(),
            None => matched.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dress() -> Product {
        Product {
            id: "1".into(),
            title: "Red Bohemian Maxi Dress".into(),
            description: "Flowy summer dress".into(),
            category: "women's clothing".into(),
            price: 59.0,
            color_options: vec!["red".into(), "cream".into()],
            style_tags: vec!["bohemian".into()],
            ..Default::default()
        }
    }

    #[test]
    fn color_and_style_filters() {
        let p = dress();
        assert!(SearchQuery::default().with_color("Red").with_style("bohemian").matches(&p));
        assert!(SearchQuery::default().with_color("cream").matches(&p));
        assert!(!SearchQuery::default().with_color("blue").matches(&p));
        assert!(!SearchQuery::default().with_style("minimalist").matches(&p));
    }

    #[test]
    fn category_matches_exact_or_word() {
        let p = dress();
        assert!(SearchQuery::default().with_category("women's clothing").matches(&p));
        assert!(SearchQuery::default().with_category("clothing").matches(&p));
        assert!(!SearchQuery::default().with_category("electronics").matches(&p));
    }

    #[test]
    fn text_query_needs_one_significant_term() {
        let p = dress();
        assert!(SearchQuery::text("show me a maxi skirt").matches(&p));
        assert!(!SearchQuery::text("laptop").matches(&p));
        assert!(SearchQuery::text("show me").matches(&p));
    }

    #[test]
    fn price_bounds_and_limit() {
        let p = dress();
        assert!(!SearchQuery::default().with_max_price(50.0).matches(&p));
        let q = SearchQuery::default().with_limit(1);
        assert_eq!(q.apply(vec![p.clone(), p]).len(), 1);
    }

    #[test]
    fn cache_key_ignores_case_and_whitespace() {
        let a = SearchQuery::text(" Dress ").with_color("RED");
        let b = SearchQuery::text("dress").with_color("red");
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), SearchQuery::text("dress").cache_key());
    }
}
