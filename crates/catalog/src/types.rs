use serde::{Deserialize, Deserializer, Serialize};

/// A displayable product. Catalog API records, host-supplied grid entries
/// and synthesized products all deserialize into this shape; missing fields
/// take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(alias = "name", alias = "product_name")]
    pub title: String,
    #[serde(deserialize_with = "lenient_price")]
    pub price: f64,
    pub category: String,
    pub description: String,
    #[serde(alias = "thumbnail", alias = "image_url")]
    pub image: String,
    pub rating: Rating,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    pub color_options: Vec<String>,
    pub size_options: Vec<String>,
    pub style_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub features: Vec<String>,
    /// Synthetic "people viewing now" counter.
    pub viewers: u32,
    /// Synthesized on the fly rather than fetched from the catalog.
    pub dynamic: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rating {
    pub rate: f64,
    pub count: u32,
}

impl Product {
    /// Title, description and category joined for keyword matching.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title,
            self.description,
            self.category,
            self.style_tags.join(" ")
        )
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Accepts `49.5`, `"49.5"` and `"$49.50"`.
fn lenient_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or_default(),
        serde_json::Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse()
            .unwrap_or_default(),
        _ => 0.0,
    })
}
