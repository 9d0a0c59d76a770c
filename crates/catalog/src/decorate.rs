//! Client-side decoration of catalog records: synthetic brand, feature
//! bullets, viewer counts and inferred styling fields.

use talkshop_common::text::contains_word;

use crate::types::Product;

const BRANDS: &[&str] = &[
    "Aurelia",
    "Northbound",
    "Maison Rive",
    "Kestrel & Co",
    "Lumen Atelier",
    "Field Theory",
    "Oakhaven",
    "Verity",
];

pub const COLORS: &[&str] = &[
    "black", "white", "red", "blue", "navy", "green", "yellow", "pink", "purple", "orange",
    "brown", "beige", "grey", "gray", "gold", "silver", "cream", "burgundy", "olive", "teal",
];

pub const STYLES: &[&str] = &[
    "casual",
    "formal",
    "bohemian",
    "minimalist",
    "vintage",
    "sporty",
    "classic",
    "elegant",
    "streetwear",
    "romantic",
    "edgy",
    "preppy",
];

pub const MATERIALS: &[&str] = &[
    "cotton", "leather", "silk", "denim", "linen", "wool", "cashmere", "polyester", "gold",
    "silver", "steel",
];

/// Deterministic small hash so decoration is stable across fetches.
fn seed(id: &str) -> usize {
    id.bytes()
        .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
}

fn features_for(category: &str) -> Vec<String> {
    let features: &[&str] = match category.to_lowercase().as_str() {
        c if c.contains("jewel") => &["Hypoallergenic", "Gift box included", "Lifetime polish"],
        c if c.contains("electronic") => &["2-year warranty", "Free returns", "Fast charging"],
        c if c.contains("women") => &["True to size", "Breathable fabric", "Free alterations"],
        c if c.contains("men") => &["Tailored fit", "Machine washable", "Free alterations"],
        _ => &["Free shipping", "30-day returns"],
    };
    features.iter().map(|f| (*f).to_string()).collect()
}

fn words_in(text: &str, vocabulary: &[&str]) -> Vec<String> {
    vocabulary
        .iter()
        .filter(|word| contains_word(text, word))
        .map(|word| (*word).to_string())
        .collect()
}

/// Fill in the fields the catalog API does not provide. Existing values are
/// kept.
pub fn decorate(product: &mut Product) {
    let seed = seed(&product.id);
    if product.brand.is_none() {
        product.brand = Some(BRANDS[seed % BRANDS.len()].to_string());
    }
    if product.features.is_empty() {
        product.features = features_for(&product.category);
    }
    if product.viewers == 0 {
        product.viewers = 3 + (seed % 45) as u32;
    }

    let text = format!("{} {}", product.title, product.description);
    if product.color_options.is_empty() {
        product.color_options = words_in(&text, COLORS);
    }
    if product.style_tags.is_empty() {
        product.style_tags = words_in(&text, STYLES);
    }
    if product.material.is_none() {
        product.material = words_in(&text, MATERIALS).into_iter().next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoration_is_stable_and_infers_styling() {
        let mut a = Product {
            id: "12".into(),
            title: "Classic Black Leather Jacket".into(),
            description: "An edgy biker jacket".into(),
            category: "women's clothing".into(),
            ..Default::default()
        };
        let mut b = a.clone();
        decorate(&mut a);
        decorate(&mut b);
        assert_eq!(a, b);
        assert_eq!(a.color_options, vec!["black"]);
        assert_eq!(a.style_tags, vec!["classic", "edgy"]);
        assert_eq!(a.material.as_deref(), Some("leather"));
        assert!(a.brand.is_some());
        assert!((3..48).contains(&a.viewers));
        assert!(a.features.contains(&"True to size".to_string()));
    }

    #[test]
    fn existing_fields_are_kept() {
        let mut product = Product {
            id: "1".into(),
            brand: Some("House".into()),
            style_tags: vec!["sporty".into()],
            ..Default::default()
        };
        decorate(&mut product);
        assert_eq!(product.brand.as_deref(), Some("House"));
        assert_eq!(product.style_tags, vec!["sporty"]);
    }
}
