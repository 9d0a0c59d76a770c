//! Dynamic product synthesis.
//!
//! Builds displayable [`Product`] records from free text when the catalog has
//! nothing suitable. Everything here is a pure function of its inputs and a
//! few static tables: the same request always yields the same product,
//! including its id.

use {
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
    talkshop_catalog::{
        Product, Rating,
        decorate::{COLORS, MATERIALS, STYLES},
    },
    talkshop_common::text::{contains_word, normalize, title_case, truncate_words},
    talkshop_protocol::ToolCall,
};

const SYNTHETIC_BRAND: &str = "TalkShop Atelier";
const PLACEHOLDER_IMAGE_BASE: &str = "https://placehold.co/600x800";

const JEWELRY_WORDS: &[&str] = &[
    "ring", "rings", "necklace", "earring", "earrings", "bracelet", "pendant", "locket", "jewelry",
    "jewellery", "jewelery", "brooch", "anklet", "choker",
];
const ELECTRONICS_WORDS: &[&str] = &[
    "headphones", "earbuds", "laptop", "phone", "smartphone", "speaker", "monitor", "camera",
    "smartwatch", "tablet", "ssd", "console",
];
const MALE_WORDS: &[&str] = &[
    "men", "mens", "male", "man", "his", "him", "gentleman", "boyfriend", "husband", "groom",
];
const FEMALE_WORDS: &[&str] = &[
    "women", "womens", "female", "woman", "her", "she", "lady", "girlfriend", "wife", "bride",
];
const FEMININE_GARMENTS: &[&str] = &[
    "dress", "skirt", "blouse", "gown", "heels", "camisole", "bodysuit", "romper",
];

// ── Gender ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Female,
    Male,
    Neutral,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Self> {
        match normalize(value).as_str() {
            "female" | "f" | "woman" | "women" | "womens" | "women's" => Some(Self::Female),
            "male" | "m" | "man" | "men" | "mens" | "men's" => Some(Self::Male),
            "neutral" | "unisex" | "any" | "none" => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Infer a gender from free text. Mixed signals yield `Neutral`, no
    /// signal yields `None`.
    pub fn detect(text: &str) -> Option<Self> {
        let hits = |words: &[&str]| words.iter().filter(|w| contains_word(text, w)).count();
        match (hits(MALE_WORDS), hits(FEMALE_WORDS)) {
            (0, 0) => None,
            (m, f) if m > f => Some(Self::Male),
            (m, f) if f > m => Some(Self::Female),
            _ => Some(Self::Neutral),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::Neutral => "neutral",
        }
    }

    fn clothing_category(self) -> &'static str {
        match self {
            Self::Female => "women's clothing",
            Self::Male => "men's clothing",
            Self::Neutral => "clothing",
        }
    }
}

/// Fallbacks used when a request carries no signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisDefaults {
    pub gender: Gender,
}

impl SynthesisDefaults {
    pub fn from_config(config: &talkshop_config::ShowcaseConfig) -> Self {
        let gender = Gender::parse(&config.default_gender).unwrap_or_else(|| {
            tracing::warn!(
                value = %config.default_gender,
                "unrecognised default_gender, using female"
            );
            Gender::Female
        });
        Self { gender }
    }
}

// ── Price tiers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceTier {
    Budget,
    #[default]
    Moderate,
    Premium,
    Luxury,
}

impl PriceTier {
    pub fn parse(hint: &str) -> Option<Self> {
        let hint = normalize(hint);
        let has = |words: &[&str]| words.iter().any(|w| hint.contains(w));
        if has(&["luxury", "splurge", "high-end", "high end"]) {
            Some(Self::Luxury)
        } else if has(&["premium", "designer", "investment"]) {
            Some(Self::Premium)
        } else if has(&["budget", "cheap", "affordable", "low"]) {
            Some(Self::Budget)
        } else if has(&["moderate", "mid", "medium", "average"]) {
            Some(Self::Moderate)
        } else {
            None
        }
    }

    pub fn bounds(self) -> (f64, f64) {
        match self {
            Self::Budget => (19.0, 49.0),
            Self::Moderate => (50.0, 120.0),
            Self::Premium => (120.0, 280.0),
            Self::Luxury => (300.0, 900.0),
        }
    }
}

/// Price window for a free-text hint such as `"$50-$100"`, `"under 80"` or
/// `"luxury"`.
fn price_bounds(hint: Option<&str>) -> (f64, f64) {
    let Some(hint) = hint else {
        return PriceTier::default().bounds();
    };
    let numbers = numbers_in(hint);
    let lower = normalize(hint);
    match numbers.as_slice() {
        [] => PriceTier::parse(hint).unwrap_or_default().bounds(),
        [n] if ["under", "below", "less", "max", "up to"]
            .iter()
            .any(|w| lower.contains(w)) =>
        {
            (n * 0.5, *n)
        },
        [n] if ["over", "above", "at least", "min"].iter().any(|w| lower.contains(w)) => {
            (*n, n * 1.5)
        },
        [n] => (n * 0.8, n * 1.2),
        many => {
            let lo = many.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = many.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (lo, hi)
        },
    }
}

fn numbers_in(text: &str) -> Vec<f64> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() || (c == '.' && !current.is_empty()) {
            current.push(c);
        } else if c == ',' && !current.is_empty() {
            continue;
        } else if !current.is_empty() {
            if let Ok(n) = current.trim_end_matches('.').parse::<f64>() {
                numbers.push(n);
            }
            current.clear();
        }
    }
    numbers
}

// ── Single product ───────────────────────────────────────────────────────────

/// Input of [`synthesize_product`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisRequest {
    pub description: String,
    pub style_reasoning: Option<String>,
    pub occasion: Option<String>,
    pub price_range: Option<String>,
    pub gender: Option<Gender>,
}

impl SynthesisRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Read a `create_dynamic_product` call.
    pub fn from_call(call: &ToolCall) -> Self {
        Self {
            description: call
                .str_arg("product_description")
                .or_else(|| call.str_arg("description"))
                .unwrap_or_default()
                .to_string(),
            style_reasoning: call.str_arg("style_reasoning").map(str::to_string),
            occasion: call.str_arg("occasion").map(str::to_string),
            price_range: call.str_arg("price_range").map(str::to_string),
            gender: call.str_arg("gender").and_then(Gender::parse),
        }
    }

    fn context_text(&self) -> String {
        [
            Some(self.description.as_str()),
            self.style_reasoning.as_deref(),
            self.occasion.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }

    fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for part in [
            Some(self.description.as_str()),
            self.style_reasoning.as_deref(),
            self.occasion.as_deref(),
            self.price_range.as_deref(),
            self.gender.map(Gender::as_str),
        ] {
            hasher.update(normalize(part.unwrap_or_default()).as_bytes());
            hasher.update([0x1f]);
        }
        hasher.finalize().into()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn words_in(text: &str, vocabulary: &[&str]) -> Vec<String> {
    vocabulary
        .iter()
        .filter(|word| contains_word(text, word))
        .map(|word| (*word).to_string())
        .collect()
}

fn has_any(text: &str, vocabulary: &[&str]) -> bool {
    vocabulary.iter().any(|word| contains_word(text, word))
}

/// Guess a catalog category. Only the description decides between
/// jewellery, electronics and clothing; gender comes from the explicit hint,
/// then the wider context, then feminine-coded garments, then the default.
fn guess_category(request: &SynthesisRequest, defaults: &SynthesisDefaults) -> &'static str {
    let description = &request.description;
    if has_any(description, JEWELRY_WORDS) {
        return "jewelery";
    }
    if has_any(description, ELECTRONICS_WORDS) {
        return "electronics";
    }
    request
        .gender
        .or_else(|| Gender::detect(&request.context_text()))
        .or_else(|| has_any(description, FEMININE_GARMENTS).then_some(Gender::Female))
        .unwrap_or(defaults.gender)
        .clothing_category()
}

fn sizes_for(category: &str) -> Vec<String> {
    let sizes: &[&str] = match category {
        "jewelery" => &["One Size"],
        "electronics" => &[],
        "men's clothing" => &["S", "M", "L", "XL", "XXL"],
        _ => &["XS", "S", "M", "L", "XL"],
    };
    sizes.iter().map(|s| (*s).to_string()).collect()
}

fn default_material(category: &str) -> Option<String> {
    match category {
        "jewelery" => Some("sterling silver".into()),
        "electronics" => None,
        _ => Some("cotton".into()),
    }
}

pub fn placeholder_image(title: &str) -> String {
    format!(
        "{PLACEHOLDER_IMAGE_BASE}?text={}",
        urlencoding::encode(title)
    )
}

/// Build a fully populated product from a description and optional hints.
/// Never fails: absent signals fall back to `defaults`.
pub fn synthesize_product(request: &SynthesisRequest, defaults: &SynthesisDefaults) -> Product {
    let digest = request.digest();
    let seed = digest[6..14]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

    let description = request.description.trim();
    let title = if description.is_empty() {
        "Curated Piece".to_string()
    } else {
        title_case(&truncate_words(description, 6))
    };
    let category = guess_category(request, defaults);
    let context = request.context_text();

    let (lo, hi) = price_bounds(request.price_range.as_deref());
    let unit = (seed % 1000) as f64 / 1000.0;
    let price = (lo + unit * (hi - lo)).floor() + 0.99;
    let price = price.min(hi).max(0.99);

    let mut long_description = if description.is_empty() {
        "A piece selected for you.".to_string()
    } else {
        format!("{}.", description.trim_end_matches('.'))
    };
    if let Some(reasoning) = &request.style_reasoning {
        long_description.push(' ');
        long_description.push_str(reasoning.trim_end_matches('.'));
        long_description.push('.');
    }
    if let Some(occasion) = &request.occasion {
        long_description.push_str(&format!(" Perfect for {occasion}."));
    }

    let mut color_options = words_in(description, COLORS);
    if color_options.is_empty() {
        color_options = vec!["black".into(), "ivory".into()];
    }

    let mut style_tags = words_in(&context, STYLES);
    if let Some(occasion) = request.occasion.as_deref().map(normalize)
        && !occasion.is_empty()
        && !style_tags.contains(&occasion)
    {
        style_tags.push(occasion);
    }

    let mut features = vec!["Made to order".to_string(), "Styled by your host".to_string()];
    if let Some(occasion) = &request.occasion {
        features.push(format!("Ideal for {occasion}"));
    }

    Product {
        id: format!("dyn-{}", hex(&digest[..6])),
        image: placeholder_image(&title),
        title,
        price,
        category: category.to_string(),
        description: long_description,
        rating: Rating {
            rate: (40 + (seed >> 10) % 10) as f64 / 10.0,
            count: 12 + ((seed >> 20) % 488) as u32,
        },
        material: words_in(description, MATERIALS)
            .into_iter()
            .next()
            .or_else(|| default_material(category)),
        color_options,
        size_options: sizes_for(category),
        style_tags,
        brand: Some(SYNTHETIC_BRAND.to_string()),
        features,
        viewers: 3 + ((seed >> 30) % 25) as u32,
        dynamic: true,
    }
}

// ── Outfits ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutfitSlot {
    Top,
    Bottom,
    Footwear,
    Outerwear,
    Accessory,
}

impl OutfitSlot {
    pub const ALL: [OutfitSlot; 5] = [
        Self::Top,
        Self::Bottom,
        Self::Footwear,
        Self::Outerwear,
        Self::Accessory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Footwear => "footwear",
            Self::Outerwear => "outerwear",
            Self::Accessory => "accessory",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Top => &[
                "shirt", "blouse", "top", "tee", "t-shirt", "sweater", "knit", "camisole",
            ],
            Self::Bottom => &["skirt", "trousers", "pants", "jeans", "shorts", "chinos"],
            Self::Footwear => &[
                "shoes", "heels", "sneakers", "boots", "loafers", "sandals", "flats",
            ],
            Self::Outerwear => &["jacket", "blazer", "coat", "cardigan", "trench", "parka"],
            Self::Accessory => &[
                "bag", "handbag", "watch", "necklace", "earrings", "belt", "scarf", "hat",
            ],
        }
    }

    fn garment(self, gender: Gender) -> &'static str {
        match (self, gender) {
            (Self::Top, Gender::Female) => "silk blouse",
            (Self::Top, Gender::Male) => "oxford shirt",
            (Self::Top, Gender::Neutral) => "relaxed tee",
            (Self::Bottom, Gender::Female) => "midi skirt",
            (Self::Bottom, Gender::Male) => "tailored trousers",
            (Self::Bottom, Gender::Neutral) => "wide-leg trousers",
            (Self::Footwear, Gender::Female) => "block heels",
            (Self::Footwear, Gender::Male) => "leather loafers",
            (Self::Footwear, Gender::Neutral) => "canvas sneakers",
            (Self::Outerwear, Gender::Female) => "cropped jacket",
            (Self::Outerwear, Gender::Male) => "unstructured blazer",
            (Self::Outerwear, Gender::Neutral) => "overshirt",
            (Self::Accessory, Gender::Female) => "structured handbag",
            (Self::Accessory, Gender::Male) => "minimalist watch",
            (Self::Accessory, Gender::Neutral) => "canvas tote bag",
        }
    }

    fn matches(self, item: &str) -> bool {
        has_any(item, self.keywords())
    }
}

/// Input of [`synthesize_outfit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutfitRequest {
    pub base_item: String,
    pub occasion: Option<String>,
    pub style_preference: Option<String>,
    pub budget_range: Option<String>,
    pub gender: Option<Gender>,
}

impl OutfitRequest {
    /// Read a `create_complete_outfit` call.
    pub fn from_call(call: &ToolCall) -> Self {
        Self {
            base_item: call.str_arg("base_item").unwrap_or_default().to_string(),
            occasion: call.str_arg("occasion").map(str::to_string),
            style_preference: call.str_arg("style_preference").map(str::to_string),
            budget_range: call.str_arg("budget_range").map(str::to_string),
            gender: call.str_arg("gender").and_then(Gender::parse),
        }
    }

    pub fn gender(&self, defaults: &SynthesisDefaults) -> Gender {
        let context = format!(
            "{} {} {}",
            self.base_item,
            self.style_preference.as_deref().unwrap_or_default(),
            self.occasion.as_deref().unwrap_or_default()
        );
        self.gender
            .or_else(|| Gender::detect(&context))
            .or_else(|| has_any(&self.base_item, FEMININE_GARMENTS).then_some(Gender::Female))
            .unwrap_or(defaults.gender)
    }
}

/// One product per [`OutfitSlot`]. The base item fills the slot it belongs
/// to (the top slot when it matches none); the others get gender-specific
/// garments in the requested style.
pub fn synthesize_outfit(request: &OutfitRequest, defaults: &SynthesisDefaults) -> Vec<Product> {
    let gender = request.gender(defaults);
    let base_item = request.base_item.trim();
    let base_slot = (!base_item.is_empty()).then(|| {
        OutfitSlot::ALL
            .into_iter()
            .find(|slot| slot.matches(base_item))
            .unwrap_or(OutfitSlot::Top)
    });
    let style = request.style_preference.as_deref().unwrap_or_default();

    OutfitSlot::ALL
        .into_iter()
        .map(|slot| {
            let description = if base_slot == Some(slot) {
                base_item.to_string()
            } else {
                format!("{style} {}", slot.garment(gender)).trim().to_string()
            };
            let reasoning = match (style.is_empty(), base_item.is_empty()) {
                (false, false) => format!("Completes a {style} look built around your {base_item}"),
                (false, true) => format!("Part of a {style} look"),
                (true, false) => format!("Pairs with your {base_item}"),
                (true, true) => "Part of a complete look".to_string(),
            };
            let mut product = synthesize_product(
                &SynthesisRequest {
                    description,
                    style_reasoning: Some(reasoning),
                    occasion: request.occasion.clone(),
                    price_range: request.budget_range.clone(),
                    gender: Some(gender),
                },
                defaults,
            );
            product.features.insert(0, format!("Outfit {}", slot.as_str()));
            product
        })
        .collect()
}

// ── Style matches ────────────────────────────────────────────────────────────

fn style_garments(gender: Gender) -> [&'static str; 4] {
    match gender {
        Gender::Female => ["wrap dress", "blouse", "midi skirt", "cardigan"],
        Gender::Male => ["shirt", "chinos", "overshirt", "knit sweater"],
        Gender::Neutral => ["tee", "trousers", "jacket", "tote bag"],
    }
}

/// Fallback for `find_and_display_style_matches` when the catalog has no
/// match: `count` synthesized pieces in the requested colour and style.
pub fn synthesize_style_matches(
    color: &str,
    style: &str,
    defaults: &SynthesisDefaults,
    count: usize,
) -> Vec<Product> {
    let color = color.trim();
    let style = style.trim();
    style_garments(defaults.gender)
        .into_iter()
        .cycle()
        .take(count)
        .enumerate()
        .map(|(i, garment)| {
            let description = format!("{color} {style} {garment}")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            synthesize_product(
                &SynthesisRequest {
                    description,
                    style_reasoning: Some(format!("Match #{} for your {style} style in {color}", i + 1)),
                    gender: Some(defaults.gender),
                    ..Default::default()
                },
                defaults,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn defaults() -> SynthesisDefaults {
        SynthesisDefaults::default()
    }

    #[test]
    fn same_request_same_product() {
        let request = SynthesisRequest {
            description: "Emerald silk slip dress".into(),
            occasion: Some("gala".into()),
            ..Default::default()
        };
        let a = synthesize_product(&request, &defaults());
        let b = synthesize_product(&request, &defaults());
        assert_eq!(a, b);
        assert!(a.id.starts_with("dyn-"));
        assert_eq!(a.id.len(), "dyn-".len() + 12);
        assert!(a.dynamic);

        let other = synthesize_product(&SynthesisRequest::new("Emerald silk slip dress"), &defaults());
        assert_ne!(a.id, other.id);
    }

    #[test]
    fn product_is_fully_populated() {
        let product = synthesize_product(
            &SynthesisRequest {
                description: "red linen wrap dress".into(),
                style_reasoning: Some("Suits a bohemian wardrobe".into()),
                occasion: Some("beach wedding".into()),
                price_range: Some("budget".into()),
                gender: None,
            },
            &defaults(),
        );
        assert_eq!(product.title, "Red Linen Wrap Dress");
        assert_eq!(product.category, "women's clothing");
        assert!((19.0..=49.0).contains(&product.price));
        assert!(product.image.starts_with("https://placehold.co/"));
        assert!(product.image.contains("Red%20Linen"));
        assert_eq!(product.material.as_deref(), Some("linen"));
        assert_eq!(product.color_options, vec!["red"]);
        assert!(product.style_tags.contains(&"bohemian".to_string()));
        assert!(product.style_tags.contains(&"beach wedding".to_string()));
        assert!((4.0..=4.9).contains(&product.rating.rate));
        assert!(product.viewers >= 3);
        assert!(!product.size_options.is_empty());
    }

    #[test]
    fn category_heuristics() {
        let category = |text: &str| synthesize_product(&SynthesisRequest::new(text), &defaults()).category;
        assert_eq!(category("gold hoop earrings"), "jewelery");
        assert_eq!(category("noise cancelling headphones"), "electronics");
        assert_eq!(category("men's wool overcoat"), "men's clothing");
        assert_eq!(category("linen shirt for him"), "men's clothing");
        assert_eq!(category("pleated skirt"), "women's clothing");
        // No signal: the configured default decides.
        assert_eq!(category("linen shirt"), "women's clothing");
        let male = SynthesisDefaults { gender: Gender::Male };
        assert_eq!(
            synthesize_product(&SynthesisRequest::new("linen shirt"), &male).category,
            "men's clothing"
        );
    }

    #[test]
    fn empty_description_still_yields_product() {
        let product = synthesize_product(&SynthesisRequest::default(), &defaults());
        assert_eq!(product.title, "Curated Piece");
        assert!(product.price > 0.0);
    }

    #[test]
    fn price_hints() {
        assert_eq!(price_bounds(Some("$50-$100")), (50.0, 100.0));
        assert_eq!(price_bounds(Some("under $80")), (40.0, 80.0));
        assert_eq!(price_bounds(Some("1,200 to 1,500")), (1200.0, 1500.0));
        assert_eq!(price_bounds(Some("luxury")), PriceTier::Luxury.bounds());
        assert_eq!(price_bounds(None), PriceTier::Moderate.bounds());
        assert_eq!(price_bounds(Some("whatever")), PriceTier::Moderate.bounds());
    }

    #[test]
    fn gender_parsing_and_detection() {
        assert_eq!(Gender::parse("Men's"), Some(Gender::Male));
        assert_eq!(Gender::parse("unisex"), Some(Gender::Neutral));
        assert_eq!(Gender::parse("robot"), None);
        assert_eq!(Gender::detect("a gift for my wife"), Some(Gender::Female));
        assert_eq!(Gender::detect("womenswear"), None);
        assert_eq!(Gender::detect("his and her robes"), Some(Gender::Neutral));
    }

    #[test]
    fn outfit_has_one_product_per_slot() {
        let outfit = synthesize_outfit(
            &OutfitRequest {
                base_item: "white linen shirt".into(),
                occasion: Some("summer dinner".into()),
                style_preference: Some("classic".into()),
                budget_range: Some("premium".into()),
                gender: Some(Gender::Male),
            },
            &defaults(),
        );
        assert_eq!(outfit.len(), 5);
        assert_eq!(outfit[0].title, "White Linen Shirt");
        assert_eq!(outfit[1].title, "Classic Tailored Trousers");
        assert!(outfit.iter().all(|p| p.category == "men's clothing"));
        assert!(outfit.iter().all(|p| (120.0..=280.0).contains(&p.price)));
        let mut ids: Vec<_> = outfit.iter().map(|p| p.id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn outfit_base_item_fills_matching_slot() {
        let outfit = synthesize_outfit(
            &OutfitRequest {
                base_item: "black leather boots".into(),
                ..Default::default()
            },
            &defaults(),
        );
        assert_eq!(outfit[2].title, "Black Leather Boots");
        assert_eq!(outfit[0].title, "Silk Blouse");
        assert!(outfit.iter().all(|p| p.category == "women's clothing"));
    }

    #[test]
    fn style_matches_respect_count() {
        let products = synthesize_style_matches("blue", "minimalist", &defaults(), 4);
        assert_eq!(products.len(), 4);
        assert!(products.iter().all(|p| p.dynamic));
        assert!(products.iter().all(|p| p.color_options == vec!["blue"]));
        assert!(products[0].style_tags.contains(&"minimalist".to_string()));
    }

    #[test]
    fn request_from_call() {
        let call = ToolCall::from_json(
            "create_dynamic_product",
            json!({"product_description": "velvet blazer", "occasion": "gala", "gender": "male"}),
        );
        let request = SynthesisRequest::from_call(&call);
        assert_eq!(request.description, "velvet blazer");
        assert_eq!(request.gender, Some(Gender::Male));
        assert_eq!(request.price_range, None);
    }
}
