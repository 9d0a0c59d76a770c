//! Wire types shared by the relay and the in-app dispatcher.
//!
//! Three kinds of JSON travel through TalkShop:
//! - provider webhook envelopes (`event_type` discriminated), POSTed to the relay
//! - data-channel `app-message` payloads (`type` discriminated), received by the app
//! - relay frames pushed down the per-conversation event stream
//!
//! All of them converge on the canonical [`ToolCall`] shape.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ── Constants ────────────────────────────────────────────────────────────────

/// Minimum spacing between two accepted perception events.
pub const PERCEPTION_THROTTLE_MS: u64 = 5_000;
/// How long a focused product stays highlighted.
pub const FOCUS_CLEAR_MS: u64 = 5_000;
/// How long the add-to-cart success animation stays visible.
pub const CART_SUCCESS_MS: u64 = 2_000;
/// Keep-alive interval on relay event streams.
pub const KEEPALIVE_INTERVAL_SECS: u64 = 30;
/// Catalog cache lifetime.
pub const CATALOG_CACHE_TTL_SECS: u64 = 900; // 15 min
/// Last path segment of the webhook endpoint.
pub const WEBHOOK_PATH_SEGMENT: &str = "tavus-webhook";

/// Provider webhook `event_type` values.
pub mod event_types {
    pub const TOOL_CALL: &str = "conversation.tool_call";
    pub const PERCEPTION_TOOL_CALL: &str = "conversation.perception_tool_call";
    pub const SHUTDOWN: &str = "system.shutdown";
}

/// Data-channel and relay frame `type` values.
pub mod message_types {
    pub const TOOL_CALL: &str = "conversation-toolcall";
    pub const UTTERANCE: &str = "conversation-utterance";
    pub const REPLICA_SPEAKING: &str = "conversation-replica-start-stop-speaking-event";
    pub const CONNECTED: &str = "connected";
    pub const PING: &str = "ping";
}

// ── Tool call ────────────────────────────────────────────────────────────────

pub type Arguments = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, thiserror::Error)]
pub enum ArgumentsError {
    #[error("arguments are not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Canonical tool call consumed by the dispatcher, whatever its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: Arguments,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
        }
    }

    /// Build a call from a `json!({...})` literal. Non-object values yield
    /// empty arguments.
    pub fn from_json(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            _ => Arguments::new(),
        };
        Self::new(name, arguments)
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn tool(&self) -> ToolName {
        ToolName::parse(&self.function.name)
    }

    pub fn arguments(&self) -> &Arguments {
        &self.function.arguments
    }

    /// Non-empty string argument. Numbers are not coerced.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.function
            .arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Identifier argument: strings as-is, numbers rendered.
    pub fn id_arg(&self, key: &str) -> Option<String> {
        match self.function.arguments.get(key)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Numeric argument, accepting numbers and numeric strings.
    pub fn f64_arg(&self, key: &str) -> Option<f64> {
        match self.function.arguments.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// List argument: a JSON array of strings/numbers or a comma separated string.
    pub fn list_arg(&self, key: &str) -> Vec<String> {
        match self.function.arguments.get(key) {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s.trim().to_string()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(serde_json::Value::String(s)) => s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Parse tool-call arguments that may arrive as an object, a JSON-encoded
/// string, or nothing at all.
pub fn parse_arguments(value: &serde_json::Value) -> Result<Arguments, ArgumentsError> {
    match value {
        serde_json::Value::Object(map) => Ok(map.clone()),
        serde_json::Value::Null => Ok(Arguments::new()),
        serde_json::Value::String(raw) => {
            if raw.trim().is_empty() {
                return Ok(Arguments::new());
            }
            match serde_json::from_str::<serde_json::Value>(raw)? {
                serde_json::Value::Object(map) => Ok(map),
                other => Err(ArgumentsError::NotAnObject(json_kind(&other))),
            }
        },
        other => Err(ArgumentsError::NotAnObject(json_kind(other))),
    }
}

fn deserialize_arguments<'de, D>(deserializer: D) -> Result<Arguments, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    parse_arguments(&value).map_err(serde::de::Error::custom)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ── Tool names ───────────────────────────────────────────────────────────────

/// Every tool name the host is allowed to call. Unknown names are kept in
/// [`ToolName::Other`] so they can be forwarded untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolName {
    ShowProduct,
    ShowProductGrid,
    ShowCategories,
    FocusOnProduct,
    FindAndDisplayStyleMatches,
    CreateDynamicProduct,
    CreateCompleteOutfit,
    CompareProducts,
    AddToCart,
    ProactivelyAddToCart,
    InitiateCheckout,
    AnalyzeObjectInView,
    DetectedUserStyle,
    SearchProducts,
    HighlightOffer,
    Show360View,
    Other(String),
}

impl ToolName {
    /// Every named variant, in declaration order.
    pub const KNOWN: [ToolName; 16] = [
        Self::ShowProduct,
        Self::ShowProductGrid,
        Self::ShowCategories,
        Self::FocusOnProduct,
        Self::FindAndDisplayStyleMatches,
        Self::CreateDynamicProduct,
        Self::CreateCompleteOutfit,
        Self::CompareProducts,
        Self::AddToCart,
        Self::ProactivelyAddToCart,
        Self::InitiateCheckout,
        Self::AnalyzeObjectInView,
        Self::DetectedUserStyle,
        Self::SearchProducts,
        Self::HighlightOffer,
        Self::Show360View,
    ];

    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "show_product" => Self::ShowProduct,
            "show_product_grid" => Self::ShowProductGrid,
            "show_categories" => Self::ShowCategories,
            "focus_on_product" => Self::FocusOnProduct,
            "find_and_display_style_matches" => Self::FindAndDisplayStyleMatches,
            "create_dynamic_product" => Self::CreateDynamicProduct,
            "create_complete_outfit" => Self::CreateCompleteOutfit,
            "compare_products" => Self::CompareProducts,
            "add_to_cart" => Self::AddToCart,
            "proactively_add_to_cart" => Self::ProactivelyAddToCart,
            "initiate_checkout" => Self::InitiateCheckout,
            "analyze_object_in_view" => Self::AnalyzeObjectInView,
            "detected_user_style" => Self::DetectedUserStyle,
            "search_products" => Self::SearchProducts,
            "highlight_offer" => Self::HighlightOffer,
            "show_360_view" => Self::Show360View,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ShowProduct => "show_product",
            Self::ShowProductGrid => "show_product_grid",
            Self::ShowCategories => "show_categories",
            Self::FocusOnProduct => "focus_on_product",
            Self::FindAndDisplayStyleMatches => "find_and_display_style_matches",
            Self::CreateDynamicProduct => "create_dynamic_product",
            Self::CreateCompleteOutfit => "create_complete_outfit",
            Self::CompareProducts => "compare_products",
            Self::AddToCart => "add_to_cart",
            Self::ProactivelyAddToCart => "proactively_add_to_cart",
            Self::InitiateCheckout => "initiate_checkout",
            Self::AnalyzeObjectInView => "analyze_object_in_view",
            Self::DetectedUserStyle => "detected_user_style",
            Self::SearchProducts => "search_products",
            Self::HighlightOffer => "highlight_offer",
            Self::Show360View => "show_360_view",
            Self::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Webhook envelopes ────────────────────────────────────────────────────────

/// The parts of a provider webhook envelope the relay inspects. The raw JSON
/// is kept separately so unrecognised envelopes can be republished verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl WebhookEnvelope {
    /// `event_type`, falling back to `type`.
    pub fn kind(&self) -> Option<&str> {
        self.event_type.as_deref().or(self.message_type.as_deref())
    }
}

/// `properties` of a tool-call envelope. `arguments` stays raw because it may
/// be a JSON-encoded string that fails to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallProperties {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCallProperties {
    pub fn into_tool_call(self) -> Result<ToolCall, ArgumentsError> {
        let arguments = parse_arguments(&self.arguments)?;
        Ok(ToolCall::new(self.name, arguments))
    }
}

// ── Relay frames ─────────────────────────────────────────────────────────────

/// Frames the relay writes on an event stream in addition to verbatim
/// provider envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayFrame {
    #[serde(rename = "connected")]
    Connected { conversation_id: String },
    #[serde(rename = "conversation-toolcall")]
    ToolCall {
        conversation_id: String,
        tool_call: ToolCall,
    },
    #[serde(rename = "ping")]
    Ping,
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn arguments_accept_encoded_string() {
        let call: ToolCall = serde_json::from_value(json!({
            "function": {"name": "add_to_cart", "arguments": "{\"product_id\":\"7\",\"quantity\":2}"}
        }))
        .unwrap();
        assert_eq!(call.str_arg("product_id"), Some("7"));
        assert_eq!(call.f64_arg("quantity"), Some(2.0));
    }

    #[test]
    fn missing_arguments_are_empty() {
        let call: ToolCall =
            serde_json::from_value(json!({"function": {"name": "show_categories"}})).unwrap();
        assert!(call.arguments().is_empty());
        assert_eq!(call.tool(), ToolName::ShowCategories);
    }

    #[test]
    fn invalid_argument_string_is_rejected() {
        let err = parse_arguments(&json!("{not json")).unwrap_err();
        assert!(matches!(err, ArgumentsError::InvalidJson(_)));
        let err = parse_arguments(&json!("[1,2]")).unwrap_err();
        assert!(matches!(err, ArgumentsError::NotAnObject("array")));
    }

    #[test]
    fn tool_names_round_trip() {
        for tool in ToolName::KNOWN {
            assert_eq!(ToolName::parse(tool.as_str()), tool);
            assert!(tool.is_known());
        }
        assert_eq!(
            ToolName::parse("negotiate_price"),
            ToolName::Other("negotiate_price".into())
        );
    }

    #[test]
    fn list_arg_accepts_array_and_csv() {
        let call = ToolCall::from_json(
            "compare_products",
            json!({"product_ids": [1, "2", ""], "tags": "boho, summer"}),
        );
        assert_eq!(call.list_arg("product_ids"), vec!["1", "2"]);
        assert_eq!(call.list_arg("tags"), vec!["boho", "summer"]);
    }

    #[test]
    fn relay_frames_are_type_tagged() {
        assert_eq!(
            serde_json::to_value(RelayFrame::Ping).unwrap(),
            json!({"type": "ping"})
        );
        let frame = RelayFrame::ToolCall {
            conversation_id: "c1".into(),
            tool_call: ToolCall::from_json("show_categories", json!({})),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "conversation-toolcall");
        assert_eq!(value["tool_call"]["function"]["name"], "show_categories");
    }

    #[test]
    fn envelope_kind_falls_back_to_type() {
        let envelope: WebhookEnvelope =
            serde_json::from_value(json!({"type": "system.replica_joined"})).unwrap();
        assert_eq!(envelope.kind(), Some("system.replica_joined"));
    }
}
