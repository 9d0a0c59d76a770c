//! Human-in-the-loop confirmation for vision-inferred style.
//!
//! A `detected_user_style` perception call never reaches the dispatcher
//! directly. Its payload is staged here and shown to the user as a card;
//! only [`PerceptionGate::analyze`] turns it into a
//! `find_and_display_style_matches` call.

use {
    serde::Serialize,
    serde_json::json,
    talkshop_protocol::{Arguments, ToolCall, ToolName},
};

use crate::state::ViewStore;

/// Style payload waiting for the user's decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedStyle {
    pub dominant_color: Option<String>,
    pub style_category: Option<String>,
    pub raw: Arguments,
}

impl StagedStyle {
    pub fn from_arguments(raw: Arguments) -> Self {
        let field = |key: &str| {
            raw.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            dominant_color: field("dominant_color"),
            style_category: field("style_category"),
            raw,
        }
    }

    pub fn curation_title(&self) -> String {
        curation_title(
            self.dominant_color.as_deref(),
            self.style_category.as_deref(),
        )
    }
}

/// Grid title for a colour/style pair; contains both values when present.
pub fn curation_title(color: Option<&str>, style: Option<&str>) -> String {
    match (color, style) {
        (Some(color), Some(style)) => format!("Curated {style} styles in {color}"),
        (None, Some(style)) => format!("Curated {style} styles"),
        (Some(color), None) => format!("Curated looks in {color}"),
        (None, None) => "Curated for you".to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PerceptionState {
    #[default]
    Idle,
    PendingConfirmation(StagedStyle),
}

/// The notification card's state machine, stored in the shared view.
#[derive(Debug, Clone)]
pub struct PerceptionGate {
    view: ViewStore,
}

impl PerceptionGate {
    pub fn new(view: ViewStore) -> Self {
        Self { view }
    }

    /// Enter (or refresh) the pending state. A newer detection replaces the
    /// staged payload.
    pub fn stage(&self, arguments: Arguments) {
        let staged = StagedStyle::from_arguments(arguments);
        tracing::info!(
            color = staged.dominant_color.as_deref().unwrap_or("-"),
            style = staged.style_category.as_deref().unwrap_or("-"),
            "style detection staged for confirmation"
        );
        self.view
            .update(|view| view.perception = PerceptionState::PendingConfirmation(staged));
    }

    pub fn pending(&self) -> Option<StagedStyle> {
        match self.view.snapshot().perception {
            PerceptionState::PendingConfirmation(staged) => Some(staged),
            PerceptionState::Idle => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// User accepted: return to idle and produce the resolver call.
    pub fn analyze(&self) -> Option<ToolCall> {
        let staged = self.take()?;
        let mut arguments = Arguments::new();
        if let Some(color) = &staged.dominant_color {
            arguments.insert("dominant_color".into(), json!(color));
        }
        if let Some(style) = &staged.style_category {
            arguments.insert("style_category".into(), json!(style));
        }
        arguments.insert("curation_title".into(), json!(staged.curation_title()));
        Some(ToolCall::new(
            ToolName::FindAndDisplayStyleMatches.as_str(),
            arguments,
        ))
    }

    /// User closed the card. Returns whether anything was staged.
    pub fn dismiss(&self) -> bool {
        let dismissed = self.take().is_some();
        if dismissed {
            tracing::debug!("style detection dismissed");
        }
        dismissed
    }

    fn take(&self) -> Option<StagedStyle> {
        let mut taken = None;
        self.view.update(|view| {
            if let PerceptionState::PendingConfirmation(staged) =
                std::mem::take(&mut view.perception)
            {
                taken = Some(staged);
            }
        });
        taken
    }
}
