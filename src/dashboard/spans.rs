use crate::dashboard::breakpoint::LayoutTier;
use crate::dashboard::config::{LayoutPreferences, WidgetId};
use crate::dashboard::store::PreferenceStore;
use std::collections::HashMap;

/// Narrowest span a widget may occupy.
pub const MIN_SPAN: u8 = 3;
/// Full width in wide-tier units.
pub const MAX_SPAN: u8 = 12;
/// Span used for widgets without a registered default.
pub const DEFAULT_SPAN: u8 = 3;
/// Span a maximized widget falls back to when no earlier size is known.
pub const RESTORE_SPAN: u8 = 6;

pub fn clamp_span(span: i64) -> u8 {
    span.clamp(MIN_SPAN as i64, MAX_SPAN as i64) as u8
}

/// Presentation bucket derived from a widget's effective span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeTier {
    Small,
    Medium,
    Large,
}

impl SizeTier {
    pub fn for_span(span: u8) -> Self {
        match span {
            s if s >= 9 => SizeTier::Large,
            s if s >= 6 => SizeTier::Medium,
            _ => SizeTier::Small,
        }
    }
}

/// Styling hints handed to widget bodies so content can scale with its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentStyle {
    pub font: SizeTier,
    pub padding: SizeTier,
}

impl ContentStyle {
    pub fn for_span(span: u8) -> Self {
        let tier = SizeTier::for_span(span);
        Self {
            font: tier,
            padding: tier,
        }
    }

    pub fn body_size(&self) -> f32 {
        match self.font {
            SizeTier::Small => 13.0,
            SizeTier::Medium => 15.0,
            SizeTier::Large => 18.0,
        }
    }

    pub fn heading_size(&self) -> f32 {
        self.body_size() + 4.0
    }

    pub fn inner_margin(&self) -> f32 {
        match self.padding {
            SizeTier::Small => 8.0,
            SizeTier::Medium => 12.0,
            SizeTier::Large => 16.0,
        }
    }
}

/// Resolves desired and effective spans from the registered defaults and the
/// span overrides held in [`LayoutPreferences`].
#[derive(Debug, Clone, Default)]
pub struct SpanRegistry {
    defaults: HashMap<WidgetId, u8>,
}

impl SpanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: WidgetId, default_span: u8) {
        self.defaults.insert(id, clamp_span(default_span as i64));
    }

    pub fn default_span(&self, id: &str) -> u8 {
        self.defaults.get(id).copied().unwrap_or(DEFAULT_SPAN)
    }

    /// Desired span in wide units: the stored override or the default.
    pub fn desired_span(&self, prefs: &LayoutPreferences, id: &str) -> u8 {
        prefs.span(id).unwrap_or_else(|| self.default_span(id))
    }

    /// Span actually rendered in `tier`; always within `[MIN_SPAN, tier.columns()]`.
    pub fn effective_span(&self, prefs: &LayoutPreferences, id: &str, tier: LayoutTier) -> u8 {
        self.desired_span(prefs, id).min(tier.columns())
    }

    pub fn font_tier(&self, prefs: &LayoutPreferences, id: &str, tier: LayoutTier) -> SizeTier {
        SizeTier::for_span(self.effective_span(prefs, id, tier))
    }

    pub fn padding_tier(&self, prefs: &LayoutPreferences, id: &str, tier: LayoutTier) -> SizeTier {
        SizeTier::for_span(self.effective_span(prefs, id, tier))
    }

    pub fn content_style(&self, prefs: &LayoutPreferences, id: &str, tier: LayoutTier) -> ContentStyle {
        ContentStyle {
            font: self.font_tier(prefs, id, tier),
            padding: self.padding_tier(prefs, id, tier),
        }
    }

    /// Store a new desired span for `id`. Out-of-range input is clamped.
    /// Returns `true` when the stored layout changed.
    pub fn set_desired_span(&self, store: &mut PreferenceStore, id: &WidgetId, span: i64) -> bool {
        store.mutate(|mut prefs| {
            prefs.set_span(id, span);
            prefs
        })
    }
}
