use crate::dashboard::breakpoint::LayoutTier;
use crate::dashboard::config::{LayoutPreferences, WidgetId};
use crate::dashboard::spans::{ContentStyle, SpanRegistry, MAX_SPAN, MIN_SPAN, RESTORE_SPAN};
use crate::dashboard::store::PreferenceStore;
use eframe::egui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseState {
    Expanded,
    Collapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeState {
    Sized,
    /// Occupying every column of the current tier.
    Maximized,
}

/// Derived chrome state of one widget in one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromeState {
    pub collapse: CollapseState,
    pub size: SizeState,
    pub span: u8,
    pub columns: u8,
}

impl ChromeState {
    pub fn resolve(
        prefs: &LayoutPreferences,
        spans: &SpanRegistry,
        id: &str,
        tier: LayoutTier,
    ) -> Self {
        let span = spans.effective_span(prefs, id, tier);
        let columns = tier.columns();
        Self {
            collapse: if prefs.is_collapsed(id) {
                CollapseState::Collapsed
            } else {
                CollapseState::Expanded
            },
            size: if span >= columns {
                SizeState::Maximized
            } else {
                SizeState::Sized
            },
            span,
            columns,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapse == CollapseState::Collapsed
    }

    pub fn is_maximized(&self) -> bool {
        self.size == SizeState::Maximized
    }

    pub fn can_grow(&self) -> bool {
        self.span < self.columns
    }

    pub fn can_shrink(&self) -> bool {
        self.span > MIN_SPAN
    }
}

/// User requests coming from a widget's header controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeAction {
    ToggleCollapse,
    IncreaseSpan,
    DecreaseSpan,
    ToggleMaximize,
}

/// Session-only chrome state for one widget.
///
/// Maximizing remembers the desired span the widget had before, and restoring
/// returns to it. When nothing was remembered (the widget was already full
/// width when the session started) or the remembered span would still fill
/// the tier, restore falls back to `min(RESTORE_SPAN, tier.columns())`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetChrome {
    restore_span: Option<u8>,
}

impl WidgetChrome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore_span(&self) -> Option<u8> {
        self.restore_span
    }

    /// Dispatch `action`. Span actions are ignored for widgets that are not
    /// resizable. Returns `true` when the stored layout changed.
    pub fn apply(
        &mut self,
        action: ChromeAction,
        id: &WidgetId,
        resizable: bool,
        store: &mut PreferenceStore,
        spans: &SpanRegistry,
        tier: LayoutTier,
    ) -> bool {
        tracing::debug!(widget = %id, ?action, tier = tier.name(), "dashboard.chrome_action");
        match action {
            ChromeAction::ToggleCollapse => self.toggle_collapse(id, store),
            _ if !resizable => false,
            ChromeAction::IncreaseSpan => self.increase_span(id, store, spans, tier),
            ChromeAction::DecreaseSpan => self.decrease_span(id, store, spans, tier),
            ChromeAction::ToggleMaximize => self.toggle_maximize(id, store, spans, tier),
        }
    }

    /// Collapse or expand. Spans are left untouched.
    pub fn toggle_collapse(&mut self, id: &WidgetId, store: &mut PreferenceStore) -> bool {
        store.mutate(|mut prefs| {
            let collapsed = prefs.is_collapsed(id.as_str());
            prefs.set_collapsed(id, !collapsed);
            prefs
        })
    }

    pub fn increase_span(
        &mut self,
        id: &WidgetId,
        store: &mut PreferenceStore,
        spans: &SpanRegistry,
        tier: LayoutTier,
    ) -> bool {
        let state = ChromeState::resolve(store.preferences(), spans, id.as_str(), tier);
        if !state.can_grow() {
            return false;
        }
        spans.set_desired_span(store, id, state.span as i64 + 1)
    }

    pub fn decrease_span(
        &mut self,
        id: &WidgetId,
        store: &mut PreferenceStore,
        spans: &SpanRegistry,
        tier: LayoutTier,
    ) -> bool {
        let state = ChromeState::resolve(store.preferences(), spans, id.as_str(), tier);
        if !state.can_shrink() {
            return false;
        }
        spans.set_desired_span(store, id, state.span as i64 - 1)
    }

    pub fn toggle_maximize(
        &mut self,
        id: &WidgetId,
        store: &mut PreferenceStore,
        spans: &SpanRegistry,
        tier: LayoutTier,
    ) -> bool {
        let state = ChromeState::resolve(store.preferences(), spans, id.as_str(), tier);
        let columns = tier.columns();
        if state.is_maximized() {
            let target = self
                .restore_span
                .take()
                .filter(|span| *span < columns)
                .unwrap_or_else(|| RESTORE_SPAN.min(columns));
            spans.set_desired_span(store, id, target as i64)
        } else {
            let desired = spans.desired_span(store.preferences(), id.as_str());
            let changed = spans.set_desired_span(store, id, MAX_SPAN as i64);
            if changed {
                self.restore_span = Some(desired);
            }
            changed
        }
    }
}

/// Draw a widget header: drag handle with the title, then the chrome buttons.
///
/// Returns the drag handle's response and the action the user clicked, if any.
pub fn header_ui(
    ui: &mut egui::Ui,
    title: &str,
    state: ChromeState,
    resizable: bool,
    style: &ContentStyle,
) -> (egui::Response, Option<ChromeAction>) {
    let mut action = None;
    let handle = ui
        .horizontal(|ui| {
            let handle = ui
                .add(
                    egui::Label::new(egui::RichText::new(title).strong().size(style.heading_size()))
                        .sense(egui::Sense::drag()),
                )
                .on_hover_cursor(egui::CursorIcon::Grab);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let collapse_label = if state.is_collapsed() { "▸" } else { "▾" };
                let collapse_hint = if state.is_collapsed() { "Expand" } else { "Collapse" };
                if ui.small_button(collapse_label).on_hover_text(collapse_hint).clicked() {
                    action = Some(ChromeAction::ToggleCollapse);
                }
                if resizable && !state.is_collapsed() {
                    let (max_label, max_hint) = if state.is_maximized() {
                        ("restore", "Return to the previous width")
                    } else {
                        ("max", "Full width")
                    };
                    if ui.small_button(max_label).on_hover_text(max_hint).clicked() {
                        action = Some(ChromeAction::ToggleMaximize);
                    }
                    if ui
                        .add_enabled(state.can_grow(), egui::Button::new("+").small())
                        .on_hover_text("Wider")
                        .clicked()
                    {
                        action = Some(ChromeAction::IncreaseSpan);
                    }
                    if ui
                        .add_enabled(state.can_shrink(), egui::Button::new("−").small())
                        .on_hover_text("Narrower")
                        .clicked()
                    {
                        action = Some(ChromeAction::DecreaseSpan);
                    }
                }
            });
            handle
        })
        .inner;
    (handle, action)
}
