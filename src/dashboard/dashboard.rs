use crate::dashboard::breakpoint::{LayoutTier, ViewportTracker, WIDE_MIN_WIDTH};
use crate::dashboard::chrome::{header_ui, ChromeAction, ChromeState, WidgetChrome};
use crate::dashboard::config::{LayoutPreferences, WidgetId};
use crate::dashboard::reorder::{DragController, DragOutcome};
use crate::dashboard::spans::{ContentStyle, SpanRegistry};
use crate::dashboard::store::{PreferenceBackend, PreferenceStore};
use crate::dashboard::widgets::{Widget, WidgetRegistry};
use crate::settings::Settings;
use eframe::egui;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Position of one widget in the responsive grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPlacement {
    pub id: WidgetId,
    /// Index in the ordering.
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub span: u8,
    pub collapsed: bool,
}

/// Flow widgets row by row in ordering. A widget that does not fit in the
/// columns left on the current row starts a new row.
pub fn place_widgets(
    prefs: &LayoutPreferences,
    spans: &SpanRegistry,
    tier: LayoutTier,
) -> Vec<GridPlacement> {
    let columns = tier.columns() as usize;
    let mut row = 0;
    let mut col = 0;
    let mut placements = Vec::with_capacity(prefs.order.len());
    for (index, id) in prefs.order.iter().enumerate() {
        let span = spans.effective_span(prefs, id.as_str(), tier);
        if col > 0 && col + span as usize > columns {
            row += 1;
            col = 0;
        }
        placements.push(GridPlacement {
            id: id.clone(),
            index,
            row,
            col,
            span,
            collapsed: prefs.is_collapsed(id.as_str()),
        });
        col += span as usize;
        if col >= columns {
            row += 1;
            col = 0;
        }
    }
    placements
}

/// Id source of a widget's body scroll area.
fn body_scroll_id(id: &WidgetId) -> egui::Id {
    egui::Id::new(("dashboard-body", id.as_str()))
}

/// Sizes used when drawing the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub row_height: f32,
    pub collapsed_height: f32,
    pub resize_throttle: Duration,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for GridMetrics {
    fn from(settings: &Settings) -> Self {
        Self {
            row_height: settings.row_height.max(settings.collapsed_height),
            collapsed_height: settings.collapsed_height,
            resize_throttle: Duration::from_millis(settings.resize_throttle_ms),
        }
    }
}

/// The widget dashboard: owns the preference store and draws the grid.
pub struct Dashboard {
    registry: WidgetRegistry,
    spans: SpanRegistry,
    store: PreferenceStore,
    viewport: ViewportTracker,
    drag: DragController,
    chrome: HashMap<WidgetId, WidgetChrome>,
    widgets: HashMap<WidgetId, Box<dyn Widget>>,
    metrics: GridMetrics,
    placements: Vec<GridPlacement>,
    placed_for: Option<(u64, LayoutTier)>,
}

impl Dashboard {
    pub fn new(
        registry: WidgetRegistry,
        backend: Arc<dyn PreferenceBackend>,
        settings: &Settings,
    ) -> Self {
        let store = PreferenceStore::new(backend, registry.ids().to_vec(), registry.rules().to_vec())
            .with_max_passes(settings.normalize_max_passes);
        Self::with_store(registry, store, GridMetrics::from(settings))
    }

    /// Build around an existing store. Loading starts immediately.
    pub fn with_store(registry: WidgetRegistry, mut store: PreferenceStore, metrics: GridMetrics) -> Self {
        store.begin_load();
        let spans = registry.span_registry();
        let widgets = registry
            .ids()
            .iter()
            .filter_map(|id| registry.create(id.as_str()).map(|w| (id.clone(), w)))
            .collect();
        Self {
            registry,
            spans,
            store,
            viewport: ViewportTracker::new(WIDE_MIN_WIDTH, metrics.resize_throttle),
            drag: DragController::new(),
            chrome: HashMap::new(),
            widgets,
            metrics,
            placements: Vec::new(),
            placed_for: None,
        }
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn spans(&self) -> &SpanRegistry {
        &self.spans
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PreferenceStore {
        &mut self.store
    }

    pub fn tier(&self) -> LayoutTier {
        self.viewport.tier()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.dragging().is_some()
    }

    /// Poll the pending load. Returns `true` once preferences are available.
    pub fn is_ready(&mut self) -> bool {
        self.store.poll_load()
    }

    /// Feed a viewport width; returns the new tier when it changed.
    pub fn observe_viewport(&mut self, width: f32, now: Instant) -> Option<LayoutTier> {
        self.viewport.observe(width, now)
    }

    /// Current grid positions, or `None` while preferences are still loading.
    pub fn placements(&mut self) -> Option<&[GridPlacement]> {
        if !self.store.poll_load() {
            return None;
        }
        let key = (self.store.revision(), self.viewport.tier());
        if self.placed_for != Some(key) {
            self.placements = place_widgets(self.store.preferences(), &self.spans, key.1);
            self.placed_for = Some(key);
        }
        Some(&self.placements)
    }

    pub fn content_style(&self, id: &str) -> ContentStyle {
        self.spans
            .content_style(self.store.preferences(), id, self.viewport.tier())
    }

    pub fn chrome_state(&self, id: &str) -> ChromeState {
        ChromeState::resolve(self.store.preferences(), &self.spans, id, self.viewport.tier())
    }

    /// Apply a header action to `id` in the current tier.
    pub fn apply_chrome(&mut self, id: &WidgetId, action: ChromeAction) -> bool {
        if !self.registry.contains(id.as_str()) {
            return false;
        }
        let resizable = self.registry.is_resizable(id.as_str());
        let tier = self.viewport.tier();
        let chrome = self.chrome.entry(id.clone()).or_default();
        chrome.apply(action, id, resizable, &mut self.store, &self.spans, tier)
    }

    pub fn begin_drag(&mut self, index: usize) {
        if self.store.is_loaded() && index < self.store.preferences().order.len() {
            self.drag.start(index);
        }
    }

    pub fn cancel_drag(&mut self) -> bool {
        self.drag.cancel() == DragOutcome::Cancelled
    }

    /// Finish a drag over `destination`. A destination outside the ordering
    /// counts as no drop target. Returns `true` when the ordering changed.
    pub fn drop_at(&mut self, destination: Option<usize>) -> bool {
        let len = self.store.preferences().order.len();
        let destination = destination.filter(|d| *d < len);
        self.drag.drop_into(&mut self.store, destination)
    }

    pub fn collapse_all(&mut self) -> bool {
        self.set_all_collapsed(true)
    }

    pub fn expand_all(&mut self) -> bool {
        self.set_all_collapsed(false)
    }

    fn set_all_collapsed(&mut self, collapsed: bool) -> bool {
        let ids = self.registry.ids().to_vec();
        self.store.mutate(move |mut prefs| {
            for id in &ids {
                prefs.set_collapsed(id, collapsed);
            }
            prefs
        })
    }

    /// Back to registration order with default spans, everything expanded.
    pub fn reset_layout(&mut self) -> bool {
        self.chrome.clear();
        self.store.reset()
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        if !self.store.poll_load() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading layout…");
            });
            ui.ctx().request_repaint();
            return;
        }

        let now = Instant::now();
        self.viewport.flush(now);
        // Tiers follow the window, not the space left inside enclosing panels.
        self.observe_viewport(ui.ctx().screen_rect().width(), now);
        if self.viewport.has_pending() {
            ui.ctx().request_repaint_after(self.metrics.resize_throttle);
        }

        let tier = self.viewport.tier();
        let placements = match self.placements() {
            Some(placements) => placements.to_vec(),
            None => return,
        };
        let columns = tier.columns() as usize;
        let spacing = ui.spacing().item_spacing;
        let width = ui.available_width();
        let col_width = ((width - spacing.x * (columns - 1) as f32) / columns as f32).max(1.0);

        let row_count = placements.iter().map(|p| p.row + 1).max().unwrap_or(0);
        let mut row_heights = vec![0.0f32; row_count];
        for p in &placements {
            let height = if p.collapsed {
                self.metrics.collapsed_height
            } else {
                self.metrics.row_height
            };
            row_heights[p.row] = row_heights[p.row].max(height);
        }
        let total_height =
            row_heights.iter().sum::<f32>() + spacing.y * row_count.saturating_sub(1) as f32;
        let (rect, _) = ui.allocate_exact_size(egui::vec2(width, total_height), egui::Sense::hover());

        let mut row_tops = Vec::with_capacity(row_count);
        let mut y = rect.min.y;
        for height in &row_heights {
            row_tops.push(y);
            y += height + spacing.y;
        }

        let mut slot_rects = Vec::with_capacity(placements.len());
        let mut actions = Vec::new();
        let mut drag_started = None;
        let mut drag_released = false;

        for p in &placements {
            let span = p.span as usize;
            let slot_rect = egui::Rect::from_min_size(
                egui::pos2(
                    rect.min.x + p.col as f32 * (col_width + spacing.x),
                    row_tops[p.row],
                ),
                egui::vec2(
                    col_width * span as f32 + spacing.x * span.saturating_sub(1) as f32,
                    if p.collapsed {
                        self.metrics.collapsed_height
                    } else {
                        row_heights[p.row]
                    },
                ),
            );
            slot_rects.push(slot_rect);

            let state = ChromeState::resolve(self.store.preferences(), &self.spans, p.id.as_str(), tier);
            let style = self.spans.content_style(self.store.preferences(), p.id.as_str(), tier);
            let title = self.registry.title(p.id.as_str()).to_string();
            let resizable = self.registry.is_resizable(p.id.as_str());
            let widget = self.widgets.get_mut(&p.id);

            let mut slot_ui = ui.child_ui_with_id_source(
                slot_rect,
                egui::Layout::top_down(egui::Align::LEFT),
                ("dashboard-slot", p.id.as_str()),
            );
            slot_ui.set_clip_rect(slot_rect.intersect(ui.clip_rect()));
            let (handle, action) =
                Self::render_slot(&mut slot_ui, slot_rect, &p.id, &title, state, resizable, &style, widget);

            if handle.drag_started() {
                drag_started = Some(p.index);
            }
            if handle.drag_stopped() {
                drag_released = true;
            }
            if let Some(action) = action {
                actions.push((p.id.clone(), action));
            }
        }

        if let Some(index) = drag_started {
            self.begin_drag(index);
        }
        if let Some(source) = self.drag.dragging() {
            let pointer = ui.input(|i| i.pointer.interact_pos().or(i.pointer.hover_pos()));
            let target = pointer.and_then(|pos| slot_rects.iter().position(|r| r.contains(pos)));
            if let Some(target) = target.filter(|t| *t != source) {
                ui.painter().rect_stroke(
                    slot_rects[target],
                    4.0,
                    egui::Stroke::new(2.0, ui.visuals().selection.stroke.color),
                );
            }
            if drag_released || ui.input(|i| i.pointer.any_released()) {
                self.drop_at(target);
            } else if !ui.input(|i| i.pointer.any_down()) {
                self.cancel_drag();
            }
        }

        for (id, action) in actions {
            self.apply_chrome(&id, action);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_slot(
        ui: &mut egui::Ui,
        slot_rect: egui::Rect,
        id: &WidgetId,
        title: &str,
        state: ChromeState,
        resizable: bool,
        style: &ContentStyle,
        widget: Option<&mut Box<dyn Widget>>,
    ) -> (egui::Response, Option<ChromeAction>) {
        let margin = style.inner_margin();
        egui::Frame::group(ui.style())
            .inner_margin(margin)
            .show(ui, |ui| {
                ui.set_min_width((slot_rect.width() - 2.0 * margin).max(0.0));
                ui.set_min_height((slot_rect.height() - 2.0 * margin).max(0.0));
                let header = header_ui(ui, title, state, resizable, style);
                if !state.is_collapsed() {
                    if let Some(widget) = widget {
                        ui.separator();
                        egui::ScrollArea::vertical()
                            .id_source(body_scroll_id(id))
                            .auto_shrink([false; 2])
                            .show(ui, |ui| widget.render(ui, style));
                    }
                }
                header
            })
            .inner
    }
}
