use crate::dashboard::config::WidgetId;
use crate::dashboard::layout::AdjacencyRule;
use crate::dashboard::spans::{clamp_span, ContentStyle, SpanRegistry, DEFAULT_SPAN};
use eframe::egui;
use std::collections::HashMap;
use std::sync::Arc;

mod placeholder;

pub use placeholder::PlaceholderWidget;

/// Widget trait implemented by all dashboard widget bodies.
pub trait Widget: Send {
    /// Draw the body. `style` carries the font and padding tiers that match
    /// the slot's current span.
    fn render(&mut self, ui: &mut egui::Ui, style: &ContentStyle);
}

/// Descriptor for building a widget body plus its layout defaults.
#[derive(Clone)]
pub struct WidgetDescriptor {
    title: String,
    default_span: u8,
    resizable: bool,
    ctor: Arc<dyn Fn() -> Box<dyn Widget> + Send + Sync>,
}

impl WidgetDescriptor {
    pub fn new<T, F>(title: impl Into<String>, build: F) -> Self
    where
        T: Widget + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            title: title.into(),
            default_span: DEFAULT_SPAN,
            resizable: true,
            ctor: Arc::new(move || Box::new(build())),
        }
    }

    pub fn with_default_span(mut self, span: u8) -> Self {
        self.default_span = clamp_span(span as i64);
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn default_span(&self) -> u8 {
        self.default_span
    }

    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    pub fn create(&self) -> Box<dyn Widget> {
        (self.ctor)()
    }
}

/// Registered widgets in registration order, plus the adjacency rules that
/// hold between them.
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    order: Vec<WidgetId>,
    map: HashMap<WidgetId, WidgetDescriptor>,
    rules: Vec<AdjacencyRule>,
}

impl WidgetRegistry {
    /// The workspace dashboard's widgets with placeholder bodies.
    pub fn with_defaults() -> Self {
        let mut reg = Self::default();
        reg.register(
            "client-lifecycle",
            WidgetDescriptor::new("Client lifecycle", || {
                PlaceholderWidget::new("Leads, active clients and closings by stage")
            })
            .with_default_span(6),
        );
        reg.register(
            "workspace-stages",
            WidgetDescriptor::new("Workspace stages", || {
                PlaceholderWidget::new("Open workspaces grouped by pipeline stage")
            })
            .with_default_span(6),
        );
        reg.register(
            "tasks",
            WidgetDescriptor::new("Tasks", || PlaceholderWidget::new("Tasks due this week"))
                .with_default_span(4),
        );
        reg.register(
            "emails",
            WidgetDescriptor::new("Emails", || PlaceholderWidget::new("Unread client emails"))
                .with_default_span(4),
        );
        reg.register(
            "transactions",
            WidgetDescriptor::new("Transactions", || {
                PlaceholderWidget::new("Transactions in escrow and recently closed")
            })
            .with_default_span(4),
        );
        reg.register(
            "parties",
            WidgetDescriptor::new("Parties", || {
                PlaceholderWidget::new("Buyers, sellers and agents on open deals")
            })
            .with_default_span(6),
        );
        reg.register(
            "calendar",
            WidgetDescriptor::new("Calendar", || PlaceholderWidget::new("Showings and deadlines"))
                .with_default_span(6),
        );
        reg.register(
            "documents",
            WidgetDescriptor::new("Documents", || {
                PlaceholderWidget::new("Documents awaiting signature")
            })
            .with_default_span(12)
            .resizable(false),
        );
        reg.add_rule(AdjacencyRule::new("client-lifecycle", "workspace-stages"));
        reg
    }

    /// Register a widget. Re-registering an id replaces its descriptor but
    /// keeps its original position in the registration order.
    pub fn register(&mut self, id: impl Into<WidgetId>, descriptor: WidgetDescriptor) {
        let id = id.into();
        if self.map.insert(id.clone(), descriptor).is_none() {
            self.order.push(id);
        }
    }

    pub fn add_rule(&mut self, rule: AdjacencyRule) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    pub fn ids(&self) -> &[WidgetId] {
        &self.order
    }

    pub fn rules(&self) -> &[AdjacencyRule] {
        &self.rules
    }

    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&WidgetDescriptor> {
        self.map.get(id)
    }

    pub fn create(&self, id: &str) -> Option<Box<dyn Widget>> {
        self.map.get(id).map(|d| d.create())
    }

    pub fn title<'a>(&'a self, id: &'a str) -> &'a str {
        self.map.get(id).map(|d| d.title()).unwrap_or(id)
    }

    pub fn is_resizable(&self, id: &str) -> bool {
        self.map.get(id).is_some_and(|d| d.is_resizable())
    }

    /// Span registry seeded with every widget's default span.
    pub fn span_registry(&self) -> SpanRegistry {
        let mut spans = SpanRegistry::new();
        for id in &self.order {
            if let Some(desc) = self.map.get(id.as_str()) {
                spans.register(id.clone(), desc.default_span());
            }
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct DummyWidget;

    impl Widget for DummyWidget {
        fn render(&mut self, _ui: &mut egui::Ui, _style: &ContentStyle) {}
    }

    #[test]
    fn registration_order_is_kept() {
        let mut reg = WidgetRegistry::default();
        reg.register("b", WidgetDescriptor::new("B", DummyWidget::default));
        reg.register("a", WidgetDescriptor::new("A", DummyWidget::default));
        reg.register(
            "b",
            WidgetDescriptor::new("B2", DummyWidget::default).with_default_span(9),
        );
        assert_eq!(reg.ids(), &[WidgetId::from("b"), WidgetId::from("a")]);
        assert_eq!(reg.title("b"), "B2");
        assert_eq!(reg.span_registry().default_span("b"), 9);
    }

    #[test]
    fn defaults_are_clamped_and_unknown_ids_fall_back() {
        let mut reg = WidgetRegistry::default();
        reg.register(
            "tiny",
            WidgetDescriptor::new("Tiny", DummyWidget::default).with_default_span(1),
        );
        assert_eq!(reg.get("tiny").unwrap().default_span(), 3);
        assert_eq!(reg.title("nope"), "nope");
        assert!(!reg.is_resizable("nope"));
        assert!(reg.create("nope").is_none());
        assert!(reg.create("tiny").is_some());
    }

    #[test]
    fn default_registry_pairs_lifecycle_with_stages() {
        let reg = WidgetRegistry::with_defaults();
        assert!(reg.contains("client-lifecycle"));
        assert!(reg.contains("workspace-stages"));
        assert_eq!(
            reg.rules(),
            &[AdjacencyRule::new("client-lifecycle", "workspace-stages")]
        );
        assert!(!reg.is_resizable("documents"));
    }
}
