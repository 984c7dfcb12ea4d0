pub mod breakpoint;
pub mod chrome;
pub mod config;
pub mod dashboard;
pub mod layout;
pub mod reorder;
pub mod spans;
pub mod store;
pub mod widgets;

pub use breakpoint::{resolve, LayoutTier, ViewportTracker};
pub use chrome::{ChromeAction, ChromeState, WidgetChrome};
pub use config::{LayoutPreferences, WidgetId};
pub use dashboard::{place_widgets, Dashboard, GridMetrics, GridPlacement};
pub use layout::{normalize, AdjacencyRule};
pub use reorder::{reorder, DragController, DragOutcome};
pub use spans::{ContentStyle, SizeTier, SpanRegistry};
pub use store::{JsonFileBackend, MemoryBackend, PreferenceBackend, PreferenceStore};
pub use widgets::{Widget, WidgetDescriptor, WidgetRegistry};
