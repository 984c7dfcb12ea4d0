use super::Widget;
use crate::dashboard::spans::ContentStyle;
use eframe::egui;

/// Static body used until the host supplies real content for a widget.
pub struct PlaceholderWidget {
    summary: String,
}

impl PlaceholderWidget {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

impl Widget for PlaceholderWidget {
    fn render(&mut self, ui: &mut egui::Ui, style: &ContentStyle) {
        ui.label(egui::RichText::new(&self.summary).size(style.body_size()));
        ui.label(
            egui::RichText::new("No data source connected")
                .size(style.body_size() - 2.0)
                .weak(),
        );
    }
}
