use dashboard_layout::dashboard::{Dashboard, JsonFileBackend, WidgetRegistry};
use dashboard_layout::logging;
use dashboard_layout::settings::Settings;
use eframe::egui;
use std::sync::Arc;

struct DashboardApp {
    dashboard: Dashboard,
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("dashboard-toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Workspace dashboard");
                ui.separator();
                if ui.button("Collapse all").clicked() {
                    self.dashboard.collapse_all();
                }
                if ui.button("Expand all").clicked() {
                    self.dashboard.expand_all();
                }
                if ui.button("Reset layout").clicked() {
                    self.dashboard.reset_layout();
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("{} layout", self.dashboard.tier()));
                });
            });
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| self.dashboard.ui(ui));
        });
    }
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::load("dashboard_settings.json")?;
    logging::init(settings.debug_logging, settings.log_file.clone());

    let preferences_path = settings.preferences_path();
    tracing::info!(path = %preferences_path.display(), "using layout preferences");
    let backend = Arc::new(JsonFileBackend::new(preferences_path));
    let dashboard = Dashboard::new(WidgetRegistry::with_defaults(), backend, &settings);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1320.0, 860.0])
            .with_min_inner_size([360.0, 240.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Workspace dashboard",
        native_options,
        Box::new(move |_cc| Box::new(DashboardApp { dashboard })),
    )
    .map_err(|e| anyhow::anyhow!("dashboard window failed: {e}"))
}
