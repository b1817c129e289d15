mod app;
mod canvas;
mod chart;
mod classifier;
mod raster;
mod ui;

use anyhow::{anyhow, Context, Result};
use app::LiveMnistApp;
use eframe::egui;
use live_mnist::config::AppConfig;
use live_mnist::logging;

fn main() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    logging::init(&config.logging);

    // Without a model there is nothing to show, so refuse to start.
    let classifier = classifier::build_classifier(&config)
        .with_context(|| format!("loading model {}", config.model.path.display()))?;
    let app = LiveMnistApp::new(&config.canvas, classifier).context("invalid [canvas] settings")?;

    let (width, height) = app.canvas.size();
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("LIVE MNIST")
            .with_inner_size([width as f32 + 320.0, height as f32 + 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "LIVE MNIST",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow!("{e}"))
}
