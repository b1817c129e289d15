//! The `live-mnist` subcommands, as plain functions returning their output.

use crate::config::AppConfig;
use crate::error::{LiveMnistError, Result};
use crate::pipeline::{DigitPredictor, Prediction};
use network::{ModelSpec, Network};
use preprocess::Preprocessor;
use serde::Serialize;
use std::fmt::Write;
use std::fs;
use std::path::Path;
use tracing::info;

/// Result of classifying one image file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub image: String,
    pub digit: usize,
    pub confidence: f32,
    pub probabilities: Vec<f32>,
}

impl Report {
    pub fn new(image: &Path, prediction: &Prediction) -> Self {
        let (digit, confidence) = prediction.digit();
        Self {
            image: image.display().to_string(),
            digit,
            confidence,
            probabilities: prediction.probabilities.to_vec(),
        }
    }

    /// One row per digit with a `#` bar, then the top class.
    pub fn table(&self) -> String {
        let mut out = String::new();
        for (digit, p) in self.probabilities.iter().enumerate() {
            let bar = "#".repeat((p * 40.0).round() as usize);
            let _ = writeln!(out, "{}  {:.4}  {}", digit, p, bar);
        }
        let _ = writeln!(
            out,
            "Prediction: {} ({:.1}%)",
            self.digit,
            self.confidence * 100.0
        );
        out
    }
}

pub fn classify(config: &AppConfig, image_path: &Path) -> Result<Report> {
    let predictor = DigitPredictor::from_config(&config.model, &config.preprocess)?;
    let image = image::open(image_path)?;

    let prediction = predictor.predict(&image)?;
    let report = Report::new(image_path, &prediction);
    info!(image = %image_path.display(), digit = report.digit, confidence = report.confidence, "classified image");
    Ok(report)
}

/// Human-readable description of the configured model and preprocessing.
pub fn inspect(config: &AppConfig) -> Result<String> {
    let network = Network::load(&config.model.path)?;
    let preprocessor = Preprocessor::new(config.preprocess.to_config()?)?;

    let mut out = format!("{} ({} parameters)\n", network.name(), network.parameter_count());
    for line in network.summary() {
        let _ = writeln!(out, "  {}", line);
    }
    let _ = writeln!(out, "classes: {}", network.classes().join(" "));
    let pre = preprocessor.config();
    let _ = writeln!(
        out,
        "preprocess: {0}x{0}, {1} resize, inversion {2}",
        pre.side, pre.filter, pre.inversion
    );
    Ok(out)
}

/// Writes a random, valid model to `out`, creating parent directories.
pub fn scaffold(out: &Path, hidden: usize, seed: u64) -> Result<Network> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| LiveMnistError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }

    // Validate before writing so the app can always load what we produce.
    let network = Network::from_spec(ModelSpec::random_mlp(hidden, seed))?;
    network.save(out)?;

    info!(path = %out.display(), hidden, seed, "wrote random model");
    Ok(network)
}
