use approx::assert_abs_diff_eq;
use image::{Rgba, RgbaImage};
use live_mnist::commands;
use live_mnist::config::AppConfig;
use live_mnist::LiveMnistError;
use std::fs;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("live-mnist-cmd-{}-{}", name, std::process::id()));
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn config_for(model: PathBuf) -> AppConfig {
    let mut config = AppConfig::default();
    config.model.path = model;
    config
}

#[test]
fn test_scaffold_creates_parent_directories() {
    let dir = scratch_dir("scaffold");
    let out = dir.join("models").join("nested").join("mnist.json");

    let network = commands::scaffold(&out, 16, 5).unwrap();
    let exists = out.is_file();
    let reloaded = live_mnist::Network::load(&out);
    fs::remove_dir_all(&dir).ok();

    assert!(exists);
    assert_eq!(network.output_len(), 10);
    assert_eq!(reloaded.unwrap().spec(), network.spec());
}

#[test]
fn test_scaffold_reports_unwritable_parent() {
    let dir = scratch_dir("blocked");
    // A file where a directory is needed.
    let blocker = dir.join("models");
    fs::write(&blocker, "not a directory").unwrap();

    let result = commands::scaffold(&blocker.join("mnist.json"), 4, 1);
    fs::remove_dir_all(&dir).ok();

    assert!(matches!(result, Err(LiveMnistError::Io { .. })));
}

#[test]
fn test_inspect_describes_model_and_preprocessing() {
    let dir = scratch_dir("inspect");
    let model = dir.join("mnist.json");
    commands::scaffold(&model, 8, 2).unwrap();

    let description = commands::inspect(&config_for(model)).unwrap();
    fs::remove_dir_all(&dir).ok();

    assert!(description.starts_with("random-mlp-8 ("));
    assert!(description.contains("dense"));
    assert!(description.contains("classes: 0 1 2 3 4 5 6 7 8 9"));
    assert!(description.contains("preprocess: 28x28, triangle resize, inversion auto"));
}

#[test]
fn test_classify_table_and_json() {
    let dir = scratch_dir("classify");
    let model = dir.join("mnist.json");
    commands::scaffold(&model, 8, 3).unwrap();

    let image_path = dir.join("seven.png");
    let mut drawing = RgbaImage::from_pixel(140, 140, Rgba([238, 238, 238, 255]));
    for x in 30..110 {
        for y in 20..30 {
            drawing.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }
    drawing.save(&image_path).unwrap();

    let report = commands::classify(&config_for(model), &image_path).unwrap();
    fs::remove_dir_all(&dir).ok();

    assert_eq!(report.probabilities.len(), 10);
    assert_abs_diff_eq!(report.probabilities.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
    assert_eq!(report.probabilities[report.digit], report.confidence);

    let table = report.table();
    assert_eq!(table.lines().count(), 11);
    assert!(table.ends_with(&format!(
        "Prediction: {} ({:.1}%)\n",
        report.digit,
        report.confidence * 100.0
    )));

    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["digit"], report.digit);
    assert_eq!(json["probabilities"].as_array().map(Vec::len), Some(10));
    assert!(json["image"].as_str().unwrap().ends_with("seven.png"));
}

#[test]
fn test_classify_without_model_fails() {
    let dir = scratch_dir("nomodel");
    let image_path = dir.join("blank.png");
    RgbaImage::from_pixel(28, 28, Rgba([255, 255, 255, 255]))
        .save(&image_path)
        .unwrap();

    let result = commands::classify(&config_for(dir.join("missing.json")), &image_path);
    fs::remove_dir_all(&dir).ok();

    assert!(matches!(result, Err(LiveMnistError::Model(_))));
}
