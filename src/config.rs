use crate::error::{LiveMnistError, Result};
use config::{Config, ConfigError, Environment, File};
use preprocess::{Inversion, PreprocessConfig, ResizeFilter};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub canvas: CanvasSettings,
    #[serde(default)]
    pub preprocess: PreprocessSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Path of the JSON model artifact
    pub path: PathBuf,
    /// Serve random probabilities instead of loading a model
    pub placeholder: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/mnist.json"),
            placeholder: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    /// Canvas size in pixels
    pub width: u32,
    pub height: u32,
    /// Initial pen width (the sidebar slider allows 1 to 25)
    pub stroke_width: f32,
    /// Colors as hex strings (`#rgb`, `#rrggbb` or `#rrggbbaa`)
    pub stroke_color: String,
    pub background_color: String,
    /// Fill of rectangles and circles
    pub fill_color: String,
    /// One of freedraw, line, rect, circle, transform
    pub drawing_mode: String,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 280,
            height: 280,
            stroke_width: 14.0,
            stroke_color: "#000000".to_string(),
            background_color: "#eeeeee".to_string(),
            // rgba(255, 165, 0, 0.3)
            fill_color: "#ffa5004d".to_string(),
            drawing_mode: "freedraw".to_string(),
        }
    }
}

impl CanvasSettings {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LiveMnistError::InvalidSetting {
                key: "canvas.width/height",
                value: format!("{}x{}", self.width, self.height),
                reason: "canvas must be at least one pixel".to_string(),
            });
        }
        if !(self.stroke_width > 0.0) {
            return Err(LiveMnistError::InvalidSetting {
                key: "canvas.stroke_width",
                value: self.stroke_width.to_string(),
                reason: "stroke width must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    /// Side of the square model input
    pub side: u32,
    /// nearest, triangle, catmullrom, gaussian or lanczos3
    pub filter: String,
    /// auto, always or never
    pub inversion: String,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        let defaults = PreprocessConfig::default();
        Self {
            side: defaults.side,
            filter: defaults.filter.to_string(),
            inversion: defaults.inversion.to_string(),
        }
    }
}

impl PreprocessSettings {
    pub fn to_config(&self) -> Result<PreprocessConfig> {
        Ok(PreprocessConfig {
            side: self.side,
            filter: self.filter.parse::<ResizeFilter>()?,
            inversion: self.inversion.parse::<Inversion>()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/demo.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("LIVE_MNIST_ENV").unwrap_or_else(|_| "local".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (LIVE_MNIST__MODEL__PATH, etc.)
            .add_source(
                Environment::with_prefix("LIVE_MNIST")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("live-mnist-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_files() {
        let config = AppConfig::load_from(scratch_dir("empty")).unwrap();

        assert_eq!(config.model.path, PathBuf::from("models/mnist.json"));
        assert!(!config.model.placeholder);
        assert_eq!((config.canvas.width, config.canvas.height), (280, 280));
        assert_eq!(config.preprocess.side, 28);
        assert_eq!(config.logging.level, "info");
        assert!(config.canvas.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = scratch_dir("file");
        fs::write(
            dir.join("default.toml"),
            "[model]\npath = \"/opt/models/cnn.json\"\n\n[canvas]\nheight = 150\n\n[preprocess]\nfilter = \"lanczos3\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&dir).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(config.model.path, PathBuf::from("/opt/models/cnn.json"));
        assert_eq!(config.canvas.height, 150);
        // Untouched keys keep their defaults.
        assert_eq!(config.canvas.width, 280);
        assert_eq!(config.canvas.stroke_color, "#000000");

        let preprocess = config.preprocess.to_config().unwrap();
        assert_eq!(preprocess.filter, ResizeFilter::Lanczos3);
        assert_eq!(preprocess.inversion, Inversion::Auto);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let settings = PreprocessSettings {
            filter: "sharpen".to_string(),
            ..PreprocessSettings::default()
        };
        assert!(matches!(
            settings.to_config(),
            Err(LiveMnistError::Preprocess(_))
        ));

        let canvas = CanvasSettings {
            width: 0,
            ..CanvasSettings::default()
        };
        assert!(matches!(
            canvas.validate(),
            Err(LiveMnistError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_environment_overrides_files() {
        let dir = scratch_dir("env");
        fs::write(
            dir.join("default.toml"),
            "[canvas]\nstroke_width = 3.0\ndrawing_mode = \"line\"\n",
        )
        .unwrap();

        // Keys no other test in this module asserts on, since the environment
        // is shared by every test thread.
        // SAFETY: std serializes its own environment access; nothing in this
        // test binary reads these variables through libc.
        unsafe {
            std::env::set_var("LIVE_MNIST__CANVAS__STROKE_WIDTH", "9");
            std::env::set_var("LIVE_MNIST__LOGGING__JSON", "true");
        }
        let config = AppConfig::load_from(&dir);
        unsafe {
            std::env::remove_var("LIVE_MNIST__CANVAS__STROKE_WIDTH");
            std::env::remove_var("LIVE_MNIST__LOGGING__JSON");
        }
        fs::remove_dir_all(&dir).ok();

        let config = config.unwrap();
        assert_eq!(config.canvas.stroke_width, 9.0);
        assert!(config.logging.json);
        // File values without an override survive.
        assert_eq!(config.canvas.drawing_mode, "line");
    }
}
