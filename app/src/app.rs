use crate::canvas::{Canvas, DrawingMode, StrokeStyle};
use crate::chart::ChartKind;
use crate::classifier::Classifier;
use crate::ui;

use eframe::egui::{self, Color32};
use eframe::{App, Frame};
use image::{DynamicImage, Rgba};
use live_mnist::config::CanvasSettings;
use live_mnist::{image_from_rgba, LiveMnistError, Prediction};
use std::path::Path;
use tracing::{info, warn};

/// Stroke width range offered by the side panel slider.
pub const STROKE_WIDTH_RANGE: std::ops::RangeInclusive<f32> = 1.0..=25.0;

/// The main application struct.
/// It holds the high-level state and delegates drawing to the `ui` module.
pub struct LiveMnistApp {
    // --- Core State ---
    /// The model behind the SUBMIT button.
    pub classifier: Box<dyn Classifier>,
    pub canvas: Canvas,
    /// Outcome of the last SUBMIT, `None` until the first one.
    pub last_submission: Option<Result<Prediction, String>>,

    // --- Pen State ---
    pub stroke_width: f32,
    pub stroke_color: [u8; 3],
    pub background_color: [u8; 3],
    /// Fill of rectangles and circles, unmultiplied RGBA.
    pub fill_color: Rgba<u8>,
    pub drawing_mode: DrawingMode,

    // --- UI State ---
    pub chart_kind: ChartKind,
    pub background_path: String,
    pub background_error: Option<String>,
    /// Uploaded to the GPU lazily and dropped whenever the source changes.
    pub background_texture: Option<egui::TextureHandle>,
    pub input_preview: Option<egui::TextureHandle>,
}

impl LiveMnistApp {
    /// Builds the initial state from the `[canvas]` settings.
    ///
    /// # Errors
    ///
    /// Fails on unparsable colors or an unknown drawing mode.
    pub fn new(settings: &CanvasSettings, classifier: Box<dyn Classifier>) -> live_mnist::Result<Self> {
        settings.validate()?;
        let stroke = parse_color("canvas.stroke_color", &settings.stroke_color)?;
        let background = parse_color("canvas.background_color", &settings.background_color)?;
        let fill_color = parse_color("canvas.fill_color", &settings.fill_color)?;
        let drawing_mode = settings.drawing_mode.parse::<DrawingMode>()?;

        let [r, g, b, _] = stroke.0;
        let stroke_color = [r, g, b];
        let [r, g, b, _] = background.0;
        let background_color = [r, g, b];

        Ok(Self {
            classifier,
            canvas: Canvas::new(settings.width, settings.height, background),
            last_submission: None,
            stroke_width: settings
                .stroke_width
                .clamp(*STROKE_WIDTH_RANGE.start(), *STROKE_WIDTH_RANGE.end()),
            stroke_color,
            background_color,
            fill_color,
            drawing_mode,
            chart_kind: ChartKind::Bars,
            background_path: String::new(),
            background_error: None,
            background_texture: None,
            input_preview: None,
        })
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        let [r, g, b] = self.stroke_color;
        StrokeStyle {
            width: self.stroke_width,
            color: Rgba([r, g, b, 255]),
        }
    }

    /// Pushes the side panel background color into the canvas.
    pub fn sync_background_color(&mut self) {
        let [r, g, b] = self.background_color;
        self.canvas.set_background(Rgba([r, g, b, 255]));
    }

    /// Rasterizes the canvas and runs the classifier on it.
    pub fn submit(&mut self) {
        self.input_preview = None;
        let (width, height) = self.canvas.size();
        let image = match image_from_rgba(width, height, self.canvas.rasterize().into_raw()) {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "canvas buffer rejected");
                self.last_submission = Some(Err(e.to_string()));
                return;
            }
        };

        self.last_submission = Some(match self.classifier.predict(&image) {
            Ok(prediction) => {
                let (digit, confidence) = prediction.digit();
                info!(
                    digit,
                    confidence,
                    blank = self.canvas.is_blank(),
                    shapes = self.canvas.shapes().len(),
                    "submitted drawing"
                );
                Ok(prediction)
            }
            Err(e) => {
                warn!(error = %e, "prediction failed");
                Err(e.to_string())
            }
        });
    }

    /// Removes every shape and forgets the last result.
    pub fn clear(&mut self) {
        self.canvas.clear();
        self.last_submission = None;
        self.input_preview = None;
    }

    pub fn undo(&mut self) {
        self.canvas.undo();
    }

    pub fn redo(&mut self) {
        self.canvas.redo();
    }

    /// Loads `background_path` as the canvas background image.
    pub fn load_background_image(&mut self) {
        let path = self.background_path.trim().to_string();
        self.background_texture = None;

        match read_background(Path::new(&path)) {
            Ok(image) => {
                info!(path = %path, width = image.width(), height = image.height(), "loaded background image");
                self.canvas.set_background_image(Some(image.to_rgba8()));
                self.background_error = None;
            }
            Err(e) => {
                warn!(path = %path, error = %e, "could not load background image");
                self.background_error = Some(e);
            }
        }
    }

    pub fn remove_background_image(&mut self) {
        self.canvas.set_background_image(None);
        self.background_texture = None;
        self.background_error = None;
    }
}

impl App for LiveMnistApp {
    /// The main update loop, called by eframe on every frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        ui::draw_side_panel(self, ctx);
        ui::draw_central_panel(self, ctx);
    }
}

/// Only png and jpg files are accepted as backgrounds.
fn read_background(path: &Path) -> Result<DynamicImage, String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png" | "jpg" | "jpeg") => {}
        _ => return Err(format!("{} is not a png or jpg file", path.display())),
    }
    image::open(path).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` into unmultiplied RGBA.
pub fn parse_color(key: &'static str, value: &str) -> live_mnist::Result<Rgba<u8>> {
    let color = Color32::from_hex(value.trim()).map_err(|_| LiveMnistError::InvalidSetting {
        key,
        value: value.to_string(),
        reason: "expected a hex color like #rrggbb".to_string(),
    })?;
    Ok(Rgba(color.to_srgba_unmultiplied()))
}

/// `#rrggbb` label shown next to the color pickers.
pub fn hex_label(rgb: [u8; 3]) -> String {
    let [r, g, b] = rgb;
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}
