use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use ndarray::Array2;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Side length of an MNIST digit, in pixels.
pub const MNIST_SIDE: u32 = 28;

/// Errors that can occur while turning a drawing into a model input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    /// The image has zero width or height
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    /// A raw RGBA buffer does not match its declared dimensions
    #[error("buffer holds {actual} bytes, a {width}x{height} RGBA image needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("output side must be at least one pixel")]
    InvalidSide,
    #[error("unknown resize filter `{0}`")]
    UnknownFilter(String),
    #[error("unknown inversion mode `{0}`")]
    UnknownInversion(String),
}

/// Resampling filter used when shrinking the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl FromStr for ResizeFilter {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(ResizeFilter::Nearest),
            "triangle" | "bilinear" => Ok(ResizeFilter::Triangle),
            "catmullrom" | "catmull-rom" | "bicubic" => Ok(ResizeFilter::CatmullRom),
            "gaussian" => Ok(ResizeFilter::Gaussian),
            "lanczos3" | "lanczos" => Ok(ResizeFilter::Lanczos3),
            _ => Err(PreprocessError::UnknownFilter(s.to_string())),
        }
    }
}

impl Display for ResizeFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResizeFilter::Nearest => "nearest",
            ResizeFilter::Triangle => "triangle",
            ResizeFilter::CatmullRom => "catmullrom",
            ResizeFilter::Gaussian => "gaussian",
            ResizeFilter::Lanczos3 => "lanczos3",
        };
        write!(f, "{}", name)
    }
}

/// Whether to flip intensities so that ink ends up bright on a dark field,
/// the polarity MNIST models are trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inversion {
    /// Invert when the image is mostly light (dark ink on a light background).
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for Inversion {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Inversion::Auto),
            "always" => Ok(Inversion::Always),
            "never" => Ok(Inversion::Never),
            _ => Err(PreprocessError::UnknownInversion(s.to_string())),
        }
    }
}

impl Display for Inversion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Inversion::Auto => "auto",
            Inversion::Always => "always",
            Inversion::Never => "never",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessConfig {
    /// Output is `side x side`.
    pub side: u32,
    pub filter: ResizeFilter,
    pub inversion: Inversion,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            side: MNIST_SIDE,
            filter: ResizeFilter::default(),
            inversion: Inversion::default(),
        }
    }
}

/// Turns an arbitrary raster into a square single-channel tensor.
///
/// The pipeline is grayscale -> resize -> scale to `[0, 1]` -> optional
/// inversion. Every value of the output lies in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Creates a new preprocessor.
    ///
    /// # Errors
    ///
    /// Returns `PreprocessError::InvalidSide` if `config.side` is 0.
    pub fn new(config: PreprocessConfig) -> Result<Self, PreprocessError> {
        if config.side == 0 {
            return Err(PreprocessError::InvalidSide);
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Converts `image` into a `side x side` tensor, indexed `[row, column]`.
    ///
    /// # Errors
    ///
    /// Returns `PreprocessError::EmptyImage` if the image has no pixels.
    pub fn process(&self, image: &DynamicImage) -> Result<Array2<f32>, PreprocessError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(PreprocessError::EmptyImage { width, height });
        }

        let side = self.config.side;
        let gray = grayscale(image);
        let resized = imageops::resize(&gray, side, side, self.config.filter.filter_type());

        let mut tensor = Array2::from_shape_fn((side as usize, side as usize), |(row, col)| {
            f32::from(resized.get_pixel(col as u32, row as u32).0[0]) / 255.0
        });

        let mean = tensor.mean().unwrap_or(0.0);
        let invert = match self.config.inversion {
            Inversion::Auto => mean > 0.5,
            Inversion::Always => true,
            Inversion::Never => false,
        };
        debug!(width, height, side, mean, invert, "preprocessed image");

        if invert {
            tensor.mapv_inplace(|v| 1.0 - v);
        }
        Ok(tensor)
    }
}

/// Luminance of every pixel (Rec. 709 weights), with transparency composited
/// over white.
pub fn grayscale(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let luma = 0.2126 * f32::from(r) + 0.7152 * f32::from(g) + 0.0722 * f32::from(b);
        let alpha = f32::from(a) / 255.0;
        let value = luma * alpha + 255.0 * (1.0 - alpha);
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Wraps a raw, row-major RGBA buffer (as produced by a drawing surface).
///
/// # Errors
///
/// Returns `PreprocessError::BufferSize` if `bytes` is not exactly
/// `width * height * 4` long.
pub fn image_from_rgba(
    width: u32,
    height: u32,
    bytes: Vec<u8>,
) -> Result<DynamicImage, PreprocessError> {
    let expected = width as usize * height as usize * 4;
    let actual = bytes.len();
    RgbaImage::from_raw(width, height, bytes)
        .filter(|_| actual == expected)
        .map(DynamicImage::ImageRgba8)
        .ok_or(PreprocessError::BufferSize {
            width,
            height,
            expected,
            actual,
        })
}
