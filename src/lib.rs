//! Draw a digit, get the MNIST class probabilities.
//!
//! The root crate wires the workspace together: configuration, logging and
//! the [`DigitPredictor`] pipeline (preprocess -> network -> softmax) used by
//! both the egui app and the command line.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use error::{LiveMnistError, Result};
pub use pipeline::{DigitPredictor, Prediction};

// Re-export the building blocks so the binaries depend on one crate
pub use digit_helpers::{softmax, Histogram, Probabilities, ProbabilityError, DIGIT_CLASSES};
pub use network::{ModelSpec, Network, NetworkError};
pub use preprocess::{image_from_rgba, Inversion, PreprocessConfig, Preprocessor, ResizeFilter, MNIST_SIDE};
