use digit_helpers::ProbabilityError;
use network::NetworkError;
use preprocess::PreprocessError;
use thiserror::Error;

/// Main error type for the demo
#[derive(Error, Debug)]
pub enum LiveMnistError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid setting {key} = {value:?}: {reason}")]
    InvalidSetting {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Model error: {0}")]
    Model(#[from] NetworkError),

    #[error("Preprocessing error: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("Invalid model output: {0}")]
    Probabilities(#[from] ProbabilityError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Model produces {found} outputs, expected {expected} digit classes")]
    OutputWidth { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, LiveMnistError>;
