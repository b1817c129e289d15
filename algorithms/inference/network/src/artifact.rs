//! On-disk format of a pretrained model.
//!
//! An artifact is a JSON document describing a feed-forward network as a list
//! of layers applied in order. Weights are stored flat and row-major:
//! dense weights as `[out_features, in_features]`, convolution kernels as
//! `[out_channels, in_channels, kernel_size, kernel_size]`.
//!
//! ```json
//! {
//!   "name": "mnist-cnn",
//!   "input": { "channels": 1, "height": 28, "width": 28 },
//!   "normalization": { "mean": 0.1307, "std": 0.3081 },
//!   "layers": [
//!     { "type": "conv2d", "in_channels": 1, "out_channels": 4, "kernel_size": 3,
//!       "padding": 1, "weight": [...], "bias": [...] },
//!     { "type": "relu" },
//!     { "type": "max_pool2d", "kernel_size": 2 },
//!     { "type": "flatten" },
//!     { "type": "dense", "in_features": 784, "out_features": 10,
//!       "weight": [...], "bias": [...] }
//!   ]
//! }
//! ```

use crate::NetworkError;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Per-pixel statistics of the training set, used as `(x - mean) / std`.
/// Taken from the PyTorch MNIST example.
pub const MNIST_MEAN: f32 = 0.1307;
pub const MNIST_STD: f32 = 0.3081;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub input: InputSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization: Option<Normalization>,
    /// Label of every output, defaults to the output index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
    pub layers: Vec<LayerSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl InputSpec {
    /// A single 28x28 grayscale digit.
    pub fn mnist() -> Self {
        Self {
            channels: 1,
            height: 28,
            width: 28,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub mean: f32,
    pub std: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        in_features: usize,
        out_features: usize,
        weight: Vec<f32>,
        bias: Vec<f32>,
    },
    Conv2d {
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        #[serde(default = "default_stride")]
        stride: usize,
        #[serde(default)]
        padding: usize,
        weight: Vec<f32>,
        bias: Vec<f32>,
    },
    MaxPool2d {
        kernel_size: usize,
        /// Defaults to `kernel_size` (non-overlapping windows).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stride: Option<usize>,
    },
    Flatten,
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

fn default_stride() -> usize {
    1
}

impl LayerSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            LayerSpec::Dense { .. } => "dense",
            LayerSpec::Conv2d { .. } => "conv2d",
            LayerSpec::MaxPool2d { .. } => "max_pool2d",
            LayerSpec::Flatten => "flatten",
            LayerSpec::Relu => "relu",
            LayerSpec::Sigmoid => "sigmoid",
            LayerSpec::Tanh => "tanh",
            LayerSpec::Softmax => "softmax",
        }
    }

    /// Number of trainable values stored in the layer.
    pub fn parameter_count(&self) -> usize {
        match self {
            LayerSpec::Dense { weight, bias, .. } | LayerSpec::Conv2d { weight, bias, .. } => {
                weight.len() + bias.len()
            }
            _ => 0,
        }
    }
}

impl ModelSpec {
    /// Reads an artifact from disk without validating it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetworkError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| NetworkError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), NetworkError> {
        let path = path.as_ref();
        let io_error = |source| NetworkError::Io {
            path: path.display().to_string(),
            source,
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
        serde_json::to_writer(&mut writer, self)?;
        // Dropping the writer would discard a failed final write.
        writer.flush().map_err(io_error)
    }

    /// A randomly initialized `784 -> hidden -> 10` perceptron over MNIST
    /// input (a single `784 -> 10` layer when `hidden` is 0).
    ///
    /// Weights are He-uniform, biases zero. Its predictions are meaningless;
    /// it exists so the demo has a valid artifact to start from.
    pub fn random_mlp(hidden: usize, seed: u64) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let input = InputSpec::mnist();
        let features = input.channels * input.height * input.width;

        let mut layers = vec![LayerSpec::Flatten];
        let mut fan_in = features;
        if hidden > 0 {
            layers.push(random_dense(&mut rng, fan_in, hidden));
            layers.push(LayerSpec::Relu);
            fan_in = hidden;
        }
        layers.push(random_dense(&mut rng, fan_in, digit_helpers::DIGIT_CLASSES));

        Self {
            name: format!("random-mlp-{}", hidden),
            input,
            normalization: Some(Normalization {
                mean: MNIST_MEAN,
                std: MNIST_STD,
            }),
            classes: None,
            layers,
        }
    }
}

fn random_dense<R: Rng>(rng: &mut R, in_features: usize, out_features: usize) -> LayerSpec {
    let limit = (6.0 / in_features as f32).sqrt();
    let weight = (0..in_features * out_features)
        .map(|_| rng.random_range(-limit..limit))
        .collect();
    LayerSpec::Dense {
        in_features,
        out_features,
        weight,
        bias: vec![0.0; out_features],
    }
}
