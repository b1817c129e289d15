use digit_helpers::ProbabilityError;
use ndarray::{Array1, Array2, Array3, Array4, ArrayView2, ArrayView3, Axis};
use std::fmt::{Display, Formatter};
use std::path::Path;
use thiserror::Error;
use tracing::info;

mod artifact;

pub use artifact::{InputSpec, LayerSpec, ModelSpec, Normalization, MNIST_MEAN, MNIST_STD};

/// Errors that can occur when loading or running a network.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The artifact could not be opened or written
    #[error("cannot access model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The artifact is not valid JSON or does not match the format
    #[error("malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model has no layers")]
    EmptyNetwork,
    #[error("input shape {0} is empty or too large")]
    InvalidInput(Shape),
    #[error("layer {layer} ({kind}): {field} holds {found} values, expected {expected}")]
    ParameterCount {
        layer: usize,
        kind: &'static str,
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("layer {layer} ({kind}) cannot take input of shape {shape}")]
    IncompatibleShape {
        layer: usize,
        kind: &'static str,
        shape: Shape,
    },
    #[error("layer {layer} ({kind}): {reason}")]
    InvalidLayer {
        layer: usize,
        kind: &'static str,
        reason: String,
    },
    #[error("network output must be flat, got {0}")]
    SpatialOutput(Shape),
    #[error("{labels} class labels given for {outputs} outputs")]
    ClassCount { labels: usize, outputs: usize },
    #[error("normalization std must be positive, got {0}")]
    InvalidNormalization(f32),
    #[error("input has shape {found}, model expects {expected}")]
    InputShape { expected: Shape, found: Shape },
    #[error(transparent)]
    Probability(#[from] ProbabilityError),
}

/// Shape of the activations flowing between two layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Spatial {
        channels: usize,
        height: usize,
        width: usize,
    },
    Flat(usize),
}

impl Shape {
    /// Number of values, or `None` if it does not fit in a `usize`.
    pub fn len(&self) -> Option<usize> {
        match *self {
            Shape::Spatial {
                channels,
                height,
                width,
            } => channels.checked_mul(height)?.checked_mul(width),
            Shape::Flat(n) => Some(n),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

impl From<InputSpec> for Shape {
    fn from(input: InputSpec) -> Self {
        Shape::Spatial {
            channels: input.channels,
            height: input.height,
            width: input.width,
        }
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Spatial {
                channels,
                height,
                width,
            } => write!(f, "{}x{}x{}", channels, height, width),
            Shape::Flat(n) => write!(f, "{}", n),
        }
    }
}

/// A validated layer, with its parameters reshaped for computation.
#[derive(Debug, Clone)]
enum Layer {
    Dense {
        weight: Array2<f32>,
        bias: Array1<f32>,
    },
    Conv2d {
        weight: Array4<f32>,
        bias: Array1<f32>,
        stride: usize,
        padding: usize,
    },
    MaxPool2d {
        kernel: usize,
        stride: usize,
    },
    Flatten,
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

#[derive(Debug, Clone)]
enum Activations {
    Spatial(Array3<f32>),
    Flat(Array1<f32>),
}

impl Activations {
    fn shape(&self) -> Shape {
        match self {
            Activations::Spatial(a) => {
                let (channels, height, width) = a.dim();
                Shape::Spatial {
                    channels,
                    height,
                    width,
                }
            }
            Activations::Flat(a) => Shape::Flat(a.len()),
        }
    }

    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        match self {
            Activations::Spatial(mut a) => {
                a.mapv_inplace(&f);
                Activations::Spatial(a)
            }
            Activations::Flat(mut a) => {
                a.mapv_inplace(&f);
                Activations::Flat(a)
            }
        }
    }
}

/// A pretrained feed-forward classifier.
///
/// Built from a [`ModelSpec`], which is checked once at load time: parameter
/// counts, layer-to-layer shapes, the output width and the class labels. After
/// that, [`Network::forward`] only fails on an input of the wrong shape.
#[derive(Debug, Clone)]
pub struct Network {
    spec: ModelSpec,
    layers: Vec<Layer>,
    /// Output shape of every layer.
    shapes: Vec<Shape>,
    classes: Vec<String>,
}

impl Network {
    /// Reads and validates an artifact.
    ///
    /// # Errors
    ///
    /// `NetworkError::Io` if the file is missing or unreadable,
    /// `NetworkError::Parse` if it is not a model artifact, and any
    /// validation error of [`Network::from_spec`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetworkError> {
        let path = path.as_ref();
        let network = Self::from_spec(ModelSpec::load(path)?)?;
        info!(
            path = %path.display(),
            name = %network.spec.name,
            layers = network.layers.len(),
            parameters = network.parameter_count(),
            "loaded model"
        );
        Ok(network)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), NetworkError> {
        self.spec.save(path)
    }

    /// Validates `spec` and prepares it for inference.
    pub fn from_spec(spec: ModelSpec) -> Result<Self, NetworkError> {
        if spec.layers.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }
        let input = Shape::from(spec.input);
        if input.len().is_none_or(|n| n == 0) {
            return Err(NetworkError::InvalidInput(input));
        }
        if let Some(norm) = spec.normalization {
            // Also rejects NaN.
            if !(norm.std > 0.0) || !norm.mean.is_finite() {
                return Err(NetworkError::InvalidNormalization(norm.std));
            }
        }

        let mut layers = Vec::with_capacity(spec.layers.len());
        let mut shapes = Vec::with_capacity(spec.layers.len());
        let mut shape = input;
        for (index, layer_spec) in spec.layers.iter().enumerate() {
            let (layer, next) = compile_layer(index, layer_spec, shape)?;
            layers.push(layer);
            shapes.push(next);
            shape = next;
        }

        let outputs = match shape {
            Shape::Flat(n) => n,
            spatial => return Err(NetworkError::SpatialOutput(spatial)),
        };
        let classes = match &spec.classes {
            Some(labels) if labels.len() != outputs => {
                return Err(NetworkError::ClassCount {
                    labels: labels.len(),
                    outputs,
                });
            }
            Some(labels) => labels.clone(),
            None => (0..outputs).map(|i| i.to_string()).collect(),
        };

        Ok(Self {
            spec,
            layers,
            shapes,
            classes,
        })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn input_shape(&self) -> Shape {
        Shape::from(self.spec.input)
    }

    pub fn output_len(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// True when the outputs are already probabilities.
    pub fn ends_with_softmax(&self) -> bool {
        matches!(self.layers.last(), Some(Layer::Softmax))
    }

    pub fn parameter_count(&self) -> usize {
        self.spec.layers.iter().map(LayerSpec::parameter_count).sum()
    }

    /// One line per layer: index, kind, output shape and parameter count.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![format!("input        -> {}", self.input_shape())];
        for (index, (layer, shape)) in self.spec.layers.iter().zip(&self.shapes).enumerate() {
            let params = layer.parameter_count();
            let mut line = format!("{:>2} {:<10} -> {}", index, layer.kind(), shape);
            if params > 0 {
                line.push_str(&format!(" ({} params)", params));
            }
            lines.push(line);
        }
        lines
    }

    /// Runs a single-channel image (`[row, column]`) through the network and
    /// returns its raw outputs.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InputShape` if the model does not take a
    /// single channel of exactly this height and width.
    pub fn forward(&self, input: ArrayView2<f32>) -> Result<Array1<f32>, NetworkError> {
        let (height, width) = input.dim();
        if self.spec.input.channels != 1 {
            return Err(NetworkError::InputShape {
                expected: self.input_shape(),
                found: Shape::Spatial {
                    channels: 1,
                    height,
                    width,
                },
            });
        }
        let input = input.insert_axis(Axis(0));
        self.forward_spatial(input)
    }

    /// Runs a `[channel, row, column]` input through the network.
    pub fn forward_spatial(&self, input: ArrayView3<f32>) -> Result<Array1<f32>, NetworkError> {
        let found = Activations::Spatial(input.to_owned());
        if found.shape() != self.input_shape() {
            return Err(NetworkError::InputShape {
                expected: self.input_shape(),
                found: found.shape(),
            });
        }

        let mut x = match self.spec.normalization {
            Some(Normalization { mean, std }) => found.map(|v| (v - mean) / std),
            None => found,
        };
        for (index, layer) in self.layers.iter().enumerate() {
            x = layer.forward(index, x)?;
        }

        match x {
            Activations::Flat(out) => Ok(out),
            spatial @ Activations::Spatial(_) => Err(NetworkError::SpatialOutput(spatial.shape())),
        }
    }
}

/// Checks one layer against its input shape and returns it with its output
/// shape.
fn compile_layer(index: usize, spec: &LayerSpec, input: Shape) -> Result<(Layer, Shape), NetworkError> {
    let kind = spec.kind();
    let incompatible = || NetworkError::IncompatibleShape {
        layer: index,
        kind,
        shape: input,
    };
    let invalid = |reason: String| NetworkError::InvalidLayer {
        layer: index,
        kind,
        reason,
    };
    let count = |field: &'static str, expected: usize, found: usize| {
        if expected == found {
            Ok(())
        } else {
            Err(NetworkError::ParameterCount {
                layer: index,
                kind,
                field,
                expected,
                found,
            })
        }
    };

    match spec {
        LayerSpec::Dense {
            in_features,
            out_features,
            weight,
            bias,
        } => {
            if input != Shape::Flat(*in_features) {
                return Err(incompatible());
            }
            if *out_features == 0 {
                return Err(invalid("out_features must be positive".to_string()));
            }
            let expected = in_features
                .checked_mul(*out_features)
                .ok_or_else(|| invalid(format!("{}x{} weights overflow", out_features, in_features)))?;
            count("weight", expected, weight.len())?;
            count("bias", *out_features, bias.len())?;

            let weight = Array2::from_shape_vec((*out_features, *in_features), weight.clone())
                .map_err(|e| invalid(e.to_string()))?;
            let layer = Layer::Dense {
                weight,
                bias: Array1::from(bias.clone()),
            };
            Ok((layer, Shape::Flat(*out_features)))
        }
        LayerSpec::Conv2d {
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
            weight,
            bias,
        } => {
            let Shape::Spatial {
                channels,
                height,
                width,
            } = input
            else {
                return Err(incompatible());
            };
            if channels != *in_channels {
                return Err(incompatible());
            }
            if *kernel_size == 0 || *stride == 0 || *out_channels == 0 {
                return Err(invalid(
                    "kernel_size, stride and out_channels must be positive".to_string(),
                ));
            }
            let (k, s, p) = (*kernel_size, *stride, *padding);
            let overflow = || invalid("layer dimensions overflow".to_string());
            let padded_height = p
                .checked_mul(2)
                .and_then(|pad| pad.checked_add(height))
                .ok_or_else(overflow)?;
            let padded_width = p
                .checked_mul(2)
                .and_then(|pad| pad.checked_add(width))
                .ok_or_else(overflow)?;
            if padded_height < k || padded_width < k {
                return Err(invalid(format!("kernel {} larger than padded input", k)));
            }
            let expected = out_channels
                .checked_mul(*in_channels)
                .and_then(|n| n.checked_mul(k))
                .and_then(|n| n.checked_mul(k))
                .ok_or_else(overflow)?;
            count("weight", expected, weight.len())?;
            count("bias", *out_channels, bias.len())?;

            let weight = Array4::from_shape_vec((*out_channels, *in_channels, k, k), weight.clone())
                .map_err(|e| invalid(e.to_string()))?;
            let layer = Layer::Conv2d {
                weight,
                bias: Array1::from(bias.clone()),
                stride: s,
                padding: p,
            };
            let next = Shape::Spatial {
                channels: *out_channels,
                height: (padded_height - k) / s + 1,
                width: (padded_width - k) / s + 1,
            };
            Ok((layer, next))
        }
        LayerSpec::MaxPool2d {
            kernel_size,
            stride,
        } => {
            let Shape::Spatial {
                channels,
                height,
                width,
            } = input
            else {
                return Err(incompatible());
            };
            let k = *kernel_size;
            let s = stride.unwrap_or(k);
            if k == 0 || s == 0 {
                return Err(invalid("kernel_size and stride must be positive".to_string()));
            }
            if height < k || width < k {
                return Err(invalid(format!("window {} larger than input", k)));
            }
            let next = Shape::Spatial {
                channels,
                height: (height - k) / s + 1,
                width: (width - k) / s + 1,
            };
            Ok((Layer::MaxPool2d { kernel: k, stride: s }, next))
        }
        LayerSpec::Flatten => {
            let len = input
                .len()
                .ok_or_else(|| invalid(format!("{} values overflow", input)))?;
            Ok((Layer::Flatten, Shape::Flat(len)))
        }
        LayerSpec::Relu => Ok((Layer::Relu, input)),
        LayerSpec::Sigmoid => Ok((Layer::Sigmoid, input)),
        LayerSpec::Tanh => Ok((Layer::Tanh, input)),
        LayerSpec::Softmax => match input {
            Shape::Flat(_) => Ok((Layer::Softmax, input)),
            Shape::Spatial { .. } => Err(incompatible()),
        },
    }
}

impl Layer {
    fn kind(&self) -> &'static str {
        match self {
            Layer::Dense { .. } => "dense",
            Layer::Conv2d { .. } => "conv2d",
            Layer::MaxPool2d { .. } => "max_pool2d",
            Layer::Flatten => "flatten",
            Layer::Relu => "relu",
            Layer::Sigmoid => "sigmoid",
            Layer::Tanh => "tanh",
            Layer::Softmax => "softmax",
        }
    }

    fn forward(&self, index: usize, x: Activations) -> Result<Activations, NetworkError> {
        let incompatible = |x: &Activations| NetworkError::IncompatibleShape {
            layer: index,
            kind: self.kind(),
            shape: x.shape(),
        };

        match (self, x) {
            (Layer::Dense { weight, bias }, Activations::Flat(x)) => {
                Ok(Activations::Flat(weight.dot(&x) + bias))
            }
            (
                Layer::Conv2d {
                    weight,
                    bias,
                    stride,
                    padding,
                },
                Activations::Spatial(x),
            ) => Ok(Activations::Spatial(conv2d(&x, weight, bias, *stride, *padding))),
            (Layer::MaxPool2d { kernel, stride }, Activations::Spatial(x)) => {
                Ok(Activations::Spatial(max_pool2d(&x, *kernel, *stride)))
            }
            (Layer::Flatten, Activations::Spatial(x)) => {
                let len = x.len();
                // Standard layout keeps channel-major (C, H, W) order.
                let flat = x.as_standard_layout().to_owned();
                let flat = flat
                    .into_shape_with_order(len)
                    .map_err(|e| NetworkError::InvalidLayer {
                        layer: index,
                        kind: "flatten",
                        reason: e.to_string(),
                    })?;
                Ok(Activations::Flat(flat))
            }
            (Layer::Flatten, flat @ Activations::Flat(_)) => Ok(flat),
            (Layer::Relu, x) => Ok(x.map(|v| v.max(0.0))),
            (Layer::Sigmoid, x) => Ok(x.map(|v| 1.0 / (1.0 + (-v).exp()))),
            (Layer::Tanh, x) => Ok(x.map(f32::tanh)),
            (Layer::Softmax, Activations::Flat(x)) => {
                let probs = digit_helpers::softmax(x.view())?;
                Ok(Activations::Flat(probs.values().to_owned()))
            }
            (_, x) => Err(incompatible(&x)),
        }
    }
}

/// Direct 2D cross-correlation with zero padding.
fn conv2d(
    x: &Array3<f32>,
    weight: &Array4<f32>,
    bias: &Array1<f32>,
    stride: usize,
    padding: usize,
) -> Array3<f32> {
    let (in_channels, height, width) = x.dim();
    let (out_channels, _, k, _) = weight.dim();
    let out_h = (height + 2 * padding - k) / stride + 1;
    let out_w = (width + 2 * padding - k) / stride + 1;

    let mut out = Array3::zeros((out_channels, out_h, out_w));
    for ((o, oy, ox), value) in out.indexed_iter_mut() {
        let mut acc = bias[o];
        for c in 0..in_channels {
            for ky in 0..k {
                let Some(iy) = (oy * stride + ky).checked_sub(padding).filter(|&iy| iy < height)
                else {
                    continue;
                };
                for kx in 0..k {
                    let Some(ix) = (ox * stride + kx).checked_sub(padding).filter(|&ix| ix < width)
                    else {
                        continue;
                    };
                    acc += x[[c, iy, ix]] * weight[[o, c, ky, kx]];
                }
            }
        }
        *value = acc;
    }
    out
}

fn max_pool2d(x: &Array3<f32>, kernel: usize, stride: usize) -> Array3<f32> {
    let (channels, height, width) = x.dim();
    let out_h = (height - kernel) / stride + 1;
    let out_w = (width - kernel) / stride + 1;

    let mut out = Array3::zeros((channels, out_h, out_w));
    for ((c, oy, ox), value) in out.indexed_iter_mut() {
        let mut best = f32::NEG_INFINITY;
        for ky in 0..kernel {
            for kx in 0..kernel {
                best = best.max(x[[c, oy * stride + ky, ox * stride + kx]]);
            }
        }
        *value = best;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn input(channels: usize, height: usize, width: usize) -> InputSpec {
        InputSpec {
            channels,
            height,
            width,
        }
    }

    fn spec(input: InputSpec, layers: Vec<LayerSpec>) -> ModelSpec {
        ModelSpec {
            name: "test".to_string(),
            input,
            normalization: None,
            classes: None,
            layers,
        }
    }

    fn dense(in_features: usize, out_features: usize, weight: Vec<f32>, bias: Vec<f32>) -> LayerSpec {
        LayerSpec::Dense {
            in_features,
            out_features,
            weight,
            bias,
        }
    }

    #[test]
    fn test_dense_forward() {
        // out0 = x00 + x11, out1 = 2 * x01 - 1
        let network = Network::from_spec(spec(
            input(1, 2, 2),
            vec![
                LayerSpec::Flatten,
                dense(4, 2, vec![1.0, 0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 0.0], vec![0.0, -1.0]),
            ],
        ))
        .unwrap();

        let out = network.forward(array![[1.0, 2.0], [3.0, 4.0]].view()).unwrap();
        assert_eq!(out, array![5.0_f32, 3.0]);
        assert_eq!(network.classes(), &["0".to_string(), "1".to_string()]);
        assert!(!network.ends_with_softmax());
    }

    #[test]
    fn test_conv_and_pool_forward() {
        let network = Network::from_spec(spec(
            input(1, 3, 3),
            vec![
                LayerSpec::Conv2d {
                    in_channels: 1,
                    out_channels: 1,
                    kernel_size: 2,
                    stride: 1,
                    padding: 0,
                    weight: vec![1.0; 4],
                    bias: vec![0.5],
                },
                LayerSpec::MaxPool2d {
                    kernel_size: 2,
                    stride: None,
                },
                LayerSpec::Flatten,
            ],
        ))
        .unwrap();

        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        // 2x2 window sums: 12, 16, 24, 28 (+0.5), pooled to the max.
        let out = network.forward(x.view()).unwrap();
        assert_eq!(out, array![28.5_f32]);
        assert_eq!(network.output_len(), 1);
    }

    #[test]
    fn test_conv_padding_keeps_size() {
        let network = Network::from_spec(spec(
            input(1, 3, 3),
            vec![
                LayerSpec::Conv2d {
                    in_channels: 1,
                    out_channels: 2,
                    kernel_size: 3,
                    stride: 1,
                    padding: 1,
                    // Channel 0 is the identity kernel, channel 1 sums the window.
                    weight: [vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0], vec![1.0; 9]].concat(),
                    bias: vec![0.0, 0.0],
                },
                LayerSpec::Flatten,
            ],
        ))
        .unwrap();

        let x = Array2::from_elem((3, 3), 1.0_f32);
        let out = network.forward(x.view()).unwrap();
        assert_eq!(out.len(), 18);
        assert_eq!(&out.to_vec()[..9], &[1.0_f32; 9]);
        // Corners see 4 pixels, edges 6, the center 9.
        assert_eq!(&out.to_vec()[9..], &[4.0_f32, 6.0, 4.0, 6.0, 9.0, 6.0, 4.0, 6.0, 4.0]);
    }

    #[test]
    fn test_normalization_and_activations() {
        let mut model = spec(
            input(1, 1, 2),
            vec![LayerSpec::Flatten, LayerSpec::Relu, LayerSpec::Tanh, LayerSpec::Sigmoid],
        );
        model.normalization = Some(Normalization { mean: 1.0, std: 2.0 });
        let network = Network::from_spec(model).unwrap();

        // (3 - 1) / 2 = 1 and (-1 - 1) / 2 = -1, clipped to 0 by relu.
        let out = network.forward(array![[3.0, -1.0]].view()).unwrap();
        assert_abs_diff_eq!(out[0], 1.0 / (1.0 + (-(1.0_f32.tanh())).exp()), epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_softmax_head() {
        let network = Network::from_spec(spec(
            input(1, 1, 3),
            vec![LayerSpec::Flatten, LayerSpec::Softmax],
        ))
        .unwrap();

        let out = network.forward(array![[1.0, 2.0, 3.0]].view()).unwrap();
        assert!(network.ends_with_softmax());
        assert_abs_diff_eq!(out.sum(), 1.0, epsilon = 1e-6);
        assert!(out[2] > out[1] && out[1] > out[0]);
    }

    #[test]
    fn test_forward_is_deterministic() {
        let network = Network::from_spec(ModelSpec::random_mlp(8, 3)).unwrap();
        let blank = Array2::<f32>::zeros((28, 28));

        let first = network.forward(blank.view()).unwrap();
        let second = network.forward(blank.view()).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_error_on_wrong_input_shape() {
        let network = Network::from_spec(ModelSpec::random_mlp(0, 1)).unwrap();
        let result = network.forward(Array2::<f32>::zeros((27, 28)).view());
        assert!(matches!(result, Err(NetworkError::InputShape { .. })));
    }

    #[test]
    fn test_error_on_empty_network() {
        let result = Network::from_spec(spec(input(1, 28, 28), vec![]));
        assert!(matches!(result, Err(NetworkError::EmptyNetwork)));
    }

    #[test]
    fn test_error_on_parameter_count() {
        let result = Network::from_spec(spec(
            input(1, 2, 2),
            vec![LayerSpec::Flatten, dense(4, 2, vec![0.0; 7], vec![0.0; 2])],
        ));
        assert!(matches!(
            result,
            Err(NetworkError::ParameterCount {
                layer: 1,
                field: "weight",
                expected: 8,
                found: 7,
                ..
            })
        ));
    }

    #[test]
    fn test_error_on_dense_without_flatten() {
        let result = Network::from_spec(spec(
            input(1, 2, 2),
            vec![dense(4, 2, vec![0.0; 8], vec![0.0; 2])],
        ));
        assert!(matches!(
            result,
            Err(NetworkError::IncompatibleShape { layer: 0, .. })
        ));
    }

    #[test]
    fn test_error_on_spatial_output() {
        let result = Network::from_spec(spec(input(1, 2, 2), vec![LayerSpec::Relu]));
        assert!(matches!(result, Err(NetworkError::SpatialOutput(_))));
    }

    #[test]
    fn test_error_on_oversized_kernel() {
        let result = Network::from_spec(spec(
            input(1, 2, 2),
            vec![LayerSpec::MaxPool2d {
                kernel_size: 3,
                stride: None,
            }],
        ));
        assert!(matches!(result, Err(NetworkError::InvalidLayer { layer: 0, .. })));
    }

    #[test]
    fn test_error_on_class_count() {
        let mut model = ModelSpec::random_mlp(0, 1);
        model.classes = Some(vec!["zero".to_string(), "one".to_string()]);
        assert!(matches!(
            Network::from_spec(model),
            Err(NetworkError::ClassCount {
                labels: 2,
                outputs: 10
            })
        ));
    }

    #[test]
    fn test_error_on_bad_normalization() {
        let mut model = ModelSpec::random_mlp(0, 1);
        model.normalization = Some(Normalization { mean: 0.0, std: 0.0 });
        assert!(matches!(
            Network::from_spec(model),
            Err(NetworkError::InvalidNormalization(_))
        ));
    }

    #[test]
    fn test_error_on_missing_artifact() {
        let path = std::env::temp_dir().join("network-test-does-not-exist.json");
        assert!(matches!(Network::load(&path), Err(NetworkError::Io { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("network-test-{}.json", std::process::id()));
        let network = Network::from_spec(ModelSpec::random_mlp(4, 9)).unwrap();
        network.save(&path).unwrap();

        let loaded = Network::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.spec(), network.spec());
        assert_eq!(loaded.summary().len(), 5);
    }

    #[test]
    fn test_error_on_overflowing_dense() {
        let model = spec(
            input(1, 28, 28),
            vec![LayerSpec::Flatten, dense(784, usize::MAX / 100, vec![], vec![])],
        );
        assert!(matches!(
            Network::from_spec(model),
            Err(NetworkError::InvalidLayer { layer: 1, .. })
        ));
    }

    #[test]
    fn test_error_on_overflowing_input() {
        let model = spec(input(usize::MAX / 2, 4, 1), vec![LayerSpec::Flatten]);
        assert!(matches!(
            Network::from_spec(model),
            Err(NetworkError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_error_on_overflowing_conv_padding() {
        let model = spec(
            input(1, 4, 4),
            vec![LayerSpec::Conv2d {
                in_channels: 1,
                out_channels: 1,
                kernel_size: 1,
                stride: 1,
                padding: usize::MAX / 2 + 1,
                weight: vec![1.0],
                bias: vec![0.0],
            }],
        );
        assert!(matches!(
            Network::from_spec(model),
            Err(NetworkError::InvalidLayer { layer: 0, .. })
        ));
    }
}
