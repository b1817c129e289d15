//! End-to-end digit recognition: raster in, class probabilities out.

use crate::config::{ModelSettings, PreprocessSettings};
use crate::error::{LiveMnistError, Result};
use digit_helpers::{Probabilities, DIGIT_CLASSES};
use image::DynamicImage;
use ndarray::{Array2, ArrayView2};
use network::Network;
use preprocess::Preprocessor;
use tracing::debug;

/// The outcome of one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// What the model actually saw, `side x side` in `[0, 1]`.
    pub input: Array2<f32>,
    pub probabilities: Probabilities<f32>,
}

impl Prediction {
    /// Most likely digit and its probability.
    pub fn digit(&self) -> (usize, f32) {
        self.probabilities.top()
    }
}

/// Preprocessor and pretrained network, loaded once at startup.
#[derive(Debug, Clone)]
pub struct DigitPredictor {
    preprocessor: Preprocessor,
    network: Network,
}

impl DigitPredictor {
    /// Loads the model artifact named in `model`.
    ///
    /// # Errors
    ///
    /// Fails if the artifact is missing or invalid, if it does not produce
    /// one output per digit, or if the preprocessing settings are invalid.
    pub fn from_config(model: &ModelSettings, preprocess: &PreprocessSettings) -> Result<Self> {
        let network = Network::load(&model.path)?;
        let preprocessor = Preprocessor::new(preprocess.to_config()?)?;
        Self::new(preprocessor, network)
    }

    pub fn new(preprocessor: Preprocessor, network: Network) -> Result<Self> {
        if network.output_len() != DIGIT_CLASSES {
            return Err(LiveMnistError::OutputWidth {
                expected: DIGIT_CLASSES,
                found: network.output_len(),
            });
        }
        Ok(Self {
            preprocessor,
            network,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Preprocesses `image` and classifies it.
    pub fn predict(&self, image: &DynamicImage) -> Result<Prediction> {
        let input = self.preprocessor.process(image)?;
        let probabilities = self.classify(input.view())?;
        Ok(Prediction {
            input,
            probabilities,
        })
    }

    /// Classifies an already preprocessed input.
    pub fn classify(&self, input: ArrayView2<f32>) -> Result<Probabilities<f32>> {
        let output = self.network.forward(input)?;

        let probabilities = if self.network.ends_with_softmax() {
            Probabilities::try_from_vec(output.to_vec())?
        } else {
            Probabilities::from_logits(output.view())?
        };

        let (digit, confidence) = probabilities.top();
        debug!(digit, confidence, "classified input");
        Ok(probabilities)
    }
}
