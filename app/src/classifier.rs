use image::DynamicImage;
use live_mnist::config::AppConfig;
use live_mnist::{DigitPredictor, Prediction, Preprocessor, Probabilities, DIGIT_CLASSES};
use ndarray::Array1;
use rand::Rng;
use std::error::Error;
use tracing::{info, warn};

/// A trait that defines the common interface for everything the SUBMIT
/// button can ask for a prediction.
pub trait Classifier: Send + Sync {
    /// Classify a rasterized canvas.
    fn predict(&self, image: &DynamicImage) -> Result<Prediction, Box<dyn Error + Send + Sync>>;

    /// Return the name shown in the side panel (e.g., "mnist-mlp").
    fn name(&self) -> String;
}

/// The pretrained network behind the [`Classifier`] interface.
pub struct NetworkAdapter {
    predictor: DigitPredictor,
}

impl NetworkAdapter {
    pub fn new(predictor: DigitPredictor) -> Self {
        Self { predictor }
    }
}

impl Classifier for NetworkAdapter {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction, Box<dyn Error + Send + Sync>> {
        Ok(self.predictor.predict(image)?)
    }

    fn name(&self) -> String {
        let network = self.predictor.network();
        format!("{} ({} parameters)", network.name(), network.parameter_count())
    }
}

/// Random probabilities for trying the UI without a model file.
///
/// The canvas still goes through preprocessing so the model input preview
/// stays meaningful.
pub struct PlaceholderAdapter {
    preprocessor: Preprocessor,
}

impl PlaceholderAdapter {
    pub fn new(preprocessor: Preprocessor) -> Self {
        Self { preprocessor }
    }
}

impl Classifier for PlaceholderAdapter {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction, Box<dyn Error + Send + Sync>> {
        let input = self.preprocessor.process(image)?;

        let mut rng = rand::rng();
        // Keep every weight strictly positive so the normalization never sees zero mass.
        let weights: Array1<f32> =
            Array1::from_shape_fn(DIGIT_CLASSES, |_| rng.random_range(f32::EPSILON..1.0));
        let probabilities = Probabilities::from_weights(weights.view())?;

        Ok(Prediction {
            input,
            probabilities,
        })
    }

    fn name(&self) -> String {
        "placeholder (random)".to_string()
    }
}

/// Picks the classifier described by the configuration.
///
/// # Errors
///
/// Fails when the model cannot be loaded, unless `model.placeholder` is set.
pub fn build_classifier(config: &AppConfig) -> live_mnist::Result<Box<dyn Classifier>> {
    if config.model.placeholder {
        warn!("model.placeholder is set, predictions are random");
        let preprocessor = Preprocessor::new(config.preprocess.to_config()?)?;
        return Ok(Box::new(PlaceholderAdapter::new(preprocessor)));
    }

    let predictor = DigitPredictor::from_config(&config.model, &config.preprocess)?;
    info!(model = %config.model.path.display(), "model ready");
    Ok(Box::new(NetworkAdapter::new(predictor)))
}
