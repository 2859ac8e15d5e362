use std::sync::{Arc, Mutex};

use log::{error, info, warn};
use shared::{Label, Prediction};
use tch::{CModule, Device, Kind, Tensor};

use crate::config::IMG_SIZE;
use crate::error::PredictError;

/// Seam between the HTTP layer and the inference engine. Tests stand in a
/// fixed-output backend where the real TorchScript module would be.
pub trait InferenceBackend: Send + Sync {
    fn forward(&self, input: &Tensor) -> Result<Vec<f32>, PredictError>;
}

struct TorchBackend {
    module: Mutex<CModule>,
    device: Device,
}

impl InferenceBackend for TorchBackend {
    fn forward(&self, input: &Tensor) -> Result<Vec<f32>, PredictError> {
        let input = input.to_device(self.device);
        let output = self.module.lock().unwrap().forward_ts(&[input])?;
        let flat = output.to_kind(Kind::Float).view([-1]);
        Vec::<f32>::try_from(&flat).map_err(PredictError::Inference)
    }
}

/// Handle to the loaded classifier, set once at startup and shared read-only
/// with every request handler.
#[derive(Clone)]
pub struct ModelHost {
    backend: Option<Arc<dyn InferenceBackend>>,
}

impl ModelHost {
    /// Load the TorchScript artifact from disk. A missing or unreadable
    /// artifact is not fatal: the server starts anyway and predict requests
    /// report the error instead.
    pub fn load(model_path: &str) -> Self {
        let device = Device::cuda_if_available();
        match CModule::load_on_device(model_path, device) {
            Ok(module) => {
                let backend = TorchBackend {
                    module: Mutex::new(module),
                    device,
                };
                let side = IMG_SIZE as i64;
                let input_shape = [1, side, side, 3];
                let probe = Tensor::zeros(input_shape, (Kind::Float, Device::Cpu));
                match backend.forward(&probe) {
                    Ok(output) => info!(
                        "Model loaded from {} (input shape {:?}, output length {})",
                        model_path,
                        input_shape,
                        output.len()
                    ),
                    Err(e) => warn!(
                        "Model loaded from {} but probe forward failed: {}",
                        model_path, e
                    ),
                }
                Self {
                    backend: Some(Arc::new(backend)),
                }
            }
            Err(e) => {
                error!("Error loading model from {}: {}", model_path, e);
                Self { backend: None }
            }
        }
    }

    pub fn with_backend(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Host with no model attached, as after a failed load.
    pub fn unloaded() -> Self {
        Self { backend: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.is_some()
    }

    /// One forward pass, output flattened to a probability vector.
    pub fn predict(&self, input: &Tensor) -> Result<Vec<f32>, PredictError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or(PredictError::ModelNotLoaded)?;
        backend.forward(input)
    }
}

/// Map the raw output vector to a label and confidence percentage.
///
/// Two values are softmax probabilities ordered (AI, real); one value is a
/// sigmoid score where 1 means real photo. Confidence is the winning class's
/// probability as a percentage, rounded to two decimals.
pub fn interpret(predictions: &[f32]) -> Result<Prediction, PredictError> {
    let (label, probability) = if predictions.len() == 2 {
        let (ai_prob, real_prob) = (predictions[0], predictions[1]);
        if real_prob > ai_prob {
            (Label::RealPhoto, real_prob)
        } else {
            (Label::AiGenerated, ai_prob)
        }
    } else if let Some(&score) = predictions.first() {
        if score > 0.5 {
            (Label::RealPhoto, score)
        } else {
            (Label::AiGenerated, 1.0 - score)
        }
    } else {
        return Err(PredictError::EmptyOutput);
    };

    Ok(Prediction {
        label,
        confidence: round_percent(probability),
    })
}

fn round_percent(probability: f32) -> f32 {
    (probability * 100.0 * 100.0).round() / 100.0
}
