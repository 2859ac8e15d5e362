use serde::{Deserialize, Serialize};

/// Class labels the classifier was trained on.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    #[serde(rename = "AI_GENERATED")]
    AiGenerated,
    #[serde(rename = "REAL_PHOTO")]
    RealPhoto,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: Label,
    /// Winning-class probability as a percentage, rounded to two decimals.
    pub confidence: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: Prediction,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
