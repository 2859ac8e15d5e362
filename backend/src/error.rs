use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use shared::ErrorResponse;
use thiserror::Error;

/// One variant per failure cause on the predict path. Validation failures
/// map to 400, everything else to 500.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Model not loaded. Please check server logs.")]
    ModelNotLoaded,
    #[error("No image file provided")]
    MissingImage,
    #[error("No file selected")]
    EmptyFilename,
    #[error("Invalid file type: {0}. Allowed: png, jpg, jpeg, webp")]
    InvalidExtension(String),
    #[error("Failed to read upload: {0}")]
    Upload(String),
    #[error("Image decoding failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Model inference failed: {0}")]
    Inference(#[from] tch::TchError),
    #[error("Model returned an empty output tensor")]
    EmptyOutput,
}

impl ResponseError for PredictError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingImage | Self::EmptyFilename | Self::InvalidExtension(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ModelNotLoaded
            | Self::Upload(_)
            | Self::Decode(_)
            | Self::Inference(_)
            | Self::EmptyOutput => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("Prediction error: {}", self);
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            error: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_are_bad_requests() {
        assert_eq!(PredictError::MissingImage.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(PredictError::EmptyFilename.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PredictError::InvalidExtension("gif".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn model_and_inference_failures_are_server_errors() {
        assert_eq!(
            PredictError::ModelNotLoaded.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            PredictError::EmptyOutput.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
