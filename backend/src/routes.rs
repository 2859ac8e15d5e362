use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::{StreamExt, TryStreamExt};
use log::info;
use shared::{HealthResponse, PredictResponse};

use crate::config::ALLOWED_EXTENSIONS;
use crate::error::PredictError;
use crate::model::{interpret, ModelHost};
use crate::preprocess;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)))
        .service(web::resource("/api/predict").route(web::post().to(handle_predict)));
}

async fn health_check(model: web::Data<ModelHost>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "online".into(),
        model_loaded: model.is_loaded(),
        message: "DeepVerify API is running".into(),
    })
}

/// Validate the upload, preprocess it, run one forward pass and map the
/// output to a label/confidence pair. Stateless across requests.
async fn handle_predict(
    model: web::Data<ModelHost>,
    mut payload: Multipart,
) -> Result<HttpResponse, PredictError> {
    if !model.is_loaded() {
        return Err(PredictError::ModelNotLoaded);
    }

    let (filename, image_data) = read_image_field(&mut payload).await?;
    validate_extension(&filename)?;

    let tensor = preprocess::image_to_tensor(&image_data)?;
    let predictions = model.predict(&tensor)?;
    let prediction = interpret(&predictions)?;

    info!(
        "Predicted {:?} at {:.2}% for {}",
        prediction.label, prediction.confidence, filename
    );

    Ok(HttpResponse::Ok().json(PredictResponse {
        success: true,
        prediction,
    }))
}

/// Pull the `image` form field out of the multipart stream, returning its
/// filename and raw bytes. Other fields are drained and ignored.
async fn read_image_field(payload: &mut Multipart) -> Result<(String, Vec<u8>), PredictError> {
    while let Ok(Some(mut field)) = payload.try_next().await {
        if field.name() != Some("image") {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| PredictError::Upload(e.to_string()))?;
            }
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        if filename.is_empty() {
            return Err(PredictError::EmptyFilename);
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| PredictError::Upload(e.to_string()))?;
            data.extend_from_slice(&chunk);
        }
        return Ok((filename, data));
    }

    Err(PredictError::MissingImage)
}

fn validate_extension(filename: &str) -> Result<(), PredictError> {
    let ext = filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(PredictError::InvalidExtension(ext))
    }
}
