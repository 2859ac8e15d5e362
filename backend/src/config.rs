use std::env;

/// Default TorchScript artifact, next to the working directory like the
/// training export leaves it.
pub const DEFAULT_MODEL_PATH: &str = "ai_vs_real_cnn.pt";

/// Input resolution the classifier was trained with.
pub const IMG_SIZE: u32 = 224;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

pub fn model_path() -> String {
    env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string())
}

pub fn server_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(5000)
}
