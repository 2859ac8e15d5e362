use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use backend::config;
use backend::model::ModelHost;
use backend::routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let model_path = config::model_path();
    let model = ModelHost::load(&model_path);
    if !model.is_loaded() {
        log::warn!(
            "Serving without a model; predict requests will fail until {} is readable",
            model_path
        );
    }

    let port = config::server_port();
    let bind_address = format!("0.0.0.0:{}", port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(model.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
