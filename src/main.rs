use actix_multipart::form::MultipartFormConfig;
use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, error::InternalError};
use serde_json::json;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod model;
mod models;
mod routes;
mod store;
mod utils;

use config::Config;
use db::{ensure_default_admin, init_store};

use crate::docs::ApiDoc;
use crate::utils::username_cache;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store = init_store(&config)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    if let Err(e) = ensure_default_admin(store.as_ref(), &config).await {
        error!(error = %e, "Failed to create default super-admin");
    }

    let store_for_cache_warmup = store.clone();
    actix_web::rt::spawn(async move {
        // Warm up taken usernames in batches of 250
        if let Err(e) = username_cache::warmup_username_cache(store_for_cache_warmup.as_ref(), 250).await {
            error!(error = %e, "Failed to warmup username cache");
        }
    });

    let server_addr = config.server_addr.clone();
    let upload_limit = config.max_upload_bytes();
    info!(addr = %server_addr, backend = store.backend(), "Listening");

    HttpServer::new(move || {
        let multipart_config = MultipartFormConfig::default()
            .total_limit(upload_limit)
            .error_handler(|err, _req| {
                let response = HttpResponse::BadRequest().json(json!({ "error": err.to_string() }));
                InternalError::from_response(err, response).into()
            });

        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::from(store.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(multipart_config)
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(server_addr)?
    .run()
    .await
}
