use actix_web::{web, App, HttpServer};
use log::{error, info, warn};

use fs_blobstore::api;
use fs_blobstore::app_state::AppState;
use fs_blobstore::config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::load().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    if let Err(e) = log4rs::init_file(&config.logging.config_file, Default::default()) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        warn!("Could not load {}: {}. Logging to stderr.", config.logging.config_file, e);
    }

    let host = config.server.host.clone();
    let port = config.server.port;
    let workers = config.server.workers;
    let max_payload_size = config.server.max_payload_size;

    let app_state = AppState::from_config(config).map_err(|e| {
        error!("Failed to initialize storage: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    let app_state = web::Data::new(app_state);

    info!("Starting server on {}:{}", host, port);
    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .configure(api::configure)
    })
    .workers(workers)
    .bind((host.as_str(), port))?
    .run()
    .await
}
