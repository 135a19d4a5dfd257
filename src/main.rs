use std::sync::Arc;

use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use tracing::{error, info};

use crate::api::AppInfo;
use crate::config::Config;
use crate::repository::database::Database;
use crate::repository::TodoRepository;

mod api;
mod config;
mod error;
mod models;
mod repository;
mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = telemetry::init(env!("CARGO_PKG_NAME"), &config.log_level) {
        eprintln!("failed to install the tracing subscriber: {err}");
        std::process::exit(1);
    }
    error::init(config.environment);

    let database = match Database::new(&config.database) {
        Ok(database) => database,
        Err(err) => {
            error!(error = %err, "Failed to connect to the database");
            std::process::exit(1);
        }
    };
    let repo: Arc<dyn TodoRepository> = Arc::new(database);
    let repo = web::Data::from(repo);
    let app_info = web::Data::new(AppInfo::new(config.environment, &config.api_version));

    info!(
        environment = %config.environment,
        port = config.port,
        prefix = %format!("/api/{}", config.api_version),
        "Starting todo service"
    );

    let api_version = config.api_version.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(repo.clone())
            .app_data(app_info.clone())
            .configure(|cfg| api::config(cfg, &api_version))
            .default_service(web::route().to(api::not_found))
            .wrap(Logger::default())
            .wrap(from_fn(api::cors::cors))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
