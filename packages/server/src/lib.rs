#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the violation map and price guide.
//!
//! Serves the filtered violation list, proximity clusters (as JSON and
//! `GeoJSON`), the report/admin endpoints, and the official price list.
//! Every read recomputes from the in-memory collection; nothing derived
//! from the records is cached between requests.

mod handlers;

use std::sync::RwLock;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, error, middleware, web};
use cpa_map_config::MapConfig;
use cpa_map_dataset::{DatasetError, PriceCatalog, ViolationStore};
use cpa_map_server_models::ApiError;

/// Errors that can occur while starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A record store could not be loaded.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Binding or running the HTTP server failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Violation records. Writers are the report and admin endpoints.
    pub store: RwLock<ViolationStore>,
    /// Official price list (read-only).
    pub prices: PriceCatalog,
    /// Resolved runtime configuration.
    pub config: MapConfig,
}

impl AppState {
    /// Bundles the stores and configuration for the handlers.
    #[must_use]
    pub const fn new(store: ViolationStore, prices: PriceCatalog, config: MapConfig) -> Self {
        Self {
            store: RwLock::new(store),
            prices,
            config,
        }
    }

    /// Opens both stores from `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if a store file exists but is unreadable or
    /// malformed.
    pub fn open(config: MapConfig) -> Result<Self, DatasetError> {
        log::info!("Opening stores in {}", config.data_dir.display());
        let store = ViolationStore::open(&config.data_dir)?;
        let prices = PriceCatalog::open(&config.data_dir)?;
        Ok(Self::new(store, prices, config))
    }
}

/// Registers the `/api` routes and the JSON error handlers for extractors.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let body = ApiError::new(err.to_string());
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    }))
    .app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let body = ApiError::new(err.to_string());
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    }))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/violations", web::get().to(handlers::violations))
            .route("/violations", web::post().to(handlers::submit_report))
            .route("/violations/{id}", web::get().to(handlers::violation))
            .route("/violations/{id}", web::put().to(handlers::update_violation))
            .route("/violations/{id}", web::delete().to(handlers::delete_violation))
            .route("/audit-log", web::get().to(handlers::audit_log))
            .route("/violation-types", web::get().to(handlers::violation_types))
            .route("/summary", web::get().to(handlers::summary))
            .route("/clusters", web::get().to(handlers::clusters))
            .route("/clusters/geojson", web::get().to(handlers::clusters_geojson))
            .route("/prices", web::get().to(handlers::prices))
            .route("/prices/barcode/{code}", web::get().to(handlers::price_by_barcode))
            .route("/price-categories", web::get().to(handlers::price_categories)),
    );
}

/// Starts the violation map API server.
///
/// Opens the stores from the configured data directory and serves until
/// the server is stopped. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if a store cannot be loaded or the HTTP server
/// fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: MapConfig) -> Result<(), ServerError> {
    let bind_addr = config.bind_addr.clone();
    let port = config.port;

    log::info!(
        "Cluster threshold: {} degrees",
        config.cluster_threshold.degrees()
    );
    let state = web::Data::new(AppState::open(config)?);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
