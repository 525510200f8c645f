#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for the REM joinpoint dashboard.
//!
//! Loads the two joinpoint exports once at startup, then serves the JSON API
//! the dashboard page calls on every selection change, plus the page itself
//! from a static directory. The loaded tables are read-only and shared by
//! all workers without locking.

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use rem_dashboard_joinpoint::{JoinpointTables, LoadError};

use crate::config::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// Joinpoint exports loaded at startup.
    pub tables: Arc<JoinpointTables>,
}

/// Errors that prevent the server from starting or keep it from running.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The joinpoint exports could not be loaded.
    #[error("Failed to load joinpoint exports: {0}")]
    Load(#[from] LoadError),

    /// Binding or running the HTTP server failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Registers the `/api` routes.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/municipalities", web::get().to(handlers::municipalities))
            .route("/dashboard", web::get().to(handlers::dashboard)),
    );
}

/// Starts the dashboard server.
///
/// Loads the joinpoint exports, then starts the Actix-Web HTTP server. This
/// is a regular async function; the caller provides the runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// * [`ServerError::Load`] if either export is missing or malformed; the
///   server never starts listening in that case
/// * [`ServerError::Io`] if the HTTP server fails to bind or run
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    log::info!("Loading joinpoint exports...");
    let tables = JoinpointTables::load(&config.load)?;

    let state = web::Data::new(AppState {
        tables: Arc::new(tables),
    });

    let ServerConfig {
        bind_addr,
        port,
        static_dir,
        ..
    } = config;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(api_routes)
            // Serve the dashboard page
            .service(Files::new("/", static_dir.clone()).index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    log::info!("Server stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn fails_before_serving_when_exports_are_missing() {
        let config = ServerConfig::from_lookup(|name| match name {
            "JOINPOINT_SEGMENTS_PATH" => Some("/nonexistent/apc.txt".to_string()),
            "JOINPOINT_DATA_PATH" => Some("/nonexistent/data.txt".to_string()),
            _ => None,
        });

        let err = run_server(config).await.unwrap_err();
        assert!(matches!(err, ServerError::Load(LoadError::Io { .. })));
    }
}
