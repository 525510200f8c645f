#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! REM joinpoint dashboard server.
//!
//! Loads the joinpoint exports named by the environment (see
//! [`rem_dashboard_server::config::ServerConfig`]) and serves the dashboard
//! until shut down.

use std::process::ExitCode;

use rem_dashboard_server::config::ServerConfig;

#[actix_web::main]
async fn main() -> ExitCode {
    pretty_env_logger::init_custom_env("RUST_LOG");

    match rem_dashboard_server::run_server(ServerConfig::from_env()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
