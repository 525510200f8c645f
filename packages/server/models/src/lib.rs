#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the REM dashboard server.
//!
//! The dashboard view itself is serialized straight from
//! `rem_dashboard_view_models::DashboardView`; this crate only holds the
//! envelope types of the surrounding endpoints.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Options for the municipality selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMunicipalities {
    /// All selectable municipality keys, sorted.
    pub municipalities: Vec<String>,
    /// Initially selected key (first alphabetically).
    pub default: String,
}

/// Query parameters for the dashboard endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQueryParams {
    /// Selected municipality key; the default selection when absent.
    pub municipality: Option<String>,
}
