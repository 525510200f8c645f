//! HTTP handler functions for the dashboard API.

use actix_web::{HttpResponse, web};
use rem_dashboard_server_models::{ApiHealth, ApiMunicipalities, DashboardQueryParams};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/municipalities`
///
/// Returns the selector options and the default selection.
pub async fn municipalities(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiMunicipalities {
        municipalities: state.tables.municipalities().to_vec(),
        default: state.tables.default_municipality().to_string(),
    })
}

/// `GET /api/dashboard?municipality=KEY`
///
/// Returns the four dashboard artifacts for the selected municipality.
/// Selections without data yield the placeholder view rather than an error,
/// so the page always has something to render.
pub async fn dashboard(
    state: web::Data<AppState>,
    params: web::Query<DashboardQueryParams>,
) -> HttpResponse {
    let key = params
        .municipality
        .as_deref()
        .unwrap_or_else(|| state.tables.default_municipality());

    let view = rem_dashboard_view::render(&state.tables, key);
    HttpResponse::Ok().json(view)
}
