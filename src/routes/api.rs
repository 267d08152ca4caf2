use crate::{AppState, handlers::api};
use axum::{
    Router,
    routing::{get, post},
};

/// API Router Module
///
/// JSON views of the same tables the pages render, for clients that want raw data.
/// Mounted under `/api`; documented in the OpenAPI document served at `/swagger-ui`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(api::get_profile))
        .route("/education", get(api::get_education))
        .route("/experiences", get(api::get_experiences))
        .route("/projects", get(api::get_projects))
        .route("/skills", get(api::get_skills))
        .route("/certifications", get(api::get_certifications))
        .route("/messages", post(api::create_message))
}
