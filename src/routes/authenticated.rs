use crate::{AppState, handlers::admin};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// The admin dashboard and every mutation it issues. `create_router` wraps this router
/// in `guard::require_session`, so each handler here can rely on a `Session` extension
/// being present.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /admin/dashboard?tab=<manager>&edit=<id>&delete=<id>
        .route("/dashboard", get(admin::dashboard))
        // POST /admin/manage/{manager}
        // Hidden `id` present: update that row. Absent: insert.
        .route("/manage/{manager}", post(admin::manage_submit))
        // POST /admin/manage/{manager}/{id}/delete
        // Requires `confirm=yes`; anything else is treated as a decline.
        .route("/manage/{manager}/{id}/delete", post(admin::manage_delete))
}
