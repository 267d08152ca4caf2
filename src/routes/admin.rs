use crate::{AppState, guard, handlers::admin};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// The parts of `/admin` that an anonymous visitor must be able to reach. Nested under
/// `/admin` next to the authenticated router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin
        // Convenience entry point; the guard on the dashboard decides where it ends up.
        .route("/", get(admin::admin_index))
        // GET /admin/login renders the form; POST signs in and sets the session cookie.
        .route("/login", get(admin::login_page).post(admin::login))
        .route("/logout", post(admin::logout))
        // GET /admin/session/events
        // Server-sent events mirroring the guard for the current cookie. Open pages
        // leave as soon as it reports `unauthorized`.
        .route("/session/events", get(guard::session_events))
}
