use crate::{AppState, handlers::pages};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Server-rendered pages for anonymous visitors. Every page reads its content from the
/// table store on each request; a store failure renders the page with empty sections.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; does not touch the store.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(pages::home))
        .route("/about", get(pages::about))
        .route("/internship", get(pages::internship))
        .route("/projects", get(pages::projects))
        // GET renders the form, POST stores a message in the inbox.
        .route("/contact", get(pages::contact).post(pages::send_message))
        // POST /theme
        // Flips the persisted light/dark preference and redirects back.
        .route("/theme", post(pages::toggle_theme))
}
