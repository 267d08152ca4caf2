use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use axum_extra::extract::cookie::Key;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Collaborators: the hosted auth service and the hosted table store.
pub mod auth;
pub mod store;
pub mod schema;

// Domain: records, the generic list editor and the session guard.
pub mod models;
pub mod editor;
pub mod guard;

// Web layer.
pub mod handlers;
pub mod theme;
pub mod views;
pub mod config;
pub mod error;

// Module for routing segregation (Public, API, Admin, Authenticated).
pub mod routes;
use routes::{admin, api, authenticated, public};

// --- Public Re-exports ---

pub use auth::{AuthState, MockAuthProvider, SupabaseAuth};
pub use config::AppConfig;
pub use store::{MemoryStore, PostgresStore, StoreState};
pub use views::Views;

/// ApiDoc
///
/// Generates the OpenAPI document for the JSON API under `/api`. Served at
/// `/api-docs/openapi.json` and browsable through Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::api::get_profile, handlers::api::get_education,
        handlers::api::get_experiences, handlers::api::get_projects,
        handlers::api::get_skills, handlers::api::get_certifications,
        handlers::api::create_message,
    ),
    components(
        schemas(
            models::Profile, models::Education, models::Experience, models::Project,
            models::SkillCategory, models::Certification, models::Message,
            models::ContactRequest,
        )
    ),
    tags(
        (name = "portfolio", description = "Portfolio content API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Unified state shared by every request. Handlers pull the one component they need
/// through the `FromRef` impls below.
#[derive(Clone)]
pub struct AppState {
    /// Table store holding every piece of site content.
    pub store: StoreState,
    /// Hosted authentication service.
    pub auth: AuthState,
    /// Compiled templates.
    pub views: Views,
    pub config: AppConfig,
    /// Key encrypting the session cookie.
    pub cookie_key: Key,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for StoreState {
    fn from_ref(app_state: &AppState) -> StoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(app_state: &AppState) -> AuthState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for Views {
    fn from_ref(app_state: &AppState) -> Views {
        app_state.views.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

// Required by `PrivateCookieJar`.
impl FromRef<AppState> for Key {
    fn from_ref(app_state: &AppState) -> Key {
        app_state.cookie_key.clone()
    }
}

/// create_router
///
/// Assembles the public, API and admin routers, puts the session guard in front of the
/// authenticated part of `/admin`, and wraps everything in the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // Everything under /admin except login, logout and the event stream is guarded.
    let admin_router = admin::admin_routes().merge(
        authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_session,
        )),
    );

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/api", api::api_routes())
        .nest("/admin", admin_router)
        .fallback(handlers::pages::not_found)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, tagged with the `x-request-id` set by `SetRequestIdLayer` so
/// every log line of the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
