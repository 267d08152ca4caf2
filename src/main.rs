use axum_extra::extract::cookie::Key;
use portfolio_site::{
    AppState,
    auth::{AuthState, SupabaseAuth},
    config::{AppConfig, Env},
    create_router,
    schema::init_schema,
    store::{PostgresStore, StoreState},
    views::Views,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, the two collaborators (table store and auth
/// service), templates, then the HTTP server. Any failure before the server is
/// listening aborts startup.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise debug for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portfolio_site=debug,tower_http=info,axum=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Table store (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    // LOCAL-ONLY: create the content tables on a fresh development database.
    if config.env == Env::Local {
        init_schema(&pool)
            .await
            .expect("FATAL: Failed to apply the local schema.");
        tracing::info!("Local schema ensured.");
    }

    let store = Arc::new(PostgresStore::new(pool)) as StoreState;

    // 4. Auth service
    let auth = Arc::new(SupabaseAuth::new(
        &config.supabase_url,
        &config.supabase_anon_key,
        &config.jwt_secret,
    )) as AuthState;

    // 5. Session cookie key. Without a configured secret, sessions end on restart.
    let cookie_key = match config.cookie_secret.as_deref() {
        Some(secret) => Key::try_from(secret.as_bytes())
            .expect("FATAL: COOKIE_SECRET must be at least 64 bytes."),
        None => {
            tracing::warn!("COOKIE_SECRET not set; generating a per-process cookie key.");
            Key::generate()
        }
    };

    // 6. Templates
    let views = Views::new(&config).expect("FATAL: Failed to compile templates.");

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        store,
        auth,
        views,
        config,
        cookie_key,
    };

    // 7. Router and server
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "HTTP server terminated");
    }
}
