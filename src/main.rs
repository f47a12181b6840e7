use std::sync::Arc;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use villa_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    session::{IdentityState, SupabaseIdentity},
};

/// main
///
/// Loads configuration, sets up logging, connects to the Supabase Postgres
/// database, builds the identity service and serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter: RUST_LOG wins, otherwise verbose defaults for development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "villa_portal=debug,tower_http=info,axum=trace".into());

    // 3. Log format follows the environment.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Identity (Supabase session cookies)
    let supabase = SupabaseIdentity::new(&config);
    tracing::info!(cookie = %supabase.cookie_name(), "Session cookie resolved");
    let identity = Arc::new(supabase) as IdentityState;

    if config.env == Env::Local {
        tracing::warn!("Local mode: the x-user-id development header is honoured");
    }

    let bind_addr = config.bind_addr.clone();

    // 6. State & router
    let app_state = AppState {
        repo,
        identity,
        config,
    };
    let app = create_router(app_state);

    // 7. Server
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {:?}", e);
    }
}
