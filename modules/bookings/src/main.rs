use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use bookings_rs::{
    clock::SystemClock,
    config::{Config, StoreType},
    db::init_pool,
    metrics::Metrics,
    repos::{BookingRepository, InMemoryBookingRepository, PgBookingRepository},
    router, AppState, TransitionService,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting bookings service...");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, store_type={:?}",
        config.host,
        config.port,
        config.store_type
    );

    let repo: Arc<dyn BookingRepository> = match config.store_type {
        StoreType::InMemory => {
            tracing::info!("Using InMemory booking store");
            Arc::new(InMemoryBookingRepository::new())
        }
        StoreType::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL checked by Config::from_env");

            tracing::info!("Connecting to database...");
            let pool = init_pool(database_url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Running migrations...");
            sqlx::migrate!("./db/migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            Arc::new(PgBookingRepository::new(pool))
        }
    };

    let metrics = Metrics::new().expect("Failed to register metrics");
    let service = TransitionService::new(repo, Arc::new(SystemClock), metrics);
    let app = router(AppState { service });

    let host: std::net::IpAddr = config.host.parse().expect("HOST must be a valid IP address");
    let addr = SocketAddr::from((host, config.port));
    tracing::info!("Bookings service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
