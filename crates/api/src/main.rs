//! API server entry point.

use allocation::{AllocationClient, HttpAllocationClient};
use api::config::Config;
use booking_store::{BookingStore, InMemoryBookingStore, PostgresBookingStore};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S, A>(store: S, allocation: A, config: &Config, metrics_handle: PrometheusHandle)
where
    S: BookingStore + 'static,
    A: AllocationClient + 'static,
{
    let state = api::create_state(store, allocation, config);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Allocation service client
    let allocation =
        HttpAllocationClient::new(&config.allocation_service_url, config.allocation_timeout)
            .expect("failed to build allocation service client");
    tracing::info!(
        url = %allocation.base_url(),
        timeout_ms = config.allocation_timeout.as_millis() as u64,
        "allocation service configured"
    );

    // 4. Booking store, then serve
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let store = PostgresBookingStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL booking store");
            serve(store, allocation, &config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, bookings are kept in memory");
            serve(InMemoryBookingStore::new(), allocation, &config, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
