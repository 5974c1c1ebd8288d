//! API server entry point.

use std::sync::Arc;

use api::config::{Backend, Config};
use api::{AppState, CafeStore};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{MemoryStore, PostgresStore};
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

async fn serve<S: CafeStore>(store: S, metrics_handle: PrometheusHandle, config: &Config) {
    let state = Arc::new(AppState::new(store));
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
    let (text_layer, json_layer) = if config.log_json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(text_layer)
        .with(json_layer)
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Open the configured backend and serve
    match config.backend() {
        Backend::Postgres {
            url,
            max_connections,
        } => {
            let store = PostgresStore::connect(&url, max_connections)
                .await
                .expect("failed to connect to database");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!(max_connections, "using postgres backend");
            serve(store, metrics_handle, &config).await;
        }
        Backend::File(dir) => {
            let store = MemoryStore::open(&dir)
                .await
                .expect("failed to open data directory");
            tracing::info!(
                data_dir = %dir.display(),
                orders = store.order_count().await,
                "using file-backed store"
            );
            serve(store, metrics_handle, &config).await;
        }
        Backend::Memory => {
            tracing::info!("using in-memory store; data is lost on shutdown");
            serve(MemoryStore::new(), metrics_handle, &config).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
