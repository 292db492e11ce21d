//! Startup orchestration.
//!
//! # Responsibilities
//! - Start background tasks (metrics endpoint, signal watcher)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: a bind error is fatal
//! - Listeners start last (traffic only when ready)

use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::routing::Dispatcher;

/// Serve `dispatcher` with `config` until a termination signal arrives.
pub async fn serve(config: AppConfig, dispatcher: Dispatcher) -> Result<(), std::io::Error> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::wait_for_signal(shutdown));

    HttpServer::new(config, dispatcher)
        .run(listener, server_shutdown)
        .await
}
