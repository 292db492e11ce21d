//! Express compatibility server.
//!
//! Serves the reference application from [`express_router::compat`] so its
//! routing behaviour can be compared with a stock Express server.

use std::path::PathBuf;

use clap::Parser;

use express_router::compat;
use express_router::config::{load_config, AppConfig};
use express_router::lifecycle::startup;
use express_router::observability::logging;
use express_router::{Dispatcher, RouterOptions};

#[derive(Parser, Debug)]
#[command(name = "express-compat", version, about = "Express routing compatibility server")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "express-compat starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        case_sensitive = config.routing.case_sensitive,
        strict = config.routing.strict,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let app = compat::build_app_with(RouterOptions {
        case_sensitive: config.routing.case_sensitive,
        strict: config.routing.strict,
        merge_params: false,
    })?;

    startup::serve(config, Dispatcher::new(app)).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
