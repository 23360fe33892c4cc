//! Offline sync agent entry point
//!
//! Run with:
//! ```bash
//! BACKEND_URL=https://... BACKEND_API_KEY=... cargo run -p tour-agent
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use tour_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Agent stopped with an error");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!(
        name = %config.app.name,
        env = ?config.app.env,
        cache = %config.offline.cache_path.display(),
        "Starting offline sync agent..."
    );

    tour_agent::run(config).await
}
