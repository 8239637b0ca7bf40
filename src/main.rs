/*
 * Contentment swap service
 * Main entry point for the application
 */

use anyhow::Context;
use contentment_swap::{api, config::Config, service::SwapService};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.server.log_level, config.server.log_json);

    info!("Starting Contentment swap service on {}", config.chain.name);

    let swap_service = SwapService::new(config.clone())
        .await
        .map_err(|e| {
            error!("Failed to initialize swap service: {e}");
            e
        })
        .context("Failed to initialize swap service")?;

    let api_state = api::ApiState {
        config: config.clone(),
        swap_service: Arc::new(swap_service),
    };

    info!("Starting API server on {}:{}", config.server.host, config.server.port);

    api::create_rocket(api_state)
        .launch()
        .await
        .context("API server terminated")?;

    Ok(())
}

/// `RUST_LOG` wins over the configured level; a bare level also quiets the HTTP stack.
fn init_tracing(log_level: &str, json_format: bool) {
    let level = log_level.trim();
    let directives = if level.contains(',') || level.contains('=') {
        level.to_string()
    } else {
        format!("{level},hyper=info,reqwest=info,rocket=info")
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::from_str(&directives))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json_format {
        subscriber
            .with(fmt::layer().json().with_target(false).with_current_span(false))
            .init();
    } else {
        subscriber.with(fmt::layer().with_target(true).compact()).init();
    }
}
