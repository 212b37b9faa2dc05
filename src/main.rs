use std::sync::Arc;

use git_status_relay::api::{StatusHandler, router};
use git_status_relay::config::{HandlerKind, RelayConfig};
use git_status_relay::error::Result;
use git_status_relay::logging::setup_logging;
use git_status_relay::AppState;
use tracing::info;

async fn run() -> Result<()> {
    let config = RelayConfig::from_env()?;
    let kind = config.handler_kind()?;
    let _log_guard = setup_logging(&config.log)?;

    let handler = match kind {
        HandlerKind::GithubPostStatus => StatusHandler::from_config(&config)?,
    };
    let state = Arc::new(AppState::new(config.function_name.clone(), handler));
    let app = router(state);

    info!(
        "Starting {:?} handler for function '{}'",
        kind, config.function_name
    );
    info!("Listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    if let Err(e) = run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
