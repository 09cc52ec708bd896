//! Sketchroom server - real-time shared drawing rooms

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sketchroom::config::Config;
use sketchroom::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchroom=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    let state = AppState::new(config.grace_period());
    let app = sketchroom::app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        grace_secs = config.room_grace_secs,
        "Server listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;

    Ok(())
}
