use anyhow::{Context, Result};
use std::sync::Arc;
use type_buddy::config::Config;
use type_buddy::inference::OllamaClient;
use type_buddy::input::source::{EventSource, RdevSource};
use type_buddy::output::DesktopSink;
use type_buddy::pipeline::{self, PipelineSettings};
use type_buddy::{permissions, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    telemetry::init(&config.telemetry)?;
    tracing::info!("type-buddy starting");

    permissions::request_all_permissions()?;

    let client = OllamaClient::new(&config.inference).context("failed to create inference client")?;
    if config.inference.pull_missing_model {
        // Non-fatal: the backend may start after us.
        if let Err(e) = client.ensure_model().await {
            tracing::warn!(error = %e, model = client.model(), "could not verify model on backend");
        }
    }

    let mut source = RdevSource::new();
    let events = source.start().context("failed to start input hook")?;

    let settings = PipelineSettings::from(&config);
    tracing::info!(
        accept_keys = ?settings.accept_keys,
        backspace = settings.backspace_key,
        "pipeline starting (press Ctrl+C to exit)"
    );

    tokio::select! {
        result = pipeline::run(events, &settings, Arc::new(client), Arc::new(DesktopSink)) => {
            result?;
            tracing::warn!("input hook ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            source.stop();
        }
    }

    Ok(())
}
