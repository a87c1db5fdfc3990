use aqi_stream::config::FeedConfig;
use aqi_stream::engine::AqiEngine;
use aqi_stream::feed::{subscribe, StopReason};
use anyhow::Context;
use futures::{future, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!(version = aqi_stream::SERVICE_VERSION, "Starting AQI stream service");

    let config = FeedConfig::from_env()?;
    let engine = AqiEngine::new(config.engine.clone())?;

    let (ws_stream, _) = tokio_tungstenite::connect_async(config.url.as_str())
        .await
        .map_err(|e| {
            error!(url = %config.url, error = %e, "Feed connection failed");
            e
        })
        .with_context(|| format!("connecting to {}", config.url))?;

    info!(url = %config.url, "Connected to feed");

    // Text frames carry batches; binary frames are accepted when they are UTF-8.
    let frames = ws_stream.filter_map(|item| {
        future::ready(match item {
            Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => Some(Ok(text.to_owned())),
                Err(_) => {
                    warn!(len = bytes.len(), "Skipping non-UTF-8 binary frame");
                    None
                }
            },
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    });

    let (tx, mut rx) = mpsc::channel(config.update_buffer);
    let subscription = subscribe(engine, frames, tx);

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Some(tick) => println!("{}", serde_json::to_string(&tick)?),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, unsubscribing");
                break;
            }
        }
    }

    drop(rx);
    let (engine, reason) = subscription.unsubscribe().await?;
    if reason == StopReason::StreamEnded {
        warn!("Feed closed by server");
    }

    info!(
        ?reason,
        cities = engine.store().len(),
        metrics = ?engine.metrics().export(),
        "Shutdown complete"
    );

    Ok(())
}
