//! Live feed subscription
//!
//! Runs an [`AqiEngine`] on a background task, one tick per text frame from
//! any stream of frames. The task owns the engine exclusively, so frames are
//! processed strictly one at a time.
//!
//! Shutdown: [`Subscription::unsubscribe`] stops the task between frames, or
//! while it waits for room in the update channel, and hands the engine back. Dropping the handle stops it too. Transport errors
//! are logged and counted; the engine keeps consuming until the stream ends.

use std::fmt;

use chrono::Utc;
use futures::{Stream, StreamExt};
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::AqiEngine;
use crate::events::TickOutput;

/// Errors from the subscription lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Why the feed task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `unsubscribe` was called or the handle was dropped.
    Unsubscribed,
    /// The frame stream ended.
    StreamEnded,
    /// The update receiver was dropped.
    ReceiverClosed,
}

/// Handle to a running feed task.
pub struct Subscription<R> {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<(AqiEngine<R>, StopReason)>,
}

/// Start consuming `frames`, sending each tick's output to `updates`.
pub fn subscribe<S, E, R>(
    engine: AqiEngine<R>,
    frames: S,
    updates: mpsc::Sender<TickOutput>,
) -> Subscription<R>
where
    S: Stream<Item = Result<String, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
    R: Rng + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(run_feed(engine, frames, updates, shutdown_rx));

    Subscription {
        shutdown: Some(shutdown_tx),
        task,
    }
}

async fn run_feed<S, E, R>(
    mut engine: AqiEngine<R>,
    frames: S,
    updates: mpsc::Sender<TickOutput>,
    mut shutdown: oneshot::Receiver<()>,
) -> (AqiEngine<R>, StopReason)
where
    S: Stream<Item = Result<String, E>>,
    E: fmt::Display,
    R: Rng,
{
    let metrics = engine.metrics();
    let mut frames = Box::pin(frames);
    info!("Feed subscribed");

    let reason = loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break StopReason::Unsubscribed,

            next = frames.next() => match next {
                Some(Ok(text)) => {
                    let Some(tick) = engine.process_message(&text, Utc::now()) else {
                        continue;
                    };
                    // A full channel must not block shutdown.
                    tokio::select! {
                        biased;

                        _ = &mut shutdown => break StopReason::Unsubscribed,

                        sent = updates.send(tick) => {
                            if sent.is_err() {
                                break StopReason::ReceiverClosed;
                            }
                        }
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "Transport error");
                    metrics.record_transport_error();
                }
                None => break StopReason::StreamEnded,
            },
        }
    };

    info!(?reason, cities = engine.store().len(), "Feed stopped");
    (engine, reason)
}

impl<R> Subscription<R> {
    /// Stop the feed between frames and return the engine.
    pub async fn unsubscribe(mut self) -> Result<(AqiEngine<R>, StopReason), FeedError> {
        if let Some(shutdown) = self.shutdown.take() {
            // The task may already have stopped on its own.
            let _ = shutdown.send(());
        }
        Ok(self.task.await?)
    }

    /// Wait for the feed to stop on its own (stream end or receiver drop).
    pub async fn join(self) -> Result<(AqiEngine<R>, StopReason), FeedError> {
        let Subscription { shutdown, task } = self;
        let result = task.await;
        drop(shutdown);
        Ok(result?)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, ViewMode};
    use futures::stream;
    use std::time::Duration;
    use types::ids::CityId;

    fn engine() -> AqiEngine {
        AqiEngine::with_seed(EngineConfig::default(), 3).unwrap()
    }

    fn frame(text: &str) -> Result<String, String> {
        Ok(text.to_string())
    }

    #[tokio::test]
    async fn test_frames_become_ticks() {
        let (tx, mut rx) = mpsc::channel(8);
        let frames = stream::iter(vec![
            frame(r#"[{"city":"Delhi","aqi":"150"}]"#),
            frame(r#"[{"city":"Delhi","aqi":"152.345"}]"#),
        ]);

        let sub = subscribe(engine(), frames, tx);
        let (engine, reason) = sub.join().await.unwrap();
        assert_eq!(reason, StopReason::StreamEnded);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.table[0].aqi, "150");
        assert_eq!(second.table[0].aqi, "152.35");

        let delhi = engine.store().get(&CityId::new("Delhi")).unwrap();
        assert_eq!(delhi.history().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_errors_are_logged_not_fatal() {
        let (tx, mut rx) = mpsc::channel(8);
        let frames = stream::iter(vec![
            Err("connection reset".to_string()),
            frame(r#"[{"city":"Pune","aqi":"40"}]"#),
            frame("not json"),
        ]);

        let (engine, _) = subscribe(engine(), frames, tx).join().await.unwrap();

        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.table[0].city, "Pune");
        // The undecodable frame produced no tick.
        assert!(rx.recv().await.is_none());

        let exported = engine.metrics().export();
        assert_eq!(exported["transport_errors"], 1);
        assert_eq!(exported["messages_rejected"], 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_idle_feed() {
        let (tx, _rx) = mpsc::channel(8);
        let frames = stream::pending::<Result<String, String>>();

        let sub = subscribe(engine(), frames, tx);
        assert!(!sub.is_finished());

        let (engine, reason) = sub.unsubscribe().await.unwrap();
        assert_eq!(reason, StopReason::Unsubscribed);
        assert!(engine.store().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_keeps_merged_state() {
        let (tx, mut rx) = mpsc::channel(8);
        let frames = stream::iter(vec![frame(r#"[{"city":"Agra","aqi":"75"}]"#)])
            .chain(stream::pending());

        let sub = subscribe(engine(), frames, tx);
        rx.recv().await.unwrap();

        let (engine, reason) = sub.unsubscribe().await.unwrap();
        assert_eq!(reason, StopReason::Unsubscribed);
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_with_full_channel() {
        let (tx, rx) = mpsc::channel(1);
        let frames = stream::iter(vec![
            frame(r#"[{"city":"Agra","aqi":"75"}]"#),
            frame(r#"[{"city":"Agra","aqi":"76"}]"#),
        ])
        .chain(stream::pending());

        let sub = subscribe(engine(), frames, tx);
        // Let the task fill the channel and park on the second send.
        while !sub.is_finished() && rx.capacity() > 0 {
            tokio::task::yield_now().await;
        }

        let (engine, reason) = tokio::time::timeout(Duration::from_secs(2), sub.unsubscribe())
            .await
            .expect("unsubscribe must not block on a full channel")
            .unwrap();
        assert_eq!(reason, StopReason::Unsubscribed);
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn test_receiver_drop_stops_feed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let frames = stream::iter(vec![frame(r#"[{"city":"Agra","aqi":"75"}]"#)])
            .chain(stream::pending());

        let (_, reason) = subscribe(engine(), frames, tx).join().await.unwrap();
        assert_eq!(reason, StopReason::ReceiverClosed);
    }

    #[tokio::test]
    async fn test_focus_feed_skips_empty_chart() {
        let (tx, mut rx) = mpsc::channel(8);
        let engine =
            AqiEngine::with_seed(EngineConfig::for_mode(ViewMode::SingleFocus), 3).unwrap();
        let frames = stream::iter(vec![frame("[]")]);

        subscribe(engine, frames, tx).join().await.unwrap();
        let tick = rx.recv().await.unwrap();
        assert!(tick.chart.is_none());
    }
}
