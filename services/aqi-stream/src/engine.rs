//! Reconciliation engine: one tick per inbound message
//!
//! Each tick decodes the message, merges it into the store, then projects
//! the store for the active view mode. Merge and projection run back to back
//! on the same `&mut self`, so a projection always sees a fully merged batch.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineConfig, ViewMode};
use crate::cursor::ViewCursor;
use crate::events::{BatchItem, RenderUpdate, TickOutput};
use crate::ingestion::decode_message;
use crate::metrics::EngineMetrics;
use crate::projection::SeriesProjector;
use crate::store::EntityStore;

/// Owns the store and everything derived from it.
pub struct AqiEngine<R = ChaCha8Rng> {
    config: EngineConfig,
    store: EntityStore,
    projector: SeriesProjector,
    cursor: ViewCursor,
    rng: R,
    metrics: Arc<EngineMetrics>,
}

impl AqiEngine<ChaCha8Rng> {
    /// Engine with a per-session random color source.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    /// Engine with repeatable colors.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> AqiEngine<R> {
    /// Engine drawing series colors from `rng`.
    pub fn with_rng(config: EngineConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;

        info!(
            mode = ?config.mode,
            history_cap = config.history_cap(),
            category_axis = ?config.category_axis,
            axis_anchor = ?config.axis_anchor,
            "AqiEngine initialized"
        );

        Ok(Self {
            store: EntityStore::new(config.history_cap()),
            projector: SeriesProjector::new(&config),
            cursor: ViewCursor::new(),
            rng,
            metrics: Arc::new(EngineMetrics::new()),
            config,
        })
    }

    /// Handle one raw text frame.
    ///
    /// Returns `None` when the frame is not a batch at all; the store is
    /// untouched and no tick happens. Malformed entries inside a batch are
    /// skipped and the tick goes ahead.
    pub fn process_message(&mut self, text: &str, now: DateTime<Utc>) -> Option<TickOutput> {
        self.metrics.record_message();

        let batch = match decode_message(text) {
            Ok(batch) => batch,
            Err(err) => {
                warn!(error = %err, "Dropping undecodable message");
                self.metrics.record_message_rejected();
                return None;
            }
        };

        let rejected = batch.rejected.len();
        Some(self.tick(&batch.items, rejected, now))
    }

    /// Handle an already-decoded batch.
    pub fn process_batch(&mut self, batch: &[BatchItem], now: DateTime<Utc>) -> TickOutput {
        self.tick(batch, 0, now)
    }

    fn tick(&mut self, items: &[BatchItem], rejected: usize, now: DateTime<Utc>) -> TickOutput {
        let started = Instant::now();

        let report = self.store.merge(items, now);
        self.metrics
            .record_batch(items.len(), rejected, report.evicted);

        let chart = self.project();
        let table = self.store.table_rows();

        self.metrics
            .record_tick_latency(started.elapsed().as_nanos() as u64);

        debug!(
            items = items.len(),
            rejected,
            cities = table.len(),
            chart = chart.is_some(),
            "Tick complete"
        );

        TickOutput { table, chart }
    }

    /// Project the store for the active view mode.
    ///
    /// In single-focus mode this advances the cursor and returns `None` for
    /// an empty store.
    pub fn project(&mut self) -> Option<RenderUpdate> {
        let projection = match self.config.mode {
            ViewMode::MultiSeries => Some(self.projector.project_multi(&self.store, &mut self.rng)),
            ViewMode::SingleFocus => {
                let selected = self.cursor.advance(self.store.len());
                selected.and_then(|idx| self.projector.project_focus(&self.store, idx))
            }
        };

        match projection {
            Some(projection) => {
                self.metrics.record_chart_update();
                Some(RenderUpdate::from_projection(
                    &projection,
                    self.config.default_y_axis,
                    &self.config.default_title,
                ))
            }
            None => {
                debug!(ticks = self.cursor.ticks(), "Single-focus tick with empty store");
                self.metrics.record_focus_noop();
                None
            }
        }
    }

    /// Forget every city and restart the focus rotation.
    pub fn reset(&mut self) {
        self.store.clear();
        self.cursor.reset();
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn cursor(&self) -> &ViewCursor {
        &self.cursor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use types::ids::CityId;

    fn t(second: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 16, 9, 5, 0).unwrap() + Duration::seconds(second)
    }

    fn multi() -> AqiEngine {
        AqiEngine::with_seed(EngineConfig::default(), 7).unwrap()
    }

    fn focus() -> AqiEngine {
        AqiEngine::with_seed(EngineConfig::for_mode(ViewMode::SingleFocus), 7).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            multi_series_cap: 0,
            ..EngineConfig::default()
        };
        assert!(AqiEngine::with_seed(config, 1).is_err());
    }

    #[test]
    fn test_multi_tick_emits_chart_and_table() {
        let mut engine = multi();
        let tick = engine
            .process_message(r#"[{"city":"Delhi","aqi":"150"}]"#, t(0))
            .unwrap();

        assert_eq!(tick.table.len(), 1);
        assert_eq!(tick.table[0].aqi, "150");

        let chart = tick.chart.unwrap();
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].name, "Delhi");
        assert_eq!(chart.categories, vec!["9:5:0"]);
        assert_eq!(chart.title.as_deref(), Some("Citywise AQI Data"));
        let yaxis = chart.yaxis.unwrap();
        assert_eq!((yaxis.min, yaxis.max), (5.0, 400.0));
    }

    #[test]
    fn test_multi_empty_store_emits_empty_chart() {
        let mut engine = multi();
        let tick = engine.process_message("[]", t(0)).unwrap();

        assert!(tick.table.is_empty());
        let chart = tick.chart.unwrap();
        assert!(chart.series.is_empty());
        assert!(chart.categories.is_empty());
        assert!(chart.colors.is_empty());
    }

    #[test]
    fn test_undecodable_message_is_not_a_tick() {
        let mut engine = multi();
        engine.process_message(r#"[{"city":"Delhi","aqi":"150"}]"#, t(0));

        assert!(engine.process_message("garbage", t(1)).is_none());
        assert!(engine.process_message(r#"{"city":"Delhi"}"#, t(2)).is_none());

        let delhi = engine.store().get(&CityId::new("Delhi")).unwrap();
        assert_eq!(delhi.history().len(), 1);

        let exported = engine.metrics().export();
        assert_eq!(exported["messages_received"], 3);
        assert_eq!(exported["messages_rejected"], 2);
    }

    #[test]
    fn test_bad_items_do_not_stop_the_batch() {
        let mut engine = multi();
        let tick = engine
            .process_message(
                r#"[{"city":"Delhi","aqi":"oops"},{"city":"Pune","aqi":"40"}]"#,
                t(0),
            )
            .unwrap();

        assert_eq!(tick.table.len(), 1);
        assert_eq!(tick.table[0].city, "Pune");
        assert_eq!(engine.metrics().export()["items_rejected"], 1);
    }

    #[test]
    fn test_focus_rotates_through_cities() {
        let mut engine = focus();
        let batch = r#"[{"city":"A","aqi":"10"},{"city":"B","aqi":"20"}]"#;

        let titles: Vec<String> = (0..3)
            .map(|i| {
                engine
                    .process_message(batch, t(i))
                    .unwrap()
                    .chart
                    .unwrap()
                    .title
                    .unwrap()
            })
            .collect();
        assert_eq!(titles, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_focus_empty_store_is_noop() {
        let mut engine = focus();
        let tick = engine.process_message("[]", t(0)).unwrap();

        assert!(tick.chart.is_none());
        assert!(tick.table.is_empty());
        assert_eq!(engine.metrics().export()["focus_noops"], 1);
        assert_eq!(engine.metrics().export()["chart_updates"], 0);
    }

    #[test]
    fn test_focus_uses_fixed_color_and_own_axis() {
        let mut engine = focus();
        let chart = engine
            .process_message(r#"[{"city":"Delhi","aqi":"150.7"}]"#, t(0))
            .unwrap()
            .chart
            .unwrap();

        assert_eq!(chart.colors, vec!["#008FFB".to_string()]);
        let yaxis = chart.yaxis.unwrap();
        assert_eq!((yaxis.min, yaxis.max), (130.0, 170.0));
    }

    #[test]
    fn test_seeded_colors_are_repeatable() {
        let batch = r#"[{"city":"A","aqi":"10"},{"city":"B","aqi":"20"}]"#;
        let a = multi().process_message(batch, t(0)).unwrap();
        let b = multi().process_message(batch, t(0)).unwrap();
        assert_eq!(a.chart.unwrap().colors, b.chart.unwrap().colors);
    }

    #[test]
    fn test_reset() {
        let mut engine = focus();
        engine.process_message(r#"[{"city":"A","aqi":"10"}]"#, t(0));
        engine.reset();

        assert!(engine.store().is_empty());
        assert_eq!(engine.cursor().ticks(), 0);
    }
}
