//! Chart projection of the entity store
//!
//! Two views over the same store:
//! - multi-series: one series per city, in first-seen order, plus one time axis
//! - single-focus: one city's window with a y-axis centred on its anchor reading
//!
//! Every chart value is rounded to 2 decimal places. Time labels are
//! `H:M:S` with no zero padding (`9:5:3`), formatted at the configured
//! UTC offset.

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;

use crate::color::ColorAssigner;
use crate::config::{AxisAnchor, AxisBounds, CategoryAxis, EngineConfig};
use crate::history::HistoryWindow;
use crate::store::{EntityStore, EntitySummary};

/// One named line on the chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSeries {
    pub label: String,
    /// Window values rounded to 2 decimal places, arrival order.
    pub values: Vec<Decimal>,
}

impl ChartSeries {
    fn from_window(window: &HistoryWindow) -> Self {
        Self {
            label: window.city().to_string(),
            values: window.values().map(|v| v.rounded().as_decimal()).collect(),
        }
    }
}

/// Chart-ready view of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionResult {
    pub series: Vec<ChartSeries>,
    /// Shared x-axis labels.
    pub categories: Vec<String>,
    pub colors: Vec<String>,
    /// `None` leaves the range to the caller's fixed default.
    pub y_axis: Option<AxisBounds>,
    pub title: Option<String>,
}

impl ProjectionResult {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Derives chart series and axes from an [`EntityStore`].
#[derive(Debug, Clone)]
pub struct SeriesProjector {
    category_axis: CategoryAxis,
    axis_anchor: AxisAnchor,
    axis_padding: Decimal,
    focus_color: String,
    label_offset: FixedOffset,
    colors: ColorAssigner,
}

impl SeriesProjector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            category_axis: config.category_axis,
            axis_anchor: config.axis_anchor,
            axis_padding: config.axis_padding,
            focus_color: config.focus_color.clone(),
            label_offset: FixedOffset::east_opt(config.label_utc_offset_secs)
                .unwrap_or_else(|| Utc.fix()),
            colors: ColorAssigner::new(),
        }
    }

    /// One series per city, colors drawn from `rng`.
    ///
    /// An empty store gives an empty projection.
    pub fn project_multi<R: Rng + ?Sized>(
        &self,
        store: &EntityStore,
        rng: &mut R,
    ) -> ProjectionResult {
        let mut result = ProjectionResult::default();

        for entity in store.iter() {
            let window = entity.history();
            result.series.push(ChartSeries::from_window(window));
            if self.category_axis == CategoryAxis::Concatenated {
                result.categories.extend(self.labels(window));
            }
            result.colors.push(self.colors.next_color(rng));
        }

        if self.category_axis == CategoryAxis::Longest {
            if let Some(longest) = longest_window(store) {
                result.categories = self.labels(longest).collect();
            }
        }

        debug!(
            series = result.series.len(),
            categories = result.categories.len(),
            "Multi-series projection built"
        );

        result
    }

    /// The city at `index` alone, with its own axis range and title.
    ///
    /// Returns `None` when `index` is out of range (including an empty store).
    pub fn project_focus(&self, store: &EntityStore, index: usize) -> Option<ProjectionResult> {
        let entity = store.get_index(index)?;
        let window = entity.history();
        let series = ChartSeries::from_window(window);

        let anchor = match self.axis_anchor {
            AxisAnchor::Oldest => series.values.first(),
            AxisAnchor::Newest => series.values.last(),
        };
        // Anchors too close to the decimal range limits fall back to the
        // caller's fixed range.
        let y_axis = anchor.and_then(|value| {
            let base = value.floor();
            let min = base.checked_sub(self.axis_padding)?;
            let max = base.checked_add(self.axis_padding)?;
            Some(AxisBounds::new(min, max))
        });

        debug!(
            city = %entity.city(),
            index,
            points = series.values.len(),
            "Single-focus projection built"
        );

        Some(ProjectionResult {
            categories: self.labels(window).collect(),
            colors: vec![self.focus_color.clone()],
            title: Some(entity.city().to_string()),
            series: vec![series],
            y_axis,
        })
    }

    /// `H:M:S` label without zero padding.
    pub fn time_label(&self, timestamp: DateTime<Utc>) -> String {
        let local = timestamp.with_timezone(&self.label_offset);
        format!("{}:{}:{}", local.hour(), local.minute(), local.second())
    }

    fn labels<'a>(&'a self, window: &'a HistoryWindow) -> impl Iterator<Item = String> + 'a {
        window.timestamps().map(move |ts| self.time_label(ts))
    }
}

/// Longest window, first in store order on ties.
fn longest_window(store: &EntityStore) -> Option<&HistoryWindow> {
    let mut best: Option<&EntitySummary> = None;
    for entity in store.iter() {
        match best {
            Some(b) if b.history().len() >= entity.history().len() => {}
            _ => best = Some(entity),
        }
    }
    best.map(EntitySummary::history)
}
