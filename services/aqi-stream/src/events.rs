//! Wire shapes for the AQI feed and its consumers
//!
//! Inbound: one JSON array of `{ city, aqi }` objects per message, where
//! `aqi` may be a string or a number.
//!
//! Outbound: a [`RenderUpdate`] for the chart widget and a list of
//! [`TableRow`] for the tabular view, bundled per tick in [`TickOutput`].

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use types::ids::CityId;
use types::numeric::Aqi;

use crate::config::AxisBounds;
use crate::projection::ProjectionResult;

/// AQI as sent by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAqi {
    Number(serde_json::Number),
    Text(String),
}

impl RawAqi {
    /// Textual form handed to the decimal parser.
    pub fn as_text(&self) -> String {
        match self {
            RawAqi::Number(n) => n.to_string(),
            RawAqi::Text(s) => s.clone(),
        }
    }
}

/// One entry of an inbound batch, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub aqi: Option<RawAqi>,
}

/// A validated batch entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub city: CityId,
    pub value: Aqi,
}

impl BatchItem {
    pub fn new(city: CityId, value: Aqi) -> Self {
        Self { city, value }
    }
}

/// One chart series in the widget's `{name, data}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPayload {
    pub name: String,
    pub data: Vec<f64>,
}

/// Y-axis range in the widget's shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YAxis {
    pub min: f64,
    pub max: f64,
}

impl From<AxisBounds> for YAxis {
    fn from(bounds: AxisBounds) -> Self {
        Self {
            min: bounds.min.to_f64().unwrap_or_default(),
            max: bounds.max.to_f64().unwrap_or_default(),
        }
    }
}

/// Everything the chart widget needs for one redraw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderUpdate {
    pub series: Vec<SeriesPayload>,
    pub categories: Vec<String>,
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<YAxis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl RenderUpdate {
    /// Convert a projection, filling in the caller's fixed axis range and
    /// title where the projection leaves them unset.
    pub fn from_projection(
        projection: &ProjectionResult,
        fallback_axis: AxisBounds,
        fallback_title: &str,
    ) -> Self {
        let series = projection
            .series
            .iter()
            .map(|s| SeriesPayload {
                name: s.label.clone(),
                data: s
                    .values
                    .iter()
                    .map(|v| v.to_f64().unwrap_or_default())
                    .collect(),
            })
            .collect();

        Self {
            series,
            categories: projection.categories.clone(),
            colors: projection.colors.clone(),
            yaxis: Some(projection.y_axis.unwrap_or(fallback_axis).into()),
            title: Some(
                projection
                    .title
                    .clone()
                    .unwrap_or_else(|| fallback_title.to_string()),
            ),
        }
    }
}

/// One row of the tabular view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub city: String,
    /// Rounded to 2 decimal places, trailing zeros removed.
    pub aqi: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

/// Output of one update tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    pub table: Vec<TableRow>,
    /// `None` when the active view has nothing to draw (single-focus on an
    /// empty store).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<RenderUpdate>,
}
