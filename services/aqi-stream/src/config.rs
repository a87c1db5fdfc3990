//! Engine and feed configuration
//!
//! Plain structs with `Default` impls. The binary overlays a few values
//! from the environment; everything else is set in code.

use std::env;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Errors raised by configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("history cap must be at least 1 (got {0})")]
    ZeroCap(usize),

    #[error("default y-axis range is inverted: min {min} > max {max}")]
    InvertedAxis { min: Decimal, max: Decimal },

    #[error("label UTC offset out of range: {0}s")]
    InvalidOffset(i32),

    #[error("unknown view mode: {0:?} (expected \"multi\" or \"focus\")")]
    UnknownViewMode(String),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// How the chart presents the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// One series per city, all on the same chart.
    MultiSeries,
    /// One city at a time, rotating each update.
    SingleFocus,
}

impl ViewMode {
    /// Parse `"multi"` / `"focus"` (and the snake_case names).
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multi" | "multi_series" => Ok(ViewMode::MultiSeries),
            "focus" | "single_focus" => Ok(ViewMode::SingleFocus),
            _ => Err(ConfigError::UnknownViewMode(s.to_string())),
        }
    }
}

/// How multi-series mode builds the shared time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryAxis {
    /// Labels from the longest window (first in store order on ties).
    Longest,
    /// Every window's labels appended in store order.
    Concatenated,
}

/// Which reading anchors the single-focus y-axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisAnchor {
    /// Oldest retained reading in the window.
    Oldest,
    /// Most recent reading.
    Newest,
}

/// Fixed y-axis range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl AxisBounds {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }
}

/// Configuration for the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Active view mode.
    pub mode: ViewMode,
    /// Readings kept per city in multi-series mode.
    pub multi_series_cap: usize,
    /// Readings kept per city in single-focus mode.
    pub single_focus_cap: usize,
    /// Time-axis policy for multi-series mode.
    pub category_axis: CategoryAxis,
    /// Y-axis anchor for single-focus mode.
    pub axis_anchor: AxisAnchor,
    /// Distance from the anchor to each single-focus axis bound.
    pub axis_padding: Decimal,
    /// Range applied when a projection carries no bounds of its own.
    pub default_y_axis: AxisBounds,
    /// Title applied when a projection carries no title of its own.
    pub default_title: String,
    /// Line color in single-focus mode.
    pub focus_color: String,
    /// Offset applied to timestamps before formatting `H:M:S` labels.
    pub label_utc_offset_secs: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ViewMode::MultiSeries,
            multi_series_cap: 1000,
            single_focus_cap: 30,
            category_axis: CategoryAxis::Longest,
            axis_anchor: AxisAnchor::Oldest,
            axis_padding: Decimal::from(20),
            default_y_axis: AxisBounds::new(Decimal::from(5), Decimal::from(400)),
            default_title: "Citywise AQI Data".to_string(),
            focus_color: "#008FFB".to_string(),
            label_utc_offset_secs: 0,
        }
    }
}

impl EngineConfig {
    /// Default configuration for the given view mode.
    pub fn for_mode(mode: ViewMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// History cap for the active view mode.
    pub fn history_cap(&self) -> usize {
        match self.mode {
            ViewMode::MultiSeries => self.multi_series_cap,
            ViewMode::SingleFocus => self.single_focus_cap,
        }
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for cap in [self.multi_series_cap, self.single_focus_cap] {
            if cap == 0 {
                return Err(ConfigError::ZeroCap(cap));
            }
        }

        if self.default_y_axis.min > self.default_y_axis.max {
            return Err(ConfigError::InvertedAxis {
                min: self.default_y_axis.min,
                max: self.default_y_axis.max,
            });
        }

        if chrono::FixedOffset::east_opt(self.label_utc_offset_secs).is_none() {
            return Err(ConfigError::InvalidOffset(self.label_utc_offset_secs));
        }

        Ok(())
    }
}

/// Configuration for the live feed binary.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket URL of the upstream AQI feed.
    pub url: String,
    /// Capacity of the channel between the feed task and the output writer.
    pub update_buffer: usize,
    /// Engine settings.
    pub engine: EngineConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "ws://city-ws.herokuapp.com/".to_string(),
            update_buffer: 64,
            engine: EngineConfig::default(),
        }
    }
}

impl FeedConfig {
    /// Build from defaults overlaid with `AQI_FEED_URL`, `AQI_VIEW_MODE`
    /// and `AQI_HISTORY_CAP`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("AQI_FEED_URL") {
            config.url = url;
        }

        if let Some(mode) = lookup("AQI_VIEW_MODE") {
            config.engine.mode = ViewMode::parse(&mode)?;
        }

        if let Some(cap) = lookup("AQI_HISTORY_CAP") {
            let parsed: usize = cap.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "AQI_HISTORY_CAP",
                value: cap.clone(),
            })?;
            match config.engine.mode {
                ViewMode::MultiSeries => config.engine.multi_series_cap = parsed,
                ViewMode::SingleFocus => config.engine.single_focus_cap = parsed,
            }
        }

        if config.url.trim().is_empty() {
            warn!("AQI_FEED_URL is empty, falling back to default feed");
            config.url = Self::default().url;
        }

        config.engine.validate()?;
        Ok(config)
    }
}
