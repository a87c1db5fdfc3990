//! Entity store: per-city summaries and their history windows
//!
//! Cities are kept in first-seen order so that table rows and chart series
//! stay stable across updates. A city is never removed by a merge; only
//! [`EntityStore::clear`] empties the store.
//!
//! Merge semantics per batch:
//! - unknown city → new summary with a one-reading window
//! - known city → value and timestamp replaced, reading appended (evicting past the cap)
//! - duplicate city within a batch → last write wins, every occurrence appended
//! - after the batch, every current value is rounded to 2 decimal places

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use types::ids::CityId;
use types::numeric::Aqi;
use types::reading::Reading;

use crate::events::{BatchItem, TableRow};
use crate::history::HistoryWindow;

/// Current state of one city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySummary {
    city: CityId,
    current_value: Aqi,
    last_updated: DateTime<Utc>,
    history: HistoryWindow,
}

impl EntitySummary {
    fn new(item: &BatchItem, now: DateTime<Utc>, cap: usize) -> Self {
        let mut history = HistoryWindow::new(item.city.clone(), cap);
        history.push(Reading::new(item.city.clone(), item.value, now));
        Self {
            city: item.city.clone(),
            current_value: item.value,
            last_updated: now,
            history,
        }
    }

    fn update(&mut self, value: Aqi, now: DateTime<Utc>) -> usize {
        self.current_value = value;
        self.last_updated = now;
        self.history
            .push(Reading::new(self.city.clone(), value, now))
    }

    pub fn city(&self) -> &CityId {
        &self.city
    }

    /// Latest value, rounded to 2 decimal places once its batch is merged.
    pub fn current_value(&self) -> Aqi {
        self.current_value
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    /// Row for the tabular view.
    pub fn to_table_row(&self) -> TableRow {
        TableRow {
            city: self.city.to_string(),
            aqi: self.current_value.to_string(),
            last_updated: self.last_updated,
        }
    }
}

/// Counts from one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Cities seen for the first time.
    pub created: usize,
    /// Items applied to cities already in the store.
    pub updated: usize,
    /// Readings dropped from windows past their cap.
    pub evicted: usize,
}

/// All tracked cities in first-seen order.
#[derive(Debug, Clone)]
pub struct EntityStore {
    entities: Vec<EntitySummary>,
    index: HashMap<CityId, usize>,
    cap: usize,
}

impl EntityStore {
    /// Empty store whose windows hold at most `cap` readings.
    pub fn new(cap: usize) -> Self {
        info!(history_cap = cap, "EntityStore initialized");
        Self {
            entities: Vec::new(),
            index: HashMap::new(),
            cap,
        }
    }

    /// Merge one batch of validated items arriving at `now`.
    pub fn merge(&mut self, batch: &[BatchItem], now: DateTime<Utc>) -> MergeReport {
        let mut report = MergeReport::default();

        for item in batch {
            match self.index.get(&item.city) {
                Some(&idx) => {
                    report.evicted += self.entities[idx].update(item.value, now);
                    report.updated += 1;
                }
                None => {
                    debug!(city = %item.city, "New city tracked");
                    self.index.insert(item.city.clone(), self.entities.len());
                    self.entities.push(EntitySummary::new(item, now, self.cap));
                    report.created += 1;
                }
            }
        }

        for entity in &mut self.entities {
            entity.current_value = entity.current_value.rounded();
        }

        debug!(
            created = report.created,
            updated = report.updated,
            evicted = report.evicted,
            cities = self.entities.len(),
            "Batch merged"
        );

        report
    }

    /// Look up a city.
    pub fn get(&self, city: &CityId) -> Option<&EntitySummary> {
        self.index.get(city).map(|&idx| &self.entities[idx])
    }

    /// City at a position in first-seen order.
    pub fn get_index(&self, idx: usize) -> Option<&EntitySummary> {
        self.entities.get(idx)
    }

    /// Summaries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySummary> {
        self.entities.iter()
    }

    /// Flat list for the tabular view.
    pub fn table_rows(&self) -> Vec<TableRow> {
        self.entities.iter().map(EntitySummary::to_table_row).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Forget every city.
    pub fn clear(&mut self) {
        info!(cities = self.entities.len(), "EntityStore cleared");
        self.entities.clear();
        self.index.clear();
    }
}
