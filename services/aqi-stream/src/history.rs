//! Bounded per-city reading history
//!
//! Append-only with FIFO eviction: once the window holds `cap` readings,
//! each push drops the oldest one. Arrival order is preserved.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use types::ids::CityId;
use types::numeric::Aqi;
use types::reading::Reading;

/// Sliding window of the most recent readings for one city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryWindow {
    city: CityId,
    readings: VecDeque<Reading>,
    cap: usize,
}

impl HistoryWindow {
    /// Empty window. A zero cap is treated as 1 so the latest reading is
    /// always retained.
    pub fn new(city: CityId, cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            city,
            readings: VecDeque::with_capacity(cap.min(1024)),
            cap,
        }
    }

    /// Append a reading, evicting from the front past the cap.
    ///
    /// Returns the number of readings evicted.
    pub fn push(&mut self, reading: Reading) -> usize {
        self.readings.push_back(reading);
        let mut evicted = 0;
        while self.readings.len() > self.cap {
            self.readings.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn city(&self) -> &CityId {
        &self.city
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Oldest retained reading.
    pub fn oldest(&self) -> Option<&Reading> {
        self.readings.front()
    }

    /// Most recent reading.
    pub fn newest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// Readings in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    /// Values in arrival order.
    pub fn values(&self) -> impl Iterator<Item = Aqi> + '_ {
        self.readings.iter().map(Reading::value)
    }

    /// Timestamps in arrival order.
    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.readings.iter().map(Reading::timestamp)
    }

    /// Drop all readings; the cap is kept.
    pub fn clear(&mut self) {
        self.readings.clear();
    }
}
