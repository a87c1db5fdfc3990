//! Immutable timestamped readings
//!
//! A reading is one AQI sample for one city at the instant it arrived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CityId;
use crate::numeric::Aqi;

/// One AQI sample. Fields are private; a reading never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    city: CityId,
    value: Aqi,
    timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(city: CityId, value: Aqi, timestamp: DateTime<Utc>) -> Self {
        Self {
            city,
            value,
            timestamp,
        }
    }

    pub fn city(&self) -> &CityId {
        &self.city
    }

    pub fn value(&self) -> Aqi {
        self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
