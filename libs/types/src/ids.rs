//! Identifier types for tracked entities
//!
//! A city is identified by the name the feed sends. Names are compared
//! exactly (case-sensitive, no normalization) so that store lookups match
//! the upstream feed one-to-one.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ReadingError;

/// City identifier
///
/// Format: the raw city name from the feed (e.g., "Delhi", "Mumbai").
/// Never empty or all-whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CityId(String);

impl CityId {
    /// Create a new CityId from a string
    ///
    /// # Panics
    /// Panics if the name is empty or whitespace only
    pub fn new(name: impl Into<String>) -> Self {
        match Self::try_new(name) {
            Ok(id) => id,
            Err(_) => panic!("CityId must not be empty"),
        }
    }

    /// Try to create a CityId, rejecting empty names
    pub fn try_new(name: impl Into<String>) -> Result<Self, ReadingError> {
        let s = name.into();
        if s.trim().is_empty() {
            Err(ReadingError::EmptyCity)
        } else {
            Ok(Self(s))
        }
    }

    /// Get the city name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl TryFrom<String> for CityId {
    type Error = ReadingError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_new(s)
    }
}

impl From<CityId> for String {
    fn from(id: CityId) -> Self {
        id.0
    }
}
