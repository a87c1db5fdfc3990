//! Error types for readings
//!
//! Error taxonomy using thiserror

use thiserror::Error;

/// Errors raised while building a reading from feed input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadingError {
    #[error("City name is empty")]
    EmptyCity,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Non-numeric AQI value: {0:?}")]
    NonNumeric(String),

    #[error("Malformed reading: {0}")]
    Malformed(String),
}
