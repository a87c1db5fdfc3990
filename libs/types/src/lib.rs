//! Types library for the air-quality stream engine
//!
//! This library provides the value types shared across the engine: city
//! identifiers, AQI values with fixed 2-decimal rounding, and immutable
//! readings.
//!
//! # Modules
//! - `ids`: Entity identifiers (CityId)
//! - `numeric`: Fixed-point AQI values
//! - `reading`: Immutable timestamped readings
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod reading;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::reading::*;
    pub use crate::errors::*;
}
