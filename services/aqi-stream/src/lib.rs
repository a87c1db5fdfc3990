//! AQI Stream Service
//!
//! Consumes a live feed of city air-quality batches and produces:
//! - A per-city summary table (latest value, last update time)
//! - Bounded per-city reading history
//! - Multi-series chart updates (one line per city)
//! - Single-focus chart updates rotating through cities
//!
//! Every inbound message is one tick: decode, merge, project, emit.
//! Ticks are processed strictly one at a time.
//!
//! # Architecture
//!
//! ```text
//!   WebSocket text frames
//!          │
//!     ┌────▼────┐
//!     │ Ingest  │  ← Parses batches, skips malformed entries
//!     └────┬────┘
//!          │
//!     ┌────▼────┐
//!     │  Store  │  ← Per-city summary + capped history
//!     └────┬────┘
//!          │
//!    ┌─────┴──────┐
//!    │            │
//! ┌──▼───┐  ┌─────▼──────┐
//! │Table │  │ Projection │  ← Multi-series or cursor-selected focus
//! └──┬───┘  └─────┬──────┘
//!    │            │
//! ┌──▼────────────▼──┐
//! │   TickOutput     │
//! └──────────────────┘
//! ```

pub mod color;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod events;
pub mod feed;
pub mod history;
pub mod ingestion;
pub mod metrics;
pub mod projection;
pub mod store;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
