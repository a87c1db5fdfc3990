//! Counters for the reconciliation engine
//!
//! Tracks messages, merged batches, accepted and rejected items, emitted
//! chart updates and transport errors, plus tick latency. Shared through an
//! `Arc` so the feed owner can read them while the engine runs.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Core metrics for the engine.
pub struct EngineMetrics {
    // Inbound
    pub messages_received: AtomicU64,
    pub messages_rejected: AtomicU64,
    pub items_accepted: AtomicU64,
    pub items_rejected: AtomicU64,

    // Store
    pub batches_merged: AtomicU64,
    pub readings_evicted: AtomicU64,

    // Outbound
    pub chart_updates: AtomicU64,
    pub focus_noops: AtomicU64,

    // Transport
    pub transport_errors: AtomicU64,

    pub tick_latency_ns: Mutex<LatencyTracker>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_rejected: AtomicU64::new(0),
            items_accepted: AtomicU64::new(0),
            items_rejected: AtomicU64::new(0),
            batches_merged: AtomicU64::new(0),
            readings_evicted: AtomicU64::new(0),
            chart_updates: AtomicU64::new(0),
            focus_noops: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            tick_latency_ns: Mutex::new(LatencyTracker::new(1000)),
        }
    }

    /// Record an inbound message, whether or not it decodes.
    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message rejected as a whole.
    pub fn record_message_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a merged batch.
    pub fn record_batch(&self, accepted: usize, rejected: usize, evicted: usize) {
        self.batches_merged.fetch_add(1, Ordering::Relaxed);
        self.items_accepted.fetch_add(accepted as u64, Ordering::Relaxed);
        self.items_rejected.fetch_add(rejected as u64, Ordering::Relaxed);
        self.readings_evicted.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    /// Record a chart update handed to the renderer.
    pub fn record_chart_update(&self) {
        self.chart_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a single-focus tick that had nothing to show.
    pub fn record_focus_noop(&self) {
        self.focus_noops.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transport-level error.
    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how long one tick took.
    pub fn record_tick_latency(&self, latency_ns: u64) {
        if let Ok(mut tracker) = self.tick_latency_ns.lock() {
            tracker.record(latency_ns);
        }
    }

    /// Export counters keyed by name.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("messages_received".to_string(), self.messages_received.load(Ordering::Relaxed));
        m.insert("messages_rejected".to_string(), self.messages_rejected.load(Ordering::Relaxed));
        m.insert("items_accepted".to_string(), self.items_accepted.load(Ordering::Relaxed));
        m.insert("items_rejected".to_string(), self.items_rejected.load(Ordering::Relaxed));
        m.insert("batches_merged".to_string(), self.batches_merged.load(Ordering::Relaxed));
        m.insert("readings_evicted".to_string(), self.readings_evicted.load(Ordering::Relaxed));
        m.insert("chart_updates".to_string(), self.chart_updates.load(Ordering::Relaxed));
        m.insert("focus_noops".to_string(), self.focus_noops.load(Ordering::Relaxed));
        m.insert("transport_errors".to_string(), self.transport_errors.load(Ordering::Relaxed));
        if let Ok(tracker) = self.tick_latency_ns.lock() {
            if let Some(p99) = tracker.percentile(99) {
                m.insert("tick_latency_p99_ns".to_string(), p99);
            }
        }
        m
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Rolling window of the most recent tick latencies.
pub struct LatencyTracker {
    samples: VecDeque<u64>,
    window: usize,
}

impl LatencyTracker {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Add a sample, dropping the oldest once the window is full.
    pub fn record(&mut self, value: u64) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Percentile over the window, index rounded down, `p` clamped to 100.
    pub fn percentile(&self, p: usize) -> Option<u64> {
        let last = self.samples.len().checked_sub(1)?;

        let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
        sorted.sort_unstable();

        let rank = p.min(100) * last / 100;
        sorted.get(rank).copied()
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }
}
