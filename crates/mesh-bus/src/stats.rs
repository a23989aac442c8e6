//! # Bus Statistics
//!
//! Cumulative bus-level counters. Subscription counts are read live from the
//! table; everything else is an atomic counter, monotonically non-decreasing
//! for the life of the process.

use mesh_types::NodeId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe bus counters.
#[derive(Debug, Default)]
pub struct BusStats {
    published: AtomicU64,
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
}

impl BusStats {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one `publish` call.
    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one `broadcast` call (once per call, not once per node).
    pub fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one successful subscriber delivery.
    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Total `publish` calls.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Total `broadcast` calls.
    #[must_use]
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts.load(Ordering::Relaxed)
    }

    /// Total successful subscriber deliveries.
    #[must_use]
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of the bus counters plus subscription census.
#[derive(Debug, Clone, Serialize)]
pub struct BusStatsSnapshot {
    /// Total `publish` calls.
    pub messages_published: u64,
    /// Total `broadcast` calls.
    pub broadcasts: u64,
    /// Total successful subscriber deliveries.
    pub deliveries: u64,
    /// Subscriptions currently in the table.
    pub active_subscriptions: usize,
    /// Node-indexed subscription counts.
    pub per_node_subscriptions: HashMap<NodeId, usize>,
}
