//! # Router Statistics
//!
//! Cumulative counters updated at the end of every completed route. All
//! counters are monotonically non-decreasing for the life of the process.

use mesh_types::NodeId;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct StatsInner {
    messages_routed: u64,
    gate_triggers: u64,
    signal_delta_total: f64,
    per_node: HashMap<NodeId, u64>,
}

/// Thread-safe router counters.
#[derive(Debug, Default)]
pub struct RouterStats {
    inner: RwLock<StatsInner>,
}

impl RouterStats {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed route to `target` traversing `signal_delta`.
    pub fn record_routed(&self, target: &NodeId, signal_delta: f64) {
        let mut inner = self.inner.write();
        inner.messages_routed += 1;
        inner.signal_delta_total += signal_delta;
        *inner.per_node.entry(target.clone()).or_insert(0) += 1;
    }

    /// Record a gate interception.
    pub fn record_gate_trigger(&self) {
        self.inner.write().gate_triggers += 1;
    }

    /// Read-only snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> RouterStatsSnapshot {
        let inner = self.inner.read();
        RouterStatsSnapshot {
            messages_routed: inner.messages_routed,
            gate_triggers: inner.gate_triggers,
            signal_delta_total: inner.signal_delta_total,
            per_node: inner.per_node.clone(),
        }
    }
}

/// Point-in-time view of the router counters, suitable for any external
/// reporting surface. The mesh itself never serializes this to a wire.
#[derive(Debug, Clone, Serialize)]
pub struct RouterStatsSnapshot {
    /// Total messages that completed routing (delivered, failed, or
    /// no-provider).
    pub messages_routed: u64,
    /// Messages intercepted by the human gate.
    pub gate_triggers: u64,
    /// Cumulative signal-level delta traversed.
    pub signal_delta_total: f64,
    /// Completed routes per target node.
    pub per_node: HashMap<NodeId, u64>,
}
