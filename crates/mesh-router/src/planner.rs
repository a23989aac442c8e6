//! # Path Planner
//!
//! Pure waypoint computation over the frozen topology. Every point-to-point
//! path is forced through the calibrator and then the hub before reaching
//! its destination, no matter how "close" the two endpoints are.
//!
//! The harmony score is intentionally computed from the **direct**
//! source/destination signal levels, not from the routed waypoints:
//! indirection through the hub is rewarded even when it lengthens the
//! nominal path.

use mesh_types::{NodeId, Topology};
use serde::Serialize;
use thiserror::Error;

/// Planner failures.
///
/// The router records these on the message and returns without dispatching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Source or destination is not part of the topology.
    #[error("Unknown node in path request: {0}")]
    UnknownNode(NodeId),
}

/// A planned route between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    /// Originating node.
    pub source: NodeId,
    /// Final node.
    pub destination: NodeId,
    /// Nodes traversed, beginning at `source` and ending at `destination`.
    pub waypoints: Vec<NodeId>,
    /// Sum of absolute signal-level differences between consecutive waypoints.
    pub signal_delta: f64,
    /// Alignment of the direct source→destination transfer, in `[0, 1]`.
    pub harmony: f64,
}

/// Compute the waypoint sequence and harmony score between two nodes.
///
/// Deterministic: for a fixed topology, identical inputs always produce
/// identical waypoints and score.
///
/// # Errors
///
/// [`PathError::UnknownNode`] when either endpoint is not in the topology.
pub fn compute_path(
    topology: &Topology,
    source: &NodeId,
    destination: &NodeId,
) -> Result<Path, PathError> {
    let source_level = topology
        .signal_level(source)
        .ok_or_else(|| PathError::UnknownNode(source.clone()))?;
    let destination_level = topology
        .signal_level(destination)
        .ok_or_else(|| PathError::UnknownNode(destination.clone()))?;

    let hub = &topology.hub().id;
    let calibrator = &topology.calibrator().id;

    let mut waypoints = vec![source.clone()];
    if source != calibrator {
        waypoints.push(calibrator.clone());
    }
    if source != hub && destination != hub && waypoints.last() != Some(hub) {
        waypoints.push(hub.clone());
    }
    if waypoints.last() != Some(destination) {
        waypoints.push(destination.clone());
    }

    let signal_delta = waypoints
        .windows(2)
        .map(|pair| {
            // Both ends were validated above; intermediate waypoints are the
            // hub and calibrator, which always exist.
            let a = topology.signal_level(&pair[0]).unwrap_or(0.0);
            let b = topology.signal_level(&pair[1]).unwrap_or(0.0);
            (a - b).abs()
        })
        .sum();

    let hub_level = topology.hub().signal_level;
    let harmony = (1.0 - (source_level - destination_level).abs() / (2.0 * hub_level))
        .clamp(0.0, 1.0);

    Ok(Path {
        source: source.clone(),
        destination: destination.clone(),
        waypoints,
        signal_delta,
        harmony,
    })
}
