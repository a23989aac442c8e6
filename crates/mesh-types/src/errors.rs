//! # Shared Error Types
//!
//! Configuration-time errors are the only errors in the mesh allowed to halt
//! startup. Everything that can go wrong per-message or per-subscriber is
//! surfaced as data on the message itself, never as a propagated error.

use thiserror::Error;

/// Errors detected while freezing a topology at startup.
///
/// Any of these is fatal: a mesh with a malformed topology must refuse to
/// accept messages at all.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TopologyError {
    /// A topology needs at least a hub and one other node.
    #[error("Topology requires at least 2 nodes, got {0}")]
    TooFewNodes(usize),

    /// The same node id was declared twice.
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    /// No node was flagged as the hub.
    #[error("Topology has no hub node")]
    MissingHub,

    /// More than one node was flagged as the hub.
    #[error("Topology has multiple hub nodes: {0} and {1}")]
    MultipleHubs(String, String),

    /// No node was flagged as the calibrator.
    #[error("Topology has no calibrator node")]
    MissingCalibrator,

    /// More than one node was flagged as the calibrator.
    #[error("Topology has multiple calibrator nodes: {0} and {1}")]
    MultipleCalibrators(String, String),

    /// The hub's signal level is the harmony divisor and must be positive.
    #[error("Hub signal level must be positive, got {0}")]
    NonPositiveHubLevel(f64),
}
