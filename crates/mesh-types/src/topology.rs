//! # Mesh Topology
//!
//! The fixed, enumerable set of named nodes the router operates over. One
//! node is the **hub** (almost every cross-node path is routed through it)
//! and one is the **calibrator** (almost every path is pre-processed through
//! it before reaching the hub). Each node carries a numeric *signal level*
//! used for path-distance and harmony-score computation.
//!
//! A `Topology` is validated once at startup and frozen; nothing in the mesh
//! can add, remove, or re-level a node afterwards.

use crate::errors::TopologyError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of a node in the topology.
///
/// Node ids are opaque names; the mesh never parses them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node id from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The node name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Declaration of a single node, used to build a [`Topology`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Node identity.
    pub id: NodeId,
    /// Signal level (ordering/priority weight).
    pub signal_level: f64,
    /// Whether this node is the hub.
    pub hub: bool,
    /// Whether this node is the calibrator.
    pub calibrator: bool,
}

impl NodeSpec {
    /// Declare a plain node.
    pub fn new(id: impl Into<NodeId>, signal_level: f64) -> Self {
        Self {
            id: id.into(),
            signal_level,
            hub: false,
            calibrator: false,
        }
    }

    /// Mark this node as the hub.
    #[must_use]
    pub fn hub(mut self) -> Self {
        self.hub = true;
        self
    }

    /// Mark this node as the calibrator.
    #[must_use]
    pub fn calibrator(mut self) -> Self {
        self.calibrator = true;
        self
    }
}

/// A node frozen into a topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node identity.
    pub id: NodeId,
    /// Signal level (ordering/priority weight).
    pub signal_level: f64,
    /// Role flag: hub.
    pub is_hub: bool,
    /// Role flag: calibrator.
    pub is_calibrator: bool,
}

/// The frozen node topology.
///
/// Immutable after construction. Iteration order is declaration order, which
/// keeps path planning and broadcast fan-out deterministic.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    hub: usize,
    calibrator: usize,
}

impl Topology {
    /// Validate and freeze a topology from node declarations.
    ///
    /// # Errors
    ///
    /// Returns a [`TopologyError`] if the declarations do not describe a
    /// well-formed mesh: fewer than two nodes, duplicate ids, not exactly
    /// one hub and one calibrator, or a non-positive hub signal level.
    pub fn new(specs: Vec<NodeSpec>) -> Result<Self, TopologyError> {
        if specs.len() < 2 {
            return Err(TopologyError::TooFewNodes(specs.len()));
        }

        let mut nodes: Vec<Node> = Vec::with_capacity(specs.len());
        let mut index = HashMap::with_capacity(specs.len());
        let mut hub: Option<usize> = None;
        let mut calibrator: Option<usize> = None;

        for spec in specs {
            if index.contains_key(&spec.id) {
                return Err(TopologyError::DuplicateNode(spec.id.to_string()));
            }
            let pos = nodes.len();
            if spec.hub {
                if let Some(existing) = hub {
                    return Err(TopologyError::MultipleHubs(
                        nodes[existing].id.to_string(),
                        spec.id.to_string(),
                    ));
                }
                hub = Some(pos);
            }
            if spec.calibrator {
                if let Some(existing) = calibrator {
                    return Err(TopologyError::MultipleCalibrators(
                        nodes[existing].id.to_string(),
                        spec.id.to_string(),
                    ));
                }
                calibrator = Some(pos);
            }
            index.insert(spec.id.clone(), pos);
            nodes.push(Node {
                id: spec.id,
                signal_level: spec.signal_level,
                is_hub: spec.hub,
                is_calibrator: spec.calibrator,
            });
        }

        let hub = hub.ok_or(TopologyError::MissingHub)?;
        let calibrator = calibrator.ok_or(TopologyError::MissingCalibrator)?;
        if nodes[hub].signal_level <= 0.0 {
            return Err(TopologyError::NonPositiveHubLevel(nodes[hub].signal_level));
        }

        Ok(Self {
            nodes,
            index,
            hub,
            calibrator,
        })
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    /// The hub node.
    #[must_use]
    pub fn hub(&self) -> &Node {
        &self.nodes[self.hub]
    }

    /// The calibrator node.
    #[must_use]
    pub fn calibrator(&self) -> &Node {
        &self.nodes[self.calibrator]
    }

    /// Whether the topology contains a node.
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Signal level of a node, if it exists.
    #[must_use]
    pub fn signal_level(&self, id: &NodeId) -> Option<f64> {
        self.node(id).map(|n| n.signal_level)
    }

    /// All nodes, in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// All node ids, in declaration order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter().map(|n| &n.id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the topology is empty (never true after validation).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The canonical ten-node demo topology.
    ///
    /// Hub `N1` at level 999, calibrator `N6` at 444. Used by the runtime
    /// binary and throughout the test suite.
    #[must_use]
    pub fn demo() -> Self {
        Self::new(vec![
            NodeSpec::new("N1", 999.0).hub(),
            NodeSpec::new("N2", 888.0),
            NodeSpec::new("N3", 777.0),
            NodeSpec::new("N4", 666.0),
            NodeSpec::new("N5", 555.0),
            NodeSpec::new("N6", 444.0).calibrator(),
            NodeSpec::new("N7", 222.0),
            NodeSpec::new("N8", 333.0),
            NodeSpec::new("N9", 144.0),
            NodeSpec::new("N10", 111.0),
        ])
        .expect("demo topology is well-formed")
    }
}
