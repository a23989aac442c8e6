//! # Provider Registry
//!
//! Maps each node to the external handler that actually processes messages
//! delivered to it. Handlers are supplied by the surrounding application;
//! the mesh treats them as opaque collaborators.

use mesh_types::{Handler, NodeId};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Node → provider handler mapping.
///
/// Thread-safe; handlers are cloned out of the lock before invocation so no
/// lock is ever held across a handler await.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    handlers: RwLock<HashMap<NodeId, Handler>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the provider for a node.
    ///
    /// Returns `true` when an existing provider was replaced.
    pub fn register(&self, node: NodeId, handler: Handler) -> bool {
        debug!(node = %node, "Provider registered");
        self.handlers.write().insert(node, handler).is_some()
    }

    /// Remove the provider for a node. Returns `true` if one was registered.
    pub fn unregister(&self, node: &NodeId) -> bool {
        debug!(node = %node, "Provider unregistered");
        self.handlers.write().remove(node).is_some()
    }

    /// Clone out the provider for a node, if any.
    #[must_use]
    pub fn get(&self, node: &NodeId) -> Option<Handler> {
        self.handlers.read().get(node).cloned()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Whether no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}
