//! # Human Gate Policy
//!
//! Designated high-impact actions are intercepted before signing and held
//! for out-of-band human approval. The check runs for every message
//! regardless of path or target, so the gate cannot be bypassed by choice
//! of destination.

use mesh_types::Message;
use std::collections::HashSet;

/// Actions gated by default.
pub const DEFAULT_GATED_ACTIONS: [&str; 5] =
    ["delete", "transfer", "publish", "deploy", "shutdown"];

/// The configured set of gated action keywords.
///
/// Matching is case-insensitive on the message payload's `action` key.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    gated: HashSet<String>,
}

impl GatePolicy {
    /// Build a policy from action keywords (stored lowercase).
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            gated: actions
                .into_iter()
                .map(|a| a.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Whether a bare action keyword is gated.
    #[must_use]
    pub fn is_gated(&self, action: &str) -> bool {
        self.gated.contains(&action.to_lowercase())
    }

    /// Whether a message must be held for human approval.
    ///
    /// Messages without an `action` key are never gated.
    #[must_use]
    pub fn requires_approval(&self, message: &Message) -> bool {
        message.action().is_some_and(|action| self.is_gated(action))
    }

    /// Number of gated actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gated.len()
    }

    /// Whether the policy gates nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gated.is_empty()
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_GATED_ACTIONS)
    }
}
