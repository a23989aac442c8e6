//! # Message Envelope
//!
//! The typed envelope every routed message travels in. Routing metadata
//! (priority, status, result, error, calibration, signature) lives in
//! dedicated fields; the caller-supplied `payload` map stays opaque to the
//! mesh except for the `action` key consulted by the gate policy.
//!
//! ## Lifecycle
//!
//! ```text
//! created ──▶ calibrated ──▶ awaiting_approval   (terminal for this call)
//!                       └──▶ signed ──▶ dispatched ──▶ delivered | failed
//!                                  └──▶ no_provider   (terminal)
//! ```
//!
//! Each stage method consumes the message and returns the next value, so a
//! message can never be half-advanced. A message whose `delivered_at` is set
//! is terminal and is never fed back into the pipeline.

use crate::topology::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Current unix time in milliseconds.
///
/// All envelope timestamps use this clock.
#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The kind of traffic a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Point-to-point request.
    Request,
    /// Reply to an earlier request.
    Response,
    /// One-to-all fan-out.
    Broadcast,
    /// State synchronization traffic (heartbeat pulses included).
    Sync,
}

/// Delivery priority, ordered `Low < Pulse < Normal < High < Critical`.
///
/// Subscriptions carry a priority floor; a message is delivered to a
/// subscription only when its priority is at or above that floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background traffic.
    Low,
    /// Heartbeat pulses.
    Pulse,
    /// Default.
    Normal,
    /// Elevated.
    High,
    /// Must-see.
    Critical,
}

/// Where a message ended up.
///
/// Every outcome of routing is data on the message; the router never raises
/// for a per-message failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum DeliveryStatus {
    /// Constructed, not yet routed.
    Created,
    /// Intercepted by the human gate; resubmit with the checkpoint id once
    /// approved out-of-band.
    AwaitingApproval {
        /// Approval checkpoint to quote on resubmission.
        checkpoint_id: Uuid,
    },
    /// The target node has no registered provider. Not an error.
    NoProvider,
    /// The provider handler returned a result.
    Delivered,
    /// The provider handler failed; the error is in `Message::error`.
    Failed,
}

/// A message travelling through the mesh.
///
/// Construct with one of the kind constructors, then let the router advance
/// it through its stages. Fields are public for inspection; mutation happens
/// only through the consuming stage methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id.
    pub id: Uuid,
    /// Originating node.
    pub source: NodeId,
    /// Addressed node.
    pub target: NodeId,
    /// Traffic kind.
    pub kind: MessageKind,
    /// Opaque caller-supplied content. The mesh reads only the `action` key.
    pub payload: Map<String, Value>,
    /// Group names this message additionally fans out to.
    pub groups: Vec<String>,
    /// Delivery priority, stamped by the bus at publish time.
    pub priority: Priority,
    /// Routing outcome.
    pub status: DeliveryStatus,
    /// Provider handler return value, when delivered.
    pub result: Option<Value>,
    /// Provider or planner failure, when one occurred.
    pub error: Option<String>,
    /// Whether the message passed the calibration step.
    pub calibrated: bool,
    /// When calibration happened (unix millis).
    pub calibrated_at: Option<u64>,
    /// Source signal level, copied from the topology at route time.
    pub source_level: Option<f64>,
    /// Target signal level, copied from the topology at route time.
    pub target_level: Option<f64>,
    /// When the message was constructed (unix millis).
    pub created_at: u64,
    /// When routing began (unix millis).
    pub routed_at: Option<u64>,
    /// When a terminal outcome was reached (unix millis).
    pub delivered_at: Option<u64>,
    /// Hex HMAC-SHA256 over `"{id}:{source}:{target}"`, absent until signed.
    pub signature: Option<String>,
}

impl Message {
    /// Construct a message of the given kind.
    #[must_use]
    pub fn new(
        source: NodeId,
        target: NodeId,
        kind: MessageKind,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            target,
            kind,
            payload,
            groups: Vec::new(),
            priority: Priority::Normal,
            status: DeliveryStatus::Created,
            result: None,
            error: None,
            calibrated: false,
            calibrated_at: None,
            source_level: None,
            target_level: None,
            created_at: unix_millis(),
            routed_at: None,
            delivered_at: None,
            signature: None,
        }
    }

    /// Construct a request.
    #[must_use]
    pub fn request(source: NodeId, target: NodeId, payload: Map<String, Value>) -> Self {
        Self::new(source, target, MessageKind::Request, payload)
    }

    /// Construct a response.
    #[must_use]
    pub fn response(source: NodeId, target: NodeId, payload: Map<String, Value>) -> Self {
        Self::new(source, target, MessageKind::Response, payload)
    }

    /// Construct a broadcast message.
    #[must_use]
    pub fn broadcast(source: NodeId, target: NodeId, payload: Map<String, Value>) -> Self {
        Self::new(source, target, MessageKind::Broadcast, payload)
    }

    /// Construct a sync message.
    #[must_use]
    pub fn sync(source: NodeId, target: NodeId, payload: Map<String, Value>) -> Self {
        Self::new(source, target, MessageKind::Sync, payload)
    }

    // =========================================================================
    // STAGE METHODS (each consumes self and returns the next value)
    // =========================================================================

    /// Copy source/target signal levels from the topology.
    #[must_use]
    pub fn with_levels(mut self, source_level: f64, target_level: f64) -> Self {
        self.source_level = Some(source_level);
        self.target_level = Some(target_level);
        self
    }

    /// Stamp the delivery priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Target additional subscription groups.
    #[must_use]
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// Mark the message calibrated.
    ///
    /// Idempotent: re-calibrating only refreshes the timestamp.
    #[must_use]
    pub fn calibrate(mut self, now: u64) -> Self {
        self.calibrated = true;
        self.calibrated_at = Some(now);
        self
    }

    /// Divert to the human gate with a fresh checkpoint.
    #[must_use]
    pub fn hold_for_approval(mut self, checkpoint_id: Uuid) -> Self {
        self.status = DeliveryStatus::AwaitingApproval { checkpoint_id };
        self
    }

    /// Attach the envelope signature.
    #[must_use]
    pub fn signed(mut self, signature: String) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Stamp the routing timestamp.
    #[must_use]
    pub fn routed(mut self, now: u64) -> Self {
        self.routed_at = Some(now);
        self
    }

    /// Record a planner failure. The message stays undelivered.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Terminal: handler returned a result.
    #[must_use]
    pub fn delivered_ok(mut self, result: Value, now: u64) -> Self {
        self.status = DeliveryStatus::Delivered;
        self.result = Some(result);
        self.delivered_at = Some(now);
        self
    }

    /// Terminal: handler failed. The routing attempt still completed;
    /// delivery failure is payload-level data, not a router error.
    #[must_use]
    pub fn delivered_err(mut self, error: impl Into<String>, now: u64) -> Self {
        self.status = DeliveryStatus::Failed;
        self.error = Some(error.into());
        self.delivered_at = Some(now);
        self
    }

    /// Terminal: the target has no registered provider.
    #[must_use]
    pub fn no_provider(mut self, now: u64) -> Self {
        self.status = DeliveryStatus::NoProvider;
        self.delivered_at = Some(now);
        self
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The `action` key of the payload, consulted by the gate policy.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.payload.get("action").and_then(Value::as_str)
    }

    /// The approval checkpoint, when the message is gate-pending.
    #[must_use]
    pub fn checkpoint(&self) -> Option<Uuid> {
        match self.status {
            DeliveryStatus::AwaitingApproval { checkpoint_id } => Some(checkpoint_id),
            _ => None,
        }
    }

    /// Whether the message reached a terminal delivery timestamp.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.delivered_at.is_some()
    }

    /// An independent copy for fan-out: same payload and kind, fresh id,
    /// re-addressed to `target`, with all routing progress reset.
    #[must_use]
    pub fn readdressed(&self, target: NodeId) -> Self {
        let mut copy = Self::new(
            self.source.clone(),
            target,
            self.kind,
            self.payload.clone(),
        );
        copy.groups = self.groups.clone();
        copy.priority = self.priority;
        copy
    }
}
