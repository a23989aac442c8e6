//! # Router
//!
//! The point-to-point delivery engine. A message is planned, calibrated,
//! gate-checked, signed, and dispatched to the target node's provider
//! handler, in that order. Every outcome is returned as data on the message;
//! `route` itself is infallible.

use crate::gate::GatePolicy;
use crate::planner::{compute_path, Path};
use crate::providers::ProviderRegistry;
use crate::stats::{RouterStats, RouterStatsSnapshot};
use mesh_crypto::sign_envelope;
use mesh_types::{unix_millis, Message, NodeId, Topology};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Secret keying the envelope HMAC.
    pub signing_secret: String,
    /// Action keywords intercepted by the human gate.
    pub gated_actions: Vec<String>,
}

impl RouterConfig {
    /// Configuration with the default gate policy.
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            gated_actions: crate::gate::DEFAULT_GATED_ACTIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Replace the gated action set.
    #[must_use]
    pub fn with_gated_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gated_actions = actions.into_iter().map(Into::into).collect();
        self
    }
}

/// The point-to-point delivery engine.
///
/// Constructed once at process start and passed by reference to all callers;
/// there is no process-wide singleton.
pub struct Router {
    topology: Arc<Topology>,
    providers: ProviderRegistry,
    gate: GatePolicy,
    secret: Vec<u8>,
    stats: RouterStats,
}

impl Router {
    /// Build a router over a frozen topology.
    #[must_use]
    pub fn new(topology: Arc<Topology>, config: RouterConfig) -> Self {
        Self {
            topology,
            providers: ProviderRegistry::new(),
            gate: GatePolicy::new(&config.gated_actions),
            secret: config.signing_secret.into_bytes(),
            stats: RouterStats::new(),
        }
    }

    /// The topology this router operates over.
    #[must_use]
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// The provider registry. Callers register node handlers here.
    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// The gate policy in force.
    #[must_use]
    pub fn gate(&self) -> &GatePolicy {
        &self.gate
    }

    /// Route a message end to end.
    ///
    /// Calibrates, evaluates the gate, signs, dispatches to the target's
    /// provider, and records statistics. All outcomes (planner failure, gate
    /// interception, missing provider, handler failure) are data on the
    /// returned message.
    pub async fn route(&self, message: Message) -> Message {
        if message.is_terminal() {
            warn!(id = %message.id, "Refusing to route a terminal message");
            return message;
        }

        let path = match compute_path(&self.topology, &message.source, &message.target) {
            Ok(path) => path,
            Err(e) => {
                warn!(id = %message.id, error = %e, "Path planning failed");
                return message.with_error(e.to_string());
            }
        };

        let now = unix_millis();
        // Both lookups were validated by compute_path above.
        let source_level = self.topology.signal_level(&message.source).unwrap_or(0.0);
        let target_level = self.topology.signal_level(&message.target).unwrap_or(0.0);
        let message = message
            .with_levels(source_level, target_level)
            .routed(now)
            .calibrate(now);

        if self.gate.requires_approval(&message) {
            let checkpoint_id = Uuid::new_v4();
            self.stats.record_gate_trigger();
            info!(
                id = %message.id,
                action = message.action().unwrap_or_default(),
                checkpoint = %checkpoint_id,
                "Message held for human approval"
            );
            return message.hold_for_approval(checkpoint_id);
        }

        self.sign_and_dispatch(message, &path).await
    }

    /// Re-submit a gate-held message with its approved checkpoint.
    ///
    /// Re-enters the pipeline at the signing step; the original calibration
    /// stands. A checkpoint mismatch is recorded as message data, never an
    /// error.
    pub async fn resume(&self, message: Message, checkpoint_id: Uuid) -> Message {
        match message.checkpoint() {
            Some(held) if held == checkpoint_id => {
                let path =
                    match compute_path(&self.topology, &message.source, &message.target) {
                        Ok(path) => path,
                        Err(e) => return message.with_error(e.to_string()),
                    };
                debug!(id = %message.id, checkpoint = %checkpoint_id, "Approval accepted");
                self.sign_and_dispatch(message, &path).await
            }
            Some(held) => {
                warn!(
                    id = %message.id,
                    expected = %held,
                    presented = %checkpoint_id,
                    "Checkpoint mismatch on resume"
                );
                message.with_error("checkpoint mismatch")
            }
            None => message.with_error("message is not awaiting approval"),
        }
    }

    /// Route an independent copy of `message` to each target.
    ///
    /// Each copy gets a fresh id and is calibrated and signed on its own.
    /// Results are keyed by target.
    pub async fn broadcast(
        &self,
        message: &Message,
        targets: &[NodeId],
    ) -> HashMap<NodeId, Message> {
        let mut results = HashMap::with_capacity(targets.len());
        for target in targets {
            let routed = self.route(message.readdressed(target.clone())).await;
            results.insert(target.clone(), routed);
        }
        results
    }

    /// Read-only snapshot of the router counters.
    #[must_use]
    pub fn stats(&self) -> RouterStatsSnapshot {
        self.stats.snapshot()
    }

    /// Sign the envelope and dispatch to the target's provider.
    async fn sign_and_dispatch(&self, message: Message, path: &Path) -> Message {
        let signature = sign_envelope(
            &self.secret,
            message.id,
            message.source.as_str(),
            message.target.as_str(),
        );
        let message = message.signed(signature);

        let Some(handler) = self.providers.get(&message.target) else {
            debug!(id = %message.id, target = %message.target, "No provider registered");
            self.stats.record_routed(&message.target, path.signal_delta);
            return message.no_provider(unix_millis());
        };

        let outcome = handler.invoke(&message).await;
        let now = unix_millis();
        let message = match outcome {
            Ok(result) => {
                debug!(id = %message.id, target = %message.target, "Delivered");
                message.delivered_ok(result, now)
            }
            Err(e) => {
                warn!(id = %message.id, target = %message.target, error = %e, "Provider failed");
                message.delivered_err(e.to_string(), now)
            }
        };
        self.stats.record_routed(&message.target, path.signal_delta);
        message
    }

    /// Secret accessor for the bus's verification helpers.
    #[must_use]
    pub fn signing_secret(&self) -> &[u8] {
        &self.secret
    }
}
