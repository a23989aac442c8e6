//! # Bus
//!
//! Wraps the router with subscriber fan-out. `publish` routes one message to
//! its addressed node, then delivers it to every matching subscription;
//! `broadcast` does this once per node and additionally feeds the
//! broadcast-scoped subscriptions.

use crate::stats::{BusStats, BusStatsSnapshot};
use crate::subscription::{SubscribeRequest, Subscription, SubscriptionTable};
use mesh_router::Router;
use mesh_types::{unix_millis, Handler, Message, NodeId, Priority};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// The publish/subscribe layer.
///
/// Constructed once around a router and shared via `Arc`; all subscription
/// state lives behind a single lock that is never held across a handler
/// await.
pub struct Bus {
    router: Arc<Router>,
    table: RwLock<SubscriptionTable>,
    stats: BusStats,
}

impl Bus {
    /// Build a bus over a router.
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            table: RwLock::new(SubscriptionTable::default()),
            stats: BusStats::new(),
        }
    }

    /// The underlying router.
    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    // =========================================================================
    // SUBSCRIPTION MANAGEMENT
    // =========================================================================

    /// Register a subscription. Returns its id.
    pub fn subscribe(&self, request: SubscribeRequest) -> Uuid {
        let id = Uuid::new_v4();
        let sub = Subscription {
            id,
            subscriber: request.subscriber,
            scope: request.scope,
            node: request.node,
            group: request.group,
            kinds: request.kinds,
            priority_floor: request.priority_floor,
            handler: request.handler,
            active: true,
            deliveries: 0,
            last_delivered_at: None,
        };
        debug!(id = %id, subscriber = %sub.subscriber, scope = ?sub.scope, "Subscribed");
        self.table.write().insert(sub);
        id
    }

    /// Remove a subscription from the table and every index.
    ///
    /// Returns whether it existed.
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.table.write().remove(id).is_some();
        if removed {
            debug!(id = %id, "Unsubscribed");
        }
        removed
    }

    /// Remove every subscription held by a subscriber. Returns how many.
    pub fn unsubscribe_all(&self, subscriber: &str) -> usize {
        let removed = self.table.write().remove_subscriber(subscriber);
        if removed > 0 {
            debug!(subscriber = %subscriber, count = removed, "Unsubscribed all");
        }
        removed
    }

    /// Inspect a subscription.
    #[must_use]
    pub fn subscription(&self, id: Uuid) -> Option<Subscription> {
        self.table.read().get(id).cloned()
    }

    /// Register an agent on a node (scope `Agent`). Returns the
    /// subscription id.
    pub fn register_agent(&self, agent_id: impl Into<String>, node: NodeId, handler: Handler) -> Uuid {
        self.subscribe(SubscribeRequest::agent(agent_id, node, handler))
    }

    /// Remove every subscription of an agent. Returns how many.
    pub fn unregister_agent(&self, agent_id: &str) -> usize {
        self.unsubscribe_all(agent_id)
    }

    // =========================================================================
    // PUBLISH / BROADCAST
    // =========================================================================

    /// Publish a message: route it to its addressed node, then fan out to
    /// every matching subscription.
    ///
    /// Fan-out happens only for messages that reached a terminal routing
    /// outcome; a gate-held or unplannable message is returned as-is, so the
    /// gate cannot be bypassed through subscriber delivery.
    pub async fn publish(&self, message: Message, priority: Priority) -> Message {
        let message = message.with_priority(priority);
        self.stats.record_published();

        let routed = self.router.route(message).await;
        if routed.is_terminal() {
            self.fan_out(&routed).await;
        }
        routed
    }

    /// Broadcast a payload from `source` to every other node.
    ///
    /// One message per node is published (and independently calibrated and
    /// signed); one additional broadcast-kind message, nominally addressed
    /// to the hub, goes straight to the broadcast-scoped subscriptions. The
    /// broadcast counter increments once per call.
    pub async fn broadcast(
        &self,
        payload: Map<String, Value>,
        priority: Priority,
        source: &NodeId,
    ) -> HashMap<NodeId, Message> {
        self.stats.record_broadcast();

        let targets: Vec<NodeId> = self
            .router
            .topology()
            .node_ids()
            .filter(|node| *node != source)
            .cloned()
            .collect();

        let mut results = HashMap::with_capacity(targets.len());
        for target in targets {
            let message = Message::broadcast(source.clone(), target.clone(), payload.clone());
            let routed = self.publish(message, priority).await;
            results.insert(target, routed);
        }

        let hub = self.router.topology().hub().id.clone();
        let pulse = Message::broadcast(source.clone(), hub, payload).with_priority(priority);
        let broadcast_subs = self.table.read().matching_broadcast(&pulse);
        self.deliver(broadcast_subs, &pulse).await;

        results
    }

    /// Read-only snapshot of the bus counters and subscription census.
    #[must_use]
    pub fn stats(&self) -> BusStatsSnapshot {
        let table = self.table.read();
        BusStatsSnapshot {
            messages_published: self.stats.published(),
            broadcasts: self.stats.broadcasts(),
            deliveries: self.stats.deliveries(),
            active_subscriptions: table.len(),
            per_node_subscriptions: table.per_node_counts(),
        }
    }

    /// Deliver to the union of the target node's and named groups' buckets.
    async fn fan_out(&self, message: &Message) {
        let matched = self.table.read().matching(message);
        self.deliver(matched, message).await;
    }

    /// Invoke each handler in bucket order with per-subscriber isolation:
    /// a failing subscriber is logged and skipped, never aborting delivery
    /// to the rest.
    async fn deliver(&self, subscriptions: Vec<(Uuid, Handler)>, message: &Message) {
        for (id, handler) in subscriptions {
            match handler.invoke(message).await {
                Ok(_) => {
                    self.table.write().record_delivery(id, unix_millis());
                    self.stats.record_delivery();
                }
                Err(e) => {
                    warn!(
                        subscription = %id,
                        message = %message.id,
                        error = %e,
                        "Subscriber handler failed; continuing fan-out"
                    );
                }
            }
        }
    }
}
