//! # Subscriptions
//!
//! A subscription binds an opaque subscriber identity to a handler, a scope,
//! a priority floor, and an optional message-kind filter. The table keeps
//! four indices (node, group, broadcast, subscriber) consistent with the
//! subscription map: every subscription appears in exactly the indices its
//! scope implies, no more, no less.

use mesh_types::{Handler, Message, MessageKind, NodeId, Priority};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// What a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionScope {
    /// Messages addressed to one node.
    Node,
    /// Messages fanned out to a named group.
    Group,
    /// Broadcast pulses only.
    Broadcast,
    /// An agent bound to a node; delivered like `Node`, removed by agent id.
    Agent,
}

/// A registered subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Subscription id.
    pub id: Uuid,
    /// Opaque subscriber identity (used by `unsubscribe_all`).
    pub subscriber: String,
    /// Listening scope.
    pub scope: SubscriptionScope,
    /// Bound node, for `Node` and `Agent` scopes.
    pub node: Option<NodeId>,
    /// Bound group name, for `Group` scope.
    pub group: Option<String>,
    /// Accepted message kinds; empty accepts all.
    pub kinds: HashSet<MessageKind>,
    /// Minimum priority delivered.
    pub priority_floor: Priority,
    /// The subscriber's handler.
    pub handler: Handler,
    /// Inactive subscriptions are skipped during fan-out.
    pub active: bool,
    /// Successful deliveries so far.
    pub deliveries: u64,
    /// Last successful delivery (unix millis).
    pub last_delivered_at: Option<u64>,
}

impl Subscription {
    /// Whether this subscription should receive `message`.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        self.active
            && self.priority_floor <= message.priority
            && (self.kinds.is_empty() || self.kinds.contains(&message.kind))
    }
}

/// Parameters for [`Bus::subscribe`](crate::Bus::subscribe).
///
/// Use the scope constructors; they guarantee the node/group binding matches
/// the scope.
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    /// Opaque subscriber identity.
    pub subscriber: String,
    /// Listening scope.
    pub scope: SubscriptionScope,
    /// Bound node, for `Node` and `Agent` scopes.
    pub node: Option<NodeId>,
    /// Bound group, for `Group` scope.
    pub group: Option<String>,
    /// Accepted message kinds; empty accepts all.
    pub kinds: HashSet<MessageKind>,
    /// Minimum priority delivered. Defaults to `Low` (everything).
    pub priority_floor: Priority,
    /// The subscriber's handler.
    pub handler: Handler,
}

impl SubscribeRequest {
    fn base(subscriber: impl Into<String>, scope: SubscriptionScope, handler: Handler) -> Self {
        Self {
            subscriber: subscriber.into(),
            scope,
            node: None,
            group: None,
            kinds: HashSet::new(),
            priority_floor: Priority::Low,
            handler,
        }
    }

    /// Subscribe to messages addressed to one node.
    pub fn node(subscriber: impl Into<String>, node: NodeId, handler: Handler) -> Self {
        let mut req = Self::base(subscriber, SubscriptionScope::Node, handler);
        req.node = Some(node);
        req
    }

    /// Subscribe to messages fanned out to a group.
    pub fn group(subscriber: impl Into<String>, group: impl Into<String>, handler: Handler) -> Self {
        let mut req = Self::base(subscriber, SubscriptionScope::Group, handler);
        req.group = Some(group.into());
        req
    }

    /// Subscribe to broadcast pulses.
    pub fn broadcast(subscriber: impl Into<String>, handler: Handler) -> Self {
        Self::base(subscriber, SubscriptionScope::Broadcast, handler)
    }

    /// Register an agent on a node.
    pub fn agent(subscriber: impl Into<String>, node: NodeId, handler: Handler) -> Self {
        let mut req = Self::base(subscriber, SubscriptionScope::Agent, handler);
        req.node = Some(node);
        req
    }

    /// Raise the priority floor.
    #[must_use]
    pub fn with_priority_floor(mut self, floor: Priority) -> Self {
        self.priority_floor = floor;
        self
    }

    /// Restrict accepted message kinds.
    #[must_use]
    pub fn with_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = MessageKind>,
    {
        self.kinds = kinds.into_iter().collect();
        self
    }
}

/// The subscription map plus its four indices.
///
/// All mutation happens under the bus's single write lock; buckets keep
/// insertion order so fan-out enumeration is deterministic.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionTable {
    subs: HashMap<Uuid, Subscription>,
    by_node: HashMap<NodeId, Vec<Uuid>>,
    by_group: HashMap<String, Vec<Uuid>>,
    by_subscriber: HashMap<String, Vec<Uuid>>,
    broadcast: Vec<Uuid>,
}

impl SubscriptionTable {
    pub fn insert(&mut self, sub: Subscription) {
        let id = sub.id;
        match sub.scope {
            SubscriptionScope::Node | SubscriptionScope::Agent => {
                if let Some(node) = &sub.node {
                    self.by_node.entry(node.clone()).or_default().push(id);
                }
            }
            SubscriptionScope::Group => {
                if let Some(group) = &sub.group {
                    self.by_group.entry(group.clone()).or_default().push(id);
                }
            }
            SubscriptionScope::Broadcast => self.broadcast.push(id),
        }
        self.by_subscriber
            .entry(sub.subscriber.clone())
            .or_default()
            .push(id);
        self.subs.insert(id, sub);
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Subscription> {
        let sub = self.subs.remove(&id)?;
        if let Some(node) = &sub.node {
            prune(&mut self.by_node, node, id);
        }
        if let Some(group) = &sub.group {
            prune(&mut self.by_group, group, id);
        }
        self.broadcast.retain(|&other| other != id);
        prune(&mut self.by_subscriber, &sub.subscriber, id);
        Some(sub)
    }

    /// Remove every subscription of one subscriber. Returns how many.
    pub fn remove_subscriber(&mut self, subscriber: &str) -> usize {
        let ids = self
            .by_subscriber
            .get(subscriber)
            .cloned()
            .unwrap_or_default();
        for id in &ids {
            self.remove(*id);
        }
        ids.len()
    }

    pub fn get(&self, id: Uuid) -> Option<&Subscription> {
        self.subs.get(&id)
    }

    /// Ids indexed under a node, in subscription order.
    pub fn node_bucket(&self, node: &NodeId) -> &[Uuid] {
        self.by_node.get(node).map_or(&[], Vec::as_slice)
    }

    /// Ids indexed under a group, in subscription order.
    pub fn group_bucket(&self, group: &str) -> &[Uuid] {
        self.by_group.get(group).map_or(&[], Vec::as_slice)
    }

    /// Ids in the broadcast set, in subscription order.
    pub fn broadcast_bucket(&self) -> &[Uuid] {
        &self.broadcast
    }

    /// The subscriber index bucket, in subscription order.
    pub fn subscriber_bucket(&self, subscriber: &str) -> &[Uuid] {
        self.by_subscriber.get(subscriber).map_or(&[], Vec::as_slice)
    }

    /// Matching subscriptions for a routed message: the union of the target
    /// node's bucket and every group bucket named by the message, deduped,
    /// filtered through [`Subscription::matches`]. Handlers are cloned out
    /// so the caller can drop the lock before invoking them.
    pub fn matching(&self, message: &Message) -> Vec<(Uuid, Handler)> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        let node_ids = self.node_bucket(&message.target).iter();
        let group_ids = message
            .groups
            .iter()
            .flat_map(|group| self.group_bucket(group).iter());

        for &id in node_ids.chain(group_ids) {
            if !seen.insert(id) {
                continue;
            }
            if let Some(sub) = self.subs.get(&id) {
                if sub.matches(message) {
                    out.push((id, sub.handler.clone()));
                }
            }
        }
        out
    }

    /// Matching broadcast-scope subscriptions, bypassing the per-node index.
    pub fn matching_broadcast(&self, message: &Message) -> Vec<(Uuid, Handler)> {
        self.broadcast
            .iter()
            .filter_map(|id| {
                let sub = self.subs.get(id)?;
                sub.matches(message).then(|| (*id, sub.handler.clone()))
            })
            .collect()
    }

    /// Bump a subscription's delivery counters.
    pub fn record_delivery(&mut self, id: Uuid, now: u64) {
        if let Some(sub) = self.subs.get_mut(&id) {
            sub.deliveries += 1;
            sub.last_delivered_at = Some(now);
        }
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    /// Active subscription counts keyed by bound node.
    pub fn per_node_counts(&self) -> HashMap<NodeId, usize> {
        self.by_node
            .iter()
            .map(|(node, bucket)| (node.clone(), bucket.len()))
            .collect()
    }
}

fn prune<K>(index: &mut HashMap<K, Vec<Uuid>>, key: &K, id: Uuid)
where
    K: std::hash::Hash + Eq + Clone,
{
    if let Some(bucket) = index.get_mut(key) {
        bucket.retain(|&other| other != id);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}
