//! # Bus Flow Tests
//!
//! Cross-crate choreography through the bus:
//!
//! ```text
//! publish ──→ [Router] ──→ provider
//!    │
//!    └──→ node/group subscriptions (priority + kind filtered)
//!
//! broadcast ──→ publish × (N-1) ──→ broadcast-scope subscriptions
//!
//! heartbeat ──→ broadcast(pulse) every 4.44s
//! ```

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use mesh_bus::{Bus, Heartbeat, HeartbeatConfig, SubscribeRequest};
    use mesh_router::{Router, RouterConfig};
    use mesh_types::{
        DeliveryStatus, Handler, Message, MessageKind, NodeId, Priority, Topology,
    };
    use parking_lot::Mutex;
    use serde_json::{json, Map, Value};
    use std::sync::Arc;
    use std::time::Duration;

    fn id(name: &str) -> NodeId {
        NodeId::new(name)
    }

    fn bus() -> Arc<Bus> {
        let topology = Arc::new(Topology::demo());
        let router = Arc::new(Router::new(topology, RouterConfig::new("bus-flow-secret")));
        Arc::new(Bus::new(router))
    }

    fn recorder(log: Arc<Mutex<Vec<Value>>>, tag: &str) -> Handler {
        let tag = tag.to_string();
        Handler::from_fn(move |msg| {
            log.lock().push(json!({ "tag": tag, "message": msg.id }));
            Ok(json!(null))
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_provider_and_subscribers() {
        let bus = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.router()
            .providers()
            .register(id("N7"), Handler::from_fn(|_| Ok(json!("provided"))));
        bus.subscribe(SubscribeRequest::node(
            "watcher",
            id("N7"),
            recorder(log.clone(), "node"),
        ));
        bus.subscribe(SubscribeRequest::group(
            "finance-desk",
            "finance",
            recorder(log.clone(), "group"),
        ));

        let message = Message::request(id("N10"), id("N7"), Map::new())
            .with_groups(vec!["finance".to_string()]);
        let routed = bus.publish(message, Priority::High).await;

        assert_eq!(routed.status, DeliveryStatus::Delivered);
        assert_eq!(routed.priority, Priority::High);
        assert_eq!(log.lock().len(), 2);
        assert_eq!(bus.stats().deliveries, 2);
    }

    #[tokio::test]
    async fn test_full_broadcast_census() {
        let bus = bus();
        let pulse_log = Arc::new(Mutex::new(Vec::new()));
        let node_log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(SubscribeRequest::broadcast(
            "pulse-watcher",
            recorder(pulse_log.clone(), "pulse"),
        ));
        bus.subscribe(SubscribeRequest::node(
            "n5-watcher",
            id("N5"),
            recorder(node_log.clone(), "n5"),
        ));

        let results = bus
            .broadcast(Map::new(), Priority::Normal, &id("N6"))
            .await;

        assert_eq!(results.len(), 9);
        assert!(!results.contains_key(&id("N6")));
        // The node-scoped watcher saw exactly its node's copy.
        assert_eq!(node_log.lock().len(), 1);
        // The broadcast-scoped watcher saw the pulse exactly once.
        assert_eq!(pulse_log.lock().len(), 1);

        let stats = bus.stats();
        assert_eq!(stats.broadcasts, 1);
        assert_eq!(stats.messages_published, 9);
    }

    #[tokio::test]
    async fn test_pulse_floor_excludes_low_traffic() {
        let bus = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(
            SubscribeRequest::node("picky", id("N2"), recorder(log.clone(), "picky"))
                .with_priority_floor(Priority::Pulse),
        );

        bus.publish(Message::request(id("N1"), id("N2"), Map::new()), Priority::Low)
            .await;
        assert!(log.lock().is_empty());

        bus.publish(Message::request(id("N1"), id("N2"), Map::new()), Priority::Pulse)
            .await;
        assert_eq!(log.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_drives_the_bus() {
        let bus = bus();
        let pulse_log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = pulse_log.clone();
        bus.subscribe(SubscribeRequest::broadcast(
            "pulse-watcher",
            Handler::from_fn(move |msg| {
                log_clone.lock().push(msg.payload.get("pulse").cloned());
                Ok(json!(null))
            }),
        ));

        let heartbeat = Heartbeat::new(
            bus.clone(),
            HeartbeatConfig {
                interval: Duration::from_secs(4),
            },
        );
        heartbeat.start();
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(4)).await;
            tokio::task::yield_now().await;
        }
        heartbeat.stop().await;

        assert_eq!(heartbeat.pulses(), 3);
        assert_eq!(
            pulse_log.lock().as_slice(),
            &[Some(json!(1)), Some(json!(2)), Some(json!(3))]
        );
        // 3 pulses × 9 targets, one publish per target per pulse.
        assert_eq!(bus.stats().messages_published, 27);
        assert_eq!(bus.stats().broadcasts, 3);

        // Stopping is final until restarted; no pulse arrives afterwards.
        tokio::time::advance(Duration::from_secs(40)).await;
        tokio::task::yield_now().await;
        assert_eq!(heartbeat.pulses(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_publishes_keep_per_subscriber_order() {
        let bus = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        bus.subscribe(SubscribeRequest::node(
            "ordered",
            id("N3"),
            Handler::from_fn(move |msg| {
                log_clone
                    .lock()
                    .push(msg.payload.get("seq").cloned().unwrap_or_default());
                Ok(json!(null))
            }),
        ));

        // Sequential awaits within one task: delivery order follows call order.
        for seq in 0..5 {
            let mut payload = Map::new();
            payload.insert("seq".to_string(), json!(seq));
            bus.publish(
                Message::request(id("N1"), id("N3"), payload),
                Priority::Normal,
            )
            .await;
        }
        assert_eq!(
            log.lock().as_slice(),
            &[json!(0), json!(1), json!(2), json!(3), json!(4)]
        );

        // Concurrent publishes from many tasks all land exactly once.
        let concurrent: Vec<_> = (0..8)
            .map(|seq| {
                let bus = bus.clone();
                async move {
                    let mut payload = Map::new();
                    payload.insert("seq".to_string(), json!(seq + 100));
                    bus.publish(
                        Message::request(id("N1"), id("N3"), payload),
                        Priority::Normal,
                    )
                    .await
                }
            })
            .collect();
        join_all(concurrent).await;
        assert_eq!(log.lock().len(), 13);
    }

    #[tokio::test]
    async fn test_gate_holds_bus_traffic_too() {
        let bus = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(SubscribeRequest::node(
            "watcher",
            id("N2"),
            recorder(log.clone(), "watcher"),
        ));

        let mut payload = Map::new();
        payload.insert("action".to_string(), json!("deploy"));
        let held = bus
            .publish(
                Message::request(id("N9"), id("N2"), payload),
                Priority::Critical,
            )
            .await;

        let checkpoint = held.checkpoint().expect("deploy is gated");
        assert!(log.lock().is_empty());

        // Approval goes through the router; the held message delivers.
        let resumed = bus.router().resume(held, checkpoint).await;
        assert_eq!(resumed.status, DeliveryStatus::NoProvider);
    }

    #[tokio::test]
    async fn test_agent_lifecycle_on_the_bus() {
        let bus = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.register_agent("ledger-agent", id("N8"), recorder(log.clone(), "agent"));
        assert_eq!(bus.stats().active_subscriptions, 1);
        assert_eq!(
            bus.stats().per_node_subscriptions.get(&id("N8")),
            Some(&1)
        );

        bus.publish(
            Message::sync(id("N1"), id("N8"), Map::new()),
            Priority::Normal,
        )
        .await;
        assert_eq!(log.lock().len(), 1);

        assert_eq!(bus.unregister_agent("ledger-agent"), 1);
        assert_eq!(bus.stats().active_subscriptions, 0);
    }

    #[tokio::test]
    async fn test_kind_filter_spans_broadcast_traffic() {
        let bus = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(
            SubscribeRequest::broadcast("sync-only", recorder(log.clone(), "sync"))
                .with_kinds([MessageKind::Request]),
        );

        // Broadcast messages are broadcast-kind; a request-only filter
        // excludes them.
        bus.broadcast(Map::new(), Priority::Normal, &id("N1")).await;
        assert!(log.lock().is_empty());
    }
}
