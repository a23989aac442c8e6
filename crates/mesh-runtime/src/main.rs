//! # Mesh Runtime
//!
//! Demo entry point for the resonance mesh.
//!
//! ## Startup Sequence
//!
//! 1. Initialize tracing (env-filter, `RUST_LOG` aware)
//! 2. Read the signing secret from `MESH_SECRET` (dev default otherwise)
//! 3. Freeze the demo topology and build router + bus
//! 4. Register an echo provider on every node
//! 5. Start the heartbeat
//! 6. Run until ctrl-c, then shut down and log final statistics

use anyhow::Result;
use mesh_bus::{Bus, Heartbeat, HeartbeatConfig};
use mesh_router::{Router, RouterConfig};
use mesh_types::{Handler, Message, Priority, Topology};
use serde_json::{json, Map};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let secret =
        std::env::var("MESH_SECRET").unwrap_or_else(|_| "mesh-dev-secret".to_string());
    if secret == "mesh-dev-secret" {
        tracing::warn!("Using the development signing secret; set MESH_SECRET in production");
    }

    let topology = Arc::new(Topology::demo());
    info!(
        nodes = topology.len(),
        hub = %topology.hub().id,
        calibrator = %topology.calibrator().id,
        "Topology frozen"
    );

    let router = Arc::new(Router::new(topology.clone(), RouterConfig::new(secret)));
    for node in topology.nodes() {
        let name = node.id.to_string();
        router.providers().register(
            node.id.clone(),
            Handler::from_fn(move |msg: &Message| {
                Ok(json!({ "echo_from": name, "message": msg.id }))
            }),
        );
    }

    let bus = Arc::new(Bus::new(router.clone()));
    let heartbeat = Heartbeat::new(bus.clone(), HeartbeatConfig::default());
    heartbeat.start();

    // One demo publish so a fresh run shows a full route in the logs.
    let routed = bus
        .publish(
            Message::request(
                topology.calibrator().id.clone(),
                topology.hub().id.clone(),
                Map::new(),
            ),
            Priority::Normal,
        )
        .await;
    info!(id = %routed.id, status = ?routed.status, "Demo message routed");

    info!("Mesh running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    heartbeat.stop().await;
    let router_stats = router.stats();
    let bus_stats = bus.stats();
    info!(
        routed = router_stats.messages_routed,
        gate_triggers = router_stats.gate_triggers,
        published = bus_stats.messages_published,
        broadcasts = bus_stats.broadcasts,
        deliveries = bus_stats.deliveries,
        "Mesh stopped"
    );
    Ok(())
}
