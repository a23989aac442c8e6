//! # Heartbeat Scheduler
//!
//! A single repeating task that keeps the bus alive: every tick it
//! broadcasts a pulse from the calibrator at `Priority::Pulse`, independent
//! of any external traffic. Stopping cancels the pending wait through the
//! same watch-channel pattern the rest of the mesh uses for task shutdown.

use crate::bus::Bus;
use mesh_types::Priority;
use parking_lot::Mutex;
use serde_json::{json, Map};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Heartbeat configuration.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Time between pulses.
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(4440),
        }
    }
}

/// The periodic pulse broadcaster.
///
/// The only long-lived background task in the mesh, and its only designed
/// cancellation point.
pub struct Heartbeat {
    bus: Arc<Bus>,
    config: HeartbeatConfig,
    pulses: Arc<AtomicU64>,
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    /// Build a heartbeat over a bus. Does not start ticking.
    #[must_use]
    pub fn new(bus: Arc<Bus>, config: HeartbeatConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            bus,
            config,
            pulses: Arc::new(AtomicU64::new(0)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    /// Start the pulse task. A no-op if already running.
    ///
    /// The first pulse fires one full interval after start.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return;
        }
        let _ = self.shutdown_tx.send(false);

        let bus = self.bus.clone();
        let pulses = self.pulses.clone();
        let interval = self.config.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(interval_ms = interval.as_millis() as u64, "Heartbeat started");
        *handle = Some(tokio::spawn(async move {
            let calibrator = bus.router().topology().calibrator().clone();
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let pulse = pulses.fetch_add(1, Ordering::Relaxed) + 1;
                        let mut payload = Map::new();
                        payload.insert("pulse".to_string(), json!(pulse));
                        payload.insert(
                            "calibrator_level".to_string(),
                            json!(calibrator.signal_level),
                        );
                        debug!(pulse, "Heartbeat pulse");
                        bus.broadcast(payload, Priority::Pulse, &calibrator.id).await;
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Heartbeat stopping");
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the pulse task, cancelling any pending wait.
    ///
    /// Never errors back to the caller; stopping an already-stopped
    /// heartbeat is a no-op.
    pub async fn stop(&self) {
        let handle = self.handle.lock().take();
        let Some(handle) = handle else {
            return;
        };
        let _ = self.shutdown_tx.send(true);
        let _ = handle.await;
        info!(pulses = self.pulses(), "Heartbeat stopped");
    }

    /// Pulses emitted so far. Strictly increases by one per tick while
    /// running; never resets.
    #[must_use]
    pub fn pulses(&self) -> u64 {
        self.pulses.load(Ordering::Relaxed)
    }

    /// Whether the pulse task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }
}
