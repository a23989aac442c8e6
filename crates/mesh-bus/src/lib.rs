//! # Mesh Bus Crate
//!
//! Publish/subscribe layer built on the router.
//!
//! ## Fan-Out
//!
//! ```text
//! publish(msg, priority)
//!     │
//!     ├──▶ Router::route ──▶ provider handler of msg.target
//!     │
//!     └──▶ subscriber fan-out
//!             node index[msg.target] ∪ group index[msg.groups]
//!             filtered by: active, priority floor, kind filter
//! ```
//!
//! One broken subscriber never blocks delivery to the rest: handler failures
//! are caught per subscriber, logged, and dropped.
//!
//! The bus also owns the heartbeat scheduler, which broadcasts a pulse
//! message from the calibrator on a fixed interval independent of external
//! traffic.

pub mod bus;
pub mod heartbeat;
pub mod stats;
pub mod subscription;

pub use bus::Bus;
pub use heartbeat::{Heartbeat, HeartbeatConfig};
pub use stats::{BusStats, BusStatsSnapshot};
pub use subscription::{SubscribeRequest, Subscription, SubscriptionScope};
