//! # Mesh Router Crate
//!
//! Point-to-point delivery engine for the mesh.
//!
//! ## Routing Pipeline
//!
//! ```text
//! [Caller] ──Message──→ [Router]
//!                          │ 1. plan path (source → calibrator → hub → target)
//!                          │ 2. calibrate
//!                          │ 3. human gate ──→ awaiting_approval (resubmit later)
//!                          │ 4. sign (HMAC over id:source:target)
//!                          ↓ 5. dispatch
//!                    [Provider Handler]
//! ```
//!
//! Every per-message outcome (no provider, handler failure, gate
//! interception, unknown node) is data on the returned message. The router
//! never propagates a per-message error to its caller; only topology
//! construction can fail at startup.

pub mod gate;
pub mod planner;
pub mod providers;
pub mod router;
pub mod stats;

pub use gate::GatePolicy;
pub use planner::{compute_path, Path, PathError};
pub use providers::ProviderRegistry;
pub use router::{Router, RouterConfig};
pub use stats::{RouterStats, RouterStatsSnapshot};
