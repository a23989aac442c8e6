//! # Mesh Types Crate
//!
//! This crate contains the fixed topology model, the `Message` envelope, and
//! the polymorphic handler abstraction shared by the router and bus crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Typed Envelope**: Routing metadata (priority, status, result, error)
//!   lives in dedicated `Message` fields and is never smuggled through the
//!   caller-supplied payload map.
//! - **Immutable Staging**: A `Message` moves through its lifecycle by
//!   consuming stage methods that each return the next value, so the
//!   calibrate → gate → sign → dispatch progression is visible in the types.

pub mod errors;
pub mod handler;
pub mod message;
pub mod topology;

pub use errors::TopologyError;
pub use handler::{AsyncHandler, Handler, HandlerError, HandlerResult};
pub use message::{unix_millis, DeliveryStatus, Message, MessageKind, Priority};
pub use topology::{Node, NodeId, NodeSpec, Topology};
