//! # Resonance Mesh Test Suite
//!
//! Unified test crate for cross-crate integration flows.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Cross-crate routing and bus choreography
//!     ├── routing_flows.rs
//!     └── bus_flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p mesh-tests
//!
//! # By category
//! cargo test -p mesh-tests integration::
//! ```

#![allow(dead_code)]

pub mod integration;
