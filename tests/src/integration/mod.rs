//! Cross-crate integration flows.

pub mod bus_flows;
pub mod routing_flows;
