//! # amlscan-graph
//!
//! Directed money-flow graph built from classified transactions. One
//! account node represents the statement owner; counterparty nodes merge
//! across transactions with risk level and cluster escalation. Edges
//! aggregate per (source, target, type).

pub mod builder;
pub mod filter;
pub mod model;

pub use builder::*;
pub use filter::*;
pub use model::*;
