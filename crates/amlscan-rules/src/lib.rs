//! # amlscan-rules
//!
//! Rule-based transaction classification and aggregate risk scoring.
//!
//! The engine compiles the declarative config once, then classifies each
//! transaction against category dictionaries, the risk dictionary, known
//! URL domains, and counterparty memory labels. Every decision leaves an
//! entry in the transaction's explain trail.

pub mod engine;
pub mod scorer;

pub use engine::*;
pub use scorer::*;
