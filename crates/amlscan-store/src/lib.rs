//! # amlscan-store
//!
//! Single-file SQLite persistence for the analysis engine: case model,
//! statements and transactions, counterparty memory, parse templates,
//! user classifications, risk assessments, flow graphs, and the audit
//! log. WAL mode with a 5-second busy timeout; one writer at a time,
//! many readers.

pub mod assessments;
pub mod cases;
pub mod classifications;
pub mod counterparties;
pub mod db;
pub mod error;
pub mod graph_store;
pub mod schema;
pub mod statements;
pub mod templates;

pub use assessments::*;
pub use cases::*;
pub use classifications::*;
pub use counterparties::*;
pub use db::*;
pub use error::*;
pub use statements::*;
