//! # amlscan-parsers
//!
//! Statement parsers and parse validation:
//! - Spatial (coordinate-based) PDF parser: word extraction with bounding
//!   boxes, header-driven column detection, date-marker transaction
//!   banding, user-confirmed re-parse with saved templates
//! - Polish amount/date primitives shared by all parsers
//! - Common statement header extraction (balances, period, declared sums)
//! - MT940/STA parser with encoding detection
//! - PDF ↔ MT940 cross-validation
//! - Balance-chain reconciliation
//! - Read-mostly parse result cache

pub mod amounts;
pub mod cache;
pub mod columns;
pub mod header;
pub mod mt940;
pub mod reconcile;
pub mod spatial;
pub mod text_fallback;
pub mod words;

pub use amounts::*;
pub use cache::*;
pub use columns::*;
pub use header::*;
pub use reconcile::*;
pub use spatial::*;
pub use text_fallback::*;
pub use words::*;
