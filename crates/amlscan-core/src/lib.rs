//! # amlscan-core
//!
//! Core domain models and deterministic transforms for AML statement analysis:
//! - Raw and normalized transaction models with exact decimal money
//! - Statement metadata (balances, declared totals, period)
//! - Text normalization and Polish diacritic folding
//! - Transaction hashing and first-wins deduplication
//! - Payment channel detection (card, transfer, BLIK, cash, fees)
//! - Alert and monthly-profile models shared by the analytics stages

pub mod channel;
pub mod error;
pub mod hash;
pub mod ids;
pub mod models;
pub mod normalize;
pub mod text;

pub use channel::*;
pub use error::*;
pub use hash::*;
pub use ids::*;
pub use models::*;
pub use normalize::*;
pub use text::*;
