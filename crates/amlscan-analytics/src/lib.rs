//! # amlscan-analytics
//!
//! Monthly baseline profiles and anomaly detection against them:
//! - Amount outliers (z-score over the baseline distribution)
//! - New counterparty with a large amount
//! - P2P transfer bursts (7-day window)
//! - Cash operation clusters (3-day window)
//! - Monthly spending exceeding income
//!
//! Detection is deterministic: month and date keys are iterated in sorted
//! order, so identical inputs produce byte-identical alert lists.

pub mod anomaly;
pub mod baseline;

pub use anomaly::*;
pub use baseline::*;
