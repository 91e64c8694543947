//! # amlscan-memory
//!
//! Cross-statement counterparty knowledge base. Resolution links printed
//! counterparty names to long-lived profiles: exact canonical/alias match
//! first, then fuzzy token-overlap matching, then profile creation. Labels
//! (whitelist/blacklist) feed the rule engine through a cached snapshot.

pub mod resolver;

pub use resolver::*;
