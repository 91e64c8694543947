//! Record identifier generation.

use uuid::Uuid;

/// Generate a new 32-hex record id.
///
/// All persisted entities (statements, transactions, counterparties,
/// assessments) share this id format.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}
