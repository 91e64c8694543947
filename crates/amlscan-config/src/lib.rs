//! # amlscan-config
//!
//! Declarative rules configuration for the classification engine:
//! schema, YAML/JSON loading with a built-in fallback, validation
//! with warnings, and an atomically swappable shared handle.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::*;
pub use schema::*;
pub use validation::*;
