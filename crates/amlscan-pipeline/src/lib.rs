//! # amlscan-pipeline
//!
//! End-to-end orchestration of the analysis engine:
//!
//! ```text
//! document → parse → reconcile → normalize → resolve entities →
//! classify → baseline → anomalies → graph → score → persist → report
//! ```
//!
//! Every stage is a pure function of its input plus the store handle;
//! warnings accumulate across stages and errors never cross the pipeline
//! boundary unwrapped.

pub mod cancel;
pub mod collaborators;
pub mod report;
pub mod runner;

pub use cancel::*;
pub use collaborators::*;
pub use report::*;
pub use runner::*;
