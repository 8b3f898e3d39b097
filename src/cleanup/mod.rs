//! The retention cleanup engine.
//!
//! Given a retention horizon and a category selection, the engine walks
//! every record of each selected category, classifies it as active,
//! protected, recent, or eligible, and deletes the eligible ones inside
//! a single transaction with mutation listeners suppressed. Dry-run mode
//! produces the same classification without touching storage.

mod cutoff;
mod engine;
mod error;
mod evaluate;
mod policy;

pub use cutoff::{MAX_RETENTION_DAYS, retention_cutoff};
pub use engine::{CategoryReport, RunConfig, RunReport, run, run_at};
pub use error::CleanupError;
pub use evaluate::{Decision, evaluate};
pub use policy::Policy;
