//! `scour` — retention-based cleanup of automation run history.
//!
//! The engine walks every persisted record of each selected category
//! (jobs, ad hoc commands, project/inventory updates, management jobs,
//! workflow jobs, notifications), classifies each record as active,
//! protected, recent, or eligible, and permanently deletes the eligible
//! ones inside a single transaction. Derived-state and activity-stream
//! listeners are suppressed for the duration of a run, and a dry-run
//! mode reports the same counts without mutating storage.

pub mod cleanup;
pub mod config;
pub mod models;
pub mod store;

#[cfg(test)]
mod tests;
