//! Storage contracts the cleanup engine runs against, plus the two
//! shipped backends.
//!
//! The engine never talks to a database directly; it goes through
//! [`RecordStore`] for enumeration, parent lookups and deletion, and
//! through [`MutationListeners`] to suspend derived-state recomputation
//! and activity-stream recording while it bulk-deletes.

mod error;
mod memory;
mod sqlite;

use async_trait::async_trait;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{Category, ParentPointers, RecordSnapshot};

/// Access to the persisted run history.
///
/// `begin`/`commit`/`rollback` scope one transaction over an entire
/// cleanup run; the engine issues every other call between `begin` and
/// the terminal `commit` or `rollback`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open the transaction wrapping a cleanup run.
    async fn begin(&self) -> StoreResult<()>;

    /// Commit the run's transaction.
    async fn commit(&self) -> StoreResult<()>;

    /// Roll the run's transaction back, undoing every deletion.
    async fn rollback(&self) -> StoreResult<()>;

    /// Enumerate every record of a category, with no storage-side
    /// eligibility filtering. Returned snapshots have `parent: None`.
    async fn list_records(&self, category: Category) -> StoreResult<Vec<RecordSnapshot>>;

    /// Look up the parent entity's update pointers for a record, or
    /// `None` when the record has no parent entity.
    async fn parent_pointers(
        &self,
        category: Category,
        record_id: i64,
    ) -> StoreResult<Option<ParentPointers>>;

    /// Permanently delete a record together with its dependent children
    /// (events, host summaries) as one atomic unit.
    async fn delete_record(&self, category: Category, record_id: i64) -> StoreResult<()>;
}

/// Listeners that react to record mutation: recomputation of derived
/// fields on parent entities, and activity-stream entries per deletion.
///
/// Both are wasted work during a bulk cleanup, so the engine suspends
/// them for the duration of a run via [`SuppressListeners`].
pub trait MutationListeners: Send + Sync {
    fn set_computed_fields_enabled(&self, enabled: bool);
    fn set_activity_stream_enabled(&self, enabled: bool);
}

/// Scoped suppression of both mutation listeners.
///
/// Disables the listeners on construction and re-enables them when
/// dropped, so every exit path out of a run, error paths included,
/// restores them.
pub struct SuppressListeners<'a> {
    listeners: &'a dyn MutationListeners,
}

impl<'a> SuppressListeners<'a> {
    pub fn new(listeners: &'a dyn MutationListeners) -> Self {
        listeners.set_computed_fields_enabled(false);
        listeners.set_activity_stream_enabled(false);
        Self { listeners }
    }
}

impl Drop for SuppressListeners<'_> {
    fn drop(&mut self) {
        self.listeners.set_computed_fields_enabled(true);
        self.listeners.set_activity_stream_enabled(true);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    struct FlagListeners {
        computed: AtomicBool,
        activity: AtomicBool,
    }

    impl FlagListeners {
        fn new() -> Self {
            Self {
                computed: AtomicBool::new(true),
                activity: AtomicBool::new(true),
            }
        }
    }

    impl MutationListeners for FlagListeners {
        fn set_computed_fields_enabled(&self, enabled: bool) {
            self.computed.store(enabled, Ordering::SeqCst);
        }

        fn set_activity_stream_enabled(&self, enabled: bool) {
            self.activity.store(enabled, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_guard_disables_and_restores() {
        let listeners = FlagListeners::new();
        {
            let _guard = SuppressListeners::new(&listeners);
            assert!(!listeners.computed.load(Ordering::SeqCst));
            assert!(!listeners.activity.load(Ordering::SeqCst));
        }
        assert!(listeners.computed.load(Ordering::SeqCst));
        assert!(listeners.activity.load(Ordering::SeqCst));
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let listeners = FlagListeners::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = SuppressListeners::new(&listeners);
            panic!("mid-run failure");
        }));
        assert!(result.is_err());
        assert!(listeners.computed.load(Ordering::SeqCst));
        assert!(listeners.activity.load(Ordering::SeqCst));
    }
}
