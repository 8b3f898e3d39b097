//! In-memory record store.
//!
//! Backs the end-to-end tests and doubles as a reference implementation
//! of the storage contracts: transactions are modeled as a full-table
//! checkpoint taken at `begin` and restored on `rollback`, and the
//! mutation listeners append to an observable activity log and bump a
//! recompute counter so suppression is verifiable.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::{MutationListeners, RecordStore, StoreError, StoreResult};
use crate::models::{Category, ParentPointers, RecordSnapshot};

#[derive(Debug, Default, Clone)]
struct Tables {
    records: BTreeMap<(Category, i64), RecordSnapshot>,
    parents: BTreeMap<(Category, i64), ParentPointers>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    checkpoint: Mutex<Option<Tables>>,
    computed_fields_enabled: AtomicBool,
    activity_stream_enabled: AtomicBool,
    activity_entries: RwLock<Vec<String>>,
    recompute_count: AtomicU64,
    list_calls: AtomicU64,
    delete_calls: AtomicU64,
    fail_delete_of: Mutex<Option<(Category, i64)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            computed_fields_enabled: AtomicBool::new(true),
            activity_stream_enabled: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Seed a record. The snapshot's `parent` field is ignored; use
    /// [`MemoryStore::set_parent`] to attach pointers.
    pub fn insert_record(&self, category: Category, mut record: RecordSnapshot) {
        record.parent = None;
        self.tables
            .write()
            .records
            .insert((category, record.id), record);
    }

    /// Attach parent-entity pointers to a seeded record.
    pub fn set_parent(&self, category: Category, record_id: i64, pointers: ParentPointers) {
        self.tables
            .write()
            .parents
            .insert((category, record_id), pointers);
    }

    /// Arm a failure for any deletion of the given record.
    pub fn fail_delete_of(&self, category: Category, record_id: i64) {
        *self.fail_delete_of.lock() = Some((category, record_id));
    }

    pub fn record_count(&self, category: Category) -> usize {
        self.tables
            .read()
            .records
            .keys()
            .filter(|(c, _)| *c == category)
            .count()
    }

    pub fn contains(&self, category: Category, record_id: i64) -> bool {
        self.tables
            .read()
            .records
            .contains_key(&(category, record_id))
    }

    pub fn activity_entry_count(&self) -> usize {
        self.activity_entries.read().len()
    }

    pub fn recompute_count(&self) -> u64 {
        self.recompute_count.load(Ordering::SeqCst)
    }

    pub fn list_call_count(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> u64 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn computed_fields_enabled(&self) -> bool {
        self.computed_fields_enabled.load(Ordering::SeqCst)
    }

    pub fn activity_stream_enabled(&self) -> bool {
        self.activity_stream_enabled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&self) -> StoreResult<()> {
        let mut checkpoint = self.checkpoint.lock();
        if checkpoint.is_some() {
            return Err(StoreError::Internal(
                "transaction already in progress".into(),
            ));
        }
        *checkpoint = Some(self.tables.read().clone());
        Ok(())
    }

    async fn commit(&self) -> StoreResult<()> {
        self.checkpoint
            .lock()
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::Internal("no transaction in progress".into()))
    }

    async fn rollback(&self) -> StoreResult<()> {
        let restored = self
            .checkpoint
            .lock()
            .take()
            .ok_or_else(|| StoreError::Internal("no transaction in progress".into()))?;
        *self.tables.write() = restored;
        Ok(())
    }

    async fn list_records(&self, category: Category) -> StoreResult<Vec<RecordSnapshot>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tables
            .read()
            .records
            .range((category, i64::MIN)..=(category, i64::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn parent_pointers(
        &self,
        category: Category,
        record_id: i64,
    ) -> StoreResult<Option<ParentPointers>> {
        Ok(self
            .tables
            .read()
            .parents
            .get(&(category, record_id))
            .cloned())
    }

    async fn delete_record(&self, category: Category, record_id: i64) -> StoreResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if *self.fail_delete_of.lock() == Some((category, record_id)) {
            return Err(StoreError::Internal("injected delete failure".into()));
        }

        let removed = {
            let mut tables = self.tables.write();
            tables.parents.remove(&(category, record_id));
            tables.records.remove(&(category, record_id))
        };
        if removed.is_none() {
            return Err(StoreError::NotFound);
        }

        if self.activity_stream_enabled.load(Ordering::SeqCst) {
            self.activity_entries
                .write()
                .push(format!("delete {} {}", category, record_id));
        }
        if self.computed_fields_enabled.load(Ordering::SeqCst) {
            self.recompute_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl MutationListeners for MemoryStore {
    fn set_computed_fields_enabled(&self, enabled: bool) {
        self.computed_fields_enabled.store(enabled, Ordering::SeqCst);
    }

    fn set_activity_stream_enabled(&self, enabled: bool) {
        self.activity_stream_enabled.store(enabled, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{RecordDetail, Status};

    fn job(id: i64) -> RecordSnapshot {
        RecordSnapshot {
            id,
            name: format!("job {}", id),
            status: Status::Successful,
            created: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            detail: RecordDetail::Job {
                host_summaries: 0,
                events: 0,
            },
            parent: None,
        }
    }

    #[tokio::test]
    async fn test_rollback_restores_deleted_records() {
        let store = MemoryStore::new();
        store.insert_record(Category::Job, job(1));
        store.insert_record(Category::Job, job(2));

        store.begin().await.unwrap();
        store.delete_record(Category::Job, 1).await.unwrap();
        assert_eq!(store.record_count(Category::Job), 1);

        store.rollback().await.unwrap();
        assert_eq!(store.record_count(Category::Job), 2);
        assert!(store.contains(Category::Job, 1));
    }

    #[tokio::test]
    async fn test_commit_keeps_deletions() {
        let store = MemoryStore::new();
        store.insert_record(Category::Job, job(1));

        store.begin().await.unwrap();
        store.delete_record(Category::Job, 1).await.unwrap();
        store.commit().await.unwrap();
        assert_eq!(store.record_count(Category::Job), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_record_is_not_found() {
        let store = MemoryStore::new();
        store.begin().await.unwrap();
        assert!(matches!(
            store.delete_record(Category::Job, 42).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_listeners_fire_only_when_enabled() {
        let store = MemoryStore::new();
        store.insert_record(Category::Job, job(1));
        store.insert_record(Category::Job, job(2));
        store.begin().await.unwrap();

        store.delete_record(Category::Job, 1).await.unwrap();
        assert_eq!(store.activity_entry_count(), 1);
        assert_eq!(store.recompute_count(), 1);

        store.set_activity_stream_enabled(false);
        store.set_computed_fields_enabled(false);
        store.delete_record(Category::Job, 2).await.unwrap();
        assert_eq!(store.activity_entry_count(), 1);
        assert_eq!(store.recompute_count(), 1);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_category() {
        let store = MemoryStore::new();
        store.insert_record(Category::Job, job(1));
        store.insert_record(
            Category::Notification,
            RecordSnapshot {
                detail: RecordDetail::Notification {
                    kind: "email".into(),
                    sent: 1,
                },
                ..job(1)
            },
        );

        let jobs = store.list_records(Category::Job).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(matches!(jobs[0].detail, RecordDetail::Job { .. }));
    }
}
