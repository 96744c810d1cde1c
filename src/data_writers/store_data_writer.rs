//! Data writer backed by a `LogStore`
//!
//! Rows are written inside one store transaction per `insert_rows` call,
//! with their timestamp converted into the store's native time type.
//! Store errors are handed back to the caller as-is.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::data_writers::writer::{DataWriter, RowSet};
use crate::db_utils::log_store::{write, LogStore, StoredLogRow, LOG_ROW_TYPE};
use crate::error::StoreResult;
use crate::log_row::LogRow;

pub struct StoreDataWriter<S: LogStore + ?Sized> {
    read_only: AtomicBool,
    store: Arc<S>,
}

impl<S: LogStore + ?Sized> StoreDataWriter<S> {
    /// Create a writer over `store`. New writers start read-only.
    pub fn new(store: Arc<S>) -> Self {
        StoreDataWriter {
            read_only: AtomicBool::new(true),
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

#[async_trait]
impl<S: LogStore + ?Sized> DataWriter for StoreDataWriter<S> {
    fn read_only(&self) -> bool {
        self.read_only.load(Ordering::Relaxed)
    }

    fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }

    // all_rows is not needed here, every row lives in the store
    async fn insert_rows(&self, rows: Vec<LogRow>, _all_rows: &[LogRow]) -> StoreResult<Vec<LogRow>> {
        if self.read_only() {
            return Ok(rows);
        }
        write(self.store.as_ref(), |tx| {
            for row in &rows {
                tx.create(LOG_ROW_TYPE, StoredLogRow::from(row));
            }
            Ok(())
        })
        .await?;
        debug!("Inserted {} rows", rows.len());
        Ok(rows)
    }

    async fn get_rows(&self) -> StoreResult<RowSet> {
        let records = self.store.objects(LOG_ROW_TYPE).await?;
        debug!("Read {} rows", records.len());
        Ok(RowSet::from_stored(records.into_iter().map(|r| r.row).collect()))
    }

    async fn clear(&self) -> StoreResult<()> {
        write(self.store.as_ref(), |tx| {
            tx.delete_all(LOG_ROW_TYPE);
            Ok(())
        })
        .await?;
        debug!("Cleared all rows");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_utils::log_store::{StoredRecord, WriteTransaction};
    use crate::db_utils::memory_log_store::MemoryLogStore;
    use crate::db_utils::sled_log_store::SledLogStore;
    use crate::error::StoreError;
    use chrono::{Local, TimeZone};
    use std::sync::atomic::AtomicUsize;

    fn row(id: &str) -> LogRow {
        LogRow::new("info", &format!("message {}", id)).with_id(id)
    }

    fn sled_writer() -> StoreDataWriter<SledLogStore> {
        StoreDataWriter::new(Arc::new(SledLogStore::memory().unwrap()))
    }

    /// Store that counts commits and can be told to fail them
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryLogStore,
        commits: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl LogStore for CountingStore {
        async fn objects(&self, type_name: &str) -> StoreResult<Vec<StoredRecord>> {
            self.inner.objects(type_name).await
        }

        async fn commit(&self, tx: WriteTransaction) -> StoreResult<()> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Transaction("disk full".to_string()));
            }
            self.inner.commit(tx).await
        }
    }

    /// Store where another writer's row lands right before each commit
    #[derive(Default)]
    struct InterleavingStore {
        inner: MemoryLogStore,
        landed: AtomicUsize,
    }

    #[async_trait]
    impl LogStore for InterleavingStore {
        async fn objects(&self, type_name: &str) -> StoreResult<Vec<StoredRecord>> {
            self.inner.objects(type_name).await
        }

        async fn commit(&self, tx: WriteTransaction) -> StoreResult<()> {
            let n = self.landed.fetch_add(1, Ordering::SeqCst);
            write(&self.inner, |other| {
                other.create(LOG_ROW_TYPE, StoredLogRow::from(&row(&format!("late-{}", n))));
                Ok(())
            })
            .await?;
            self.inner.commit(tx).await
        }
    }

    #[tokio::test]
    async fn test_clear_removes_rows_written_just_before_it() {
        let store = Arc::new(InterleavingStore::default());
        let writer = StoreDataWriter::new(store.clone());
        writer.set_read_only(false);
        writer.insert_rows(vec![row("a")], &[]).await.unwrap();
        assert_eq!(writer.get_rows().await.unwrap().len(), 2);

        writer.clear().await.unwrap();
        assert!(writer.get_rows().await.unwrap().is_empty());
        assert_eq!(store.landed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_is_a_single_commit() {
        let store = Arc::new(CountingStore::default());
        let writer = StoreDataWriter::new(store.clone());
        writer.clear().await.unwrap();
        assert_eq!(store.commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pre_epoch_timestamps_round_trip_through_store() {
        let writer = sled_writer();
        writer.set_read_only(false);

        let when = Local.timestamp_opt(-86_400, 500).unwrap();
        let rows = vec![row("old").with_time_stamp(when)];
        writer.insert_rows(rows.clone(), &[]).await.unwrap();

        let back = writer.get_rows().await.unwrap().into_vec();
        assert_eq!(back, rows);
        assert_eq!(back[0].time_stamp, when);
    }

    #[tokio::test]
    async fn test_starts_read_only() {
        let writer = sled_writer();
        assert!(writer.read_only());
        writer.set_read_only(false);
        assert!(!writer.read_only());
    }

    #[tokio::test]
    async fn test_read_only_echoes_without_touching_store() {
        let store = Arc::new(CountingStore::default());
        let writer = StoreDataWriter::new(store.clone());

        let rows = vec![row("a"), row("b")];
        let echoed = writer.insert_rows(rows.clone(), &[]).await.unwrap();

        assert_eq!(echoed, rows);
        assert_eq!(store.commits.load(Ordering::SeqCst), 0);
        assert!(writer.get_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_then_get_keeps_order() {
        let writer = sled_writer();
        writer.set_read_only(false);

        let rows = vec![row("a"), row("b")];
        let inserted = writer.insert_rows(rows.clone(), &[]).await.unwrap();
        assert_eq!(inserted, rows);

        let ids: Vec<String> = writer.get_rows().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_timestamps_round_trip_through_store() {
        let writer = sled_writer();
        writer.set_read_only(false);

        let when = Local.timestamp_opt(1_650_000_000, 987_654_321).unwrap();
        let rows = vec![row("t").with_time_stamp(when).with_length_at_insertion(12)];
        writer.insert_rows(rows.clone(), &[]).await.unwrap();

        let back = writer.get_rows().await.unwrap().into_vec();
        assert_eq!(back, rows);
        assert_eq!(back[0].time_stamp, when);
    }

    #[tokio::test]
    async fn test_each_insert_adds_exactly_its_rows() {
        let store = Arc::new(SledLogStore::memory().unwrap());
        let writer = StoreDataWriter::new(store.clone());
        writer.set_read_only(false);

        writer.insert_rows(vec![row("1"), row("2"), row("3")], &[]).await.unwrap();
        assert_eq!(store.count(LOG_ROW_TYPE).unwrap(), 3);
        assert!(Arc::ptr_eq(writer.store(), &store));

        let existing = writer.get_rows().await.unwrap().into_vec();
        writer.insert_rows(vec![row("4")], &existing).await.unwrap();
        assert_eq!(writer.get_rows().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_toggling_read_only_mid_session() {
        let writer = sled_writer();

        writer.set_read_only(true);
        writer.insert_rows(vec![row("x")], &[]).await.unwrap();
        assert!(writer.get_rows().await.unwrap().is_empty());

        writer.set_read_only(false);
        writer.insert_rows(vec![row("x")], &[]).await.unwrap();
        let rows = writer.get_rows().await.unwrap().into_vec();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "x");
    }

    #[tokio::test]
    async fn test_clear_empties_and_is_idempotent() {
        let writer = sled_writer();
        writer.set_read_only(false);
        writer.insert_rows(vec![row("a"), row("b")], &[]).await.unwrap();

        writer.clear().await.unwrap();
        assert!(writer.get_rows().await.unwrap().is_empty());

        writer.clear().await.unwrap();
        assert!(writer.get_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(CountingStore::default());
        let writer = StoreDataWriter::new(store.clone());
        writer.set_read_only(false);
        store.fail.store(true, Ordering::SeqCst);

        let err = writer.insert_rows(vec![row("a")], &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::Transaction(_)));
        assert_eq!(store.commits.load(Ordering::SeqCst), 1);
        assert!(writer.get_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejects_batch() {
        let writer = sled_writer();
        writer.set_read_only(false);
        writer.insert_rows(vec![row("a")], &[]).await.unwrap();

        let result = writer.insert_rows(vec![row("b"), row("a")], &[]).await;
        assert!(matches!(result, Err(StoreError::DuplicateId { .. })));
        assert_eq!(writer.get_rows().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_hooks_are_passive() {
        let store = Arc::new(CountingStore::default());
        let writer = StoreDataWriter::new(store.clone());
        writer.set_read_only(false);

        let r = row("hook");
        writer.log_row_created(&r);
        assert_eq!(writer.append_to_log_row(r.clone()), r);
        writer.initial_data_read(&[r]).await;
        assert_eq!(store.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_works_behind_dyn_store() {
        let store: Arc<dyn LogStore> = Arc::new(MemoryLogStore::new());
        let writer: Arc<dyn DataWriter> = Arc::new(StoreDataWriter::new(store));
        writer.set_read_only(false);

        writer.insert_rows(vec![row("a"), row("b")], &[]).await.unwrap();
        let ids: Vec<String> = writer.get_rows().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
