//! In-process backing store
//!
//! Keeps records in a map of vectors guarded by an async mutex. A commit is
//! applied to a copy of the state and only swapped in once every operation
//! succeeded, so a failed transaction leaves nothing behind.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::db_utils::log_store::{LogStore, RecordKey, StoredRecord, WriteOp, WriteTransaction};
use crate::error::{StoreError, StoreResult};

#[derive(Default, Clone)]
struct MemoryState {
    next_key: u64,
    records: HashMap<String, Vec<StoredRecord>>,
}

#[derive(Default)]
pub struct MemoryLogStore {
    state: Mutex<MemoryState>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self, type_name: &str) -> usize {
        let state = self.state.lock().await;
        state.records.get(type_name).map_or(0, Vec::len)
    }
}

fn apply(state: &mut MemoryState, op: &WriteOp) -> StoreResult<()> {
    match op {
        WriteOp::Create { type_name, row } => {
            let records = state.records.entry(type_name.clone()).or_default();
            if records.iter().any(|r| r.row.id == row.id) {
                return Err(StoreError::DuplicateId {
                    type_name: type_name.clone(),
                    id: row.id.clone(),
                });
            }
            records.push(StoredRecord {
                key: RecordKey(state.next_key),
                row: row.clone(),
            });
            state.next_key += 1;
        }
        WriteOp::Delete { type_name, keys } => {
            if let Some(records) = state.records.get_mut(type_name) {
                records.retain(|r| !keys.contains(&r.key));
            }
        }
        WriteOp::DeleteAll { type_name } => {
            state.records.remove(type_name);
        }
    }
    Ok(())
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn objects(&self, type_name: &str) -> StoreResult<Vec<StoredRecord>> {
        let state = self.state.lock().await;
        Ok(state.records.get(type_name).cloned().unwrap_or_default())
    }

    async fn commit(&self, tx: WriteTransaction) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        for op in tx.ops() {
            apply(&mut next, op)?;
        }
        *state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_utils::log_store::{write, StoredLogRow, LOG_ROW_TYPE};
    use crate::log_row::LogRow;

    fn stored(id: &str) -> StoredLogRow {
        StoredLogRow::from(&LogRow::new("debug", id).with_id(id))
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_state_untouched() {
        let store = MemoryLogStore::new();
        let err = write(&store, |tx| {
            tx.create(LOG_ROW_TYPE, stored("x"));
            tx.create(LOG_ROW_TYPE, stored("x"));
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateId { .. }));
        assert_eq!(store.count(LOG_ROW_TYPE).await, 0);
    }

    #[tokio::test]
    async fn test_delete_all_then_create_in_one_commit() {
        let store = MemoryLogStore::new();
        write(&store, |tx| {
            tx.create(LOG_ROW_TYPE, stored("x"));
            tx.create(LOG_ROW_TYPE, stored("y"));
            Ok(())
        })
        .await
        .unwrap();

        write(&store, |tx| {
            tx.delete_all(LOG_ROW_TYPE);
            tx.create(LOG_ROW_TYPE, stored("x"));
            Ok(())
        })
        .await
        .unwrap();

        let records = store.objects(LOG_ROW_TYPE).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].row.id, "x");
    }

    #[tokio::test]
    async fn test_types_are_kept_apart() {
        let store = MemoryLogStore::new();
        write(&store, |tx| {
            tx.create(LOG_ROW_TYPE, stored("x"));
            tx.create("Archived", stored("x"));
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(store.count(LOG_ROW_TYPE).await, 1);
        assert_eq!(store.count("Archived").await, 1);
        assert!(store.objects("Missing").await.unwrap().is_empty());
    }
}
