use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionResult, Transactional};
use sled::{Db, Tree};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::db_utils::log_store::{LogStore, RecordKey, StoredLogRow, StoredRecord, WriteOp, WriteTransaction};
use crate::error::{StoreError, StoreResult};

/// 基于Sled的日志行存储
///
/// Every record type gets two trees: the records themselves, keyed by a
/// big-endian id from `generate_id` so that iteration follows insertion
/// order, and an `id -> key` index that keeps row ids unique.
///
/// Commits are serialised through `commit_lock`. sled transactions cannot
/// scan a tree, so `DeleteAll` reads the current keys under that lock just
/// before the transaction runs; no other commit can land in between.
#[derive(Clone)]
pub struct SledLogStore {
    db: Db,
    commit_lock: Arc<Mutex<()>>,
}

impl SledLogStore {
    /// 打开（或创建）指定路径下的数据库
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path.as_ref())?;
        info!("Opened sled log store at {:?}", path.as_ref());
        Ok(Self::with_db(db))
    }

    /// 使用已经打开的数据库实例
    pub fn with_db(db: Db) -> Self {
        SledLogStore {
            db,
            commit_lock: Arc::new(Mutex::new(())),
        }
    }

    /// 使用临时数据库创建实例（用于测试）
    pub fn memory() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::with_db(db))
    }

    fn records_tree(&self, type_name: &str) -> StoreResult<Tree> {
        Ok(self.db.open_tree(type_name)?)
    }

    fn index_tree(&self, type_name: &str) -> StoreResult<Tree> {
        Ok(self.db.open_tree(format!("{}__id", type_name))?)
    }

    /// 获取某类型的记录数量
    pub fn count(&self, type_name: &str) -> StoreResult<usize> {
        Ok(self.records_tree(type_name)?.len())
    }
}

fn decode_key(bytes: &[u8]) -> StoreResult<RecordKey> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("record key of {} bytes", bytes.len())))?;
    Ok(RecordKey(u64::from_be_bytes(raw)))
}

fn abort(err: StoreError) -> ConflictableTransactionError<StoreError> {
    ConflictableTransactionError::Abort(err)
}

fn type_name_of(op: &WriteOp) -> &str {
    match op {
        WriteOp::Create { type_name, .. }
        | WriteOp::Delete { type_name, .. }
        | WriteOp::DeleteAll { type_name } => type_name.as_str(),
    }
}

#[async_trait]
impl LogStore for SledLogStore {
    async fn objects(&self, type_name: &str) -> StoreResult<Vec<StoredRecord>> {
        let mut records = Vec::new();
        for item in self.records_tree(type_name)?.iter() {
            let (key_bytes, value_bytes) = item?;
            let row: StoredLogRow = serde_json::from_slice(&value_bytes)?;
            records.push(StoredRecord {
                key: decode_key(&key_bytes)?,
                row,
            });
        }
        Ok(records)
    }

    /// Applies the transaction, then flushes. A flush failure comes back as
    /// `StoreError::Unflushed`: the operations are applied at that point.
    async fn commit(&self, tx: WriteTransaction) -> StoreResult<()> {
        if tx.is_empty() {
            return Ok(());
        }
        let _guard = self.commit_lock.lock().await;

        // trees are laid out as [records, index] pairs, one pair per type
        let mut type_names: Vec<&str> = Vec::new();
        for op in tx.ops() {
            let name = type_name_of(op);
            if !type_names.contains(&name) {
                type_names.push(name);
            }
        }
        let mut trees = Vec::with_capacity(type_names.len() * 2);
        for name in &type_names {
            trees.push(self.records_tree(name)?);
            trees.push(self.index_tree(name)?);
        }
        let slot = |name: &str| type_names.iter().position(|n| *n == name).unwrap_or_default() * 2;

        let mut existing: HashMap<&str, Vec<[u8; 8]>> = HashMap::new();
        for op in tx.ops() {
            if let WriteOp::DeleteAll { type_name } = op {
                if existing.contains_key(type_name.as_str()) {
                    continue;
                }
                let mut keys = Vec::new();
                for key in trees[slot(type_name.as_str())].iter().keys() {
                    keys.push(decode_key(&key?)?.0.to_be_bytes());
                }
                existing.insert(type_name.as_str(), keys);
            }
        }

        let result: TransactionResult<(), StoreError> = trees.as_slice().transaction(|view| {
            let mut created: HashMap<&str, Vec<[u8; 8]>> = HashMap::new();
            for op in tx.ops() {
                let type_name = type_name_of(op);
                let base = slot(type_name);
                let (records, index) = (&view[base], &view[base + 1]);
                let mut doomed: Vec<[u8; 8]> = Vec::new();
                match op {
                    WriteOp::Create { row, .. } => {
                        if index.get(row.id.as_bytes())?.is_some() {
                            return Err(abort(StoreError::DuplicateId {
                                type_name: type_name.to_string(),
                                id: row.id.clone(),
                            }));
                        }
                        let value = serde_json::to_vec(row).map_err(|e| abort(e.into()))?;
                        let key = records.generate_id()?.to_be_bytes();
                        records.insert(&key[..], value)?;
                        index.insert(row.id.as_bytes(), &key[..])?;
                        created.entry(type_name).or_default().push(key);
                    }
                    WriteOp::Delete { keys, .. } => {
                        doomed.extend(keys.iter().map(|k| k.0.to_be_bytes()));
                    }
                    WriteOp::DeleteAll { .. } => {
                        doomed.extend(existing.get(type_name).into_iter().flatten().copied());
                        doomed.extend(created.remove(type_name).unwrap_or_default());
                    }
                }
                for key in doomed {
                    if let Some(old) = records.remove(&key[..])? {
                        let row: StoredLogRow =
                            serde_json::from_slice(&old).map_err(|e| abort(e.into()))?;
                        index.remove(row.id.as_bytes())?;
                    }
                }
            }
            Ok(())
        });

        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(StoreError::Sled(e)),
        }

        self.db.flush_async().await.map_err(StoreError::Unflushed)?;
        Ok(())
    }
}
