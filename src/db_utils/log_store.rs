//! Backing store interface
//!
//! Data writers only ever talk to a store through this narrow surface:
//! query the records of a type, and commit a write transaction made of
//! create/delete operations. Any embedded or in-process database that can
//! apply a transaction atomically can sit behind it.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::error::StoreResult;
use crate::log_row::LogRow;

/// Record type name under which log rows are persisted
pub const LOG_ROW_TYPE: &str = "LogRow";

/// Persisted shape of a `LogRow`.
///
/// The timestamp is kept in the store's native temporal type
/// (`SystemTime`) under `_timeStamp`, encoded as signed seconds plus
/// nanoseconds so instants before 1970 survive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLogRow {
    pub id: String,
    pub length_at_insertion: usize,
    pub level: String,
    pub message: String,
    #[serde(rename = "_timeStamp", with = "signed_time")]
    pub time_stamp: SystemTime,
    pub color: String,
}

impl From<&LogRow> for StoredLogRow {
    fn from(row: &LogRow) -> Self {
        StoredLogRow {
            id: row.id.clone(),
            length_at_insertion: row.length_at_insertion,
            level: row.level.clone(),
            message: row.message.clone(),
            time_stamp: SystemTime::from(row.time_stamp),
            color: row.color.clone(),
        }
    }
}

impl From<StoredLogRow> for LogRow {
    fn from(stored: StoredLogRow) -> Self {
        LogRow {
            id: stored.id,
            length_at_insertion: stored.length_at_insertion,
            level: stored.level,
            message: stored.message,
            time_stamp: DateTime::<Local>::from(stored.time_stamp),
            color: stored.color,
        }
    }
}

/// `SystemTime` as `{ secs, nanos }` with `secs` signed and `nanos` in
/// `0..1_000_000_000`, i.e. floored to the second.
mod signed_time {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    #[derive(Serialize, Deserialize)]
    struct SignedTime {
        secs: i64,
        nanos: u32,
    }

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => SignedTime {
                secs: after.as_secs() as i64,
                nanos: after.subsec_nanos(),
            },
            Err(e) => {
                let before = e.duration();
                let mut secs = -(before.as_secs() as i64);
                let mut nanos = before.subsec_nanos();
                if nanos > 0 {
                    secs -= 1;
                    nanos = 1_000_000_000 - nanos;
                }
                SignedTime { secs, nanos }
            }
        };
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let SignedTime { secs, nanos } = SignedTime::deserialize(deserializer)?;
        if nanos >= 1_000_000_000 {
            return Err(D::Error::custom(format!("nanos out of range: {}", nanos)));
        }
        let whole = Duration::from_secs(secs.unsigned_abs());
        let time = if secs >= 0 {
            UNIX_EPOCH.checked_add(whole)
        } else {
            UNIX_EPOCH.checked_sub(whole)
        };
        time.and_then(|t| t.checked_add(Duration::from_nanos(nanos as u64)))
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}s", secs)))
    }
}

/// Store-assigned key. Keys grow monotonically, so key order is insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey(pub u64);

/// A persisted record together with the key the store filed it under
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: RecordKey,
    pub row: StoredLogRow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Create {
        type_name: String,
        row: StoredLogRow,
    },
    Delete {
        type_name: String,
        keys: Vec<RecordKey>,
    },
    /// Every record of the type that exists when the commit applies
    DeleteAll {
        type_name: String,
    },
}

/// Operations collected inside one scoped write.
///
/// Nothing reaches the store until the transaction is committed, and a
/// store applies a committed transaction all-or-nothing.
#[derive(Debug, Default)]
pub struct WriteTransaction {
    ops: Vec<WriteOp>,
}

impl WriteTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a new record of `type_name`
    pub fn create(&mut self, type_name: &str, row: StoredLogRow) {
        self.ops.push(WriteOp::Create {
            type_name: type_name.to_string(),
            row,
        });
    }

    /// Queue removal of a collection previously returned by `objects`
    pub fn delete(&mut self, type_name: &str, records: &[StoredRecord]) {
        if records.is_empty() {
            return;
        }
        self.ops.push(WriteOp::Delete {
            type_name: type_name.to_string(),
            keys: records.iter().map(|r| r.key).collect(),
        });
    }

    /// Queue removal of every record of `type_name`, resolved by the store
    /// at commit time
    pub fn delete_all(&mut self, type_name: &str) {
        self.ops.push(WriteOp::DeleteAll {
            type_name: type_name.to_string(),
        });
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[async_trait]
pub trait LogStore: Send + Sync {
    /// All live records of `type_name`, in insertion order
    async fn objects(&self, type_name: &str) -> StoreResult<Vec<StoredRecord>>;

    /// Apply every queued operation atomically
    async fn commit(&self, tx: WriteTransaction) -> StoreResult<()>;
}

/// Run `body` inside a scoped write transaction and commit it.
///
/// If `body` fails the transaction is dropped without touching the store.
pub async fn write<S, F>(store: &S, body: F) -> StoreResult<()>
where
    S: LogStore + ?Sized,
    F: FnOnce(&mut WriteTransaction) -> StoreResult<()>,
{
    let mut tx = WriteTransaction::new();
    body(&mut tx)?;
    if tx.is_empty() {
        return Ok(());
    }
    store.commit(tx).await
}
