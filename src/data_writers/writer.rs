//! DataWriter trait and types
//!
//! This module defines the common interface every log storage adapter
//! implements, whether it keeps rows in memory, in a file or in an
//! embedded database.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db_utils::log_store::StoredLogRow;
use crate::error::StoreResult;
use crate::log_row::LogRow;

/// Writer type selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriterType {
    /// Embedded sled database
    #[default]
    Sled,
    /// Process memory only
    Memory,
    /// Newline-delimited JSON file
    File,
}

#[derive(Debug)]
enum RowSource {
    Stored(Vec<StoredLogRow>),
    Rows(Vec<LogRow>),
}

/// Snapshot of persisted rows returned by `get_rows`.
///
/// Stored records are only converted back into `LogRow`s while iterating,
/// and `iter` can be called any number of times.
#[derive(Debug)]
pub struct RowSet {
    source: RowSource,
}

impl RowSet {
    pub fn from_stored(records: Vec<StoredLogRow>) -> Self {
        RowSet {
            source: RowSource::Stored(records),
        }
    }

    pub fn from_rows(rows: Vec<LogRow>) -> Self {
        RowSet {
            source: RowSource::Rows(rows),
        }
    }

    pub fn len(&self) -> usize {
        match &self.source {
            RowSource::Stored(records) => records.len(),
            RowSource::Rows(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = LogRow> + '_> {
        match &self.source {
            RowSource::Stored(records) => Box::new(records.iter().cloned().map(LogRow::from)),
            RowSource::Rows(rows) => Box::new(rows.iter().cloned()),
        }
    }

    pub fn into_vec(self) -> Vec<LogRow> {
        match self.source {
            RowSource::Stored(records) => records.into_iter().map(LogRow::from).collect(),
            RowSource::Rows(rows) => rows,
        }
    }
}

impl IntoIterator for RowSet {
    type Item = LogRow;
    type IntoIter = IntoRows;

    fn into_iter(self) -> Self::IntoIter {
        let inner = match self.source {
            RowSource::Stored(records) => IntoRowsInner::Stored(records.into_iter()),
            RowSource::Rows(rows) => IntoRowsInner::Rows(rows.into_iter()),
        };
        IntoRows { inner }
    }
}

enum IntoRowsInner {
    Stored(std::vec::IntoIter<StoredLogRow>),
    Rows(std::vec::IntoIter<LogRow>),
}

/// Owning iterator over a `RowSet`, converting one record per `next`
pub struct IntoRows {
    inner: IntoRowsInner,
}

impl Iterator for IntoRows {
    type Item = LogRow;

    fn next(&mut self) -> Option<LogRow> {
        match &mut self.inner {
            IntoRowsInner::Stored(records) => records.next().map(LogRow::from),
            IntoRowsInner::Rows(rows) => rows.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            IntoRowsInner::Stored(records) => records.size_hint(),
            IntoRowsInner::Rows(rows) => rows.size_hint(),
        }
    }
}

impl ExactSizeIterator for IntoRows {}

/// Common interface for log storage adapters
#[async_trait]
pub trait DataWriter: Send + Sync {
    fn read_only(&self) -> bool;

    /// Enable or disable writes. Takes effect for the next call.
    fn set_read_only(&self, read_only: bool);

    /// Persist `rows` unless read-only, and echo them back.
    ///
    /// `all_rows` is the caller's full buffer, for adapters that need it to
    /// manage capacity.
    async fn insert_rows(&self, rows: Vec<LogRow>, all_rows: &[LogRow]) -> StoreResult<Vec<LogRow>>;

    /// Every persisted row, in insertion order
    async fn get_rows(&self) -> StoreResult<RowSet>;

    /// Remove every persisted row
    async fn clear(&self) -> StoreResult<()>;

    fn log_row_created(&self, _row: &LogRow) {}

    fn append_to_log_row(&self, row: LogRow) -> LogRow {
        row
    }

    async fn initial_data_read(&self, _rows: &[LogRow]) {}
}
