//! Memory-only data writer
//!
//! Keeps rows in process memory, optionally capped to the most recent
//! `max_rows`. Nothing survives a restart.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use crate::data_writers::writer::{DataWriter, RowSet};
use crate::error::StoreResult;
use crate::log_row::LogRow;

pub struct MemoryDataWriter {
    read_only: AtomicBool,
    max_rows: Option<usize>,
    rows: Mutex<Vec<LogRow>>,
    created: AtomicUsize,
}

impl MemoryDataWriter {
    pub fn new(max_rows: Option<usize>) -> Self {
        MemoryDataWriter {
            read_only: AtomicBool::new(true),
            max_rows,
            rows: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// Number of rows reported through `log_row_created`
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    fn trim(&self, buffer: &mut Vec<LogRow>, total: usize) {
        if let Some(max) = self.max_rows {
            let overflow = total.saturating_sub(max).min(buffer.len());
            if overflow > 0 {
                buffer.drain(..overflow);
                debug!("Evicted {} rows over capacity {}", overflow, max);
            }
        }
    }
}

impl Default for MemoryDataWriter {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl DataWriter for MemoryDataWriter {
    fn read_only(&self) -> bool {
        self.read_only.load(Ordering::Relaxed)
    }

    fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }

    /// `all_rows` plus `rows` is the caller's buffer after this insert; it
    /// decides how many of the oldest rows to evict.
    async fn insert_rows(&self, rows: Vec<LogRow>, all_rows: &[LogRow]) -> StoreResult<Vec<LogRow>> {
        if self.read_only() {
            return Ok(rows);
        }
        let mut buffer = self.rows.lock().await;
        // the caller's view can lag behind ours
        let total = (all_rows.len() + rows.len()).max(buffer.len() + rows.len());
        buffer.extend(rows.iter().cloned());
        self.trim(&mut buffer, total);
        debug!("Buffered {} rows ({} held)", rows.len(), buffer.len());
        Ok(rows)
    }

    async fn get_rows(&self) -> StoreResult<RowSet> {
        let buffer = self.rows.lock().await;
        Ok(RowSet::from_rows(buffer.clone()))
    }

    async fn clear(&self) -> StoreResult<()> {
        self.rows.lock().await.clear();
        Ok(())
    }

    fn log_row_created(&self, _row: &LogRow) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    async fn initial_data_read(&self, rows: &[LogRow]) {
        let mut buffer = self.rows.lock().await;
        buffer.clear();
        buffer.extend(rows.iter().cloned());
        let total = buffer.len();
        self.trim(&mut buffer, total);
    }
}
