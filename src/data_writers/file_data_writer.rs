//! JSON lines data writer
//!
//! Appends each stored row as one line of JSON to a single file. The whole
//! batch of an `insert_rows` call goes out in one write.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::data_writers::writer::{DataWriter, RowSet};
use crate::db_utils::log_store::StoredLogRow;
use crate::error::StoreResult;
use crate::log_row::LogRow;

pub struct FileDataWriter {
    read_only: AtomicBool,
    path: PathBuf,
}

impl FileDataWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileDataWriter {
            read_only: AtomicBool::new(true),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DataWriter for FileDataWriter {
    fn read_only(&self) -> bool {
        self.read_only.load(Ordering::Relaxed)
    }

    fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }

    async fn insert_rows(&self, rows: Vec<LogRow>, _all_rows: &[LogRow]) -> StoreResult<Vec<LogRow>> {
        if self.read_only() || rows.is_empty() {
            return Ok(rows);
        }

        let mut buf = Vec::new();
        for row in &rows {
            serde_json::to_writer(&mut buf, &StoredLogRow::from(row))?;
            buf.push(b'\n');
        }

        self.ensure_parent().await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buf).await?;
        file.sync_data().await?;

        debug!("Appended {} rows to {:?}", rows.len(), self.path);
        Ok(rows)
    }

    async fn get_rows(&self) -> StoreResult<RowSet> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RowSet::from_stored(Vec::new())),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            records.push(serde_json::from_str::<StoredLogRow>(line)?);
        }
        debug!("Read {} rows from {:?}", records.len(), self.path);
        Ok(RowSet::from_stored(records))
    }

    async fn clear(&self) -> StoreResult<()> {
        self.ensure_parent().await?;
        fs::File::create(&self.path).await?;
        info!("Truncated log file {:?}", self.path);
        Ok(())
    }
}
