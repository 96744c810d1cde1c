//! Configuration module for log data writers
//!
//! Selects which storage adapter to build and where it keeps its data.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::data_writers::file_data_writer::FileDataWriter;
use crate::data_writers::memory_data_writer::MemoryDataWriter;
use crate::data_writers::store_data_writer::StoreDataWriter;
use crate::data_writers::writer::{DataWriter, WriterType};
use crate::db_utils::sled_log_store::SledLogStore;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Writer type: "sled" (default), "memory" or "file"
    #[serde(default)]
    pub writer_type: WriterType,
    /// Database directory (sled) or JSON lines file (file). Unused for memory.
    #[serde(default = "default_path")]
    pub path: String,
    /// Writers start read-only unless told otherwise
    #[serde(default = "default_read_only")]
    pub read_only: bool,
    /// Capacity of the memory writer
    #[serde(default)]
    pub max_rows: Option<usize>,
}

fn default_path() -> String {
    "log_rows.db".to_string()
}

fn default_read_only() -> bool {
    true
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            writer_type: WriterType::default(),
            path: default_path(),
            read_only: default_read_only(),
            max_rows: None,
        }
    }
}

impl WriterConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .context(format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: WriterConfig = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;
        Ok(config)
    }
}

/// Build the data writer described by `config`
pub fn build_writer(config: &WriterConfig) -> Result<Arc<dyn DataWriter>> {
    let writer: Arc<dyn DataWriter> = match config.writer_type {
        WriterType::Sled => {
            let store = SledLogStore::open(&config.path)
                .context(format!("Failed to open sled store: {}", config.path))?;
            Arc::new(StoreDataWriter::new(Arc::new(store)))
        }
        WriterType::Memory => Arc::new(MemoryDataWriter::new(config.max_rows)),
        WriterType::File => Arc::new(FileDataWriter::new(&config.path)),
    };
    writer.set_read_only(config.read_only);
    Ok(writer)
}
