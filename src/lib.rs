//! Log Data Writers Library
//!
//! Pluggable storage adapters for log rows. Every adapter implements
//! [`DataWriter`]; the store-backed one talks to any [`LogStore`], with
//! [`SledLogStore`] as the embedded database and [`MemoryLogStore`] as an
//! in-process stand-in.

pub mod config;
pub mod error;
pub mod log_row;

pub mod db_utils {
    pub mod log_store;
    pub mod memory_log_store;
    pub mod sled_log_store;
}

pub mod data_writers {
    pub mod file_data_writer;
    pub mod memory_data_writer;
    pub mod store_data_writer;
    pub mod writer;
}

pub use crate::config::{build_writer, WriterConfig};
pub use crate::data_writers::file_data_writer::FileDataWriter;
pub use crate::data_writers::memory_data_writer::MemoryDataWriter;
pub use crate::data_writers::store_data_writer::StoreDataWriter;
pub use crate::data_writers::writer::{DataWriter, IntoRows, RowSet, WriterType};
pub use crate::db_utils::log_store::{write, LogStore, StoredLogRow, StoredRecord, WriteTransaction, LOG_ROW_TYPE};
pub use crate::db_utils::memory_log_store::MemoryLogStore;
pub use crate::db_utils::sled_log_store::SledLogStore;
pub use crate::error::{StoreError, StoreResult};
pub use crate::log_row::LogRow;
