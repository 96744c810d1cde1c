//! Store error type shared by every backing store and data writer

use std::fmt::{self, Display, Formatter};

#[derive(Debug)]
pub enum StoreError {
    Sled(sled::Error),
    /// The write was applied but flushing it to disk failed
    Unflushed(sled::Error),
    Serde(serde_json::Error),
    Io(std::io::Error),
    /// A record with the same id already exists for this type
    DuplicateId { type_name: String, id: String },
    /// Stored bytes that do not decode into a record
    Corrupt(String),
    Transaction(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            StoreError::Sled(e) => write!(f, "Sled Error: {}", e),
            StoreError::Unflushed(e) => write!(f, "Applied but not flushed: {}", e),
            StoreError::Serde(e) => write!(f, "Serialization Error: {}", e),
            StoreError::Io(e) => write!(f, "IO Error: {}", e),
            StoreError::DuplicateId { type_name, id } => {
                write!(f, "Duplicate {} id '{}'", type_name, id)
            }
            StoreError::Corrupt(e) => write!(f, "Corrupt Record: {}", e),
            StoreError::Transaction(e) => write!(f, "Transaction Error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sled(e) | StoreError::Unflushed(e) => Some(e),
            StoreError::Serde(e) => Some(e),
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Sled(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
