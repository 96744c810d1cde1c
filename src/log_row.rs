//! Log row value type
//!
//! A `LogRow` is one structured log entry as it lives in the caller's
//! in-memory buffer. Data writers persist it and hand it back unchanged.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ROW_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRow {
    pub id: String,
    /// Length of the in-memory buffer when this row was added
    pub length_at_insertion: usize,
    pub level: String,
    pub message: String,
    pub time_stamp: DateTime<Local>,
    pub color: String,
}

impl LogRow {
    /// Create a row stamped with the current local time and a fresh id
    pub fn new(level: &str, message: &str) -> Self {
        let time_stamp = Local::now();
        LogRow {
            id: Self::generate_id(&time_stamp),
            length_at_insertion: 0,
            level: level.to_string(),
            message: message.to_string(),
            color: color_for_level(level).to_string(),
            time_stamp,
        }
    }

    pub fn with_length_at_insertion(mut self, length: usize) -> Self {
        self.length_at_insertion = length;
        self
    }

    pub fn with_time_stamp(mut self, time_stamp: DateTime<Local>) -> Self {
        self.time_stamp = time_stamp;
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    // timestamp alone collides when rows are created in the same tick
    fn generate_id(time_stamp: &DateTime<Local>) -> String {
        let seq = NEXT_ROW_SEQ.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{}",
            time_stamp.timestamp_nanos_opt().unwrap_or_default(),
            seq
        )
    }
}

/// Display color used by log viewers for a given level
pub fn color_for_level(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "debug" | "trace" => "grey",
        "info" => "white",
        "warn" | "warning" => "orange",
        "error" => "red",
        _ => "white",
    }
}
