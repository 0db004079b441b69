// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory sink, used by tests and demos to observe emissions.

use std::sync::Mutex;

use crate::error::SinkError;

use super::{CallRecord, Sink};

/// Sink that retains every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<CallRecord>>,
}

impl MemorySink {
    /// Create an empty memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records emitted so far.
    pub fn records(&self) -> Vec<CallRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Number of records emitted so far.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Check if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all retained records.
    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }
}

impl Sink for MemorySink {
    fn emit(&self, record: &CallRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Unavailable("record buffer lock poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retains_records_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.emit(&CallRecord::success(json!({"n": 1}), json!("a")))
            .unwrap();
        sink.emit(&CallRecord::success(json!({"n": 2}), json!("b")))
            .unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].query, json!({"n": 1}));
        assert_eq!(records[1].query, json!({"n": 2}));

        sink.clear();
        assert!(sink.is_empty());
    }
}
