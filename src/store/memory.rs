//! In-memory store for interaction records.
//!
//! Stores records in a concurrent map. Suitable for tests and single-process
//! deployments where losing the log on restart is acceptable.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, VolleyError};
use crate::request::RequestId;

use super::{InteractionRecord, InteractionStore, RecordQuery};

/// In-memory implementation of `InteractionStore`.
///
/// Enforces the same uniqueness constraint on `request_id` as the SQLite
/// store, so recorder behavior is identical across backends.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<RequestId, InteractionRecord>>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl InteractionStore for InMemoryStore {
    async fn insert(&self, record: &InteractionRecord) -> Result<()> {
        let mut records = self.records.write();

        if records.contains_key(&record.request_id) {
            return Err(VolleyError::Duplicate(record.request_id));
        }

        records.insert(record.request_id, record.clone());
        Ok(())
    }

    async fn list(&self, query: &RecordQuery) -> Result<Vec<InteractionRecord>> {
        let records = self.records.read();

        let mut matching: Vec<InteractionRecord> = records
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        matching.sort_by_key(|record| record.created_at);

        Ok(matching)
    }
}
