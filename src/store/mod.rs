//! Persistence for interaction records.
//!
//! The `InteractionStore` trait abstracts the append-only interaction log.
//! Implementations are internally synchronized: an insert either stores the
//! full record or nothing.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::request::{GenerationKind, Outcome, RequestId};

pub mod memory;
pub mod sqlite;

/// A recorded interaction: the join of a request and its terminal result,
/// plus derived fields. Append-only; never mutated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// The request this record belongs to. At most one record per request.
    pub request_id: RequestId,

    /// Opaque anonymized identifier of the submitting user.
    pub user_ref: String,

    pub kind: GenerationKind,

    pub prompt: String,

    /// Theme tag derived from the prompt.
    pub theme_tag: String,

    /// Terminal classification of the request.
    pub outcome: Outcome,

    /// Latency of the final attempt in milliseconds.
    pub latency_ms: u64,

    /// Opaque reference to the generated payload, when the request succeeded.
    pub payload_ref: Option<String>,

    /// Error detail for non-success outcomes.
    pub error: Option<String>,

    /// Number of outbound calls made for the request.
    pub attempts: u32,

    /// When the record was appended.
    pub created_at: DateTime<Utc>,
}

/// Filter for reading back interaction records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// Restrict to a single generation kind.
    pub kind: Option<GenerationKind>,

    /// Only records created at or after this instant.
    pub since: Option<DateTime<Utc>>,

    /// Only records created strictly before this instant.
    pub until: Option<DateTime<Utc>>,
}

/// Storage trait for the append-only interaction log.
pub trait InteractionStore: Send + Sync {
    /// Append a record atomically.
    ///
    /// # Errors
    /// - `Duplicate` if a record for the same request ID already exists
    /// - `Storage` if the persistence layer cannot be reached
    fn insert(&self, record: &InteractionRecord) -> impl Future<Output = Result<()>> + Send;

    /// Read back records matching the query, oldest first.
    fn list(&self, query: &RecordQuery)
        -> impl Future<Output = Result<Vec<InteractionRecord>>> + Send;
}

impl RecordQuery {
    /// Whether a record passes this filter.
    pub(crate) fn matches(&self, record: &InteractionRecord) -> bool {
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.created_at >= until {
                return false;
            }
        }
        true
    }
}
