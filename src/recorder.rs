//! Interaction recorder.
//!
//! Joins a request with its terminal result into an `InteractionRecord` and
//! appends it to the store. The recorder validates referential integrity and
//! never retries; on `Storage` errors the caller decides whether to drop the
//! record or queue it for later.

use chrono::Utc;

use crate::error::{Result, VolleyError};
use crate::request::{GenerationRequest, GenerationResult};
use crate::store::{InteractionRecord, InteractionStore};
use crate::theme;

/// Records request/result pairs into an `InteractionStore`.
#[derive(Clone)]
pub struct Recorder<S: InteractionStore> {
    store: S,
}

impl<S: InteractionStore> Recorder<S> {
    /// Create a recorder over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store (e.g. to share it with an aggregator).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist the terminal result of a request as a single atomic append.
    ///
    /// # Errors
    /// - `InvalidInput` if `result.request_id` does not match `request.id`
    /// - `Duplicate` if the request has already been recorded
    /// - `Storage` if the persistence layer cannot be reached
    pub async fn record(
        &self,
        request: &GenerationRequest,
        result: &GenerationResult,
    ) -> Result<InteractionRecord> {
        if result.request_id != request.id {
            return Err(VolleyError::InvalidInput(format!(
                "result {} does not belong to request {}",
                result.request_id, request.id
            )));
        }

        let record = InteractionRecord {
            request_id: request.id,
            user_ref: request.user_ref.clone(),
            kind: request.kind,
            prompt: request.prompt.clone(),
            theme_tag: theme::tag_prompt(&request.prompt),
            outcome: result.outcome,
            latency_ms: result.latency_ms,
            payload_ref: result.payload_ref.clone(),
            error: result.error.clone(),
            attempts: result.attempts,
            created_at: Utc::now(),
        };

        self.store.insert(&record).await?;

        tracing::info!(
            request_id = %record.request_id,
            kind = %record.kind,
            outcome = %record.outcome,
            theme = %record.theme_tag,
            latency_ms = record.latency_ms,
            "Recorded interaction"
        );

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{GenerationKind, Outcome, RequestId};
    use crate::store::memory::InMemoryStore;
    use crate::store::RecordQuery;

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            GenerationKind::Image,
            "a wizard in a castle",
            "https://image.example",
            "user-7",
        )
    }

    fn result_for(request: &GenerationRequest) -> GenerationResult {
        GenerationResult {
            request_id: request.id,
            outcome: Outcome::Success,
            latency_ms: 850,
            payload_ref: Some("image-bytes".to_string()),
            error: None,
            attempts: 1,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_joins_request_and_result() {
        let recorder = Recorder::new(InMemoryStore::new());
        let req = request();
        let res = result_for(&req);

        let record = recorder.record(&req, &res).await.unwrap();

        assert_eq!(record.request_id, req.id);
        assert_eq!(record.user_ref, "user-7");
        assert_eq!(record.theme_tag, "fantasy");
        assert_eq!(record.outcome, Outcome::Success);
        assert_eq!(record.latency_ms, 850);

        let stored = recorder
            .store()
            .list(&RecordQuery::default())
            .await
            .unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[tokio::test]
    async fn test_mismatched_result_rejected() {
        let recorder = Recorder::new(InMemoryStore::new());
        let req = request();
        let mut res = result_for(&req);
        res.request_id = RequestId::new();

        let err = recorder.record(&req, &res).await.unwrap_err();

        assert!(matches!(err, VolleyError::InvalidInput(_)));
        assert!(recorder.store().is_empty());
    }

    #[tokio::test]
    async fn test_double_record_is_rejected() {
        let recorder = Recorder::new(InMemoryStore::new());
        let req = request();
        let res = result_for(&req);

        recorder.record(&req, &res).await.unwrap();
        let err = recorder.record(&req, &res).await.unwrap_err();

        assert!(matches!(err, VolleyError::Duplicate(id) if id == req.id));
        assert_eq!(recorder.store().len(), 1);
    }
}
