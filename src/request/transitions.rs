//! Type-safe transitions through the attempt lifecycle.
//!
//! A logical request moves `Pending -> Attempting -> {Succeeded, Retrying, Failed}`;
//! `Retrying` returns to `Pending` once its backoff has elapsed, and the retry
//! transition refuses to fire once the attempt budget is spent. `Succeeded` and
//! `Failed` are terminal. Transitions are pure; persistence is the recorder's
//! concern, not the state machine's.

use chrono::Utc;

use crate::config::RetryPolicy;
use crate::request::types::{
    Attempt, Attempting, Failed, GenerationRequest, GenerationResult, Outcome, Pending, Retrying,
    Succeeded,
};

fn elapsed_ms(since: chrono::DateTime<Utc>) -> u64 {
    (Utc::now() - since).num_milliseconds().max(0) as u64
}

impl Attempt<Pending> {
    /// Start the lifecycle for a validated request.
    pub fn new(request: GenerationRequest) -> Self {
        Attempt {
            state: Pending { attempt: 0 },
            request,
        }
    }

    /// Begin an outbound call.
    pub fn begin(self) -> Attempt<Attempting> {
        tracing::debug!(
            request_id = %self.request.id,
            attempt = self.state.attempt,
            "Beginning attempt"
        );

        Attempt {
            state: Attempting {
                attempt: self.state.attempt,
                started_at: Utc::now(),
            },
            request: self.request,
        }
    }
}

impl Attempt<Attempting> {
    /// The attempt was classified as a success. Terminal.
    pub fn succeed(self, payload_ref: Option<String>) -> Attempt<Succeeded> {
        let latency_ms = elapsed_ms(self.state.started_at);

        tracing::info!(
            request_id = %self.request.id,
            attempts = self.state.attempt + 1,
            latency_ms,
            "Request succeeded"
        );

        Attempt {
            state: Succeeded {
                attempts: self.state.attempt + 1,
                latency_ms,
                payload_ref,
                completed_at: Utc::now(),
            },
            request: self.request,
        }
    }

    /// The attempt was classified as a non-transient failure. Terminal, no retry.
    pub fn fail(self, outcome: Outcome, error: Option<String>) -> Attempt<Failed> {
        let latency_ms = elapsed_ms(self.state.started_at);

        tracing::warn!(
            request_id = %self.request.id,
            attempts = self.state.attempt + 1,
            outcome = %outcome,
            "Request failed"
        );

        Attempt {
            state: Failed {
                attempts: self.state.attempt + 1,
                outcome,
                error,
                latency_ms,
                failed_at: Utc::now(),
            },
            request: self.request,
        }
    }

    /// The attempt was classified as a transient failure.
    ///
    /// If attempts remain under `policy.max_attempts`, transitions to `Retrying`
    /// with the exponential backoff for this attempt index. Otherwise the request
    /// fails with the transient classification as its terminal outcome.
    pub fn retry(
        self,
        outcome: Outcome,
        error: Option<String>,
        policy: &RetryPolicy,
    ) -> Result<Attempt<Retrying>, Attempt<Failed>> {
        debug_assert!(outcome.is_transient());

        if self.state.attempt + 1 >= policy.max_attempts {
            tracing::warn!(
                request_id = %self.request.id,
                attempts = self.state.attempt + 1,
                max_attempts = policy.max_attempts,
                outcome = %outcome,
                "No retries remaining, request fails with last classification"
            );

            let latency_ms = elapsed_ms(self.state.started_at);
            return Err(Attempt {
                state: Failed {
                    attempts: self.state.attempt + 1,
                    outcome,
                    error,
                    latency_ms,
                    failed_at: Utc::now(),
                },
                request: self.request,
            });
        }

        let backoff = policy.backoff_for(self.state.attempt);

        tracing::info!(
            request_id = %self.request.id,
            attempt = self.state.attempt,
            backoff_ms = backoff.as_millis() as u64,
            outcome = %outcome,
            "Transient failure, backing off before retry"
        );

        Ok(Attempt {
            state: Retrying {
                attempt: self.state.attempt,
                outcome,
                backoff,
            },
            request: self.request,
        })
    }
}

impl Attempt<Retrying> {
    /// Wait out the backoff delay, then return to `Pending` for the next attempt.
    ///
    /// The sleep is a suspension point: other requests keep making progress on
    /// the same runtime while this one waits.
    pub async fn wait(self) -> Attempt<Pending> {
        tokio::time::sleep(self.state.backoff).await;

        Attempt {
            state: Pending {
                attempt: self.state.attempt + 1,
            },
            request: self.request,
        }
    }
}

impl Attempt<Succeeded> {
    /// Produce the terminal result for this request.
    pub fn into_result(self) -> GenerationResult {
        GenerationResult {
            request_id: self.request.id,
            outcome: Outcome::Success,
            latency_ms: self.state.latency_ms,
            payload_ref: self.state.payload_ref,
            error: None,
            attempts: self.state.attempts,
            created_at: self.state.completed_at,
        }
    }
}

impl Attempt<Failed> {
    /// Produce the terminal result for this request.
    pub fn into_result(self) -> GenerationResult {
        GenerationResult {
            request_id: self.request.id,
            outcome: self.state.outcome,
            latency_ms: self.state.latency_ms,
            payload_ref: None,
            error: self.state.error,
            attempts: self.state.attempts,
            created_at: self.state.failed_at,
        }
    }
}
