//! Dispatcher: validates requests, executes attempts, classifies outcomes, and
//! applies the bounded retry policy for transient failures.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, VolleyError};
use crate::http::{InferenceClient, InferenceResponse};
use crate::request::{Attempt, GenerationRequest, GenerationResult, Outcome};

/// Classify a raw endpoint response.
///
/// The endpoint schema is opaque; classification uses status-code and body
/// heuristics. Cold-starting spaces answer 503 or embed a loading indicator
/// with an ETA in the body, so both map to `Loading`.
pub fn classify(status: u16, body: &str) -> Outcome {
    match status {
        200..=299 => Outcome::Success,
        429 => Outcome::RateLimited,
        503 => Outcome::Loading,
        _ if body.contains("loading") || body.contains("estimated_time") => Outcome::Loading,
        _ => Outcome::Error,
    }
}

/// Dispatches generation requests to inference endpoints.
///
/// One outbound call per attempt; `Loading` and `RateLimited` classifications
/// are retried with exponential backoff up to the configured attempt budget,
/// `Error` ends the request immediately. The dispatcher has no side effects
/// beyond the outbound calls; persisting the result is the caller's job via
/// the recorder.
///
/// A dispatcher is cheap to share: requests from different users can run
/// `dispatch` concurrently on the same instance, while each individual
/// request's retry sequence stays strictly sequential.
#[derive(Clone)]
pub struct Dispatcher<C: InferenceClient> {
    client: C,
    config: Arc<Config>,
}

impl<C: InferenceClient> Dispatcher<C> {
    /// Create a new dispatcher over an inference client and process config.
    pub fn new(client: C, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Reject malformed requests before any outbound call is made.
    fn validate(&self, request: &GenerationRequest) -> Result<()> {
        if request.prompt.trim().is_empty() {
            return Err(VolleyError::InvalidInput("prompt is empty".to_string()));
        }

        if !self.config.is_configured_endpoint(&request.endpoint) {
            return Err(VolleyError::InvalidInput(format!(
                "endpoint '{}' is not a configured target",
                request.endpoint
            )));
        }

        Ok(())
    }

    /// Dispatch a request and drive it to a terminal result.
    ///
    /// Returns `Err(InvalidInput)` for caller errors, detected before any
    /// outbound call. Every other outcome, including terminal `RateLimited`,
    /// `Loading`, and `Error` classifications, is returned as a
    /// `GenerationResult` the caller can pattern-match on.
    #[tracing::instrument(skip(self, request), fields(request_id = %request.id, kind = %request.kind))]
    pub async fn dispatch(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.validate(request)?;

        let mut pending = Attempt::new(request.clone());

        loop {
            let attempting = pending.begin();

            let response = self
                .client
                .generate(
                    &attempting.request,
                    self.config.api_key.as_deref(),
                    self.config.timeout_ms,
                )
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    // Transport failures and timeouts classify as errors and
                    // are not retried, bounding total latency.
                    return Ok(attempting
                        .fail(Outcome::Error, Some(e.to_string()))
                        .into_result());
                }
            };

            let outcome = classify(response.status, &response.body);

            if self.config.debug {
                tracing::debug!(
                    status = response.status,
                    outcome = %outcome,
                    body = %response.body,
                    "Classified response"
                );
            }

            match outcome {
                Outcome::Success => {
                    return Ok(attempting.succeed(Some(response.body)).into_result());
                }
                Outcome::RateLimited | Outcome::Loading => {
                    let detail = error_detail(&response);
                    match attempting.retry(outcome, Some(detail), &self.config.retry) {
                        Ok(retrying) => pending = retrying.wait().await,
                        Err(failed) => return Ok(failed.into_result()),
                    }
                }
                Outcome::Error => {
                    return Ok(attempting
                        .fail(Outcome::Error, Some(error_detail(&response)))
                        .into_result());
                }
            }
        }
    }
}

/// Compact error detail for a non-success response, body truncated to keep
/// records small.
fn error_detail(response: &InferenceResponse) -> String {
    const MAX_BODY: usize = 200;
    let body: String = response.body.chars().take(MAX_BODY).collect();
    format!("status {}: {}", response.status, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::http::MockInferenceClient;
    use crate::request::GenerationKind;

    const ENDPOINT: &str = "https://text.example";

    fn config() -> Arc<Config> {
        Arc::new(Config {
            text_endpoint: ENDPOINT.to_string(),
            image_endpoint: "https://image.example".to_string(),
            video_endpoint: "https://video.example".to_string(),
            retry: RetryPolicy {
                max_attempts: 3,
                backoff_ms: 100,
                backoff_factor: 2,
                max_backoff_ms: 1000,
            },
            ..Config::default()
        })
    }

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(GenerationKind::Text, prompt, ENDPOINT, "user-1")
    }

    fn ok(status: u16, body: &str) -> crate::error::Result<InferenceResponse> {
        Ok(InferenceResponse {
            status,
            body: body.to_string(),
        })
    }

    #[test]
    fn test_classification_heuristics() {
        assert_eq!(classify(200, "{}"), Outcome::Success);
        assert_eq!(classify(201, ""), Outcome::Success);
        assert_eq!(classify(429, "slow down"), Outcome::RateLimited);
        assert_eq!(classify(503, ""), Outcome::Loading);
        assert_eq!(
            classify(500, r#"{"error":"Model is currently loading","estimated_time":20.0}"#),
            Outcome::Loading
        );
        assert_eq!(classify(500, "internal error"), Outcome::Error);
        assert_eq!(classify(404, "not found"), Outcome::Error);
        assert_eq!(classify(400, "bad request"), Outcome::Error);
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_before_any_call() {
        let mock = MockInferenceClient::new();
        let dispatcher = Dispatcher::new(mock.clone(), config());

        let err = dispatcher.dispatch(&request("   ")).await.unwrap_err();

        assert!(matches!(err, VolleyError::InvalidInput(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_endpoint_rejected_before_any_call() {
        let mock = MockInferenceClient::new();
        let dispatcher = Dispatcher::new(mock.clone(), config());

        let mut req = request("hello");
        req.endpoint = "https://rogue.example".to_string();
        let err = dispatcher.dispatch(&req).await.unwrap_err();

        assert!(matches!(err, VolleyError::InvalidInput(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_then_success_retries_to_completion() {
        let mock = MockInferenceClient::new();
        mock.add_response(ENDPOINT, ok(503, "warming up"));
        mock.add_response(ENDPOINT, ok(503, "warming up"));
        mock.add_response(ENDPOINT, ok(200, r#"{"data":["a story"]}"#));

        let dispatcher = Dispatcher::new(mock.clone(), config());
        let started = tokio::time::Instant::now();

        let result = dispatcher.dispatch(&request("hello")).await.unwrap();

        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.attempts, 3);
        assert_eq!(mock.call_count(), 3);
        assert_eq!(result.payload_ref.as_deref(), Some(r#"{"data":["a story"]}"#));

        // Backoffs of 100ms then 200ms elapsed on the paused clock.
        assert_eq!(started.elapsed().as_millis(), 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_exhausts_attempts() {
        let mock = MockInferenceClient::new();
        for _ in 0..5 {
            mock.add_response(ENDPOINT, ok(429, "too many requests"));
        }

        let dispatcher = Dispatcher::new(mock.clone(), config());
        let result = dispatcher.dispatch(&request("hello")).await.unwrap();

        assert_eq!(result.outcome, Outcome::RateLimited);
        assert_eq!(result.attempts, 3);
        // Exactly max_attempts calls, never more.
        assert_eq!(mock.call_count(), 3);
        assert!(result.error.as_deref().unwrap().starts_with("status 429"));
    }

    #[tokio::test]
    async fn test_endpoint_error_is_not_retried() {
        let mock = MockInferenceClient::new();
        mock.add_response(ENDPOINT, ok(500, "internal error"));

        let dispatcher = Dispatcher::new(mock.clone(), config());
        let result = dispatcher.dispatch(&request("hello")).await.unwrap();

        assert_eq!(result.outcome, Outcome::Error);
        assert_eq!(result.attempts, 1);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_terminal_error() {
        // No response configured: the mock returns a transport-level error.
        let mock = MockInferenceClient::new();
        let dispatcher = Dispatcher::new(mock.clone(), config());

        let result = dispatcher.dispatch(&request("hello")).await.unwrap();

        assert_eq!(result.outcome, Outcome::Error);
        assert_eq!(result.attempts, 1);
        assert!(result.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_id_matches_request() {
        let mock = MockInferenceClient::new();
        mock.add_response(ENDPOINT, ok(200, "done"));

        let dispatcher = Dispatcher::new(mock, config());
        let req = request("hello");
        let result = dispatcher.dispatch(&req).await.unwrap();

        assert_eq!(result.request_id, req.id);
    }
}
