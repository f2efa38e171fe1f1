//! HTTP client abstraction for inference endpoints.
//!
//! This module defines the `InferenceClient` trait to abstract outbound call
//! execution, enabling testability with mock implementations.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::request::{GenerationKind, GenerationRequest};

/// Raw response from an inference endpoint, prior to classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as a string
    pub body: String,
}

/// Trait for executing outbound inference calls.
///
/// This abstraction allows for different implementations (production vs. testing)
/// and makes the dispatch loop testable without making real HTTP calls.
#[async_trait]
pub trait InferenceClient: Send + Sync + Clone {
    /// Execute a single inference attempt.
    ///
    /// # Arguments
    /// * `request` - The generation request carrying kind, prompt, and endpoint
    /// * `api_key` - Optional API key sent in an `Authorization: Bearer` header
    /// * `timeout_ms` - Attempt timeout in milliseconds
    ///
    /// # Errors
    /// Returns an error if the request fails below the HTTP layer (network
    /// failure, timeout, invalid URL). Non-2xx responses are NOT errors here;
    /// the dispatcher classifies them.
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: Option<&str>,
        timeout_ms: u64,
    ) -> Result<InferenceResponse>;
}

/// Default generation parameters per kind, sent alongside the prompt.
///
/// The wire schema is endpoint-specific and treated as opaque; these mirror the
/// common text/diffusion/animation parameter sets.
fn default_parameters(kind: GenerationKind) -> serde_json::Value {
    match kind {
        GenerationKind::Text => json!({
            "max_new_tokens": 150,
            "temperature": 0.9,
            "top_p": 0.95,
            "repetition_penalty": 1.1,
        }),
        GenerationKind::Image => json!({
            "negative_prompt": "",
            "num_inference_steps": 20,
            "guidance_scale": 7.5,
            "width": 512,
            "height": 512,
        }),
        GenerationKind::Video => json!({
            "num_frames": 16,
            "num_inference_steps": 20,
            "guidance_scale": 7.5,
            "width": 512,
            "height": 512,
        }),
    }
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production inference client using reqwest.
#[derive(Clone)]
pub struct ReqwestInferenceClient {
    client: reqwest::Client,
}

impl ReqwestInferenceClient {
    /// Create a new reqwest-based inference client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestInferenceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceClient for ReqwestInferenceClient {
    #[tracing::instrument(skip(self, request, api_key), fields(request_id = %request.id, kind = %request.kind))]
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: Option<&str>,
        timeout_ms: u64,
    ) -> Result<InferenceResponse> {
        let payload = json!({
            "prompt": request.prompt,
            "parameters": default_parameters(request.kind),
        });

        tracing::debug!(
            endpoint = %request.endpoint,
            timeout_ms,
            "Executing inference request"
        );

        let mut req = self
            .client
            .post(&request.endpoint)
            .timeout(Duration::from_millis(timeout_ms))
            .json(&payload);

        if let Some(key) = api_key {
            if !key.is_empty() {
                req = req.header("Authorization", format!("Bearer {key}"));
            }
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!(
                request_id = %request.id,
                endpoint = %request.endpoint,
                error = %e,
                "Inference request failed"
            );
            e
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::info!(
            request_id = %request.id,
            status,
            response_len = body.len(),
            "Inference request completed"
        );

        Ok(InferenceResponse { status, body })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Mock inference client for testing.
///
/// Allows configuring predetermined responses per endpoint without making
/// actual HTTP calls. Multiple responses for the same endpoint are returned
/// in FIFO order.
#[derive(Clone)]
pub struct MockInferenceClient {
    responses: Arc<Mutex<HashMap<String, Vec<Result<InferenceResponse>>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

/// Record of a call made to the mock inference client.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub endpoint: String,
    pub kind: GenerationKind,
    pub prompt: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl MockInferenceClient {
    /// Create a new mock inference client.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a predetermined response for an endpoint.
    pub fn add_response(&self, endpoint: &str, response: Result<InferenceResponse>) {
        self.responses
            .lock()
            .entry(endpoint.to_string())
            .or_default()
            .push(response);
    }

    /// Get all calls that have been made to this mock client.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for MockInferenceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: Option<&str>,
        timeout_ms: u64,
    ) -> Result<InferenceResponse> {
        self.calls.lock().push(MockCall {
            endpoint: request.endpoint.clone(),
            kind: request.kind,
            prompt: request.prompt.clone(),
            api_key: api_key.map(str::to_string),
            timeout_ms,
        });

        let mut responses = self.responses.lock();
        if let Some(queue) = responses.get_mut(&request.endpoint) {
            if !queue.is_empty() {
                return queue.remove(0);
            }
        }

        Err(crate::error::VolleyError::Other(anyhow::anyhow!(
            "no mock response configured for {}",
            request.endpoint
        )))
    }
}
