//! Core types for the generation-request lifecycle.
//!
//! This module defines the type-safe attempt lifecycle using the typestate pattern.
//! Each logical request progresses through distinct states, enforced at compile time.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VolleyError;

/// A unique identifier for a generation request.
///
/// Uses a short, readable display format like "gen_abc123xy" instead of full UUIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Convert to a short, readable string format.
    ///
    /// Takes the first 8 hex characters of the UUID and formats as "gen_xxxxxxxx".
    pub fn to_short_string(&self) -> String {
        let hex = format!("{:032x}", self.0.as_u128());
        format!("gen_{}", &hex[..8])
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RequestId> for Uuid {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_short_string())
    }
}

/// The category of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Text,
    Image,
    Video,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::Text => "text",
            GenerationKind::Image => "image",
            GenerationKind::Video => "video",
        }
    }
}

impl FromStr for GenerationKind {
    type Err = VolleyError;

    /// Parse a kind from its wire form. Unknown kinds are a caller error and
    /// must be rejected before any outbound call is made.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(GenerationKind::Text),
            "image" => Ok(GenerationKind::Image),
            "video" => Ok(GenerationKind::Video),
            other => Err(VolleyError::InvalidInput(format!(
                "unsupported generation kind '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generation request as submitted by the caller.
///
/// Immutable once created; retries reuse the same request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The ID with which the request was created.
    pub id: RequestId,

    /// The category of content to generate.
    pub kind: GenerationKind,

    /// The user prompt to send to the inference endpoint.
    pub prompt: String,

    /// The inference endpoint URL for this kind (must be one of the configured targets).
    pub endpoint: String,

    /// Opaque anonymized identifier of the submitting user.
    pub user_ref: String,

    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

impl GenerationRequest {
    /// Create a new request with a fresh ID and creation timestamp.
    pub fn new(
        kind: GenerationKind,
        prompt: impl Into<String>,
        endpoint: impl Into<String>,
        user_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            kind,
            prompt: prompt.into(),
            endpoint: endpoint.into(),
            user_ref: user_ref.into(),
            created_at: Utc::now(),
        }
    }
}

/// Classification of a single inference attempt.
///
/// `Loading` and `RateLimited` are transient and eligible for retry;
/// `Success` and `Error` end the request on first sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    RateLimited,
    Loading,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::RateLimited => "rate_limited",
            Outcome::Loading => "loading",
            Outcome::Error => "error",
        }
    }

    /// Whether this classification is expected to resolve itself after a delay.
    pub fn is_transient(&self) -> bool {
        matches!(self, Outcome::RateLimited | Outcome::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl FromStr for Outcome {
    type Err = VolleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Outcome::Success),
            "rate_limited" => Ok(Outcome::RateLimited),
            "loading" => Ok(Outcome::Loading),
            "error" => Ok(Outcome::Error),
            other => Err(VolleyError::Internal(format!(
                "unknown outcome '{other}' in stored record"
            ))),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The terminal result of a logical request.
///
/// Produced exactly once per request: on the first success, or with the last
/// non-success classification after retries are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The request this result belongs to.
    pub request_id: RequestId,

    /// Terminal classification of the request.
    pub outcome: Outcome,

    /// Latency of the final attempt in milliseconds.
    pub latency_ms: u64,

    /// Opaque reference to the generated payload (response body or media pointer).
    pub payload_ref: Option<String>,

    /// Error detail for non-success outcomes.
    pub error: Option<String>,

    /// Number of outbound calls made for this request.
    pub attempts: u32,

    /// When the terminal classification was reached.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Attempt States
// ============================================================================

/// Marker trait for valid attempt states.
///
/// This trait enables the typestate pattern, ensuring that operations
/// are only performed on attempts in valid states.
pub trait AttemptState: Send + Sync {}

/// The attempt lifecycle of a single logical request.
///
/// Uses the typestate pattern to ensure type-safe state transitions.
/// The generic parameter `S` represents the current state.
#[derive(Debug, Clone)]
pub struct Attempt<S: AttemptState> {
    /// The current state of the attempt.
    pub state: S,
    /// The request being attempted.
    pub request: GenerationRequest,
}

/// Waiting for the next outbound call to begin.
///
/// This is the initial state, and the state a transient failure returns to
/// after its backoff delay has elapsed.
#[derive(Debug, Clone)]
pub struct Pending {
    /// Zero-based index of the next attempt.
    pub attempt: u32,
}

impl AttemptState for Pending {}

/// An outbound call is in flight.
#[derive(Debug, Clone)]
pub struct Attempting {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
}

impl AttemptState for Attempting {}

/// A transient failure was classified and the request is waiting out its backoff.
#[derive(Debug, Clone)]
pub struct Retrying {
    /// Index of the attempt that failed.
    pub attempt: u32,
    /// The transient classification that triggered the retry.
    pub outcome: Outcome,
    /// How long to wait before the next attempt.
    pub backoff: std::time::Duration,
}

impl AttemptState for Retrying {}

/// The request succeeded. Terminal.
#[derive(Debug, Clone)]
pub struct Succeeded {
    pub attempts: u32,
    pub latency_ms: u64,
    pub payload_ref: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl AttemptState for Succeeded {}

/// The request failed, either immediately or after exhausting retries. Terminal.
#[derive(Debug, Clone)]
pub struct Failed {
    pub attempts: u32,
    /// The last non-success classification.
    pub outcome: Outcome,
    pub error: Option<String>,
    pub latency_ms: u64,
    pub failed_at: DateTime<Utc>,
}

impl AttemptState for Failed {}
