//! Dispatch layer for generation requests with retry logic and interaction logging.
//!
//! This crate provides a request dispatch system that:
//! - Accepts generation requests (text, image, video) for inference endpoints
//! - Manages the attempt lifecycle with type-safe state transitions
//! - Implements retry logic with exponential backoff for transient failures
//! - Logs every interaction append-only for later analysis
//! - Computes usage analytics (per-kind counts, success rate, latency, themes)
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use volley::{
//!     Aggregator, Config, Dispatcher, GenerationKind, GenerationRequest,
//!     Recorder, ReqwestInferenceClient, SqliteStore,
//! };
//!
//! let config = Arc::new(Config::from_env()?);
//! let dispatcher = Dispatcher::new(ReqwestInferenceClient::new(), config.clone());
//!
//! let store = SqliteStore::connect(&config.database_url).await?;
//! let recorder = Recorder::new(store.clone());
//! let aggregator = Aggregator::new(store);
//!
//! // Dispatch a request and log the terminal result
//! let request = GenerationRequest::new(
//!     GenerationKind::Image,
//!     "a wizard in a castle",
//!     config.endpoint_for(GenerationKind::Image),
//!     "user-42",
//! );
//! let result = dispatcher.dispatch(&request).await?;
//! recorder.record(&request, &result).await?;
//!
//! // Summarize usage
//! let summary = aggregator.summarize(&Default::default()).await?;
//! ```

pub mod analytics;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod recorder;
pub mod request;
pub mod store;
pub mod theme;

// Re-export commonly used types
pub use analytics::{Aggregator, AnalyticsSummary};
pub use config::{Config, RetryPolicy};
pub use dispatch::{classify, Dispatcher};
pub use error::{Result, VolleyError};
pub use http::{InferenceClient, InferenceResponse, MockInferenceClient, ReqwestInferenceClient};
pub use recorder::Recorder;
pub use request::*;
pub use store::memory::InMemoryStore;
pub use store::sqlite::SqliteStore;
pub use store::{InteractionRecord, InteractionStore, RecordQuery};
