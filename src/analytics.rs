//! Read-only analytics over the interaction log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::request::GenerationKind;
use crate::store::{InteractionStore, RecordQuery};

/// Aggregate statistics over recorded interactions.
///
/// Returned by `Aggregator::summarize`. An empty record set yields the zeroed
/// summary, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total: u64,
    pub text_requests: u64,
    pub image_requests: u64,
    pub video_requests: u64,
    pub successes: u64,
    /// successes / total; 0.0 when no records match.
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: u64,
    /// Most frequent theme tags, (tag, count), highest count first.
    pub top_themes: Vec<(String, u64)>,
    pub first_interaction: Option<DateTime<Utc>>,
    pub last_interaction: Option<DateTime<Utc>>,
}

impl AnalyticsSummary {
    fn empty() -> Self {
        Self {
            total: 0,
            text_requests: 0,
            image_requests: 0,
            video_requests: 0,
            successes: 0,
            success_rate: 0.0,
            avg_latency_ms: 0.0,
            p95_latency_ms: 0,
            top_themes: Vec::new(),
            first_interaction: None,
            last_interaction: None,
        }
    }
}

/// Computes summaries over an `InteractionStore`.
#[derive(Clone)]
pub struct Aggregator<S: InteractionStore> {
    store: S,
    top_themes: usize,
}

impl<S: InteractionStore> Aggregator<S> {
    /// Create an aggregator reporting the 5 most frequent themes.
    pub fn new(store: S) -> Self {
        Self {
            store,
            top_themes: 5,
        }
    }

    /// Report the `n` most frequent themes instead.
    pub fn with_top_themes(mut self, n: usize) -> Self {
        self.top_themes = n;
        self
    }

    /// Summarize the records matching `query`.
    pub async fn summarize(&self, query: &RecordQuery) -> Result<AnalyticsSummary> {
        let records = self.store.list(query).await?;

        if records.is_empty() {
            return Ok(AnalyticsSummary::empty());
        }

        let total = records.len() as u64;
        let mut kind_counts: HashMap<GenerationKind, u64> = HashMap::new();
        let mut theme_counts: HashMap<String, u64> = HashMap::new();
        let mut successes = 0u64;
        let mut latencies: Vec<u64> = Vec::with_capacity(records.len());

        for record in &records {
            *kind_counts.entry(record.kind).or_default() += 1;
            *theme_counts.entry(record.theme_tag.clone()).or_default() += 1;
            if record.outcome.is_success() {
                successes += 1;
            }
            latencies.push(record.latency_ms);
        }

        let avg_latency_ms =
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64;
        let p95_latency_ms = percentile(&mut latencies, 0.95);

        let mut top_themes: Vec<(String, u64)> = theme_counts.into_iter().collect();
        // Highest count first; ties break alphabetically for a stable order.
        top_themes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_themes.truncate(self.top_themes);

        // Records come back oldest first.
        let first_interaction = records.first().map(|r| r.created_at);
        let last_interaction = records.last().map(|r| r.created_at);

        Ok(AnalyticsSummary {
            total,
            text_requests: kind_counts.remove(&GenerationKind::Text).unwrap_or(0),
            image_requests: kind_counts.remove(&GenerationKind::Image).unwrap_or(0),
            video_requests: kind_counts.remove(&GenerationKind::Video).unwrap_or(0),
            successes,
            success_rate: successes as f64 / total as f64,
            avg_latency_ms,
            p95_latency_ms,
            top_themes,
            first_interaction,
            last_interaction,
        })
    }
}

/// Nearest-rank percentile over the given samples.
fn percentile(samples: &mut [u64], pct: f64) -> u64 {
    if samples.is_empty() {
        return 0;
    }
    samples.sort_unstable();
    let rank = (pct * samples.len() as f64).ceil() as usize;
    samples[rank.clamp(1, samples.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Outcome, RequestId};
    use crate::store::memory::InMemoryStore;
    use crate::store::InteractionRecord;
    use chrono::TimeZone;

    fn record(
        kind: GenerationKind,
        outcome: Outcome,
        theme: &str,
        latency_ms: u64,
        at_minute: u32,
    ) -> InteractionRecord {
        InteractionRecord {
            request_id: RequestId::new(),
            user_ref: "user-1".to_string(),
            kind,
            prompt: "a prompt".to_string(),
            theme_tag: theme.to_string(),
            outcome,
            latency_ms,
            payload_ref: None,
            error: None,
            attempts: 1,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, at_minute, 0).unwrap(),
        }
    }

    async fn seeded(records: Vec<InteractionRecord>) -> Aggregator<InMemoryStore> {
        let store = InMemoryStore::new();
        for record in &records {
            store.insert(record).await.unwrap();
        }
        Aggregator::new(store)
    }

    #[tokio::test]
    async fn test_empty_store_yields_zeroed_summary() {
        let aggregator = seeded(vec![]).await;
        let summary = aggregator.summarize(&RecordQuery::default()).await.unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.avg_latency_ms, 0.0);
        assert_eq!(summary.p95_latency_ms, 0);
        assert!(summary.top_themes.is_empty());
        assert!(summary.first_interaction.is_none());
    }

    #[tokio::test]
    async fn test_success_rate_over_mixed_outcomes() {
        // 7 successes, 3 rate-limited.
        let mut records = Vec::new();
        for i in 0..7 {
            records.push(record(
                GenerationKind::Text,
                Outcome::Success,
                "general",
                100,
                i,
            ));
        }
        for i in 7..10 {
            records.push(record(
                GenerationKind::Text,
                Outcome::RateLimited,
                "general",
                100,
                i,
            ));
        }

        let aggregator = seeded(records).await;
        let summary = aggregator.summarize(&RecordQuery::default()).await.unwrap();

        assert_eq!(summary.total, 10);
        assert_eq!(summary.successes, 7);
        assert!((summary.success_rate - 0.7).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_kind_counts_and_filter() {
        let aggregator = seeded(vec![
            record(GenerationKind::Text, Outcome::Success, "general", 100, 0),
            record(GenerationKind::Image, Outcome::Success, "fantasy", 400, 1),
            record(GenerationKind::Image, Outcome::Error, "fantasy", 300, 2),
            record(GenerationKind::Video, Outcome::Success, "sci-fi", 900, 3),
        ])
        .await;

        let summary = aggregator.summarize(&RecordQuery::default()).await.unwrap();
        assert_eq!(summary.text_requests, 1);
        assert_eq!(summary.image_requests, 2);
        assert_eq!(summary.video_requests, 1);

        let images_only = aggregator
            .summarize(&RecordQuery {
                kind: Some(GenerationKind::Image),
                ..RecordQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(images_only.total, 2);
        assert_eq!(images_only.image_requests, 2);
        assert_eq!(images_only.text_requests, 0);
        assert!((images_only.success_rate - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_latency_statistics() {
        let records: Vec<_> = (1..=20)
            .map(|i| {
                record(
                    GenerationKind::Text,
                    Outcome::Success,
                    "general",
                    i * 10,
                    i as u32,
                )
            })
            .collect();

        let aggregator = seeded(records).await;
        let summary = aggregator.summarize(&RecordQuery::default()).await.unwrap();

        // Latencies 10..=200: mean 105, nearest-rank p95 = 19th value = 190.
        assert!((summary.avg_latency_ms - 105.0).abs() < f64::EPSILON);
        assert_eq!(summary.p95_latency_ms, 190);
    }

    #[tokio::test]
    async fn test_top_themes_ranked_by_frequency() {
        let aggregator = seeded(vec![
            record(GenerationKind::Image, Outcome::Success, "fantasy", 100, 0),
            record(GenerationKind::Image, Outcome::Success, "fantasy", 100, 1),
            record(GenerationKind::Image, Outcome::Success, "fantasy", 100, 2),
            record(GenerationKind::Image, Outcome::Success, "sci-fi", 100, 3),
            record(GenerationKind::Image, Outcome::Success, "sci-fi", 100, 4),
            record(GenerationKind::Text, Outcome::Success, "general", 100, 5),
        ])
        .await
        .with_top_themes(2);

        let summary = aggregator.summarize(&RecordQuery::default()).await.unwrap();

        assert_eq!(
            summary.top_themes,
            vec![("fantasy".to_string(), 3), ("sci-fi".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_interaction_window() {
        let aggregator = seeded(vec![
            record(GenerationKind::Text, Outcome::Success, "general", 100, 5),
            record(GenerationKind::Text, Outcome::Success, "general", 100, 45),
        ])
        .await;

        let summary = aggregator.summarize(&RecordQuery::default()).await.unwrap();

        assert_eq!(
            summary.first_interaction,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 5, 0).unwrap())
        );
        assert_eq!(
            summary.last_interaction,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 45, 0).unwrap())
        );
    }
}
