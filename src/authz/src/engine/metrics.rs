//! Decision metrics for engine observability

use crate::types::Operation;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Decision outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allowed,
    Forbidden,
    Unauthorized,
    NotFound,
    Error,
}

impl Outcome {
    pub const ALL: [Outcome; 5] = [
        Outcome::Allowed,
        Outcome::Forbidden,
        Outcome::Unauthorized,
        Outcome::NotFound,
        Outcome::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Forbidden => "forbidden",
            Outcome::Unauthorized => "unauthorized",
            Outcome::NotFound => "not_found",
            Outcome::Error => "error",
        }
    }
}

/// Snapshot of engine metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineMetrics {
    /// Total number of decisions
    pub total_decisions: u64,

    pub allowed: u64,
    pub forbidden: u64,
    pub unauthorized: u64,
    pub not_found: u64,

    /// Store failures
    pub errors: u64,

    /// Decisions keyed by operation, then outcome
    pub by_operation: BTreeMap<String, BTreeMap<String, u64>>,

    /// Average decision latency
    pub avg_latency_ms: f64,
}

impl EngineMetrics {
    /// Share of decisions that were allowed
    pub fn allow_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            0.0
        } else {
            self.allowed as f64 / self.total_decisions as f64
        }
    }

    /// Count for one operation/outcome pair
    pub fn count(&self, operation: Operation, outcome: Outcome) -> u64 {
        self.by_operation
            .get(operation.as_str())
            .and_then(|m| m.get(outcome.as_str()))
            .copied()
            .unwrap_or(0)
    }
}

/// Metrics collector shared by all requests
pub struct MetricsCollector {
    metrics: Arc<RwLock<EngineMetrics>>,

    /// Running latency sum for the average
    latency_total_ms: Arc<RwLock<f64>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(EngineMetrics::default())),
            latency_total_ms: Arc::new(RwLock::new(0.0)),
        }
    }

    /// Record one decision and its latency
    pub async fn record(&self, operation: Operation, outcome: Outcome, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut metrics = self.metrics.write().await;
        metrics.total_decisions += 1;
        match outcome {
            Outcome::Allowed => metrics.allowed += 1,
            Outcome::Forbidden => metrics.forbidden += 1,
            Outcome::Unauthorized => metrics.unauthorized += 1,
            Outcome::NotFound => metrics.not_found += 1,
            Outcome::Error => metrics.errors += 1,
        }
        *metrics
            .by_operation
            .entry(operation.as_str().to_string())
            .or_default()
            .entry(outcome.as_str().to_string())
            .or_insert(0) += 1;

        let mut total = self.latency_total_ms.write().await;
        *total += latency_ms;
        metrics.avg_latency_ms = *total / metrics.total_decisions as f64;
    }

    /// Get a snapshot of current metrics
    pub async fn get_metrics(&self) -> EngineMetrics {
        self.metrics.read().await.clone()
    }

    /// Reset all metrics
    pub async fn reset(&self) {
        *self.metrics.write().await = EngineMetrics::default();
        *self.latency_total_ms.write().await = 0.0;
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_decisions() {
        let collector = MetricsCollector::new();

        collector
            .record(Operation::List, Outcome::Allowed, Duration::from_millis(2))
            .await;
        collector
            .record(Operation::List, Outcome::Forbidden, Duration::from_millis(4))
            .await;
        collector
            .record(Operation::Delete, Outcome::Unauthorized, Duration::from_millis(6))
            .await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_decisions, 3);
        assert_eq!(metrics.allowed, 1);
        assert_eq!(metrics.forbidden, 1);
        assert_eq!(metrics.unauthorized, 1);
        assert_eq!(metrics.count(Operation::List, Outcome::Forbidden), 1);
        assert_eq!(metrics.count(Operation::Create, Outcome::Allowed), 0);
        assert!((metrics.avg_latency_ms - 4.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_allow_rate() {
        let collector = MetricsCollector::new();
        assert_eq!(collector.get_metrics().await.allow_rate(), 0.0);

        for _ in 0..3 {
            collector
                .record(Operation::ReadOne, Outcome::Allowed, Duration::ZERO)
                .await;
        }
        collector
            .record(Operation::ReadOne, Outcome::Forbidden, Duration::ZERO)
            .await;

        let metrics = collector.get_metrics().await;
        assert!((metrics.allow_rate() - 0.75).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_reset() {
        let collector = MetricsCollector::new();
        collector
            .record(Operation::Create, Outcome::Allowed, Duration::from_millis(1))
            .await;
        collector.reset().await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_decisions, 0);
        assert!(metrics.by_operation.is_empty());
    }
}
