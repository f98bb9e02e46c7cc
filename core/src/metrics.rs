use crate::graph::GraphClass;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
pub struct PredictionMetrics {
    pub total_predictions: u64,
    pub failures: u64,
    pub label_counts: [u64; 3],
    pub latencies: VecDeque<u64>, // microseconds
}

#[derive(Clone)]
pub struct MetricsCollector {
    state: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    predictions: PredictionMetrics,
    max_history: usize,
}

impl MetricsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MetricsState {
                predictions: PredictionMetrics::default(),
                max_history,
            })),
        }
    }

    pub fn record_prediction(&self, label: GraphClass, latency_us: u64) {
        let mut state = self.lock();
        state.predictions.total_predictions += 1;
        state.predictions.label_counts[label.index()] += 1;
        push_latency(&mut state, latency_us);
    }

    pub fn record_failure(&self, latency_us: u64) {
        let mut state = self.lock();
        state.predictions.total_predictions += 1;
        state.predictions.failures += 1;
        push_latency(&mut state, latency_us);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.lock();
        let p = &state.predictions;

        let mut sorted_latencies: Vec<u64> = p.latencies.iter().copied().collect();
        sorted_latencies.sort_unstable();

        let failure_rate = if p.total_predictions > 0 {
            p.failures as f32 / p.total_predictions as f32
        } else {
            0.0
        };

        MetricsSnapshot {
            total_predictions: p.total_predictions,
            failures: p.failures,
            failure_rate,
            tree: p.label_counts[GraphClass::Tree.index()],
            dag: p.label_counts[GraphClass::Dag.index()],
            cyclic: p.label_counts[GraphClass::Cyclic.index()],
            p50: percentile(&sorted_latencies, 50.0),
            p95: percentile(&sorted_latencies, 95.0),
            p99: percentile(&sorted_latencies, 99.0),
            history_count: p.latencies.len(),
        }
    }

    // A panic while holding the lock leaves plain counters behind, still usable.
    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn push_latency(state: &mut MetricsState, latency_us: u64) {
    state.predictions.latencies.push_back(latency_us);
    if state.predictions.latencies.len() > state.max_history {
        state.predictions.latencies.pop_front();
    }
}

fn percentile(sorted: &[u64], p: f32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f32)).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub total_predictions: u64,
    pub failures: u64,
    pub failure_rate: f32,
    pub tree: u64,
    pub dag: u64,
    pub cyclic: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub history_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_labels_and_failures() {
        let metrics = MetricsCollector::new(16);
        metrics.record_prediction(GraphClass::Tree, 10);
        metrics.record_prediction(GraphClass::Tree, 20);
        metrics.record_prediction(GraphClass::Cyclic, 30);
        metrics.record_failure(5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_predictions, 4);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.failure_rate, 0.25);
        assert_eq!(snapshot.tree, 2);
        assert_eq!(snapshot.dag, 0);
        assert_eq!(snapshot.cyclic, 1);
        assert_eq!(snapshot.history_count, 4);
    }

    #[test]
    fn test_latency_history_is_bounded() {
        let metrics = MetricsCollector::new(3);
        for latency in 1..=10 {
            metrics.record_prediction(GraphClass::Dag, latency);
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.history_count, 3);
        assert_eq!(snapshot.p50, 9);
        assert_eq!(snapshot.p99, 10);
        assert!(snapshot.p95 >= snapshot.p50);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MetricsCollector::new(8).snapshot();
        assert_eq!(snapshot.total_predictions, 0);
        assert_eq!(snapshot.failure_rate, 0.0);
        assert_eq!(snapshot.p50, 0);
    }
}
