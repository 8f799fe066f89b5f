//! Metrics collection and statistics.

use std::time::Duration;

use hdrhistogram::Histogram;
use readings_common::RegionAverage;
use serde::{Deserialize, Serialize};

use crate::config::TestConfig;

/// Which endpoint a call hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Update,
    Average,
    Memory,
}

/// How a dispatched call settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Success,
    Failed,
    TimedOut,
}

/// One settled call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub kind: CallKind,
    pub outcome: CallOutcome,
    pub latency_us: u64,
    /// Server memory reported by a successful memory call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
}

impl CallRecord {
    pub fn new(kind: CallKind, outcome: CallOutcome, latency_us: u64) -> Self {
        Self {
            kind,
            outcome,
            latency_us,
            memory_bytes: None,
        }
    }
}

/// Per-kind counters and latency histogram.
struct KindStats {
    histogram: Histogram<u64>,
    total: u64,
    successful: u64,
    failed: u64,
    timed_out: u64,
}

impl KindStats {
    fn new() -> Self {
        Self {
            histogram: Histogram::new(3).expect("3 significant figures is a valid precision"),
            total: 0,
            successful: 0,
            failed: 0,
            timed_out: 0,
        }
    }

    fn record(&mut self, record: &CallRecord) {
        self.total += 1;
        match record.outcome {
            CallOutcome::Success => self.successful += 1,
            CallOutcome::Failed => self.failed += 1,
            CallOutcome::TimedOut => self.timed_out += 1,
        }
        self.histogram.record(record.latency_us).ok();
    }

    fn summary(&self) -> CallSummary {
        let ms = |us: u64| us as f64 / 1000.0;
        CallSummary {
            total: self.total,
            successful: self.successful,
            failed: self.failed,
            timed_out: self.timed_out,
            latency_p50: ms(self.histogram.value_at_percentile(50.0)),
            latency_p90: ms(self.histogram.value_at_percentile(90.0)),
            latency_p99: ms(self.histogram.value_at_percentile(99.0)),
            latency_max: ms(self.histogram.max()),
            latency_avg: self.histogram.mean() / 1000.0,
        }
    }
}

/// Collects metrics during load test execution.
pub struct MetricsCollector {
    updates: KindStats,
    averages: KindStats,
    memory: KindStats,
    /// Calls whose task panicked before producing records.
    lost_calls: u64,
    memory_samples: MemorySamples,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            updates: KindStats::new(),
            averages: KindStats::new(),
            memory: KindStats::new(),
            lost_calls: 0,
            memory_samples: MemorySamples::default(),
        }
    }

    /// Record a settled call.
    pub fn record(&mut self, record: &CallRecord) {
        match record.kind {
            CallKind::Update => self.updates.record(record),
            CallKind::Average => self.averages.record(record),
            CallKind::Memory => self.memory.record(record),
        }
        if let Some(bytes) = record.memory_bytes {
            self.memory_samples.add(bytes);
        }
    }

    /// Record `calls` dispatched calls whose task never reported them.
    pub fn record_lost_calls(&mut self, calls: u64) {
        self.lost_calls += calls;
    }

    /// Failed, timed-out and lost calls.
    pub fn failed_calls(&self) -> u64 {
        [&self.updates, &self.averages, &self.memory]
            .iter()
            .map(|s| s.failed + s.timed_out)
            .sum::<u64>()
            + self.lost_calls
    }

    /// Generate final test results.
    pub fn results(
        &self,
        config: &TestConfig,
        elapsed: Duration,
        final_region: String,
        final_average: Option<Vec<RegionAverage>>,
    ) -> TestResults {
        let elapsed_ms = elapsed.as_micros() as f64 / 1000.0;
        let mean_step_ms = if config.steps > 0 {
            Some(elapsed_ms / config.steps as f64)
        } else {
            None
        };

        TestResults {
            timestamp: chrono::Utc::now().to_rfc3339(),
            scenario_name: config.name.clone(),
            seed: config.seed,
            steps: config.steps,
            elapsed_ms,
            mean_step_ms,
            updates: self.updates.summary(),
            averages: self.averages.summary(),
            memory: self.memory.summary(),
            failed_calls: self.failed_calls(),
            lost_calls: self.lost_calls,
            memory_samples: self.memory_samples.clone(),
            final_region,
            final_average,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Server memory observed over a run, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySamples {
    pub count: u64,
    pub first: Option<u64>,
    pub peak: Option<u64>,
    pub last: Option<u64>,
}

impl MemorySamples {
    fn add(&mut self, bytes: u64) {
        self.count += 1;
        self.first.get_or_insert(bytes);
        self.peak = Some(self.peak.map_or(bytes, |p| p.max(bytes)));
        self.last = Some(bytes);
    }
}

/// Counts and latency (ms) for one call kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSummary {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub latency_p50: f64,
    pub latency_p90: f64,
    pub latency_p99: f64,
    pub latency_max: f64,
    pub latency_avg: f64,
}

/// Final test results.
///
/// Call counts include the post-run memory sample and average query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResults {
    pub timestamp: String,
    pub scenario_name: String,
    pub seed: u64,
    pub steps: u64,

    // Wall clock for the whole run, post-run calls included
    pub elapsed_ms: f64,
    pub mean_step_ms: Option<f64>,

    pub updates: CallSummary,
    pub averages: CallSummary,
    pub memory: CallSummary,
    pub failed_calls: u64,
    pub lost_calls: u64,

    pub memory_samples: MemorySamples,

    pub final_region: String,
    /// `None` when the final average query failed.
    pub final_average: Option<Vec<RegionAverage>>,
}

impl TestResults {
    pub fn total_calls(&self) -> u64 {
        self.updates.total + self.averages.total + self.memory.total + self.lost_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: CallKind, outcome: CallOutcome, latency_us: u64) -> CallRecord {
        CallRecord::new(kind, outcome, latency_us)
    }

    #[test]
    fn test_counts_by_kind_and_outcome() {
        let mut collector = MetricsCollector::new();
        collector.record(&record(CallKind::Update, CallOutcome::Success, 100));
        collector.record(&record(CallKind::Update, CallOutcome::Failed, 200));
        collector.record(&record(CallKind::Average, CallOutcome::TimedOut, 5000));
        collector.record_lost_calls(1);

        assert_eq!(collector.failed_calls(), 3);

        let config = TestConfig::quick("http://localhost:3000", 4, 1);
        let results = collector.results(&config, Duration::from_millis(8), "A".into(), None);
        assert_eq!(results.updates.total, 2);
        assert_eq!(results.updates.successful, 1);
        assert_eq!(results.averages.timed_out, 1);
        assert_eq!(results.total_calls(), 4);
        assert_eq!(results.mean_step_ms, Some(2.0));
    }

    #[test]
    fn test_memory_samples() {
        let mut collector = MetricsCollector::new();
        for bytes in [300, 900, 600] {
            let mut r = record(CallKind::Memory, CallOutcome::Success, 10);
            r.memory_bytes = Some(bytes);
            collector.record(&r);
        }

        let config = TestConfig::quick("http://localhost:3000", 1, 1);
        let results = collector.results(&config, Duration::from_millis(1), "A".into(), None);
        assert_eq!(results.memory_samples.count, 3);
        assert_eq!(results.memory_samples.first, Some(300));
        assert_eq!(results.memory_samples.peak, Some(900));
        assert_eq!(results.memory_samples.last, Some(600));
    }

    #[test]
    fn test_zero_steps_has_no_mean() {
        let config = TestConfig::quick("http://localhost:3000", 0, 1);
        let results =
            MetricsCollector::new().results(&config, Duration::from_millis(3), "A".into(), None);
        assert_eq!(results.mean_step_ms, None);
        assert_eq!(results.failed_calls, 0);
    }
}
