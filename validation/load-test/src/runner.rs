//! Workload dispatch and load test orchestration.

use std::fs::File;
use std::future::Future;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use readings_common::ReadingUpdate;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::AggregationClient;
use crate::config::TestConfig;
use crate::generator::{WorkloadGenerator, WorkloadStep};
use crate::metrics::{CallKind, CallOutcome, CallRecord, MetricsCollector, TestResults};

/// Dispatches a seeded workload against an [`AggregationClient`].
///
/// Calls are spawned without waiting on earlier steps; the run joins every
/// dispatched call once, after the last step.
pub struct LoadRunner<C> {
    client: Arc<C>,
    config: TestConfig,
    show_progress: bool,
}

impl<C: AggregationClient> LoadRunner<C> {
    /// Create a new load runner.
    pub fn new(client: C, config: TestConfig) -> Self {
        Self::shared(Arc::new(client), config)
    }

    /// Create a runner over a client the caller keeps a handle to.
    pub fn shared(client: Arc<C>, config: TestConfig) -> Self {
        Self {
            client,
            config,
            show_progress: false,
        }
    }

    /// Draw a progress bar while dispatching.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run the load test.
    pub async fn run(&self) -> anyhow::Result<TestResults> {
        let config = &self.config;
        let limit = Duration::from_millis(config.request_timeout_ms);
        let mut generator = WorkloadGenerator::new(config.seed, config.bounds.clone());

        let mut workload_log = match &config.workload_log {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                info!(path = %path.display(), "Logging workload");
                Some(BufWriter::new(File::create(path)?))
            }
            None => None,
        };

        info!(
            scenario = %config.name,
            seed = config.seed,
            steps = config.steps,
            base_url = %config.base_url,
            "Starting load test"
        );

        let pb = if self.show_progress {
            let pb = ProgressBar::new(config.steps);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} steps {msg}")?
                    .progress_chars("##-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let start = Instant::now();
        let mut pending: Vec<Dispatched> = Vec::new();

        for i in 0..config.steps {
            let step = generator.next_step(i);

            if let Some(log) = workload_log.as_mut() {
                serde_json::to_writer(&mut *log, &step)?;
                writeln!(log)?;
            }

            self.dispatch(step, limit, &mut pending);
            pb.inc(1);
        }

        if let Some(mut log) = workload_log.take() {
            log.flush()?;
        }

        pb.set_message("Waiting for in-flight calls...");
        let dispatched = pending.len();
        let (calls, handles): (Vec<u64>, Vec<_>) =
            pending.into_iter().map(|d| (d.calls, d.handle)).unzip();
        let settled = join_all(handles).await;

        let mut metrics = MetricsCollector::new();
        for (calls, result) in calls.into_iter().zip(settled) {
            match result {
                Ok(records) => records.iter().for_each(|r| metrics.record(r)),
                Err(e) => {
                    warn!(error = %e, calls, "Dispatched call task did not complete");
                    metrics.record_lost_calls(calls);
                }
            }
        }
        pb.finish_with_message("Complete!");

        debug!(tasks = dispatched, failed = metrics.failed_calls(), "All dispatched calls settled");

        // Post-run samples, one after the other
        let client = &self.client;
        let memory = memory_call(client.as_ref(), limit).await;
        metrics.record(&memory);

        let final_region = generator.final_region();
        let (record, final_average) =
            timed(CallKind::Average, limit, client.average(&final_region)).await;
        metrics.record(&record);

        let elapsed = start.elapsed();
        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            failed_calls = metrics.failed_calls(),
            "Load test finished"
        );

        Ok(metrics.results(config, elapsed, final_region, final_average))
    }

    /// Spawn the calls for one step.
    fn dispatch(
        &self,
        step: WorkloadStep,
        limit: Duration,
        pending: &mut Vec<Dispatched>,
    ) {
        let updates = [
            ReadingUpdate::temperature(f64::from(step.temperature)),
            ReadingUpdate::humidity(f64::from(step.humidity)),
        ];

        for update in updates {
            let client = Arc::clone(&self.client);
            let region = step.region.clone();
            let city = step.city.clone();
            let handle = tokio::spawn(async move {
                let (record, _) =
                    timed(CallKind::Update, limit, client.update(&region, &city, &update)).await;
                vec![record]
            });
            pending.push(Dispatched { calls: 1, handle });
        }

        if let Some(region) = step.average_region {
            let client = Arc::clone(&self.client);
            let sample_memory = step.sample_memory;
            let handle = tokio::spawn(async move {
                let (average, _) = timed(CallKind::Average, limit, client.average(&region)).await;
                let mut records = vec![average];
                // Only after the average settles, whatever its outcome
                if sample_memory {
                    records.push(memory_call(client.as_ref(), limit).await);
                }
                records
            });
            pending.push(Dispatched {
                calls: 1 + u64::from(sample_memory),
                handle,
            });
        }
    }
}

/// A spawned task and the number of calls it issues.
struct Dispatched {
    calls: u64,
    handle: JoinHandle<Vec<CallRecord>>,
}

async fn memory_call<C: AggregationClient>(client: &C, limit: Duration) -> CallRecord {
    let (mut record, bytes) = timed(CallKind::Memory, limit, client.memory()).await;
    record.memory_bytes = bytes;
    record
}

/// Await `call` for at most `limit`, returning its record and value.
async fn timed<T, F>(kind: CallKind, limit: Duration, call: F) -> (CallRecord, Option<T>)
where
    F: Future<Output = anyhow::Result<T>>,
{
    let start = Instant::now();
    let result = tokio::time::timeout(limit, call).await;
    let latency_us = start.elapsed().as_micros() as u64;

    match result {
        Ok(Ok(value)) => (CallRecord::new(kind, CallOutcome::Success, latency_us), Some(value)),
        Ok(Err(e)) => {
            debug!(?kind, error = %e, "Call failed");
            (CallRecord::new(kind, CallOutcome::Failed, latency_us), None)
        }
        Err(_) => {
            debug!(?kind, timeout_ms = limit.as_millis() as u64, "Call timed out");
            (CallRecord::new(kind, CallOutcome::TimedOut, latency_us), None)
        }
    }
}
