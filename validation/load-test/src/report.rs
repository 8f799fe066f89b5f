//! Results reporting and formatting.

use crate::metrics::{CallSummary, TestResults};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

/// Formats test results for output.
pub struct ResultsReport;

impl ResultsReport {
    /// Format results as a console table.
    pub fn format_table(results: &TestResults) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!("Load Test Results: {}", results.scenario_name)]);

        table.add_row(vec!["Seed / Steps:", &format!("{} / {}", results.seed, results.steps)]);
        table.add_row(vec!["Elapsed:", &format!("{:.1} ms", results.elapsed_ms)]);
        table.add_row(vec![
            "Mean per step:",
            &results
                .mean_step_ms
                .map(|ms| format!("{:.3} ms", ms))
                .unwrap_or_else(|| "n/a".to_string()),
        ]);
        table.add_row(vec![
            "Failed calls:",
            &format!("{} of {}", results.failed_calls, results.total_calls()),
        ]);

        table.add_row(vec!["", ""]);
        table.add_row(vec!["Calls (ok / failed / timed out)", "p50 / p90 / p99 / max (ms)"]);
        for (label, summary) in [
            ("update", &results.updates),
            ("average", &results.averages),
            ("memory", &results.memory),
        ] {
            table.add_row(vec![
                format!(
                    "{:<8} {} / {} / {}",
                    label, summary.successful, summary.failed, summary.timed_out
                ),
                latency_row(summary),
            ]);
        }

        table.add_row(vec!["", ""]);
        table.add_row(vec![
            "Server memory:".to_string(),
            match (results.memory_samples.first, results.memory_samples.peak) {
                (Some(first), Some(peak)) => format!(
                    "first {:.1} MB, peak {:.1} MB",
                    first as f64 / 1_048_576.0,
                    peak as f64 / 1_048_576.0
                ),
                _ => "no samples".to_string(),
            },
        ]);
        table.add_row(vec![
            format!("Final average ({}):", results.final_region),
            match &results.final_average {
                Some(averages) => match averages.first() {
                    Some(avg) => format!(
                        "temperature {} / humidity {}",
                        format_mean(avg.temperature),
                        format_mean(avg.humidity)
                    ),
                    None => "no readings".to_string(),
                },
                None => "query failed".to_string(),
            },
        ]);

        table.to_string()
    }

    /// Format results as JSON.
    pub fn format_json(results: &TestResults) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Format results as CSV row.
    pub fn format_csv(results: &TestResults) -> String {
        format!(
            "{},{},{},{},{:.1},{},{},{},{},{},{:.1},{:.1}",
            results.timestamp,
            results.scenario_name,
            results.seed,
            results.steps,
            results.elapsed_ms,
            results
                .mean_step_ms
                .map(|ms| format!("{:.3}", ms))
                .unwrap_or_default(),
            results.updates.total,
            results.averages.total,
            results.memory.total,
            results.failed_calls,
            results.updates.latency_p50,
            results.updates.latency_p99
        )
    }

    /// CSV header row.
    pub fn csv_header() -> &'static str {
        "timestamp,scenario,seed,steps,elapsed_ms,mean_step_ms,updates,averages,memory,failed,update_p50,update_p99"
    }
}

fn latency_row(summary: &CallSummary) -> String {
    format!(
        "{:.1} / {:.1} / {:.1} / {:.1}",
        summary.latency_p50, summary.latency_p90, summary.latency_p99, summary.latency_max
    )
}

fn format_mean(mean: Option<f64>) -> String {
    mean.map(|m| format!("{:.2}", m))
        .unwrap_or_else(|| "-".to_string())
}
