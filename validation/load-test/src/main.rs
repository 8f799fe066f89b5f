//! Load test CLI for the aggregation API.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use load_test::{HttpAggregationClient, LoadRunner, ResultsReport, TestConfig, TestResults};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "load-test")]
#[command(about = "Seeded load generator for the aggregation API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a load test from a scenario file
    Run {
        /// Path to scenario YAML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Override the RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the number of steps
        #[arg(short = 'n', long)]
        steps: Option<u64>,

        /// Output format: table (default), json, csv
        #[arg(short, long, default_value = "table")]
        output: String,
    },

    /// Run a quick smoke test with default bounds
    Quick {
        /// Number of steps
        #[arg(short = 'n', long, default_value = "5000")]
        steps: u64,

        /// RNG seed
        #[arg(long, env = "LOAD_TEST_SEED", default_value = "42")]
        seed: u64,

        /// Base URL
        #[arg(short, long, env = "AGGREGATOR_URL", default_value = "http://127.0.0.1:3000")]
        url: String,
    },

    /// List available scenarios
    List {
        /// Scenarios directory
        #[arg(short, long, default_value = "scenarios")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            steps,
            output,
        } => {
            println!("Loading scenario: {}", scenario.display());

            // Load and validate configuration
            let mut config = TestConfig::from_file(&scenario)?;

            // Apply overrides
            if let Some(s) = seed {
                config.seed = s;
            }
            if let Some(n) = steps {
                config.steps = n;
            }

            config.validate()?;

            println!("✓ Configuration loaded successfully");
            println!("  Name: {}", config.name);
            println!("  Description: {}", config.description);
            println!("  Target: {}", config.base_url);
            println!("  Seed: {}", config.seed);
            println!("  Steps: {}", config.steps);
            println!();

            let results = run(config).await?;

            // Output results
            match output.as_str() {
                "json" => {
                    println!("{}", ResultsReport::format_json(&results)?);
                }
                "csv" => {
                    println!("{}", ResultsReport::csv_header());
                    println!("{}", ResultsReport::format_csv(&results));
                }
                _ => {
                    println!("{}", ResultsReport::format_table(&results));
                }
            }

            Ok(())
        }
        Commands::Quick { steps, seed, url } => {
            println!("Running quick test:");
            println!("  Steps: {}", steps);
            println!("  Seed: {}", seed);
            println!("  URL: {}", url);
            println!();

            let config = TestConfig::quick(url, steps, seed);
            config.validate()?;

            let results = run(config).await?;
            println!("{}", ResultsReport::format_table(&results));

            Ok(())
        }
        Commands::List { dir } => {
            println!("Available scenarios in {}:", dir.display());
            println!();

            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    eprintln!("Error reading directory: {}", e);
                    eprintln!("Make sure the directory exists and is readable");
                    return Ok(());
                }
            };

            let mut scenarios = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) != Some("yaml") {
                    continue;
                }
                // Skip files that don't parse as scenarios
                if let Ok(config) = TestConfig::from_file(&path) {
                    let filename = entry.file_name().to_string_lossy().to_string();
                    scenarios.push((filename, config));
                }
            }

            scenarios.sort_by(|a, b| a.0.cmp(&b.0));

            if scenarios.is_empty() {
                println!("No scenario files found");
            } else {
                for (filename, config) in scenarios {
                    println!("  {} - {} (seed {}, {} steps)", filename, config.name, config.seed, config.steps);
                    println!("    {}", config.description);
                    println!();
                }
            }

            Ok(())
        }
    }
}

async fn run(config: TestConfig) -> anyhow::Result<TestResults> {
    let client = HttpAggregationClient::new(
        config.base_url.clone(),
        Duration::from_millis(config.request_timeout_ms),
    )?;
    LoadRunner::new(client, config).with_progress(true).run().await
}
