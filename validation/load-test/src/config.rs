//! Configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default seed for reproducible runs.
pub const DEFAULT_SEED: u64 = 42;

/// Default number of workload steps.
pub const DEFAULT_STEPS: u64 = 5000;

/// Main test configuration loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_url: String,
    #[serde(default = "default_steps")]
    pub steps: u64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub bounds: ValueBounds,
    #[serde(default)]
    pub workload_log: Option<PathBuf>, // Generated steps as JSON lines, written before dispatch
}

/// Ranges the generator draws from. All bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueBounds {
    /// Number of regions; region `i` is named by the `i`-th capital letter.
    pub regions: u32,
    /// Number of cities; city `i` is named `city-NNN`.
    pub cities: u32,
    pub temperature_min: i32,
    pub temperature_max: i32,
    pub humidity_min: u32,
    pub humidity_max: u32,
}

impl Default for ValueBounds {
    fn default() -> Self {
        Self {
            regions: 26,
            cities: 256,
            temperature_min: -25,
            temperature_max: 35,
            humidity_min: 0,
            humidity_max: 100,
        }
    }
}

fn default_steps() -> u64 {
    DEFAULT_STEPS
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl TestConfig {
    /// Configuration for a run against `base_url` with default bounds.
    pub fn quick(base_url: impl Into<String>, steps: u64, seed: u64) -> Self {
        Self {
            name: "quick".to_string(),
            description: "Quick smoke test".to_string(),
            base_url: base_url.into(),
            steps,
            seed,
            request_timeout_ms: default_request_timeout_ms(),
            bounds: ValueBounds::default(),
            workload_log: None,
        }
    }

    /// Load configuration from YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TestConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base_url must not be empty");
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("request_timeout_ms must be > 0");
        }
        self.bounds.validate()
    }
}

impl ValueBounds {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.regions == 0 || self.regions > 26 {
            anyhow::bail!("regions must be between 1 and 26, got {}", self.regions);
        }
        if self.cities == 0 || self.cities > 1000 {
            anyhow::bail!("cities must be between 1 and 1000, got {}", self.cities);
        }
        if self.temperature_min > self.temperature_max {
            anyhow::bail!(
                "temperature_min ({}) must not exceed temperature_max ({})",
                self.temperature_min,
                self.temperature_max
            );
        }
        if self.humidity_min > self.humidity_max || self.humidity_max > 100 {
            anyhow::bail!(
                "humidity range {}..={} must lie within 0..=100",
                self.humidity_min,
                self.humidity_max
            );
        }
        Ok(())
    }
}
