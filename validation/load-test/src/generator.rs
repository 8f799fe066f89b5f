//! Seeded workload generation.
//!
//! Every random draw of a run comes from one generator, in step order, so the
//! generated workload is fixed by the seed no matter how the resulting calls
//! interleave once dispatched.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::ValueBounds;

/// Steps between average queries.
pub const AVERAGE_EVERY: u64 = 10;

/// Steps between chained memory samples.
pub const MEMORY_SAMPLE_EVERY: u64 = 500;

/// The calls issued for one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadStep {
    pub index: u64,
    pub region: String,
    pub city: String,
    pub temperature: i32,
    pub humidity: u32,
    /// Region to query the average of, on every [`AVERAGE_EVERY`]th step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_region: Option<String>,
    /// Sample server memory once the average query settles.
    pub sample_memory: bool,
}

/// Draws workload steps from a single seeded [`ChaCha8Rng`].
pub struct WorkloadGenerator {
    rng: ChaCha8Rng,
    bounds: ValueBounds,
}

impl WorkloadGenerator {
    pub fn new(seed: u64, bounds: ValueBounds) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            bounds,
        }
    }

    /// Draw step `index`: region, city, temperature, humidity, then the
    /// average region when the step queries one.
    pub fn next_step(&mut self, index: u64) -> WorkloadStep {
        let region = draw_region(&mut self.rng, &self.bounds);
        let city = draw_city(&mut self.rng, &self.bounds);
        let temperature = self
            .rng
            .gen_range(self.bounds.temperature_min..=self.bounds.temperature_max);
        let humidity = self
            .rng
            .gen_range(self.bounds.humidity_min..=self.bounds.humidity_max);

        let average_region = if index % AVERAGE_EVERY == 0 {
            Some(draw_region(&mut self.rng, &self.bounds))
        } else {
            None
        };
        let sample_memory = average_region.is_some() && index % MEMORY_SAMPLE_EVERY == 0;

        WorkloadStep {
            index,
            region,
            city,
            temperature,
            humidity,
            average_region,
            sample_memory,
        }
    }

    /// Region for the post-run average query.
    pub fn final_region(&mut self) -> String {
        draw_region(&mut self.rng, &self.bounds)
    }

    /// The first `steps` steps, in order.
    pub fn plan(&mut self, steps: u64) -> Vec<WorkloadStep> {
        (0..steps).map(|i| self.next_step(i)).collect()
    }
}

fn draw_region(rng: &mut ChaCha8Rng, bounds: &ValueBounds) -> String {
    region_name(rng.gen_range(0..bounds.regions))
}

fn draw_city(rng: &mut ChaCha8Rng, bounds: &ValueBounds) -> String {
    city_name(rng.gen_range(0..bounds.cities))
}

/// `0` is `A`, `25` is `Z`.
pub fn region_name(index: u32) -> String {
    char::from(b'A' + (index % 26) as u8).to_string()
}

pub fn city_name(index: u32) -> String {
    format!("city-{:03}", index)
}
