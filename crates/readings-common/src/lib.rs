//! Common types shared by the readings service, its store and the load generator.

pub mod error;
pub mod reading;

pub use error::{ReadingsError, ReadingsResult};
pub use reading::{Reading, ReadingKey, ReadingUpdate, RegionAverage};
