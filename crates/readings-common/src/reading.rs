//! Reading records, partial updates and region averages.

use serde::{Deserialize, Serialize};

use crate::error::{ReadingsError, ReadingsResult};

/// Maximum length in bytes of a region or city identifier.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Natural key of a reading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadingKey {
    pub region: String,
    pub city: String,
}

impl ReadingKey {
    /// Build a key, rejecting identifiers the store cannot hold.
    pub fn new(region: impl Into<String>, city: impl Into<String>) -> ReadingsResult<Self> {
        let region = region.into();
        let city = city.into();
        validate_identifier("region", &region)?;
        validate_identifier("city", &city)?;
        Ok(Self { region, city })
    }
}

/// Check a region or city identifier.
pub fn validate_identifier(name: &str, value: &str) -> ReadingsResult<()> {
    if value.is_empty() {
        return Err(ReadingsError::MalformedRequest(format!("{} must not be empty", name)));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ReadingsError::MalformedRequest(format!(
            "{} exceeds {} bytes",
            name, MAX_IDENTIFIER_LEN
        )));
    }
    if value.contains('\0') {
        return Err(ReadingsError::MalformedRequest(format!(
            "{} must not contain NUL characters",
            name
        )));
    }
    Ok(())
}

/// The latest observed values for one (region, city) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub region: String,
    pub city: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// A partial reading: each field is either supplied or absent.
///
/// Absent fields are left untouched by an upsert. A JSON `null` is treated
/// the same as a missing field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
}

impl ReadingUpdate {
    pub fn temperature(value: f64) -> Self {
        Self {
            temperature: Some(value),
            humidity: None,
        }
    }

    pub fn humidity(value: f64) -> Self {
        Self {
            temperature: None,
            humidity: Some(value),
        }
    }

    /// True when no field is supplied; applying it only ensures the record exists.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none()
    }
}

/// Per-region means. A mean is `None` when no record in the region has that field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAverage {
    pub region: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    /// Number of records in the region, including those lacking both fields.
    pub readings: u64,
}
