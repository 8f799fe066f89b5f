//! HTTP request handlers for the aggregation API.

pub mod health;
pub mod memory;
pub mod readings;
