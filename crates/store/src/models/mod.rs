//! Persisted records and request DTOs.

pub mod agent;
pub mod job;
