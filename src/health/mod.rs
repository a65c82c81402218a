// src/health/mod.rs
mod checker;
mod probe;

pub use checker::{HealthChecker, HealthReport};
pub use probe::{probe, ProbeError};
