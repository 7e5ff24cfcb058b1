//! Process-wide tracing setup shared by the binaries.

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use crate::tracing::{DEFAULT_FILTER, LogFormat, init};
