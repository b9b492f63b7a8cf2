//! Usage analytics adapters.
//!
//! Implementations of the `UsageAnalytics` port:
//! - `TracingAnalytics`: structured log lines, the production default
//! - `InMemoryAnalytics`: recording sink for tests

mod in_memory;
mod tracing_analytics;

pub use in_memory::InMemoryAnalytics;
pub use tracing_analytics::TracingAnalytics;
