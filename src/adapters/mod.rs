//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `analytics` - Usage event sinks (tracing, in-memory)
//! - `http` - REST API surface (axum)
//! - `jobs` - Background maintenance loop
//! - `memory` - In-memory port implementations for tests and local runs
//! - `postgres` - PostgreSQL-backed stores (sqlx)
//! - `stripe` - Payment provider webhook verification

pub mod analytics;
pub mod http;
pub mod jobs;
pub mod memory;
pub mod postgres;
pub mod stripe;
