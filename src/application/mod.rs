//! Application layer - Commands, Queries, and Handlers.
//!
//! Orchestrates the credits and billing domain through the ports,
//! keeping write paths (commands) separate from read paths (queries).

pub mod handlers;
