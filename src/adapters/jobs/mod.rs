//! Background jobs.
//!
//! Long-running tasks spawned at startup alongside the HTTP server.

mod maintenance_sweeper;

pub use maintenance_sweeper::{MaintenanceSweeper, MaintenanceSweeperConfig, SweepSummary};
