//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (SnapshotStore, ChildLoader)
//! but are themselves concrete structs, not traits.

mod org_chart;

pub use org_chart::{LoadOutcome, LoadStatus, OrgChartService, Outcome};
