//! Catchment aggregation and temporal rollups
//!
//! # Organization
//!
//! This module is organized into submodules:
//! - [`operations`]: Periods, period keys and reporting modes
//! - [`catchment`]: Area-weighted aggregation of one flux grid
//! - [`temporal`]: Monthly and annual accumulation of daily records
//! - [`land_cover`]: Per-class accumulators for the land-cover variant

pub mod catchment;
pub mod land_cover;
pub mod operations;
pub mod temporal;

// Re-export the main types and functions for convenience
pub use catchment::{aggregate, aggregate_by_class, DailyAggregator, DailyRecord};
pub use land_cover::LandCoverAccumulators;
pub use operations::{Period, PeriodKey, ReportingMode};
pub use temporal::{FinalizedRecord, PeriodAccumulator, TemporalAccumulator};
