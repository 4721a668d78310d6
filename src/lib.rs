//! catchment_flux: catchment-integrated fluxes from gridded NetCDF data
//!
//! Turns a daily series of gridded flux densities (runoff, evapotranspiration,
//! precipitation) into a catchment time series. Each day the flux grid is
//! masked to the catchment, weighted by cell area, summed to an absolute
//! amount and expressed as a depth over the catchment. Daily records are then
//! rolled up into calendar months and, optionally, years.
//!
//! ## Module Organization
//!
//! - [`grid`]: Georeferences and aligned 2-D grids
//! - [`catalog`]: Catchment mask, cell areas and land-cover classes
//! - [`units`]: Flux to amount to depth conversions
//! - [`statistics`]: Daily aggregation and period rollups
//! - [`data_source`]: Traits for boundary and flux inputs
//! - [`netcdf_io`]: NetCDF readers and the NetCDF report writer
//! - [`report`]: Report sinks (text, NetCDF, memory)
//! - [`config`]: JSON run configuration
//! - [`pipeline`]: The daily loop and its setup
//! - [`metadata`]: Dataset inspection
//! - [`errors`]: Centralized error handling
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use catchment_flux::prelude::*;
//!
//! let config = RunConfig::from_file("run.json").unwrap();
//! let summary = catchment_flux::pipeline::run_from_config(&config).unwrap();
//! println!("{} days over {:.1} km²", summary.days, summary.catchment_area / 1e6);
//! ```
//!
//! In-memory inputs go through the same loop:
//!
//! ```rust
//! use catchment_flux::prelude::*;
//! use chrono::NaiveDate;
//!
//! let georef = GeoReference::new(0.0, 10.0, 10.0, 10.0, 1, 2).unwrap();
//! let boundary = Grid::from_shape_vec(georef, vec![Some(1), Some(1)]).unwrap();
//! let areas = Grid::from_shape_vec(georef, vec![100.0, 300.0]).unwrap();
//! let catalog = GridCatalog::build(&boundary, areas).unwrap();
//!
//! let day = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
//! let flux = Grid::from_shape_vec(georef, vec![0.001, 0.001]).unwrap();
//! let mut source = InMemoryFluxSource::new("memory", "ro", georef)
//!     .with_grid(day, flux)
//!     .unwrap();
//!
//! let options = RunOptions {
//!     start_date: day,
//!     end_date: day,
//!     conversion: DepthConversion::runoff_mm_per_day(),
//!     annual: false,
//!     mode: ReportingMode::Average,
//! };
//! let mut sink = MemoryReportSink::new();
//! run_catchment(&catalog, &mut source, &mut sink, &options).unwrap();
//! assert!((sink.daily[0].catchment_average - 86.4).abs() < 1e-9);
//! ```

// Core modules
pub mod catalog;
pub mod config;
pub mod data_source;
pub mod errors;
pub mod grid;
pub mod metadata;
pub mod netcdf_io;
pub mod pipeline;
pub mod report;
pub mod statistics;
pub mod units;

// Direct re-exports for the public API
pub use catalog::GridCatalog;
pub use errors::{CatchmentError, Result};
pub use grid::{CategoryGrid, GeoReference, Grid};
pub use pipeline::{run_catchment, run_from_config, RunOptions, RunSummary};
pub use statistics::{DailyRecord, FinalizedRecord, Period, ReportingMode};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::catalog::GridCatalog;
    pub use crate::config::RunConfig;
    pub use crate::data_source::{BoundarySource, FluxSource, InMemoryFluxSource};
    pub use crate::errors::{CatchmentError, Result};
    pub use crate::grid::{CategoryGrid, GeoReference, Grid};
    pub use crate::netcdf_io::{NetCDFBoundary, NetCDFFluxSource};
    pub use crate::pipeline::{run_catchment, RunOptions, RunSummary};
    pub use crate::report::{MemoryReportSink, ReportSink, TextReportSink};
    pub use crate::statistics::{
        DailyAggregator, DailyRecord, FinalizedRecord, Period, ReportingMode,
        TemporalAccumulator,
    };
    pub use crate::units::{DepthConversion, UnitConversion};
}
