//! Centralized error handling for catchment_flux
//!
//! Every fallible operation in the crate returns [`Result`], so callers can
//! match on the concrete failure (grid misalignment, empty catchment, a gap in
//! the time series) instead of inspecting strings.

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for catchment_flux operations
#[derive(Debug, Error)]
pub enum CatchmentError {
    /// Two grids that must share a georeference do not
    #[error("Grid mismatch ({context}): expected {expected}, found {found}")]
    GridMismatch {
        context: String,
        expected: String,
        found: String,
    },

    /// The catchment mask selects no cells
    #[error("Catchment mask selects no cells")]
    EmptyCatchment,

    /// A cell inside the catchment has no usable area
    #[error("Invalid cell area {value} at row {row}, column {col} inside the catchment")]
    InvalidCellArea { row: usize, col: usize, value: f64 },

    /// A flux cell inside the catchment holds no data
    #[error("No flux data on {date} at row {row}, column {col} inside the catchment")]
    NoDataInCatchment {
        date: NaiveDate,
        row: usize,
        col: usize,
    },

    /// Daily records arrived out of chronological order
    #[error("Out-of-order record: {received} arrived after {previous}")]
    OutOfOrder {
        previous: NaiveDate,
        received: NaiveDate,
    },

    /// The data source has no grid for the requested date
    #[error("No time step for {date} in variable '{variable}' of {dataset}")]
    MissingTimestep {
        dataset: String,
        variable: String,
        date: NaiveDate,
    },

    /// The data source could not be opened or decoded
    #[error("Dataset {dataset} is unreadable: {reason}")]
    DatasetUnreadable { dataset: String, reason: String },

    /// Variable not found in NetCDF file
    #[error("Variable '{var}' not found in file")]
    VariableNotFound { var: String },

    /// Dimension not found in variable
    #[error("Dimension '{dim}' not found in variable '{var}'")]
    DimensionNotFound { var: String, dim: String },

    /// Time axis units that cannot be decoded into calendar dates
    #[error("Unsupported time units '{units}'")]
    InvalidTimeUnits { units: String },

    /// A time coordinate that is missing or outside the representable range
    #[error("Time value {value} at index {index} of '{variable}' is not a valid date")]
    InvalidTimeValue {
        variable: String,
        index: usize,
        value: f64,
    },

    /// Land-cover aggregation requested on a catalog without classes
    #[error("Grid catalog has no land-cover classes")]
    MissingLandCover,

    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDFError(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration parsing errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),
}

/// Result type alias for catchment_flux operations
pub type Result<T> = std::result::Result<T, CatchmentError>;
