//! Data source abstraction for the run's external inputs
//!
//! The core never opens files itself. Boundary rasters and daily flux grids
//! come through these traits, so the NetCDF readers in [`crate::netcdf_io`]
//! and the in-memory source used in tests are interchangeable.

use crate::errors::{CatchmentError, Result};
use crate::grid::{CategoryGrid, GeoReference, Grid};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Supplies one flux grid per date
pub trait FluxSource {
    /// Identifier of the dataset, used in error messages
    fn dataset(&self) -> &str;

    /// Name of the flux variable
    fn variable(&self) -> &str;

    /// Georeference every returned grid sits on
    fn georef(&self) -> &GeoReference;

    /// Flux grid for `date`.
    ///
    /// Fails with [`CatchmentError::MissingTimestep`] when the dataset has no
    /// such date, and with [`CatchmentError::DatasetUnreadable`] when it cannot
    /// be read at all.
    fn flux_at(&mut self, date: NaiveDate) -> Result<Grid<f64>>;
}

/// Supplies a rasterized boundary already aligned to the target grid
pub trait BoundarySource {
    fn categories(&self) -> Result<CategoryGrid>;
}

impl BoundarySource for CategoryGrid {
    fn categories(&self) -> Result<CategoryGrid> {
        Ok(self.clone())
    }
}

/// Flux grids held in memory, keyed by date
#[derive(Debug, Clone)]
pub struct InMemoryFluxSource {
    dataset: String,
    variable: String,
    georef: GeoReference,
    grids: BTreeMap<NaiveDate, Grid<f64>>,
}

impl InMemoryFluxSource {
    #[must_use]
    pub fn new(dataset: &str, variable: &str, georef: GeoReference) -> Self {
        Self {
            dataset: dataset.to_string(),
            variable: variable.to_string(),
            georef,
            grids: BTreeMap::new(),
        }
    }

    /// Add or replace the grid for `date`
    pub fn insert(&mut self, date: NaiveDate, grid: Grid<f64>) -> Result<()> {
        self.georef
            .ensure_matches(grid.georef(), "in-memory flux grid")?;
        self.grids.insert(date, grid);
        Ok(())
    }

    /// Builder-style [`InMemoryFluxSource::insert`]
    pub fn with_grid(mut self, date: NaiveDate, grid: Grid<f64>) -> Result<Self> {
        self.insert(date, grid)?;
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}

impl FluxSource for InMemoryFluxSource {
    fn dataset(&self) -> &str {
        &self.dataset
    }

    fn variable(&self) -> &str {
        &self.variable
    }

    fn georef(&self) -> &GeoReference {
        &self.georef
    }

    fn flux_at(&mut self, date: NaiveDate) -> Result<Grid<f64>> {
        self.grids
            .get(&date)
            .cloned()
            .ok_or_else(|| CatchmentError::MissingTimestep {
                dataset: self.dataset.clone(),
                variable: self.variable.clone(),
                date,
            })
    }
}
