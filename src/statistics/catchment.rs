//! Catchment-wide aggregation of one time step
//!
//! A flux grid is masked to the catchment, each cell is converted to an
//! absolute amount with its own area, and the amounts are summed in row-major
//! order. The catchment average divides that total by the catchment area, so
//! large cells weigh more than small ones.

use crate::catalog::GridCatalog;
use crate::errors::{CatchmentError, Result};
use crate::grid::Grid;
use crate::units::UnitConversion;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Catchment result for one time step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// Absolute amount over the catchment (e.g. kg/day)
    pub catchment_total: f64,
    /// Depth over the catchment (e.g. mm/day)
    pub catchment_average: f64,
}

/// Aggregates daily flux grids against one catalog and conversion
pub struct DailyAggregator<'a, C: UnitConversion + ?Sized> {
    catalog: &'a GridCatalog,
    conversion: &'a C,
}

impl<'a, C: UnitConversion + ?Sized> DailyAggregator<'a, C> {
    pub fn new(catalog: &'a GridCatalog, conversion: &'a C) -> Self {
        Self {
            catalog,
            conversion,
        }
    }

    pub fn aggregate(&self, date: NaiveDate, flux: &Grid<f64>) -> Result<DailyRecord> {
        aggregate(date, flux, self.catalog, self.conversion)
    }

    pub fn aggregate_by_class(
        &self,
        date: NaiveDate,
        flux: &Grid<f64>,
    ) -> Result<BTreeMap<i32, DailyRecord>> {
        aggregate_by_class(date, flux, self.catalog, self.conversion)
    }
}

/// Area-weighted catchment total and average of one flux grid.
///
/// Cells outside the catchment are ignored. A non-finite flux inside the
/// catchment fails with [`CatchmentError::NoDataInCatchment`].
pub fn aggregate<C: UnitConversion + ?Sized>(
    date: NaiveDate,
    flux: &Grid<f64>,
    catalog: &GridCatalog,
    conversion: &C,
) -> Result<DailyRecord> {
    catalog.mask().ensure_aligned(flux, "flux vs catchment")?;
    let catchment_area = catalog.catchment_area()?;

    let mut catchment_total = 0.0f64;
    for (row, col, area) in catalog.masked_cells() {
        let value = masked_flux(date, flux, row, col)?;
        catchment_total += conversion.cell_total(value, area);
    }

    Ok(DailyRecord {
        date,
        catchment_total,
        catchment_average: conversion.average(catchment_total, catchment_area),
    })
}

/// Per land-cover class totals and averages of one flux grid.
///
/// Each class average divides by the area that class covers inside the
/// catchment. Catchment cells without a class are skipped.
pub fn aggregate_by_class<C: UnitConversion + ?Sized>(
    date: NaiveDate,
    flux: &Grid<f64>,
    catalog: &GridCatalog,
    conversion: &C,
) -> Result<BTreeMap<i32, DailyRecord>> {
    catalog.mask().ensure_aligned(flux, "flux vs catchment")?;
    let land_cover = catalog
        .land_cover()
        .ok_or(CatchmentError::MissingLandCover)?;

    // class -> (total, area)
    let mut sums: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for (row, col, area) in catalog.masked_cells() {
        let Some(class) = land_cover.values()[[row, col]] else {
            continue;
        };
        let value = masked_flux(date, flux, row, col)?;
        let entry = sums.entry(class).or_insert((0.0, 0.0));
        entry.0 += conversion.cell_total(value, area);
        entry.1 += area;
    }

    Ok(sums
        .into_iter()
        .map(|(class, (total, area))| {
            let record = DailyRecord {
                date,
                catchment_total: total,
                catchment_average: conversion.average(total, area),
            };
            (class, record)
        })
        .collect())
}

fn masked_flux(date: NaiveDate, flux: &Grid<f64>, row: usize, col: usize) -> Result<f64> {
    let value = flux.values()[[row, col]];
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CatchmentError::NoDataInCatchment { date, row, col })
    }
}
