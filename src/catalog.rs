//! Catchment mask and cell areas for one run
//!
//! The [`GridCatalog`] is built once at startup. It owns the catchment mask,
//! the cell-area grid and, for the evapotranspiration variant, the land-cover
//! classes. Catchment area is summed lazily and cached for the lifetime of the
//! catalog.

use crate::errors::{CatchmentError, Result};
use crate::grid::{CategoryGrid, GeoReference, Grid};
use std::cell::OnceCell;
use std::collections::BTreeMap;

/// Static grids shared by every time step of a run
#[derive(Debug)]
pub struct GridCatalog {
    mask: Grid<bool>,
    cell_area: Grid<f64>,
    land_cover: Option<CategoryGrid>,
    catchment_area: OnceCell<f64>,
}

impl GridCatalog {
    /// Build a catalog where every defined boundary cell is inside the catchment
    pub fn build(boundary: &CategoryGrid, cell_area: Grid<f64>) -> Result<Self> {
        Self::from_mask(boundary.map(Option::is_some), cell_area)
    }

    /// Build a catalog for the cells of `boundary` carrying category `id`
    pub fn build_for_id(boundary: &CategoryGrid, id: i32, cell_area: Grid<f64>) -> Result<Self> {
        Self::from_mask(boundary.map(|code| *code == Some(id)), cell_area)
    }

    /// Build a catalog from an explicit mask
    ///
    /// Every masked cell must have a finite, positive area.
    pub fn from_mask(mask: Grid<bool>, cell_area: Grid<f64>) -> Result<Self> {
        mask.ensure_aligned(&cell_area, "cell area vs catchment")?;

        for ((row, col), inside) in mask.values().indexed_iter() {
            let area = cell_area.values()[[row, col]];
            if *inside && !(area.is_finite() && area > 0.0) {
                return Err(CatchmentError::InvalidCellArea {
                    row,
                    col,
                    value: area,
                });
            }
        }

        Ok(Self {
            mask,
            cell_area,
            land_cover: None,
            catchment_area: OnceCell::new(),
        })
    }

    /// Attach land-cover classes on the same grid
    pub fn with_land_cover(mut self, land_cover: CategoryGrid) -> Result<Self> {
        self.mask
            .ensure_aligned(&land_cover, "land cover vs catchment")?;
        self.land_cover = Some(land_cover);
        Ok(self)
    }

    #[must_use]
    pub const fn georef(&self) -> &GeoReference {
        self.mask.georef()
    }

    #[must_use]
    pub const fn mask(&self) -> &Grid<bool> {
        &self.mask
    }

    #[must_use]
    pub const fn cell_area(&self) -> &Grid<f64> {
        &self.cell_area
    }

    #[must_use]
    pub const fn land_cover(&self) -> Option<&CategoryGrid> {
        self.land_cover.as_ref()
    }

    /// Number of cells inside the catchment
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.mask.values().iter().filter(|inside| **inside).count()
    }

    /// Catchment cells in row-major order as `(row, col, area)`
    pub fn masked_cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.mask
            .values()
            .indexed_iter()
            .filter(|(_, inside)| **inside)
            .map(|((row, col), _)| (row, col, self.cell_area.values()[[row, col]]))
    }

    /// Total catchment area (m²), summed on first call and cached
    pub fn catchment_area(&self) -> Result<f64> {
        if let Some(area) = self.catchment_area.get() {
            return Ok(*area);
        }

        let mut cells = 0usize;
        let mut area = 0.0f64;
        for (_, _, cell) in self.masked_cells() {
            area += cell;
            cells += 1;
        }
        if cells == 0 {
            return Err(CatchmentError::EmptyCatchment);
        }

        log::debug!("Catchment covers {cells} cells, {area:.1} m²");
        Ok(*self.catchment_area.get_or_init(|| area))
    }

    /// Area (m²) of each land-cover class inside the catchment
    ///
    /// Masked cells without a class are left out.
    pub fn land_cover_areas(&self) -> Result<BTreeMap<i32, f64>> {
        let land_cover = self
            .land_cover
            .as_ref()
            .ok_or(CatchmentError::MissingLandCover)?;

        let mut areas = BTreeMap::new();
        for (row, col, area) in self.masked_cells() {
            if let Some(class) = land_cover.values()[[row, col]] {
                *areas.entry(class).or_insert(0.0) += area;
            }
        }
        Ok(areas)
    }
}
