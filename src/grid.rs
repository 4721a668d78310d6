//! Georeferenced 2-D grids
//!
//! A [`Grid`] couples an `ndarray` array with the [`GeoReference`] that places
//! it on the earth. Rows run north to south and columns west to east, so the
//! origin is the north-west corner of the first cell. Every grid the core
//! consumes (catchment mask, cell area, daily flux) must share one
//! georeference; [`Grid::ensure_aligned`] is the single place that checks it.

use crate::errors::{CatchmentError, Result};
use ndarray::Array2;
use std::fmt;

/// Mean earth radius (m) used for spherical cell areas
pub const EARTH_RADIUS_M: f64 = 6_371_007.2;

/// Relative tolerance, in cell sizes, for comparing georeferences read from
/// floating point coordinate variables
const GEOREF_TOLERANCE: f64 = 1e-6;

/// Relative tolerance on the step between consecutive coordinates
const SPACING_TOLERANCE: f64 = 1e-4;

/// Placement and resolution of a regular grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    /// X coordinate of the western edge
    pub x_origin: f64,
    /// Y coordinate of the northern edge
    pub y_origin: f64,
    /// Cell size along x
    pub cell_width: f64,
    /// Cell size along y (positive, rows advance southwards)
    pub cell_height: f64,
    pub rows: usize,
    pub cols: usize,
}

impl GeoReference {
    /// Create a georeference, rejecting empty or degenerate grids
    pub fn new(
        x_origin: f64,
        y_origin: f64,
        cell_width: f64,
        cell_height: f64,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(CatchmentError::Config(format!(
                "grid must have at least one row and column, got {rows}x{cols}"
            )));
        }
        if !(cell_width.is_finite() && cell_width > 0.0 && cell_height.is_finite() && cell_height > 0.0)
        {
            return Err(CatchmentError::Config(format!(
                "cell size must be positive, got {cell_width} x {cell_height}"
            )));
        }
        Ok(Self {
            x_origin,
            y_origin,
            cell_width,
            cell_height,
            rows,
            cols,
        })
    }

    /// Build a georeference from cell-centre coordinate vectors.
    ///
    /// `x` must be strictly increasing. `y` may run either way; the returned
    /// flag is `true` when it increases (south to north), in which case data
    /// rows have to be reversed to become north-up.
    pub fn from_cell_centers(x: &[f64], y: &[f64]) -> Result<(Self, bool)> {
        Self::from_cell_centers_with_sizes(x, y, None, None)
    }

    /// Like [`GeoReference::from_cell_centers`], with cell sizes for axes that
    /// hold a single coordinate.
    ///
    /// A single-coordinate axis takes its size from `x_size` / `y_size`, and
    /// failing that from the other axis (square cells).
    pub fn from_cell_centers_with_sizes(
        x: &[f64],
        y: &[f64],
        x_size: Option<f64>,
        y_size: Option<f64>,
    ) -> Result<(Self, bool)> {
        let x_step = regular_spacing(x, "x")?;
        if x_step.is_some_and(|step| step <= 0.0) {
            return Err(CatchmentError::Config(
                "x coordinates must increase from west to east".to_string(),
            ));
        }
        let y_step = regular_spacing(y, "y")?;
        let south_to_north = y_step.is_some_and(|step| step > 0.0);

        let x_own = x_step.or(x_size);
        let y_own = y_step.map(f64::abs).or(y_size);
        let (cell_width, cell_height) = match (x_own, y_own) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w),
            (None, Some(h)) => (h, h),
            (None, None) => {
                return Err(CatchmentError::Config(
                    "a single cell has no inferable size; give the coordinates bounds".to_string(),
                ))
            }
        };
        let north = y[0].max(y[y.len() - 1]);

        let georef = Self::new(
            x[0] - cell_width / 2.0,
            north + cell_height / 2.0,
            cell_width,
            cell_height,
            y.len(),
            x.len(),
        )?;
        Ok((georef, south_to_north))
    }

    /// Grid shape as `(rows, cols)`
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of cells
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows * self.cols
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of the centre of a cell
    #[must_use]
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.x_origin + (col as f64 + 0.5) * self.cell_width,
            self.y_origin - (row as f64 + 0.5) * self.cell_height,
        )
    }

    /// Corner coordinates in the order north-west, north-east, south-east, south-west
    #[must_use]
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (west, south, east, north) = self.extent();
        [(west, north), (east, north), (east, south), (west, south)]
    }

    /// Bounding box as `(west, south, east, north)`
    #[must_use]
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let east = self.x_origin + self.cols as f64 * self.cell_width;
        let south = self.y_origin - self.rows as f64 * self.cell_height;
        (self.x_origin, south, east, self.y_origin)
    }

    /// Whether two georeferences describe the same cells
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        let tol_x = GEOREF_TOLERANCE * self.cell_width;
        let tol_y = GEOREF_TOLERANCE * self.cell_height;
        self.rows == other.rows
            && self.cols == other.cols
            && (self.cell_width - other.cell_width).abs() <= tol_x
            && (self.cell_height - other.cell_height).abs() <= tol_y
            && (self.x_origin - other.x_origin).abs() <= tol_x
            && (self.y_origin - other.y_origin).abs() <= tol_y
    }

    /// Fail with [`CatchmentError::GridMismatch`] unless `other` matches
    pub fn ensure_matches(&self, other: &Self, context: &str) -> Result<()> {
        if self.matches(other) {
            Ok(())
        } else {
            Err(CatchmentError::GridMismatch {
                context: context.to_string(),
                expected: self.to_string(),
                found: other.to_string(),
            })
        }
    }

    /// Cell areas (m²) for a geographic grid in degrees, on a sphere
    ///
    /// Each cell covers `R² · Δλ · (sin φ_north − sin φ_south)`.
    pub fn spherical_cell_areas(&self) -> Result<Grid<f64>> {
        let (_, south, _, north) = self.extent();
        if north > 90.0 + GEOREF_TOLERANCE || south < -90.0 - GEOREF_TOLERANCE {
            return Err(CatchmentError::Config(format!(
                "latitudes {south}..{north} are outside [-90, 90]; spherical cell areas need a geographic grid"
            )));
        }

        let d_lambda = self.cell_width.to_radians();
        let values = Array2::from_shape_fn(self.shape(), |(row, _)| {
            let lat_north = (self.y_origin - row as f64 * self.cell_height).min(90.0);
            let lat_south = (lat_north - self.cell_height).max(-90.0);
            EARTH_RADIUS_M
                * EARTH_RADIUS_M
                * d_lambda
                * (lat_north.to_radians().sin() - lat_south.to_radians().sin())
        });
        Grid::new(*self, values)
    }
}

impl fmt::Display for GeoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} cells of {}x{} from ({}, {})",
            self.rows, self.cols, self.cell_width, self.cell_height, self.x_origin, self.y_origin
        )
    }
}

/// Spacing of a regularly spaced coordinate vector (signed), `None` for a
/// single coordinate
fn regular_spacing(coords: &[f64], axis: &str) -> Result<Option<f64>> {
    match coords {
        [] => {
            return Err(CatchmentError::Config(format!(
                "{axis} axis has no coordinates"
            )))
        }
        [_] => return Ok(None),
        _ => {}
    }
    let step = (coords[coords.len() - 1] - coords[0]) / (coords.len() - 1) as f64;
    if step == 0.0 || !step.is_finite() {
        return Err(CatchmentError::Config(format!(
            "{axis} coordinates do not advance"
        )));
    }
    let tolerance = SPACING_TOLERANCE * step.abs();
    for pair in coords.windows(2) {
        if ((pair[1] - pair[0]) - step).abs() > tolerance {
            return Err(CatchmentError::Config(format!(
                "{axis} coordinates are not regularly spaced ({} -> {})",
                pair[0], pair[1]
            )));
        }
    }
    Ok(Some(step))
}

/// Immutable 2-D array of cell values with its georeference
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    georef: GeoReference,
    values: Array2<T>,
}

impl<T> Grid<T> {
    /// Wrap an array, checking its shape against the georeference
    pub fn new(georef: GeoReference, values: Array2<T>) -> Result<Self> {
        if values.dim() != georef.shape() {
            return Err(CatchmentError::GridMismatch {
                context: "array shape".to_string(),
                expected: format!("{:?}", georef.shape()),
                found: format!("{:?}", values.dim()),
            });
        }
        Ok(Self { georef, values })
    }

    /// Build a grid from row-major values
    pub fn from_shape_vec(georef: GeoReference, values: Vec<T>) -> Result<Self> {
        let values = Array2::from_shape_vec(georef.shape(), values)?;
        Ok(Self { georef, values })
    }

    #[must_use]
    pub const fn georef(&self) -> &GeoReference {
        &self.georef
    }

    #[must_use]
    pub const fn values(&self) -> &Array2<T> {
        &self.values
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.values.get((row, col))
    }

    /// Fail with [`CatchmentError::GridMismatch`] unless `other` sits on the same cells
    pub fn ensure_aligned<U>(&self, other: &Grid<U>, context: &str) -> Result<()> {
        self.georef.ensure_matches(&other.georef, context)
    }

    /// Apply `f` to every cell, keeping the georeference
    #[must_use]
    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        F: FnMut(&T) -> U,
    {
        Grid {
            georef: self.georef,
            values: self.values.map(f),
        }
    }
}

/// Raster of category codes; `None` marks no-data cells
pub type CategoryGrid = Grid<Option<i32>>;
