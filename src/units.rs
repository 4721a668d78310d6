//! Flux unit conversions
//!
//! Gridded fluxes arrive as densities (kg·m⁻²·s⁻¹). Aggregation turns each
//! catchment cell into an absolute amount per time step, sums those, and
//! expresses the sum back as a depth over the catchment. A [`UnitConversion`]
//! owns both directions, including any sign correction for fields that are
//! defined negative-downward.

use crate::errors::{CatchmentError, Result};
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const WATER_DENSITY_KG_M3: f64 = 1_000.0;
pub const MM_PER_METRE: f64 = 1_000.0;

/// Conversion between flux density, absolute amount and catchment depth
pub trait UnitConversion {
    /// Absolute amount for one cell over one time step
    fn cell_total(&self, flux: f64, cell_area: f64) -> f64;

    /// Depth over `area` equivalent to an absolute amount
    fn average(&self, total: f64, area: f64) -> f64;

    /// Flux density whose catchment depth is `average`
    fn flux_for_average(&self, average: f64) -> f64;

    /// Units of [`UnitConversion::cell_total`] results
    fn total_units(&self) -> String;

    /// Units of [`UnitConversion::average`] results
    fn average_units(&self) -> String;
}

/// Mass flux to depth conversion with an explicit sign
///
/// With the defaults a runoff field in kg·m⁻²·s⁻¹ becomes kg/day per cell and
/// mm/day over the catchment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConversion {
    /// Length of one time step
    pub seconds_per_step: f64,
    /// Density (kg/m³) turning mass into volume
    pub density: f64,
    /// Depth units per metre (1000 for mm)
    pub depth_per_metre: f64,
    /// +1 keeps the source sign, -1 flips negative-downward fields
    pub sign: f64,
}

impl DepthConversion {
    /// kg·m⁻²·s⁻¹ to kg/day and mm/day
    #[must_use]
    pub const fn runoff_mm_per_day() -> Self {
        Self {
            seconds_per_step: SECONDS_PER_DAY,
            density: WATER_DENSITY_KG_M3,
            depth_per_metre: MM_PER_METRE,
            sign: 1.0,
        }
    }

    /// Same conversion with the sign flipped
    #[must_use]
    pub fn negated(self) -> Self {
        Self {
            sign: -self.sign,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.seconds_per_step) {
            return Err(CatchmentError::Config(format!(
                "seconds_per_step must be positive, got {}",
                self.seconds_per_step
            )));
        }
        if !positive(self.density) {
            return Err(CatchmentError::Config(format!(
                "density must be positive, got {}",
                self.density
            )));
        }
        if !positive(self.depth_per_metre) {
            return Err(CatchmentError::Config(format!(
                "depth_per_metre must be positive, got {}",
                self.depth_per_metre
            )));
        }
        if self.sign != 1.0 && self.sign != -1.0 {
            return Err(CatchmentError::Config(format!(
                "sign must be 1 or -1, got {}",
                self.sign
            )));
        }
        Ok(())
    }

    fn step_label(&self) -> String {
        if self.seconds_per_step == SECONDS_PER_DAY {
            "day-1".to_string()
        } else {
            format!("({} s)-1", self.seconds_per_step)
        }
    }
}

impl Default for DepthConversion {
    fn default() -> Self {
        Self::runoff_mm_per_day()
    }
}

impl UnitConversion for DepthConversion {
    fn cell_total(&self, flux: f64, cell_area: f64) -> f64 {
        self.sign * flux * cell_area * self.seconds_per_step
    }

    fn average(&self, total: f64, area: f64) -> f64 {
        total / (self.density * area) * self.depth_per_metre
    }

    fn flux_for_average(&self, average: f64) -> f64 {
        self.sign * average * self.density / (self.depth_per_metre * self.seconds_per_step)
    }

    fn total_units(&self) -> String {
        format!("kg {}", self.step_label())
    }

    fn average_units(&self) -> String {
        let depth = if self.depth_per_metre == MM_PER_METRE {
            "mm".to_string()
        } else if self.depth_per_metre == 1.0 {
            "m".to_string()
        } else {
            format!("m/{}", self.depth_per_metre)
        };
        format!("{depth} {}", self.step_label())
    }
}
