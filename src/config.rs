//! Run configuration
//!
//! A run is described by one immutable [`RunConfig`], loaded from JSON and
//! passed explicitly to the pipeline.
//!
//! ```json
//! {
//!   "start_date": "1979-01-01",
//!   "end_date": "1979-12-31",
//!   "catchment": { "file": "catchment.nc", "variable": "catchment", "id": 3 },
//!   "cell_area": "spherical",
//!   "flux": { "file": "runoff.nc", "variable": "ro" },
//!   "conversion": { "sign": 1.0 },
//!   "rollup": { "annual": true, "mode": "average" },
//!   "output": { "daily_txt": "out/daily.txt", "monthly_txt": "out/monthly.txt" }
//! }
//! ```

use crate::errors::{CatchmentError, Result};
use crate::pipeline::RunOptions;
use crate::statistics::ReportingMode;
use crate::units::DepthConversion;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A variable inside a NetCDF file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetVariable {
    pub file: PathBuf,
    pub variable: String,
}

/// Boundary raster, optionally restricted to one catchment id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchmentConfig {
    pub file: PathBuf,
    pub variable: String,
    /// Keep only cells carrying this category; all defined cells otherwise
    #[serde(default)]
    pub id: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellAreaMethod {
    /// Derived from the georeference on a sphere
    Spherical,
}

/// Where cell areas come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellAreaSpec {
    Variable(DatasetVariable),
    Derived(CellAreaMethod),
}

impl Default for CellAreaSpec {
    fn default() -> Self {
        Self::Derived(CellAreaMethod::Spherical)
    }
}

fn default_time_variable() -> String {
    "time".to_string()
}

/// Daily flux dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxConfig {
    pub file: PathBuf,
    pub variable: String,
    #[serde(default = "default_time_variable")]
    pub time_variable: String,
}

/// Which period rollups run and how they reduce
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RollupConfig {
    /// Run an annual rollup next to the monthly one
    pub annual: bool,
    pub mode: ReportingMode,
}

/// Report destinations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub daily_txt: PathBuf,
    #[serde(default)]
    pub monthly_txt: Option<PathBuf>,
    #[serde(default)]
    pub annual_txt: Option<PathBuf>,
    /// Per-class period records, written when land cover is configured
    #[serde(default)]
    pub land_cover_txt: Option<PathBuf>,
    #[serde(default)]
    pub netcdf: Option<PathBuf>,
}

impl OutputConfig {
    /// Every configured output path
    pub fn paths(&self) -> impl Iterator<Item = &Path> + '_ {
        std::iter::once(self.daily_txt.as_path()).chain(
            [
                &self.monthly_txt,
                &self.annual_txt,
                &self.land_cover_txt,
                &self.netcdf,
            ]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path),
        )
    }

    /// Move every output into `dir`, keeping file names
    #[must_use]
    pub fn relocated(&self, dir: &Path) -> Self {
        let move_to = |path: &PathBuf| match path.file_name() {
            Some(name) => dir.join(name),
            None => dir.join(path),
        };
        Self {
            daily_txt: move_to(&self.daily_txt),
            monthly_txt: self.monthly_txt.as_ref().map(move_to),
            annual_txt: self.annual_txt.as_ref().map(move_to),
            land_cover_txt: self.land_cover_txt.as_ref().map(move_to),
            netcdf: self.netcdf.as_ref().map(move_to),
        }
    }
}

/// Complete description of one catchment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub catchment: CatchmentConfig,
    #[serde(default)]
    pub cell_area: CellAreaSpec,
    pub flux: FluxConfig,
    #[serde(default)]
    pub conversion: DepthConversion,
    #[serde(default)]
    pub rollup: RollupConfig,
    #[serde(default)]
    pub land_cover: Option<DatasetVariable>,
    pub output: OutputConfig,
}

impl RunConfig {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(CatchmentError::Config(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.catchment.variable.is_empty() || self.flux.variable.is_empty() {
            return Err(CatchmentError::Config(
                "catchment and flux variables must be named".to_string(),
            ));
        }
        self.conversion.validate()?;

        let paths: Vec<&Path> = self.output.paths().collect();
        for (i, path) in paths.iter().enumerate() {
            if paths[..i].contains(path) {
                return Err(CatchmentError::Config(format!(
                    "output {} is configured twice",
                    path.display()
                )));
            }
        }
        if self.output.land_cover_txt.is_some() && self.land_cover.is_none() {
            return Err(CatchmentError::Config(
                "land_cover_txt requires a land_cover dataset".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply command-line overrides and validate again
    pub fn with_overrides(
        mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        output_dir: Option<&Path>,
    ) -> Result<Self> {
        if let Some(start) = start {
            self.start_date = start;
        }
        if let Some(end) = end {
            self.end_date = end;
        }
        if let Some(dir) = output_dir {
            self.output = self.output.relocated(dir);
        }
        self.validate()?;
        Ok(self)
    }

    /// Every date of the run, inclusive
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        RunOptions::from(self).dates()
    }
}

