//! NetCDF dataset inspection
//!
//! Summarizes one variable the way a run will see it: units, dimensions, the
//! georeference of its spatial plane and the dates its time axis covers.

use crate::errors::{CatchmentError, Result};
use crate::grid::GeoReference;
use crate::netcdf_io::{attribute_f64, attribute_string, open_dataset, read_time_axis, spatial_georef};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Information about a dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// Dates covered by a time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCoverage {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub steps: usize,
}

/// What a run needs to know about one variable
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub path: PathBuf,
    pub variable: String,
    pub data_type: String,
    pub units: Option<String>,
    pub long_name: Option<String>,
    pub fill_value: Option<f64>,
    pub dimensions: Vec<DimensionInfo>,
    /// `None` when the variable has no usable spatial coordinates
    pub georef: Option<GeoReference>,
    pub south_to_north: bool,
    /// `None` when the leading dimension is not a decodable time axis
    pub time_coverage: Option<TimeCoverage>,
}

/// Summarize `variable` in the dataset at `path`
pub fn describe_dataset(path: &Path, variable: &str) -> Result<DatasetSummary> {
    let file = open_dataset(path)?;
    let var = file
        .variable(variable)
        .ok_or_else(|| CatchmentError::VariableNotFound {
            var: variable.to_string(),
        })?;

    let dimensions: Vec<DimensionInfo> = var
        .dimensions()
        .iter()
        .map(|d| DimensionInfo {
            name: d.name(),
            length: d.len(),
            is_unlimited: d.is_unlimited(),
        })
        .collect();

    let (georef, south_to_north) = match spatial_georef(&file, &var) {
        Ok((georef, flipped)) => (Some(georef), flipped),
        Err(e) => {
            log::debug!("No georeference for {variable}: {e}");
            (None, false)
        }
    };

    let time_coverage = if dimensions.len() == 3 {
        match read_time_axis(&file, &dimensions[0].name) {
            Ok(dates) => match (dates.iter().min(), dates.iter().max()) {
                (Some(first), Some(last)) => Some(TimeCoverage {
                    first: *first,
                    last: *last,
                    steps: dates.len(),
                }),
                _ => None,
            },
            Err(e) => {
                log::debug!("Time axis of {variable} not decodable: {e}");
                None
            }
        }
    } else {
        None
    };

    Ok(DatasetSummary {
        path: path.to_path_buf(),
        variable: variable.to_string(),
        data_type: format!("{:?}", var.vartype()).to_lowercase(),
        units: attribute_string(&var, "units"),
        long_name: attribute_string(&var, "long_name"),
        fill_value: attribute_f64(&var, "_FillValue"),
        dimensions,
        georef,
        south_to_north,
        time_coverage,
    })
}

impl DatasetSummary {
    /// Print the summary to stdout
    pub fn print(&self) {
        println!("\n Variable Description: {}", self.variable);
        println!("={}", "=".repeat(self.variable.len() + 25));
        println!(" File: {}", self.path.display());
        println!(" Data type: {}", self.data_type);
        if let Some(long_name) = &self.long_name {
            println!(" Long name: {}", long_name);
        }
        println!(" Units: {}", self.units.as_deref().unwrap_or("(none)"));
        if let Some(fill) = self.fill_value {
            println!(" _FillValue: {}", fill);
        }

        if self.dimensions.is_empty() {
            println!(" Dimensions: (scalar)");
        } else {
            println!("\n Dimension Details:");
            for dim in &self.dimensions {
                let length_info = if dim.is_unlimited {
                    format!("{} (unlimited)", dim.length)
                } else {
                    dim.length.to_string()
                };
                println!("    {} = {}", dim.name, length_info);
            }
        }

        match &self.georef {
            Some(georef) => {
                println!("\n Grid:");
                println!("    {}", georef);
                let (west, south, east, north) = georef.extent();
                println!(
                    "    Extent: west {west}, south {south}, east {east}, north {north}"
                );
                if self.south_to_north {
                    println!("    Rows stored south to north");
                }
            }
            None => println!("\n Grid: (no spatial coordinates)"),
        }

        if let Some(coverage) = &self.time_coverage {
            println!("\n Time Coverage:");
            println!(
                "    {} to {} ({} steps)",
                coverage.first, coverage.last, coverage.steps
            );
        }
    }
}
