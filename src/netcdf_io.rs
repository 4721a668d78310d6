//! NetCDF I/O: static rasters, daily flux grids and report files
//!
//! Every spatial variable is expected as `(..., y, x)` with one coordinate
//! variable per spatial dimension. Grids are returned north-up; fields stored
//! south-to-north are flipped on read. `_FillValue` / `missing_value` cells
//! become `NaN` (values) or `None` (categories), and `scale_factor` /
//! `add_offset` packing is undone.

use crate::data_source::{BoundarySource, FluxSource};
use crate::errors::{CatchmentError, Result};
use crate::grid::{CategoryGrid, GeoReference, Grid};
use crate::statistics::{DailyRecord, FinalizedRecord, Period, ReportingMode};
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use netcdf::{AttributeValue, File, Variable};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Report time axis units
pub const REPORT_TIME_UNITS: &str = "days since 1970-01-01";

/// Open a dataset, reporting failures as [`CatchmentError::DatasetUnreadable`]
pub fn open_dataset(path: &Path) -> Result<File> {
    netcdf::open(path).map_err(|e| CatchmentError::DatasetUnreadable {
        dataset: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn find_variable<'f>(file: &'f File, name: &str) -> Result<Variable<'f>> {
    file.variable(name)
        .ok_or_else(|| CatchmentError::VariableNotFound {
            var: name.to_string(),
        })
}

/// Numeric attribute as f64
pub fn attribute_f64(var: &Variable, name: &str) -> Option<f64> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Ulonglong(v) => Some(v as f64),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Floats(v) => v.first().map(|x| f64::from(*x)),
        AttributeValue::Ints(v) => v.first().map(|x| f64::from(*x)),
        AttributeValue::Shorts(v) => v.first().map(|x| f64::from(*x)),
        AttributeValue::Schars(v) => v.first().map(|x| f64::from(*x)),
        AttributeValue::Uchars(v) => v.first().map(|x| f64::from(*x)),
        AttributeValue::Ushorts(v) => v.first().map(|x| f64::from(*x)),
        AttributeValue::Uints(v) => v.first().map(|x| f64::from(*x)),
        _ => None,
    }
}

/// String attribute
pub fn attribute_string(var: &Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// How stored values map to physical values
#[derive(Debug, Clone, Copy, PartialEq)]
struct Decoding {
    fill: Option<f64>,
    missing: Option<f64>,
    scale: f64,
    offset: f64,
}

impl Decoding {
    fn for_variable(var: &Variable) -> Self {
        Self {
            fill: attribute_f64(var, "_FillValue"),
            missing: attribute_f64(var, "missing_value"),
            scale: attribute_f64(var, "scale_factor").unwrap_or(1.0),
            offset: attribute_f64(var, "add_offset").unwrap_or(0.0),
        }
    }

    fn is_nodata(&self, raw: f64) -> bool {
        !raw.is_finite() || Some(raw) == self.fill || Some(raw) == self.missing
    }

    fn decode(&self, raw: f64) -> f64 {
        if self.is_nodata(raw) {
            f64::NAN
        } else {
            raw * self.scale + self.offset
        }
    }
}

/// Georeference of a variable's two trailing dimensions
///
/// The flag is `true` when rows are stored south to north.
pub fn spatial_georef(file: &File, var: &Variable) -> Result<(GeoReference, bool)> {
    let dims = var.dimensions();
    if dims.len() < 2 {
        return Err(CatchmentError::DimensionNotFound {
            var: var.name(),
            dim: "spatial (y, x)".to_string(),
        });
    }
    let y_dim = dims[dims.len() - 2].name();
    let x_dim = dims[dims.len() - 1].name();

    let x_var = find_variable(file, &x_dim)?;
    let y_var = find_variable(file, &y_dim)?;
    let x = x_var.get_values::<f64, _>(..)?;
    let y = y_var.get_values::<f64, _>(..)?;
    let x_size = if x.len() == 1 { bounds_width(file, &x_var) } else { None };
    let y_size = if y.len() == 1 { bounds_width(file, &y_var) } else { None };
    GeoReference::from_cell_centers_with_sizes(&x, &y, x_size, y_size)
}

/// Width of the first cell from a coordinate's CF `bounds` variable
fn bounds_width(file: &File, coord: &Variable) -> Option<f64> {
    let name = attribute_string(coord, "bounds")?;
    let bounds = file.variable(&name)?.get_values::<f64, _>(..).ok()?;
    match bounds.as_slice() {
        [lower, upper, ..] => Some((upper - lower).abs()).filter(|w| w.is_finite() && *w > 0.0),
        _ => None,
    }
}

/// Read the spatial plane at `leading` (for 3-D variables) as row-major f64
fn read_plane(var: &Variable, leading: Option<usize>) -> Result<Vec<f64>> {
    let ndims = var.dimensions().len();
    let values = match (ndims, leading) {
        (2, None) => var.get_values::<f64, _>((.., ..))?,
        (3, Some(index)) => var.get_values::<f64, _>((index, .., ..))?,
        (3, None) if var.dimensions()[0].len() == 1 => var.get_values::<f64, _>((0usize, .., ..))?,
        _ => {
            return Err(CatchmentError::DatasetUnreadable {
                dataset: var.name(),
                reason: format!("expected a 2-D (y, x) or 3-D (t, y, x) variable, found {ndims} dimensions"),
            })
        }
    };
    Ok(values)
}

/// Reverse row order of a row-major plane
fn flip_rows<T: Clone>(values: Vec<T>, rows: usize, cols: usize) -> Vec<T> {
    let mut flipped = Vec::with_capacity(values.len());
    for row in (0..rows).rev() {
        flipped.extend_from_slice(&values[row * cols..(row + 1) * cols]);
    }
    flipped
}

fn read_north_up(file: &File, var: &Variable, leading: Option<usize>) -> Result<(GeoReference, Vec<f64>)> {
    let (georef, south_to_north) = spatial_georef(file, var)?;
    let raw = read_plane(var, leading)?;
    let decoding = Decoding::for_variable(var);
    let values: Vec<f64> = raw.into_iter().map(|v| decoding.decode(v)).collect();
    let values = if south_to_north {
        flip_rows(values, georef.rows, georef.cols)
    } else {
        values
    };
    Ok((georef, values))
}

/// Read a 2-D value raster (e.g. cell area in m²); no-data cells become `NaN`
pub fn read_value_grid(path: &Path, variable: &str) -> Result<Grid<f64>> {
    let file = open_dataset(path)?;
    let var = find_variable(&file, variable)?;
    let (georef, values) = read_north_up(&file, &var, None)?;
    log::debug!("Read {} from {}: {}", variable, path.display(), georef);
    Grid::from_shape_vec(georef, values)
}

/// Read a 2-D categorical raster; no-data cells become `None`
pub fn read_category_grid(path: &Path, variable: &str) -> Result<CategoryGrid> {
    let grid = read_value_grid(path, variable)?;
    Ok(grid.map(|v| if v.is_finite() { Some(v.round() as i32) } else { None }))
}

/// Boundary raster stored in a NetCDF file, already on the model grid
#[derive(Debug, Clone)]
pub struct NetCDFBoundary {
    pub path: PathBuf,
    pub variable: String,
}

impl NetCDFBoundary {
    pub fn new(path: impl Into<PathBuf>, variable: &str) -> Self {
        Self {
            path: path.into(),
            variable: variable.to_string(),
        }
    }
}

impl BoundarySource for NetCDFBoundary {
    fn categories(&self) -> Result<CategoryGrid> {
        read_category_grid(&self.path, &self.variable)
    }
}

/// Split CF time units (`"days since 1979-01-01 00:00:00"`) into seconds per
/// unit and the reference instant
pub fn parse_cf_time_units(units: &str) -> Result<(f64, NaiveDateTime)> {
    let invalid = || CatchmentError::InvalidTimeUnits {
        units: units.to_string(),
    };

    let (unit, base) = units.split_once(" since ").ok_or_else(invalid)?;
    let seconds = match unit.trim().to_lowercase().as_str() {
        "seconds" | "second" | "secs" | "s" => 1.0,
        "minutes" | "minute" | "mins" | "min" => 60.0,
        "hours" | "hour" | "hrs" | "h" => 3_600.0,
        "days" | "day" | "d" => 86_400.0,
        _ => return Err(invalid()),
    };

    let base = base
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();
    let reference = NaiveDateTime::parse_from_str(base, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(base, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(base, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(base, "%Y-%m-%d %H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(base, "%Y-%m-%d").map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|_| invalid())?;

    Ok((seconds, reference))
}

/// Calendar dates of a CF time coordinate variable
pub fn read_time_axis(file: &File, time_variable: &str) -> Result<Vec<NaiveDate>> {
    let var = find_variable(file, time_variable)?;
    let units = attribute_string(&var, "units").ok_or_else(|| CatchmentError::InvalidTimeUnits {
        units: String::new(),
    })?;

    if let Some(calendar) = attribute_string(&var, "calendar") {
        let calendar = calendar.to_lowercase();
        if !matches!(calendar.as_str(), "standard" | "gregorian" | "proleptic_gregorian") {
            return Err(CatchmentError::InvalidTimeUnits {
                units: format!("{units} (calendar '{calendar}')"),
            });
        }
    }

    let (seconds_per_unit, reference) = parse_cf_time_units(&units)?;
    let decoding = Decoding::for_variable(&var);
    let values = var.get_values::<f64, _>(..)?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, v)| {
            let invalid = || CatchmentError::InvalidTimeValue {
                variable: time_variable.to_string(),
                index,
                value: v,
            };
            if decoding.is_nodata(v) {
                return Err(invalid());
            }
            let millis = (v * seconds_per_unit * 1_000.0).round();
            if millis.abs() >= i64::MAX as f64 {
                return Err(invalid());
            }
            TimeDelta::try_milliseconds(millis as i64)
                .and_then(|offset| reference.checked_add_signed(offset))
                .map(|instant| instant.date())
                .ok_or_else(invalid)
        })
        .collect()
}

/// Daily flux grids from a `(time, y, x)` NetCDF variable
pub struct NetCDFFluxSource {
    path: PathBuf,
    dataset: String,
    variable: String,
    file: File,
    georef: GeoReference,
    south_to_north: bool,
    decoding: Decoding,
    index: HashMap<NaiveDate, usize>,
    dates: Vec<NaiveDate>,
}

impl NetCDFFluxSource {
    /// Open `variable` in `path`, resolving its time axis from `time_variable`
    pub fn open(path: &Path, variable: &str, time_variable: &str) -> Result<Self> {
        let dataset = path.display().to_string();
        let file = open_dataset(path)?;

        let (georef, south_to_north, decoding, ntime) = {
            let var = find_variable(&file, variable)?;
            let dims = var.dimensions();
            if dims.len() != 3 {
                return Err(CatchmentError::DatasetUnreadable {
                    dataset,
                    reason: format!(
                        "'{variable}' must be (time, y, x), found {} dimensions",
                        dims.len()
                    ),
                });
            }
            let (georef, south_to_north) = spatial_georef(&file, &var)?;
            (georef, south_to_north, Decoding::for_variable(&var), dims[0].len())
        };

        let dates = read_time_axis(&file, time_variable)?;
        if dates.len() != ntime {
            return Err(CatchmentError::DatasetUnreadable {
                dataset,
                reason: format!(
                    "time axis has {} entries but '{variable}' has {ntime} time steps",
                    dates.len()
                ),
            });
        }

        let mut index = HashMap::with_capacity(dates.len());
        for (i, date) in dates.iter().enumerate() {
            if index.insert(*date, i).is_some() {
                log::warn!("{dataset}: several time steps fall on {date}, using the last one");
            }
        }

        log::info!(
            "Opened {} ({}): {} time steps on {}",
            dataset,
            variable,
            dates.len(),
            georef
        );

        Ok(Self {
            path: path.to_path_buf(),
            dataset,
            variable: variable.to_string(),
            file,
            georef,
            south_to_north,
            decoding,
            index,
            dates,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dates available in the dataset, in file order
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }
}

impl FluxSource for NetCDFFluxSource {
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
        let step = *self
            .index
            .get(&date)
            .ok_or_else(|| CatchmentError::MissingTimestep {
                dataset: self.dataset.clone(),
                variable: self.variable.clone(),
                date,
            })?;

        let unreadable = |e: CatchmentError| CatchmentError::DatasetUnreadable {
            dataset: self.dataset.clone(),
            reason: e.to_string(),
        };
        let var = find_variable(&self.file, &self.variable).map_err(unreadable)?;
        let raw = read_plane(&var, Some(step)).map_err(unreadable)?;

        let values: Vec<f64> = raw.into_iter().map(|v| self.decoding.decode(v)).collect();
        let values = if self.south_to_north {
            flip_rows(values, self.georef.rows, self.georef.cols)
        } else {
            values
        };
        Grid::from_shape_vec(self.georef, values)
    }
}

fn days_since_epoch(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

/// Writes run results to a NetCDF file
pub struct NetCDFReportWriter<'a> {
    output_path: &'a Path,
    source_variable: &'a str,
    total_units: String,
    average_units: String,
}

impl<'a> NetCDFReportWriter<'a> {
    pub fn new(
        output_path: &'a Path,
        source_variable: &'a str,
        total_units: String,
        average_units: String,
    ) -> Self {
        Self {
            output_path,
            source_variable,
            total_units,
            average_units,
        }
    }

    /// Write the daily series and any finalized periods.
    ///
    /// Periods are stored along a `month` or `year` dimension with their
    /// first day, day count, total and average.
    pub fn write(&self, daily: &[DailyRecord], periods: &[(Period, FinalizedRecord)]) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = netcdf::create(self.output_path)?;
        file.add_dimension("time", daily.len())?;

        {
            let mut time = file.add_variable::<f64>("time", &["time"])?;
            time.put_attribute("units", REPORT_TIME_UNITS)?;
            time.put_attribute("calendar", "standard")?;
            time.put_attribute("long_name", "time")?;
            let values: Vec<f64> = daily.iter().map(|r| days_since_epoch(r.date)).collect();
            time.put_values(&values, ..)?;
        }
        {
            let mut total = file.add_variable::<f64>("catchment_total", &["time"])?;
            total.put_attribute("units", self.total_units.as_str())?;
            total.put_attribute(
                "long_name",
                format!("catchment total of {}", self.source_variable),
            )?;
            let values: Vec<f64> = daily.iter().map(|r| r.catchment_total).collect();
            total.put_values(&values, ..)?;
        }
        {
            let mut average = file.add_variable::<f64>("catchment_average", &["time"])?;
            average.put_attribute("units", self.average_units.as_str())?;
            average.put_attribute(
                "long_name",
                format!("area-weighted catchment average of {}", self.source_variable),
            )?;
            let values: Vec<f64> = daily.iter().map(|r| r.catchment_average).collect();
            average.put_values(&values, ..)?;
        }

        for period in [Period::Monthly, Period::Annual] {
            let records: Vec<&FinalizedRecord> = periods
                .iter()
                .filter(|(p, _)| *p == period)
                .map(|(_, r)| r)
                .collect();
            if records.is_empty() {
                continue;
            }
            let dim = match period {
                Period::Monthly => "month",
                Period::Annual => "year",
            };
            file.add_dimension(dim, records.len())?;

            {
                let mut start = file.add_variable::<f64>(&format!("{dim}_start"), &[dim])?;
                start.put_attribute("units", REPORT_TIME_UNITS)?;
                start.put_attribute("calendar", "standard")?;
                let values: Vec<f64> = records.iter().map(|r| days_since_epoch(r.first_date)).collect();
                start.put_values(&values, ..)?;
            }
            {
                let mut count = file.add_variable::<i32>(&format!("{dim}_day_count"), &[dim])?;
                let values: Vec<i32> = records
                    .iter()
                    .map(|r| i32::try_from(r.day_count).unwrap_or(i32::MAX))
                    .collect();
                count.put_values(&values, ..)?;
            }
            {
                let mut total = file.add_variable::<f64>(&format!("{dim}_total"), &[dim])?;
                total.put_attribute("units", self.total_units.as_str())?;
                total.put_attribute("cell_methods", format!("time: {}", mode_method(records[0])))?;
                let values: Vec<f64> = records.iter().map(|r| r.catchment_total).collect();
                total.put_values(&values, ..)?;
            }
            {
                let mut average = file.add_variable::<f64>(&format!("{dim}_average"), &[dim])?;
                average.put_attribute("units", self.average_units.as_str())?;
                average.put_attribute("cell_methods", format!("time: {}", mode_method(records[0])))?;
                let values: Vec<f64> = records.iter().map(|r| r.catchment_average).collect();
                average.put_values(&values, ..)?;
            }
        }

        file.add_attribute("source_variable", self.source_variable)?;
        file.add_attribute(
            "history",
            format!("Created by catchment_flux on {}", Utc::now().to_rfc3339()),
        )?;

        log::info!(
            "Wrote {} daily records and {} period records to {}",
            daily.len(),
            periods.len(),
            self.output_path.display()
        );
        Ok(())
    }
}

fn mode_method(record: &FinalizedRecord) -> &'static str {
    match record.mode {
        ReportingMode::Average => "mean",
        ReportingMode::Total => "sum",
    }
}
