//! End-to-end runs against NetCDF files built in a temporary directory.

use approx::assert_relative_eq;
use catchment_flux::{
    catalog::GridCatalog,
    config::RunConfig,
    data_source::FluxSource,
    errors::CatchmentError,
    grid::Grid,
    metadata::describe_dataset,
    netcdf_io::{parse_cf_time_units, read_category_grid, read_value_grid, NetCDFFluxSource},
    pipeline::{build_catalog, run_from_config},
    statistics::aggregate,
    units::DepthConversion,
};
use chrono::{NaiveDate, NaiveTime};
use netcdf::{create, open};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const FILL: f64 = -9999.0;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2x2 grid of 1° cells, latitude stored south to north
fn add_grid(file: &mut netcdf::FileMut) {
    file.add_dimension("lat", 2).unwrap();
    file.add_dimension("lon", 2).unwrap();
    {
        let mut lat = file.add_variable::<f64>("lat", &["lat"]).unwrap();
        lat.put_attribute("units", "degrees_north").unwrap();
        lat.put_values(&[0.5, 1.5][..], ..).unwrap();
    }
    let mut lon = file.add_variable::<f64>("lon", &["lon"]).unwrap();
    lon.put_attribute("units", "degrees_east").unwrap();
    lon.put_values(&[10.5, 11.5][..], ..).unwrap();
}

/// Catchment covers the western column
fn write_catchment(path: &Path) {
    let mut file = create(path).unwrap();
    add_grid(&mut file);
    let mut var = file
        .add_variable::<i32>("catchment", &["lat", "lon"])
        .unwrap();
    var.put_attribute("_FillValue", -1i32).unwrap();
    var.put_values(&[4i32, -1, 4, -1][..], ..).unwrap();
}

/// 100 m² in the south-west cell, 300 m² in the north-west cell
fn write_cell_area(path: &Path) {
    let mut file = create(path).unwrap();
    add_grid(&mut file);
    let mut var = file
        .add_variable::<f64>("cellarea", &["lat", "lon"])
        .unwrap();
    var.put_attribute("units", "m2").unwrap();
    var.put_values(&[100.0, 5.0, 300.0, 5.0][..], ..).unwrap();
}

/// `days` daily steps of a uniform 0.001 kg m-2 s-1 inside the catchment
fn write_runoff(path: &Path, units: &str, step: f64, days: usize) {
    let steps: Vec<f64> = (0..days).map(|d| d as f64 * step).collect();
    write_runoff_at(path, units, &steps, None);
}

fn write_runoff_at(path: &Path, units: &str, steps: &[f64], time_fill: Option<f64>) {
    let mut file = create(path).unwrap();
    file.add_dimension("time", steps.len()).unwrap();
    add_grid(&mut file);

    {
        let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
        time.put_attribute("units", units).unwrap();
        time.put_attribute("calendar", "standard").unwrap();
        if let Some(fill) = time_fill {
            time.put_attribute("_FillValue", fill).unwrap();
        }
        time.put_values(steps, ..).unwrap();
    }

    let mut ro = file
        .add_variable::<f64>("ro", &["time", "lat", "lon"])
        .unwrap();
    ro.put_attribute("units", "kg m-2 s-1").unwrap();
    ro.put_attribute("long_name", "surface runoff").unwrap();
    ro.put_attribute("_FillValue", FILL).unwrap();
    let values: Vec<f64> = steps
        .iter()
        .flat_map(|_| [0.001, FILL, 0.001, FILL])
        .collect();
    ro.put_values(&values, ..).unwrap();
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new(days: usize) -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        write_catchment(&root.join("catchment.nc"));
        write_cell_area(&root.join("area.nc"));
        write_runoff(&root.join("runoff.nc"), "days since 2000-01-01", 1.0, days);
        Self { _dir: dir, root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn config(&self, end: &str, cell_area: serde_json::Value) -> RunConfig {
        let config = json!({
            "start_date": "2000-01-01",
            "end_date": end,
            "catchment": { "file": self.path("catchment.nc"), "variable": "catchment", "id": 4 },
            "cell_area": cell_area,
            "flux": { "file": self.path("runoff.nc"), "variable": "ro" },
            "rollup": { "annual": true, "mode": "average" },
            "output": {
                "daily_txt": self.path("out/daily.txt"),
                "monthly_txt": self.path("out/monthly.txt"),
                "annual_txt": self.path("out/annual.txt"),
                "netcdf": self.path("out/catchment.nc")
            }
        });
        RunConfig::from_json(&config.to_string()).unwrap()
    }

    fn area_file(&self) -> serde_json::Value {
        json!({ "file": self.path("area.nc"), "variable": "cellarea" })
    }
}

#[test]
fn test_boundary_read_north_up() {
    let fixture = Fixture::new(1);
    let boundary = read_category_grid(&fixture.path("catchment.nc"), "catchment").unwrap();
    assert_eq!(boundary.georef().shape(), (2, 2));
    assert_relative_eq!(boundary.georef().y_origin, 2.0);
    assert_relative_eq!(boundary.georef().x_origin, 10.0);
    assert_eq!(boundary.get(0, 0), Some(&Some(4)));
    assert_eq!(boundary.get(0, 1), Some(&None));
}

#[test]
fn test_byte_catchment_fill_is_outside() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("catchment_i8.nc");
    {
        let mut file = create(&path).unwrap();
        add_grid(&mut file);
        let mut var = file.add_variable::<i8>("catchment", &["lat", "lon"]).unwrap();
        var.put_attribute("_FillValue", -1i8).unwrap();
        var.put_values(&[4i8, -1, 4, -1][..], ..).unwrap();
    }

    let boundary = read_category_grid(&path, "catchment").unwrap();
    assert_eq!(boundary.get(0, 0), Some(&Some(4)));
    assert_eq!(boundary.get(0, 1), Some(&None));
    assert_eq!(boundary.get(1, 1), Some(&None));

    let areas = Grid::from_shape_vec(*boundary.georef(), vec![1.0; 4]).unwrap();
    let catalog = GridCatalog::build(&boundary, areas).unwrap();
    assert_eq!(catalog.cell_count(), 2);
}

#[test]
fn test_single_row_grid_with_bounds() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    {
        let mut file = create(root.join("row.nc")).unwrap();
        file.add_dimension("lat", 1).unwrap();
        file.add_dimension("lon", 2).unwrap();
        file.add_dimension("nv", 2).unwrap();
        {
            let mut lat = file.add_variable::<f64>("lat", &["lat"]).unwrap();
            lat.put_attribute("bounds", "lat_bnds").unwrap();
            lat.put_values(&[0.25][..], ..).unwrap();
        }
        {
            let mut bounds = file.add_variable::<f64>("lat_bnds", &["lat", "nv"]).unwrap();
            bounds.put_values(&[0.0, 0.5][..], ..).unwrap();
        }
        {
            let mut lon = file.add_variable::<f64>("lon", &["lon"]).unwrap();
            lon.put_values(&[10.5, 11.5][..], ..).unwrap();
        }
        {
            let mut catchment = file.add_variable::<i32>("catchment", &["lat", "lon"]).unwrap();
            catchment.put_values(&[1i32, 1][..], ..).unwrap();
        }
        let mut area = file.add_variable::<f64>("cellarea", &["lat", "lon"]).unwrap();
        area.put_values(&[100.0, 300.0][..], ..).unwrap();
    }

    let boundary = read_category_grid(&root.join("row.nc"), "catchment").unwrap();
    let georef = *boundary.georef();
    assert_eq!(georef.shape(), (1, 2));
    assert_relative_eq!(georef.cell_height, 0.5);
    assert_relative_eq!(georef.cell_width, 1.0);
    assert_relative_eq!(georef.y_origin, 0.5);

    let areas = read_value_grid(&root.join("row.nc"), "cellarea").unwrap();
    let catalog = GridCatalog::build(&boundary, areas).unwrap();
    let flux = Grid::from_shape_vec(georef, vec![0.001, 0.001]).unwrap();
    let record = aggregate(
        date(2000, 1, 1),
        &flux,
        &catalog,
        &DepthConversion::runoff_mm_per_day(),
    )
    .unwrap();
    assert_relative_eq!(record.catchment_total, 34_560.0, max_relative = 1e-12);
    assert_relative_eq!(record.catchment_average, 86.4, max_relative = 1e-12);
}

#[test]
fn test_catalog_from_files() {
    let fixture = Fixture::new(1);
    let config = fixture.config("2000-01-01", fixture.area_file());
    let catalog = build_catalog(&config).unwrap();
    assert_eq!(catalog.cell_count(), 2);
    assert_relative_eq!(catalog.catchment_area().unwrap(), 400.0);
    // flipped rows: the northern cell comes first
    assert_relative_eq!(catalog.cell_area().values()[[0, 0]], 300.0);
}

#[test]
fn test_flux_source_by_date() {
    let fixture = Fixture::new(3);
    let mut source = NetCDFFluxSource::open(&fixture.path("runoff.nc"), "ro", "time").unwrap();
    assert_eq!(source.dates(), &[date(2000, 1, 1), date(2000, 1, 2), date(2000, 1, 3)]);

    let grid = source.flux_at(date(2000, 1, 2)).unwrap();
    assert_relative_eq!(grid.values()[[0, 0]], 0.001);
    assert!(grid.values()[[0, 1]].is_nan());

    let err = source.flux_at(date(2000, 1, 4)).unwrap_err();
    assert!(matches!(err, CatchmentError::MissingTimestep { .. }));
}

#[test]
fn test_hourly_time_axis() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hourly.nc");
    write_runoff(&path, "hours since 1999-12-31T00:00:00Z", 24.0, 2);
    let source = NetCDFFluxSource::open(&path, "ro", "time").unwrap();
    assert_eq!(source.dates(), &[date(1999, 12, 31), date(2000, 1, 1)]);
}

#[test]
fn test_unusable_time_values_rejected() {
    let dir = tempdir().unwrap();

    let nan = dir.path().join("nan_time.nc");
    write_runoff_at(&nan, "days since 2000-01-01", &[0.0, f64::NAN], None);
    assert!(matches!(
        NetCDFFluxSource::open(&nan, "ro", "time"),
        Err(CatchmentError::InvalidTimeValue { index: 1, .. })
    ));

    // unwritten record on the time axis
    let fill = 9.969_209_968_386_869e36;
    let filled = dir.path().join("filled_time.nc");
    write_runoff_at(&filled, "days since 2000-01-01", &[0.0, 1.0, fill], Some(fill));
    assert!(matches!(
        NetCDFFluxSource::open(&filled, "ro", "time"),
        Err(CatchmentError::InvalidTimeValue { index: 2, .. })
    ));

    // out of range without a fill attribute
    let huge = dir.path().join("huge_time.nc");
    write_runoff_at(&huge, "days since 2000-01-01", &[0.0, fill], None);
    assert!(matches!(
        NetCDFFluxSource::open(&huge, "ro", "time"),
        Err(CatchmentError::InvalidTimeValue { index: 1, .. })
    ));
}

#[test]
fn test_parse_cf_time_units() {
    let (seconds, reference) = parse_cf_time_units("days since 1979-01-01 00:00:00").unwrap();
    assert_relative_eq!(seconds, 86_400.0);
    assert_eq!(reference, date(1979, 1, 1).and_time(NaiveTime::MIN));

    let (seconds, _) = parse_cf_time_units("hours since 1900-01-01").unwrap();
    assert_relative_eq!(seconds, 3_600.0);

    assert!(matches!(
        parse_cf_time_units("fortnights since 2000-01-01"),
        Err(CatchmentError::InvalidTimeUnits { .. })
    ));
    assert!(parse_cf_time_units("days").is_err());
}

#[test]
fn test_end_to_end_two_days() {
    let fixture = Fixture::new(2);
    let config = fixture.config("2000-01-02", fixture.area_file());

    let summary = run_from_config(&config).unwrap();
    assert_eq!(summary.days, 2);
    assert_eq!(summary.months, 1);
    assert_eq!(summary.years, 1);
    assert_relative_eq!(summary.catchment_area, 400.0);

    let daily = fs::read_to_string(fixture.path("out/daily.txt")).unwrap();
    let lines: Vec<&str> = daily.lines().collect();
    assert_eq!(
        lines,
        vec![
            "date,catchment_total,catchment_average",
            "2000-01-01,34560.000000,86.400000",
            "2000-01-02,34560.000000,86.400000",
        ]
    );

    let monthly = fs::read_to_string(fixture.path("out/monthly.txt")).unwrap();
    let lines: Vec<&str> = monthly.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        "2000-01,2000-01-01,2000-01-02,2,34560.000000,86.400000"
    );

    let annual = fs::read_to_string(fixture.path("out/annual.txt")).unwrap();
    assert!(annual.lines().nth(1).unwrap().starts_with("2000,"));

    let report = open(fixture.path("out/catchment.nc")).unwrap();
    let average = report
        .variable("catchment_average")
        .unwrap()
        .get_values::<f64, _>(..)
        .unwrap();
    assert_eq!(average.len(), 2);
    assert_relative_eq!(average[0], 86.4, max_relative = 1e-12);

    let month_average = report
        .variable("month_average")
        .unwrap()
        .get_values::<f64, _>(..)
        .unwrap();
    assert_relative_eq!(month_average[0], 86.4, max_relative = 1e-12);
    let day_count = report
        .variable("month_day_count")
        .unwrap()
        .get_values::<i32, _>(..)
        .unwrap();
    assert_eq!(day_count, vec![2]);
}

#[test]
fn test_end_to_end_spherical_areas() {
    let fixture = Fixture::new(2);
    let config = fixture.config("2000-01-02", json!("spherical"));
    let summary = run_from_config(&config).unwrap();
    assert_eq!(summary.days, 2);
    // two 1° cells near the equator
    assert!(summary.catchment_area > 2.4e10 && summary.catchment_area < 2.5e10);

    let daily = fs::read_to_string(fixture.path("out/daily.txt")).unwrap();
    let first = daily.lines().nth(1).unwrap();
    assert!(first.ends_with(",86.400000"), "{first}");
}

#[test]
fn test_missing_timestep_stops_run() {
    let fixture = Fixture::new(2);
    let config = fixture.config("2000-01-03", fixture.area_file());
    let err = run_from_config(&config).unwrap_err();
    assert!(matches!(
        err,
        CatchmentError::MissingTimestep { date: d, .. } if d == date(2000, 1, 3)
    ));

    // no period rows were written
    let monthly = fs::read_to_string(fixture.path("out/monthly.txt")).unwrap_or_default();
    assert!(monthly.lines().count() <= 1);
}

#[test]
fn test_missing_catchment_file() {
    let fixture = Fixture::new(1);
    let mut config = fixture.config("2000-01-01", fixture.area_file());
    config.catchment.file = fixture.path("nope.nc");
    assert!(matches!(
        build_catalog(&config),
        Err(CatchmentError::DatasetUnreadable { .. })
    ));
}

#[test]
fn test_describe_dataset() {
    let fixture = Fixture::new(3);
    let summary = describe_dataset(&fixture.path("runoff.nc"), "ro").unwrap();
    assert_eq!(summary.units.as_deref(), Some("kg m-2 s-1"));
    assert_eq!(summary.long_name.as_deref(), Some("surface runoff"));
    assert_eq!(summary.fill_value, Some(FILL));
    assert_eq!(summary.dimensions.len(), 3);
    assert_eq!(summary.dimensions[0].name, "time");
    assert_eq!(summary.dimensions[0].length, 3);
    assert!(summary.south_to_north);
    assert!(summary.georef.is_some());

    let coverage = summary.time_coverage.unwrap();
    assert_eq!(coverage.first, date(2000, 1, 1));
    assert_eq!(coverage.last, date(2000, 1, 3));
    assert_eq!(coverage.steps, 3);

    let missing = describe_dataset(&fixture.path("runoff.nc"), "nope");
    assert!(matches!(
        missing,
        Err(CatchmentError::VariableNotFound { .. })
    ));
}
