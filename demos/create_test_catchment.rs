//! Creates a small catchment, a daily runoff file and a run configuration.
//!
//! The catchment raster marks three of four 0.5° cells; the runoff field is
//! stored south to north with a fill value outside the catchment. Run the
//! result with `catchment_flux --config demo_data/run.json`.

use netcdf::create;
use serde_json::json;
use std::fs;
use std::path::Path;

const LATS: [f64; 2] = [51.25, 51.75];
const LONS: [f64; 2] = [4.25, 4.75];
const DAYS: usize = 59;
const FILL: f32 = -9999.0;

fn add_coordinates(file: &mut netcdf::FileMut) -> Result<(), Box<dyn std::error::Error>> {
    file.add_dimension("lat", LATS.len())?;
    file.add_dimension("lon", LONS.len())?;
    {
        let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put_attribute("long_name", "latitude")?;
        lat.put_values(&LATS[..], ..)?;
    }
    {
        let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put_attribute("long_name", "longitude")?;
        lon.put_values(&LONS[..], ..)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = Path::new("demo_data");
    fs::create_dir_all(dir)?;

    let catchment_path = dir.join("catchment.nc");
    let runoff_path = dir.join("runoff.nc");
    for path in [&catchment_path, &runoff_path] {
        if path.exists() {
            fs::remove_file(path)?;
        }
    }

    println!("🔨 Creating catchment raster: {}", catchment_path.display());
    {
        let mut file = create(&catchment_path)?;
        file.add_attribute("title", "Demo catchment")?;
        add_coordinates(&mut file)?;
        let mut var = file.add_variable::<i32>("catchment", &["lat", "lon"])?;
        var.put_attribute("_FillValue", -1i32)?;
        var.put_attribute("long_name", "catchment id")?;
        // rows south to north: the south-east cell is outside
        var.put_values(&[7i32, -1, 7, 7], ..)?;
    }

    println!("🔨 Creating runoff file: {}", runoff_path.display());
    {
        let mut file = create(&runoff_path)?;
        file.add_attribute("title", "Demo daily runoff")?;
        file.add_dimension("time", DAYS)?;
        add_coordinates(&mut file)?;
        {
            let mut time = file.add_variable::<f64>("time", &["time"])?;
            time.put_attribute("units", "days since 1979-01-01 00:00:00")?;
            time.put_attribute("calendar", "standard")?;
            let values: Vec<f64> = (0..DAYS).map(|d| d as f64).collect();
            time.put_values(&values, ..)?;
        }
        let mut ro = file.add_variable::<f32>("ro", &["time", "lat", "lon"])?;
        ro.put_attribute("units", "kg m-2 s-1")?;
        ro.put_attribute("long_name", "surface runoff")?;
        ro.put_attribute("_FillValue", FILL)?;
        let mut values = Vec::with_capacity(DAYS * 4);
        for day in 0..DAYS {
            let base = 1.0e-5 * (1.0 + (day as f32 / 10.0).sin().abs());
            values.extend_from_slice(&[base, FILL, base * 2.0, base * 0.5]);
        }
        ro.put_values(&values, ..)?;
    }

    let config = json!({
        "start_date": "1979-01-01",
        "end_date": "1979-02-28",
        "catchment": { "file": catchment_path, "variable": "catchment", "id": 7 },
        "cell_area": "spherical",
        "flux": { "file": runoff_path, "variable": "ro" },
        "rollup": { "annual": true, "mode": "average" },
        "output": {
            "daily_txt": dir.join("out/daily.txt"),
            "monthly_txt": dir.join("out/monthly.txt"),
            "annual_txt": dir.join("out/annual.txt"),
            "netcdf": dir.join("out/catchment_ro.nc")
        }
    });
    let config_path = dir.join("run.json");
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("✅ Wrote run configuration to {}", config_path.display());

    Ok(())
}
