//! Defines command-line interface options using `clap` for catchment_flux.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Catchment-integrated fluxes from gridded NetCDF data
#[derive(Parser, Debug)]
#[command(
    version,
    name = "catchment_flux",
    about = "Aggregate gridded daily fluxes over a catchment"
)]
pub struct Args {
    /// Path to the JSON run configuration
    #[arg(short, long, required_unless_present = "describe")]
    pub config: Option<PathBuf>,

    /// First date to process (YYYY-MM-DD), overrides the configuration
    #[arg(long, value_parser = parse_date_arg)]
    pub start: Option<NaiveDate>,

    /// Last date to process (YYYY-MM-DD), overrides the configuration
    #[arg(long, value_parser = parse_date_arg)]
    pub end: Option<NaiveDate>,

    /// Directory that replaces the parent directory of every output file
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Describe a dataset variable instead of running, formatted as <file>:<variable>
    #[arg(long, value_parser = parse_describe_arg)]
    pub describe: Option<(PathBuf, String)>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{s}': {e}. Expected YYYY-MM-DD."))
}

fn parse_describe_arg(s: &str) -> Result<(PathBuf, String), String> {
    match s.rsplit_once(':') {
        Some((file, var)) if !file.is_empty() && !var.is_empty() => {
            Ok((PathBuf::from(file), var.to_string()))
        }
        _ => Err("Invalid format: Expected '<file>:<variable>'.".to_string()),
    }
}
