//! Entry point for the catchment_flux application.
//! Handles CLI parsing and logging, then either runs a configured catchment or describes a dataset.

use catchment_flux::config::RunConfig;
use catchment_flux::metadata::describe_dataset;
use catchment_flux::pipeline::run_from_config;
use clap::Parser;
mod cli;

use cli::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    println!(
        r#"
------------------------------------------------------------------
                   catchment_flux
       catchment-integrated fluxes from gridded NetCDF
------------------------------------------------------------------
                        "#
    );

    if let Some((path, variable)) = &args.describe {
        let summary = describe_dataset(path, variable)?;
        summary.print();
        return Ok(());
    }

    let Some(config_path) = &args.config else {
        return Err("either --config or --describe is required".into());
    };
    let config = RunConfig::from_file(config_path)?.with_overrides(
        args.start,
        args.end,
        args.output_dir.as_deref(),
    )?;
    println!("Successfully loaded run configuration: {}", config_path.display());
    println!(
        "   {} to {} ({} from {})",
        config.start_date,
        config.end_date,
        config.flux.variable,
        config.flux.file.display()
    );

    let summary = run_from_config(&config)?;
    println!(
        "✅ Processed {} days over {} cells ({:.3} km²)",
        summary.days,
        summary.catchment_cells,
        summary.catchment_area / 1.0e6
    );
    println!("✅ Saved daily report to {}", config.output.daily_txt.display());
    let extra_outputs = [
        &config.output.monthly_txt,
        &config.output.annual_txt,
        &config.output.land_cover_txt,
        &config.output.netcdf,
    ];
    for path in extra_outputs.into_iter().flatten() {
        println!("✅ Saved report to {}", path.display());
    }

    Ok(())
}
