//! Catchment run orchestration
//!
//! A run builds the [`GridCatalog`] once, then walks the configured dates in
//! order: fetch the flux grid, aggregate it over the catchment, report the
//! daily record, feed the period accumulators and report whatever they close.
//! Open periods are flushed after the last date. Any error stops the run; no
//! partial period is ever reported.

use crate::catalog::GridCatalog;
use crate::config::{CellAreaSpec, RunConfig};
use crate::data_source::{BoundarySource, FluxSource};
use crate::errors::Result;
use crate::netcdf_io::{read_category_grid, read_value_grid, NetCDFBoundary, NetCDFFluxSource};
use crate::report::{NetCDFReportSink, ReportSink, TextReportSink};
use crate::statistics::{
    DailyAggregator, FinalizedRecord, LandCoverAccumulators, Period, ReportingMode,
    TemporalAccumulator,
};
use crate::units::{DepthConversion, UnitConversion};
use chrono::NaiveDate;
use log::{debug, info};

/// Per-run settings the daily loop needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub conversion: DepthConversion,
    /// Also roll up calendar years
    pub annual: bool,
    pub mode: ReportingMode,
}

impl From<&RunConfig> for RunOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            start_date: config.start_date,
            end_date: config.end_date,
            conversion: config.conversion,
            annual: config.rollup.annual,
            mode: config.rollup.mode,
        }
    }
}

impl RunOptions {
    /// Every date of the run, inclusive
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date;
        self.start_date.iter_days().take_while(move |d| *d <= end)
    }
}

/// What a finished run produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub days: usize,
    pub months: usize,
    pub years: usize,
    pub catchment_cells: usize,
    /// Catchment area in m²
    pub catchment_area: f64,
}

/// Build the catalog described by `config`
pub fn build_catalog(config: &RunConfig) -> Result<GridCatalog> {
    let boundary = NetCDFBoundary::new(&config.catchment.file, &config.catchment.variable);
    let categories = boundary.categories()?;

    let cell_area = match &config.cell_area {
        CellAreaSpec::Variable(source) => read_value_grid(&source.file, &source.variable)?,
        CellAreaSpec::Derived(_) => categories.georef().spherical_cell_areas()?,
    };

    let mut catalog = match config.catchment.id {
        Some(id) => GridCatalog::build_for_id(&categories, id, cell_area)?,
        None => GridCatalog::build(&categories, cell_area)?,
    };

    if let Some(source) = &config.land_cover {
        let classes = read_category_grid(&source.file, &source.variable)?;
        catalog = catalog.with_land_cover(classes)?;
    }

    info!(
        "Catchment of {} cells, {:.3} km² on {}",
        catalog.cell_count(),
        catalog.catchment_area()? / 1.0e6,
        catalog.georef()
    );
    Ok(catalog)
}

fn report_closed(
    sink: &mut dyn ReportSink,
    period: Period,
    record: &FinalizedRecord,
    summary: &mut RunSummary,
) -> Result<()> {
    info!(
        "Closed {} period {}: {} days, average {:.6}",
        period.as_str(),
        record.period,
        record.day_count,
        record.catchment_average
    );
    match period {
        Period::Monthly => summary.months += 1,
        Period::Annual => summary.years += 1,
    }
    sink.period(period, record)
}

/// Run the daily loop from `options.start_date` to `options.end_date`
pub fn run_catchment(
    catalog: &GridCatalog,
    source: &mut dyn FluxSource,
    sink: &mut dyn ReportSink,
    options: &RunOptions,
) -> Result<RunSummary> {
    options.conversion.validate()?;
    catalog
        .georef()
        .ensure_matches(source.georef(), "flux dataset vs catchment")?;

    let aggregator = DailyAggregator::new(catalog, &options.conversion);
    let mut rollups = vec![TemporalAccumulator::monthly(options.mode)];
    if options.annual {
        rollups.push(TemporalAccumulator::annual(options.mode));
    }
    let mut classes = catalog
        .land_cover()
        .map(|_| LandCoverAccumulators::new(Period::Monthly, options.mode));

    let mut summary = RunSummary {
        days: 0,
        months: 0,
        years: 0,
        catchment_cells: catalog.cell_count(),
        catchment_area: catalog.catchment_area()?,
    };

    for date in options.dates() {
        let flux = source.flux_at(date)?;
        let record = aggregator.aggregate(date, &flux)?;
        debug!(
            "{}: total {:.6} {}, average {:.6} {}",
            date,
            record.catchment_total,
            options.conversion.total_units(),
            record.catchment_average,
            options.conversion.average_units()
        );
        sink.daily(&record)?;

        for rollup in &mut rollups {
            if let Some(closed) = rollup.ingest(&record)? {
                report_closed(sink, rollup.period(), &closed, &mut summary)?;
            }
        }

        if let Some(classes) = classes.as_mut() {
            let by_class = aggregator.aggregate_by_class(date, &flux)?;
            for (class, class_record) in &by_class {
                sink.land_cover_daily(*class, class_record)?;
            }
            for (class, closed) in classes.ingest(&by_class)? {
                sink.land_cover_period(class, Period::Monthly, &closed)?;
            }
        }

        summary.days += 1;
    }

    for rollup in &mut rollups {
        if let Some(closed) = rollup.flush() {
            report_closed(sink, rollup.period(), &closed, &mut summary)?;
        }
    }
    if let Some(classes) = classes.as_mut() {
        for (class, closed) in classes.flush() {
            sink.land_cover_period(class, Period::Monthly, &closed)?;
        }
    }

    sink.finish()?;
    Ok(summary)
}

/// Open the configured sinks
pub fn report_sinks(config: &RunConfig) -> Result<Vec<Box<dyn ReportSink>>> {
    let output = &config.output;
    let text = TextReportSink::create(
        &output.daily_txt,
        output.monthly_txt.as_deref(),
        output.annual_txt.as_deref(),
        output.land_cover_txt.as_deref(),
    )?;
    let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(text)];

    if let Some(path) = &output.netcdf {
        sinks.push(Box::new(NetCDFReportSink::new(
            path,
            &config.flux.variable,
            config.conversion.total_units(),
            config.conversion.average_units(),
        )));
    }
    Ok(sinks)
}

/// Run everything `config` describes against NetCDF inputs
pub fn run_from_config(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;
    let catalog = build_catalog(config)?;
    let mut source = NetCDFFluxSource::open(
        &config.flux.file,
        &config.flux.variable,
        &config.flux.time_variable,
    )?;
    let mut sinks = report_sinks(config)?;

    let summary = run_catchment(&catalog, &mut source, &mut sinks, &RunOptions::from(config))?;
    info!(
        "Processed {} days ({} months, {} years)",
        summary.days, summary.months, summary.years
    );
    Ok(summary)
}
