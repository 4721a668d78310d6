//! Report sinks for daily and period records
//!
//! The run hands every record to a [`ReportSink`] as soon as it is final.
//! Sinks decide the persistence format: delimited text (one file per stream),
//! a NetCDF file written at the end of the run, or memory for tests. Several
//! sinks can be combined with a `Vec<Box<dyn ReportSink>>`.

use crate::errors::Result;
use crate::netcdf_io::NetCDFReportWriter;
use crate::statistics::{DailyRecord, FinalizedRecord, Period};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Receives finalized records
pub trait ReportSink {
    fn daily(&mut self, record: &DailyRecord) -> Result<()>;

    fn period(&mut self, period: Period, record: &FinalizedRecord) -> Result<()>;

    fn land_cover_daily(&mut self, _class: i32, _record: &DailyRecord) -> Result<()> {
        Ok(())
    }

    fn land_cover_period(
        &mut self,
        _class: i32,
        _period: Period,
        _record: &FinalizedRecord,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once after the last record
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl ReportSink for Vec<Box<dyn ReportSink>> {
    fn daily(&mut self, record: &DailyRecord) -> Result<()> {
        self.iter_mut().try_for_each(|sink| sink.daily(record))
    }

    fn period(&mut self, period: Period, record: &FinalizedRecord) -> Result<()> {
        self.iter_mut().try_for_each(|sink| sink.period(period, record))
    }

    fn land_cover_daily(&mut self, class: i32, record: &DailyRecord) -> Result<()> {
        self.iter_mut()
            .try_for_each(|sink| sink.land_cover_daily(class, record))
    }

    fn land_cover_period(
        &mut self,
        class: i32,
        period: Period,
        record: &FinalizedRecord,
    ) -> Result<()> {
        self.iter_mut()
            .try_for_each(|sink| sink.land_cover_period(class, period, record))
    }

    fn finish(&mut self) -> Result<()> {
        self.iter_mut().try_for_each(|sink| sink.finish())
    }
}

/// Keeps every record in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryReportSink {
    pub daily: Vec<DailyRecord>,
    pub periods: Vec<(Period, FinalizedRecord)>,
    pub land_cover_daily: Vec<(i32, DailyRecord)>,
    pub land_cover_periods: Vec<(i32, Period, FinalizedRecord)>,
    pub finished: bool,
}

impl MemoryReportSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalized records of one period kind
    pub fn periods_of(&self, period: Period) -> impl Iterator<Item = &FinalizedRecord> + '_ {
        self.periods
            .iter()
            .filter(move |(p, _)| *p == period)
            .map(|(_, record)| record)
    }
}

impl ReportSink for MemoryReportSink {
    fn daily(&mut self, record: &DailyRecord) -> Result<()> {
        self.daily.push(*record);
        Ok(())
    }

    fn period(&mut self, period: Period, record: &FinalizedRecord) -> Result<()> {
        self.periods.push((period, *record));
        Ok(())
    }

    fn land_cover_daily(&mut self, class: i32, record: &DailyRecord) -> Result<()> {
        self.land_cover_daily.push((class, *record));
        Ok(())
    }

    fn land_cover_period(
        &mut self,
        class: i32,
        period: Period,
        record: &FinalizedRecord,
    ) -> Result<()> {
        self.land_cover_periods.push((class, period, *record));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

pub const DAILY_HEADER: &str = "date,catchment_total,catchment_average";
pub const PERIOD_HEADER: &str =
    "period,first_date,last_date,day_count,catchment_total,catchment_average";
pub const LAND_COVER_HEADER: &str =
    "class,period,first_date,last_date,day_count,catchment_total,catchment_average";

fn period_row(record: &FinalizedRecord) -> String {
    format!(
        "{},{},{},{},{:.6},{:.6}",
        record.period,
        record.first_date,
        record.last_date,
        record.day_count,
        record.catchment_total,
        record.catchment_average
    )
}

/// Comma-separated text reports, one writer per stream
///
/// Monthly and annual records go to their own writers when configured and are
/// dropped otherwise. Land-cover period records go to the land-cover writer;
/// per-class daily records are not written.
pub struct TextReportSink<W: Write> {
    daily: W,
    monthly: Option<W>,
    annual: Option<W>,
    land_cover: Option<W>,
}

impl<W: Write> TextReportSink<W> {
    /// Start a report, writing the daily header
    pub fn new(mut daily: W) -> Result<Self> {
        writeln!(daily, "{DAILY_HEADER}")?;
        Ok(Self {
            daily,
            monthly: None,
            annual: None,
            land_cover: None,
        })
    }

    pub fn with_monthly(mut self, mut writer: W) -> Result<Self> {
        writeln!(writer, "{PERIOD_HEADER}")?;
        self.monthly = Some(writer);
        Ok(self)
    }

    pub fn with_annual(mut self, mut writer: W) -> Result<Self> {
        writeln!(writer, "{PERIOD_HEADER}")?;
        self.annual = Some(writer);
        Ok(self)
    }

    pub fn with_land_cover(mut self, mut writer: W) -> Result<Self> {
        writeln!(writer, "{LAND_COVER_HEADER}")?;
        self.land_cover = Some(writer);
        Ok(self)
    }

    /// Give back the daily writer
    pub fn into_daily(self) -> W {
        self.daily
    }
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

impl TextReportSink<BufWriter<File>> {
    /// Create report files, including missing parent directories
    pub fn create(
        daily: &Path,
        monthly: Option<&Path>,
        annual: Option<&Path>,
        land_cover: Option<&Path>,
    ) -> Result<Self> {
        let mut sink = Self::new(create_file(daily)?)?;
        if let Some(path) = monthly {
            sink = sink.with_monthly(create_file(path)?)?;
        }
        if let Some(path) = annual {
            sink = sink.with_annual(create_file(path)?)?;
        }
        if let Some(path) = land_cover {
            sink = sink.with_land_cover(create_file(path)?)?;
        }
        Ok(sink)
    }
}

impl<W: Write> ReportSink for TextReportSink<W> {
    fn daily(&mut self, record: &DailyRecord) -> Result<()> {
        writeln!(
            self.daily,
            "{},{:.6},{:.6}",
            record.date, record.catchment_total, record.catchment_average
        )?;
        Ok(())
    }

    fn period(&mut self, period: Period, record: &FinalizedRecord) -> Result<()> {
        let writer = match period {
            Period::Monthly => self.monthly.as_mut(),
            Period::Annual => self.annual.as_mut(),
        };
        if let Some(writer) = writer {
            writeln!(writer, "{}", period_row(record))?;
        }
        Ok(())
    }

    fn land_cover_period(
        &mut self,
        class: i32,
        _period: Period,
        record: &FinalizedRecord,
    ) -> Result<()> {
        if let Some(writer) = self.land_cover.as_mut() {
            writeln!(writer, "{},{}", class, period_row(record))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.daily.flush()?;
        for writer in [&mut self.monthly, &mut self.annual, &mut self.land_cover]
            .into_iter()
            .flatten()
        {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Buffers the run and writes one NetCDF file on [`ReportSink::finish`]
pub struct NetCDFReportSink {
    path: PathBuf,
    source_variable: String,
    total_units: String,
    average_units: String,
    daily: Vec<DailyRecord>,
    periods: Vec<(Period, FinalizedRecord)>,
}

impl NetCDFReportSink {
    pub fn new(
        path: impl Into<PathBuf>,
        source_variable: &str,
        total_units: String,
        average_units: String,
    ) -> Self {
        Self {
            path: path.into(),
            source_variable: source_variable.to_string(),
            total_units,
            average_units,
            daily: Vec::new(),
            periods: Vec::new(),
        }
    }
}

impl ReportSink for NetCDFReportSink {
    fn daily(&mut self, record: &DailyRecord) -> Result<()> {
        self.daily.push(*record);
        Ok(())
    }

    fn period(&mut self, period: Period, record: &FinalizedRecord) -> Result<()> {
        self.periods.push((period, *record));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        NetCDFReportWriter::new(
            &self.path,
            &self.source_variable,
            self.total_units.clone(),
            self.average_units.clone(),
        )
        .write(&self.daily, &self.periods)
    }
}
