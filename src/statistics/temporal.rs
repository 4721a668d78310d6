//! Rolling daily records up into calendar periods
//!
//! A [`TemporalAccumulator`] keeps at most one open [`PeriodAccumulator`].
//! Records are folded into it while their date falls in the open period; the
//! first record of a new period closes the old one and returns it as a
//! [`FinalizedRecord`]. Call [`TemporalAccumulator::flush`] at the end of the
//! stream to close whatever is still open.

use super::catchment::DailyRecord;
use super::operations::{Period, PeriodKey, ReportingMode};
use crate::errors::{CatchmentError, Result};
use chrono::NaiveDate;

/// A closed calendar period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalizedRecord {
    pub period: PeriodKey,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// Days actually ingested, not the calendar length
    pub day_count: usize,
    /// Daily totals reduced with `mode`
    pub catchment_total: f64,
    /// Daily averages reduced with `mode`
    pub catchment_average: f64,
    pub mode: ReportingMode,
}

/// Running sums for the open period
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodAccumulator {
    key: PeriodKey,
    first_date: NaiveDate,
    last_date: NaiveDate,
    total_sum: f64,
    average_sum: f64,
    day_count: usize,
}

impl PeriodAccumulator {
    fn open(key: PeriodKey, record: &DailyRecord) -> Self {
        Self {
            key,
            first_date: record.date,
            last_date: record.date,
            total_sum: record.catchment_total,
            average_sum: record.catchment_average,
            day_count: 1,
        }
    }

    fn add(&mut self, record: &DailyRecord) {
        self.last_date = record.date;
        self.total_sum += record.catchment_total;
        self.average_sum += record.catchment_average;
        self.day_count += 1;
    }

    fn finalize(self, mode: ReportingMode) -> FinalizedRecord {
        let reduce = |sum: f64| match mode {
            ReportingMode::Average => sum / self.day_count as f64,
            ReportingMode::Total => sum,
        };
        FinalizedRecord {
            period: self.key,
            first_date: self.first_date,
            last_date: self.last_date,
            day_count: self.day_count,
            catchment_total: reduce(self.total_sum),
            catchment_average: reduce(self.average_sum),
            mode,
        }
    }

    #[must_use]
    pub const fn key(&self) -> PeriodKey {
        self.key
    }

    #[must_use]
    pub const fn day_count(&self) -> usize {
        self.day_count
    }
}

/// Folds daily records into monthly or annual periods
#[derive(Debug, Clone)]
pub struct TemporalAccumulator {
    period: Period,
    mode: ReportingMode,
    open: Option<PeriodAccumulator>,
    last_date: Option<NaiveDate>,
}

impl TemporalAccumulator {
    #[must_use]
    pub const fn new(period: Period, mode: ReportingMode) -> Self {
        Self {
            period,
            mode,
            open: None,
            last_date: None,
        }
    }

    #[must_use]
    pub const fn monthly(mode: ReportingMode) -> Self {
        Self::new(Period::Monthly, mode)
    }

    #[must_use]
    pub const fn annual(mode: ReportingMode) -> Self {
        Self::new(Period::Annual, mode)
    }

    #[must_use]
    pub const fn period(&self) -> Period {
        self.period
    }

    #[must_use]
    pub const fn mode(&self) -> ReportingMode {
        self.mode
    }

    /// The open period, if any
    #[must_use]
    pub const fn open_period(&self) -> Option<&PeriodAccumulator> {
        self.open.as_ref()
    }

    /// Fail with [`CatchmentError::OutOfOrder`] if `date` precedes the last ingested date
    pub fn check_order(&self, date: NaiveDate) -> Result<()> {
        match self.last_date {
            Some(previous) if date < previous => Err(CatchmentError::OutOfOrder {
                previous,
                received: date,
            }),
            _ => Ok(()),
        }
    }

    /// Fold one record in, returning the period it closed, if any.
    ///
    /// On error the accumulator is left untouched.
    pub fn ingest(&mut self, record: &DailyRecord) -> Result<Option<FinalizedRecord>> {
        self.check_order(record.date)?;
        self.last_date = Some(record.date);

        let key = self.period.key_for(record.date);
        if let Some(open) = self.open.as_mut() {
            if open.key == key {
                open.add(record);
                return Ok(None);
            }
        }

        let closed = self.open.replace(PeriodAccumulator::open(key, record));
        Ok(closed.map(|acc| acc.finalize(self.mode)))
    }

    /// Close and return the open period, if any
    pub fn flush(&mut self) -> Option<FinalizedRecord> {
        self.open.take().map(|acc| acc.finalize(self.mode))
    }
}
