//! Independent period rollups per land-cover class

use super::catchment::DailyRecord;
use super::operations::{Period, ReportingMode};
use super::temporal::{FinalizedRecord, TemporalAccumulator};
use crate::errors::Result;
use std::collections::BTreeMap;

/// One [`TemporalAccumulator`] per land-cover class
///
/// Classes are created on first sight and never share state.
#[derive(Debug, Clone)]
pub struct LandCoverAccumulators {
    period: Period,
    mode: ReportingMode,
    accumulators: BTreeMap<i32, TemporalAccumulator>,
}

impl LandCoverAccumulators {
    #[must_use]
    pub const fn new(period: Period, mode: ReportingMode) -> Self {
        Self {
            period,
            mode,
            accumulators: BTreeMap::new(),
        }
    }

    /// Known classes in ascending order
    pub fn classes(&self) -> impl Iterator<Item = i32> + '_ {
        self.accumulators.keys().copied()
    }

    /// Fold one day of per-class records in.
    ///
    /// Ordering is checked for every class before any accumulator changes, so
    /// an out-of-order day leaves all classes untouched.
    pub fn ingest(
        &mut self,
        records: &BTreeMap<i32, DailyRecord>,
    ) -> Result<Vec<(i32, FinalizedRecord)>> {
        for (class, record) in records {
            if let Some(acc) = self.accumulators.get(class) {
                acc.check_order(record.date)?;
            }
        }

        let mut closed = Vec::new();
        for (class, record) in records {
            let acc = self
                .accumulators
                .entry(*class)
                .or_insert_with(|| TemporalAccumulator::new(self.period, self.mode));
            if let Some(finalized) = acc.ingest(record)? {
                closed.push((*class, finalized));
            }
        }
        Ok(closed)
    }

    /// Close every open class period
    pub fn flush(&mut self) -> Vec<(i32, FinalizedRecord)> {
        self.accumulators
            .iter_mut()
            .filter_map(|(class, acc)| acc.flush().map(|record| (*class, record)))
            .collect()
    }
}
