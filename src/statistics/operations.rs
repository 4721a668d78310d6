//! Core rollup types
//!
//! This module defines the calendar periods daily records are grouped into
//! and how a finished period is reduced.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar period a rollup groups days into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Calendar month
    #[default]
    Monthly,
    /// Calendar year
    Annual,
}

impl Period {
    /// Get the string representation of the period
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Key of the period containing `date`
    #[must_use]
    pub fn key_for(self, date: NaiveDate) -> PeriodKey {
        match self {
            Self::Monthly => PeriodKey {
                year: date.year(),
                month: Some(date.month()),
            },
            Self::Annual => PeriodKey {
                year: date.year(),
                month: None,
            },
        }
    }
}

/// Identifies one calendar month or year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    pub year: i32,
    /// `None` for annual periods
    pub month: Option<u32>,
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(month) => write!(f, "{:04}-{:02}", self.year, month),
            None => write!(f, "{:04}", self.year),
        }
    }
}

/// How a closed period reduces its daily values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingMode {
    /// Mean over the ingested days
    #[default]
    Average,
    /// Sum over the ingested days
    Total,
}

impl ReportingMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Total => "total",
        }
    }
}
