//! Calendar bucketing of dated records.
//!
//! Months serialize as `YYYY-MM`, quarters as `YYYY-Qn`, so bucket maps can
//! be emitted directly as JSON objects.

use chrono::{Datelike, Months, NaiveDate};
use realty_core::{Error, Result, Transaction};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Month containing a date.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Months elapsed since year zero; differences give month distances.
    pub fn ordinal(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// Quarter containing this month.
    pub fn quarter(self) -> QuarterKey {
        QuarterKey {
            year: self.year,
            quarter: (self.month - 1) / 3 + 1,
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::data(format!("invalid month key '{s}' (expected YYYY-MM)"));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

/// A calendar quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuarterKey {
    pub year: i32,
    /// 1 to 4.
    pub quarter: u32,
}

impl QuarterKey {
    /// Quarter containing a date.
    pub fn of(date: NaiveDate) -> Self {
        MonthKey::of(date).quarter()
    }
}

impl fmt::Display for QuarterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-Q{}", self.year, self.quarter)
    }
}

impl FromStr for QuarterKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::data(format!("invalid quarter key '{s}' (expected YYYY-Qn)"));
        let (year, quarter) = s.split_once("-Q").ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let quarter: u32 = quarter.parse().map_err(|_| invalid())?;
        if !(1..=4).contains(&quarter) {
            return Err(invalid());
        }
        Ok(Self { year, quarter })
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

string_serde!(MonthKey);
string_serde!(QuarterKey);

/// Keep only records within the last `months` months of the batch.
///
/// The window is anchored on the most recent record date, so the result
/// depends only on the input. `None` keeps the whole batch.
pub fn apply_window(records: &[Transaction], months: Option<u32>) -> Vec<Transaction> {
    let Some(months) = months else {
        return records.to_vec();
    };
    let Some(latest) = Iterator::max(records.iter().map(|r| r.date)) else {
        return Vec::new();
    };
    let cutoff = latest
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN);

    records.iter().filter(|r| r.date > cutoff).cloned().collect()
}

/// Record counts per month and per quarter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodCounts {
    pub total: usize,
    pub monthly: BTreeMap<MonthKey, usize>,
    pub quarterly: BTreeMap<QuarterKey, usize>,
}

impl PeriodCounts {
    /// Bucket a batch by month and quarter.
    pub fn from_records(records: &[Transaction]) -> Self {
        let mut counts = Self::default();
        for record in records {
            let month = MonthKey::of(record.date);
            *counts.monthly.entry(month).or_insert(0) += 1;
            *counts.quarterly.entry(month.quarter()).or_insert(0) += 1;
            counts.total += 1;
        }
        counts
    }

    /// Months containing at least one record.
    pub fn distinct_months(&self) -> usize {
        self.monthly.len()
    }

    /// Quarters containing at least one record.
    pub fn distinct_quarters(&self) -> usize {
        self.quarterly.len()
    }

    /// Records per month with data.
    pub fn per_month(&self) -> f64 {
        if self.monthly.is_empty() {
            0.0
        } else {
            self.total as f64 / self.monthly.len() as f64
        }
    }

    /// Records per quarter with data.
    pub fn per_quarter(&self) -> f64 {
        if self.quarterly.is_empty() {
            0.0
        } else {
            self.total as f64 / self.quarterly.len() as f64
        }
    }

    /// Quarter with the most records (earliest on ties).
    pub fn busiest_quarter(&self) -> Option<(QuarterKey, usize)> {
        self.quarterly
            .iter()
            .fold(None, |best: Option<(QuarterKey, usize)>, (&q, &n)| match best {
                Some((_, best_n)) if best_n >= n => best,
                _ => Some((q, n)),
            })
    }
}
