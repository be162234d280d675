//! Comparable-record selection.

use realty_core::{Error, Result, Transaction};
use serde::{Deserialize, Serialize};

/// How `property_type` is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Whole label, case-sensitive after trimming.
    #[default]
    Exact,
    /// Case-insensitive substring.
    Contains,
}

/// Optional bounds a record must satisfy. All set bounds apply together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub property_type: Option<String>,
    pub property_type_match: TextMatch,
    pub min_rooms: Option<f64>,
    pub max_rooms: Option<f64>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub min_floor: Option<i32>,
    pub max_floor: Option<i32>,
}

fn check_pair<T: PartialOrd + std::fmt::Display>(
    name: &str,
    min: Option<T>,
    max: Option<T>,
) -> Result<()> {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => Err(Error::config(format!(
            "min_{name} ({lo}) is greater than max_{name} ({hi})"
        ))),
        _ => Ok(()),
    }
}

/// Whether `value` lies within the optional bounds. Missing values fail any set bound.
fn within<T: PartialOrd>(value: Option<T>, min: Option<T>, max: Option<T>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(v) = value else {
        return false;
    };
    min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi)
}

impl FilterCriteria {
    /// Whether no criterion is set.
    pub fn is_empty(&self) -> bool {
        *self == Self {
            property_type_match: self.property_type_match,
            ..Self::default()
        }
    }

    /// Reject `min > max` pairs.
    pub fn validate(&self) -> Result<()> {
        check_pair("rooms", self.min_rooms, self.max_rooms)?;
        check_pair("amount", self.min_amount, self.max_amount)?;
        check_pair("area", self.min_area, self.max_area)?;
        check_pair("floor", self.min_floor, self.max_floor)?;
        Ok(())
    }

    /// Whether one record satisfies every set criterion.
    pub fn matches(&self, record: &Transaction) -> bool {
        if let Some(wanted) = self.property_type.as_deref() {
            let Some(actual) = record.property_type.as_deref() else {
                return false;
            };
            let hit = match self.property_type_match {
                TextMatch::Exact => actual.trim() == wanted.trim(),
                TextMatch::Contains => actual
                    .to_lowercase()
                    .contains(&wanted.trim().to_lowercase()),
            };
            if !hit {
                return false;
            }
        }

        within(record.rooms, self.min_rooms, self.max_rooms)
            && within(record.price(), self.min_amount, self.max_amount)
            && within(record.usable_area(), self.min_area, self.max_area)
            && within(record.floor, self.min_floor, self.max_floor)
    }
}

/// Records matching `criteria`, in input order.
///
/// Fails with a configuration error when any bound pair is inverted.
pub fn filter_records(
    records: &[Transaction],
    criteria: &FilterCriteria,
) -> Result<Vec<Transaction>> {
    criteria.validate()?;
    Ok(records.iter().filter(|r| criteria.matches(r)).cloned().collect())
}
