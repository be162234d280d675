//! Core data types for the real-estate analytics engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Opaque record identifier.
pub type RecordId = String;

/// A single real-estate transaction.
///
/// Records are treated as immutable values; filtering and outlier removal
/// always produce new batches. Price per area is derived on every call and
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: RecordId,
    /// Transaction price. Zero or negative is treated as missing.
    pub amount: Option<f64>,
    /// Calendar date of the transaction.
    pub date: NaiveDate,
    /// Floor area in square meters.
    pub area: Option<f64>,
    /// Room count (may be fractional, e.g. 3.5).
    pub rooms: Option<f64>,
    /// Floor level, already parsed from its textual label.
    pub floor: Option<i32>,
    /// Free-text category label.
    pub property_type: Option<String>,
}

impl Transaction {
    /// Create a record with only the required fields set.
    pub fn new(id: impl Into<RecordId>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            amount: None,
            date,
            area: None,
            rooms: None,
            floor: None,
            property_type: None,
        }
    }

    /// Positive, finite amount, or `None` when missing.
    #[inline]
    pub fn price(&self) -> Option<f64> {
        self.amount.filter(|a| a.is_finite() && *a > 0.0)
    }

    /// Positive, finite area, or `None` when missing.
    #[inline]
    pub fn usable_area(&self) -> Option<f64> {
        self.area.filter(|a| a.is_finite() && *a > 0.0)
    }

    /// Price per square meter, computed from the current amount and area.
    #[inline]
    pub fn price_per_area(&self) -> Option<f64> {
        match (self.price(), self.usable_area()) {
            (Some(amount), Some(area)) => Some(amount / area),
            _ => None,
        }
    }

    /// Copy of this record with a different amount.
    pub fn with_amount(&self, amount: Option<f64>) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }

    /// Copy of this record with a different area.
    pub fn with_area(&self, area: Option<f64>) -> Self {
        Self {
            area,
            ..self.clone()
        }
    }
}

/// Numeric attribute a statistics or outlier pass operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Transaction amount.
    Amount,
    /// Floor area.
    Area,
    /// Amount divided by area.
    PricePerArea,
}

impl Metric {
    /// Extract this attribute from a record, if present and positive.
    #[inline]
    pub fn value(self, record: &Transaction) -> Option<f64> {
        match self {
            Metric::Amount => record.price(),
            Metric::Area => record.usable_area(),
            Metric::PricePerArea => record.price_per_area(),
        }
    }

    /// Snake-case name used in reports and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Amount => "amount",
            Metric::Area => "area",
            Metric::PricePerArea => "price_per_area",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistical outlier detection method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Interquartile-range fences.
    Iqr,
    /// Relative deviation from the median.
    Percent,
    /// No statistical pass (hard bounds still apply).
    None,
}

impl OutlierMethod {
    /// Snake-case name used in reports and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            OutlierMethod::Iqr => "iqr",
            OutlierMethod::Percent => "percent",
            OutlierMethod::None => "none",
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutlierMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "percent" => Ok(OutlierMethod::Percent),
            "none" => Ok(OutlierMethod::None),
            other => Err(Error::config(format!(
                "unknown outlier method '{other}' (expected iqr, percent or none)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_price_per_area() {
        let mut tx = Transaction::new("1", date(2024, 1, 15));
        tx.amount = Some(1_500_000.0);
        tx.area = Some(75.0);
        assert_relative_eq!(tx.price_per_area().unwrap(), 20_000.0);
    }

    #[test]
    fn test_price_per_area_recomputed_after_change() {
        let mut tx = Transaction::new("1", date(2024, 1, 15));
        tx.amount = Some(1_000_000.0);
        tx.area = Some(50.0);
        assert_relative_eq!(tx.price_per_area().unwrap(), 20_000.0);

        let repriced = tx.with_amount(Some(1_500_000.0));
        assert_relative_eq!(repriced.price_per_area().unwrap(), 30_000.0);

        let resized = repriced.with_area(Some(100.0));
        assert_relative_eq!(resized.price_per_area().unwrap(), 15_000.0);

        // Original untouched
        assert_relative_eq!(tx.price_per_area().unwrap(), 20_000.0);
    }

    #[test]
    fn test_missing_or_zero_values() {
        let mut tx = Transaction::new("1", date(2024, 1, 15));
        tx.amount = Some(0.0);
        tx.area = Some(50.0);
        assert!(tx.price().is_none());
        assert!(tx.price_per_area().is_none());

        let tx = tx.with_amount(Some(1_000_000.0)).with_area(Some(0.0));
        assert!(tx.usable_area().is_none());
        assert!(tx.price_per_area().is_none());

        let tx = tx.with_amount(Some(-5.0));
        assert!(tx.price().is_none());
    }

    #[test]
    fn test_metric_value() {
        let mut tx = Transaction::new("1", date(2024, 1, 15));
        tx.amount = Some(900_000.0);
        tx.area = Some(60.0);
        assert_eq!(Metric::Amount.value(&tx), Some(900_000.0));
        assert_eq!(Metric::Area.value(&tx), Some(60.0));
        assert_relative_eq!(Metric::PricePerArea.value(&tx).unwrap(), 15_000.0);
    }

    #[test]
    fn test_outlier_method_from_str() {
        assert_eq!("iqr".parse::<OutlierMethod>().unwrap(), OutlierMethod::Iqr);
        assert_eq!(" Percent ".parse::<OutlierMethod>().unwrap(), OutlierMethod::Percent);
        assert_eq!("none".parse::<OutlierMethod>().unwrap(), OutlierMethod::None);
        assert!(matches!("zscore".parse::<OutlierMethod>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Metric::PricePerArea).unwrap(), "\"price_per_area\"");
        assert_eq!(serde_json::to_string(&OutlierMethod::Iqr).unwrap(), "\"iqr\"");
    }
}
