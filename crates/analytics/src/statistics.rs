//! Descriptive statistics over record batches.
//!
//! Every attribute (amount, area, price per area) is summarized over only the
//! records that carry it, so a batch where one attribute is entirely missing
//! still yields usable blocks for the others.

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use realty_core::{Metric, OutlierConfig, Transaction};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics as _;
use std::collections::BTreeMap;

use crate::outliers::{OutlierDetector, OutlierReport};

/// Label used for records without a property type.
pub const UNKNOWN_PROPERTY_TYPE: &str = "unknown";

/// Descriptive statistics for one numeric attribute.
///
/// An empty input produces a zeroed block with `count == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub p25: f64,
    pub p75: f64,
}

impl Statistics {
    /// Zeroed statistics for an attribute with no values.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether no values contributed.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Interquartile range (p75 - p25).
    pub fn iqr(&self) -> f64 {
        self.p75 - self.p25
    }
}

/// Sort the finite values of a slice in ascending order.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_unstable_by_key(|&v| OrderedFloat(v));
    sorted
}

/// Percentile of an ascending slice, `p` in `[0, 1]`.
///
/// Linear interpolation between the two closest ranks at `p * (n - 1)`.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Median of an unsorted slice.
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(&sorted_finite(values), 0.5)
}

/// Compute descriptive statistics for a set of values.
pub fn compute_statistics(values: &[f64]) -> Statistics {
    let sorted = sorted_finite(values);
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Statistics::empty();
    };

    let std_dev = if sorted.len() > 1 {
        sorted.iter().population_std_dev()
    } else {
        0.0
    };

    Statistics {
        count: sorted.len(),
        mean: sorted.iter().mean(),
        median: percentile(&sorted, 0.5).unwrap_or(min),
        min,
        max,
        std_dev,
        p25: percentile(&sorted, 0.25).unwrap_or(min),
        p75: percentile(&sorted, 0.75).unwrap_or(max),
    }
}

/// Statistics of one attribute across a record batch.
pub fn metric_statistics(records: &[Transaction], metric: Metric) -> Statistics {
    let values: Vec<f64> = records.iter().filter_map(|r| metric.value(r)).collect();
    compute_statistics(&values)
}

/// Number of records with a given room count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomCount {
    pub rooms: f64,
    pub count: usize,
}

/// Earliest and latest transaction dates in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl DateRange {
    /// Date range of a batch, `None` when empty.
    pub fn of(records: &[Transaction]) -> Option<Self> {
        let earliest = Iterator::min(records.iter().map(|r| r.date))?;
        let latest = Iterator::max(records.iter().map(|r| r.date))?;
        Some(Self { earliest, latest })
    }
}

/// Statistics block for a record batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealStatistics {
    pub total_records: usize,
    pub amount: Statistics,
    pub area: Statistics,
    pub price_per_area: Statistics,
    pub property_types: BTreeMap<String, usize>,
    /// Ordered by room count.
    pub rooms: Vec<RoomCount>,
    pub date_range: Option<DateRange>,
}

impl DealStatistics {
    /// Summarize a batch.
    pub fn from_records(records: &[Transaction]) -> Self {
        let mut property_types = BTreeMap::new();
        let mut rooms: BTreeMap<OrderedFloat<f64>, usize> = BTreeMap::new();

        for record in records {
            let label = record
                .property_type
                .as_deref()
                .unwrap_or(UNKNOWN_PROPERTY_TYPE)
                .to_string();
            *property_types.entry(label).or_insert(0) += 1;

            if let Some(r) = record.rooms.filter(|r| r.is_finite()) {
                *rooms.entry(OrderedFloat(r)).or_insert(0) += 1;
            }
        }

        Self {
            total_records: records.len(),
            amount: metric_statistics(records, Metric::Amount),
            area: metric_statistics(records, Metric::Area),
            price_per_area: metric_statistics(records, Metric::PricePerArea),
            property_types,
            rooms: rooms
                .into_iter()
                .map(|(rooms, count)| RoomCount { rooms: rooms.0, count })
                .collect(),
            date_range: DateRange::of(records),
        }
    }
}

/// Raw statistics plus, when requested, the outlier-filtered view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub statistics: DealStatistics,
    #[serde(rename = "filtered_statistics")]
    pub filtered: Option<DealStatistics>,
    pub outlier_report: Option<OutlierReport>,
}

impl StatisticsReport {
    /// Build a report; with `filter_outliers` both views are always present.
    pub fn build(records: &[Transaction], config: &OutlierConfig, filter_outliers: bool) -> Self {
        let statistics = DealStatistics::from_records(records);
        if !filter_outliers {
            return Self {
                statistics,
                filtered: None,
                outlier_report: None,
            };
        }

        let (kept, report) = OutlierDetector::new(config.clone()).filter_records(records);
        Self {
            statistics,
            filtered: Some(DealStatistics::from_records(&kept)),
            outlier_report: Some(report),
        }
    }
}
