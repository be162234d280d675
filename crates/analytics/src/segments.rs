//! Per-year, per-type and cross-segment price summaries.

use chrono::Datelike;
use ordered_float::OrderedFloat;
use realty_core::{Metric, Transaction};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::statistics::{metric_statistics, Statistics, UNKNOWN_PROPERTY_TYPE};

/// Amount summary of one group of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub count: usize,
    pub avg_amount: f64,
    pub median_amount: f64,
    pub min_amount: f64,
    pub max_amount: f64,
}

impl PriceSummary {
    fn from_records(records: &[Transaction]) -> Self {
        let stats = metric_statistics(records, Metric::Amount);
        Self {
            count: records.len(),
            avg_amount: stats.mean,
            median_amount: stats.median,
            min_amount: stats.min,
            max_amount: stats.max,
        }
    }
}

fn grouped<K: Ord>(
    records: &[Transaction],
    key: impl Fn(&Transaction) -> K,
) -> BTreeMap<K, PriceSummary> {
    let mut groups: BTreeMap<K, Vec<Transaction>> = BTreeMap::new();
    for record in records {
        groups.entry(key(record)).or_default().push(record.clone());
    }
    groups
        .into_iter()
        .map(|(k, group)| (k, PriceSummary::from_records(&group)))
        .collect()
}

/// Amount summary per calendar year.
pub fn yearly_breakdown(records: &[Transaction]) -> BTreeMap<i32, PriceSummary> {
    grouped(records, |r| r.date.year())
}

/// Amount summary per property type; untyped records fall under `unknown`.
pub fn property_type_breakdown(records: &[Transaction]) -> BTreeMap<String, PriceSummary> {
    grouped(records, |r| {
        r.property_type
            .as_deref()
            .unwrap_or(UNKNOWN_PROPERTY_TYPE)
            .to_string()
    })
}

/// One labelled batch in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub label: String,
    pub count: usize,
    pub amount: Statistics,
    pub price_per_area: Statistics,
    /// 1 is the most expensive; `None` without priced records.
    pub rank: Option<usize>,
}

/// Side-by-side view of several segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentComparison {
    /// In input order.
    pub segments: Vec<SegmentSummary>,
    /// Labels from most to least expensive by median price per area.
    pub ranking: Vec<String>,
}

/// Compare labelled batches by median price per area.
///
/// Segments without any priced record keep their place in `segments` but
/// are left out of the ranking.
pub fn compare_segments<S: AsRef<str>>(segments: &[(S, Vec<Transaction>)]) -> SegmentComparison {
    let mut summaries: Vec<SegmentSummary> = segments
        .iter()
        .map(|(label, records)| SegmentSummary {
            label: label.as_ref().to_string(),
            count: records.len(),
            amount: metric_statistics(records, Metric::Amount),
            price_per_area: metric_statistics(records, Metric::PricePerArea),
            rank: None,
        })
        .collect();

    let mut ranked: Vec<usize> = (0..summaries.len())
        .filter(|&i| !summaries[i].price_per_area.is_empty())
        .collect();
    ranked.sort_by_key(|&i| Reverse(OrderedFloat(summaries[i].price_per_area.median)));

    let ranking = ranked
        .iter()
        .enumerate()
        .map(|(pos, &i)| {
            summaries[i].rank = Some(pos + 1);
            summaries[i].label.clone()
        })
        .collect();

    SegmentComparison {
        segments: summaries,
        ranking,
    }
}
