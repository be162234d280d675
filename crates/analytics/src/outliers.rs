//! Outlier detection for transaction batches.
//!
//! Three passes, all producing removal flags that are unioned:
//! 1. Hard bounds on price per area and deal amount (entry errors, partial sales)
//! 2. IQR fences on the configured metric
//! 3. Relative deviation from the median (backup for heterogeneous batches)
//!
//! Batches below `min_sample_size` are returned untouched. If the passes
//! would remove every record, the original batch is returned instead and the
//! report says so.

use realty_core::{Metric, OutlierConfig, OutlierMethod, RecordId, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::statistics::{percentile, sorted_finite};

/// Lower and upper acceptance bounds of a statistical pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fences {
    pub lower: f64,
    pub upper: f64,
}

impl Fences {
    /// Whether a value lies outside the fences.
    #[inline]
    pub fn excludes(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// IQR fences `[Q1 - k*IQR, Q3 + k*IQR]`, quartiles by linear interpolation.
pub fn iqr_fences(values: &[f64], multiplier: f64) -> Option<Fences> {
    let sorted = sorted_finite(values);
    let q1 = percentile(&sorted, 0.25)?;
    let q3 = percentile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some(Fences {
        lower: q1 - multiplier * iqr,
        upper: q3 + multiplier * iqr,
    })
}

/// Flag values outside the IQR fences.
pub fn iqr_outliers(values: &[f64], multiplier: f64) -> Vec<bool> {
    match iqr_fences(values, multiplier) {
        Some(fences) => values.iter().map(|&v| fences.excludes(v)).collect(),
        None => vec![false; values.len()],
    }
}

/// Flag values whose relative deviation from the median exceeds `threshold`.
pub fn percent_outliers(values: &[f64], threshold: f64) -> Vec<bool> {
    let sorted = sorted_finite(values);
    match percentile(&sorted, 0.5) {
        Some(median) if median > 0.0 => values
            .iter()
            .map(|&v| ((v - median) / median).abs() > threshold)
            .collect(),
        _ => vec![false; values.len()],
    }
}

/// Why outlier detection did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Fewer metric values than `min_sample_size`.
    InsufficientSample,
}

/// What an outlier pass removed and with which parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub method: OutlierMethod,
    pub metric: Metric,
    pub iqr_multiplier: Option<f64>,
    pub percentage_backup_enabled: bool,
    pub percentage_threshold: Option<f64>,
    pub price_per_area_min: f64,
    pub price_per_area_max: f64,
    pub min_deal_amount: f64,
    pub min_sample_size: usize,
    /// IQR fences actually applied, if any.
    pub fences: Option<Fences>,
    pub total_records: usize,
    pub outliers_removed: usize,
    /// Removed by the hard-bounds pass.
    pub hard_bound_removals: usize,
    /// Removed by the statistical passes (not counting hard bounds).
    pub statistical_removals: usize,
    pub removed_ids: Vec<RecordId>,
    pub removed_indices: Vec<usize>,
    pub skipped: Option<SkipReason>,
    /// Every record was flagged; the unfiltered batch was returned.
    pub fallback_to_unfiltered: bool,
}

impl OutlierReport {
    fn new(config: &OutlierConfig, total_records: usize) -> Self {
        let backup = config.method == OutlierMethod::Iqr && config.use_percentage_backup;
        let percent_used = backup || config.method == OutlierMethod::Percent;
        Self {
            method: config.method,
            metric: config.metric,
            iqr_multiplier: (config.method == OutlierMethod::Iqr).then_some(config.iqr_multiplier),
            percentage_backup_enabled: backup,
            percentage_threshold: percent_used.then_some(config.percentage_threshold),
            price_per_area_min: config.price_per_area_min,
            price_per_area_max: config.price_per_area_max,
            min_deal_amount: config.min_deal_amount,
            min_sample_size: config.min_sample_size,
            fences: None,
            total_records,
            outliers_removed: 0,
            hard_bound_removals: 0,
            statistical_removals: 0,
            removed_ids: Vec::new(),
            removed_indices: Vec::new(),
            skipped: None,
            fallback_to_unfiltered: false,
        }
    }
}

/// Outlier detector configured once and applied to many batches.
#[derive(Debug, Clone, Default)]
pub struct OutlierDetector {
    config: OutlierConfig,
}

impl OutlierDetector {
    /// Create a new detector.
    pub fn new(config: OutlierConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &OutlierConfig {
        &self.config
    }

    /// Indices of values flagged by the statistical passes.
    ///
    /// Returns nothing when fewer than `min_sample_size` values are given.
    pub fn detect(&self, values: &[f64]) -> Vec<usize> {
        if values.len() < self.config.min_sample_size {
            return Vec::new();
        }
        self.statistical_flags(values)
            .into_iter()
            .enumerate()
            .filter_map(|(i, flagged)| flagged.then_some(i))
            .collect()
    }

    /// Union of the enabled statistical passes over `values`.
    fn statistical_flags(&self, values: &[f64]) -> Vec<bool> {
        let cfg = &self.config;
        match cfg.method {
            OutlierMethod::Iqr => {
                let mut flags = iqr_outliers(values, cfg.iqr_multiplier);
                if cfg.use_percentage_backup {
                    let backup = percent_outliers(values, cfg.percentage_threshold);
                    for (flag, extra) in flags.iter_mut().zip(backup) {
                        *flag |= extra;
                    }
                }
                flags
            }
            OutlierMethod::Percent => percent_outliers(values, cfg.percentage_threshold),
            OutlierMethod::None => vec![false; values.len()],
        }
    }

    /// Whether a record violates the absolute sanity bounds.
    fn violates_hard_bounds(&self, record: &Transaction) -> bool {
        let cfg = &self.config;
        let bad_ppa = record
            .price_per_area()
            .is_some_and(|ppa| ppa < cfg.price_per_area_min || ppa > cfg.price_per_area_max);
        let partial_sale = record.price().is_some_and(|a| a < cfg.min_deal_amount);
        bad_ppa || partial_sale
    }

    /// Remove outliers from a batch.
    ///
    /// Records lacking the configured metric are only subject to hard bounds.
    pub fn filter_records(&self, records: &[Transaction]) -> (Vec<Transaction>, OutlierReport) {
        let cfg = &self.config;
        let mut report = OutlierReport::new(cfg, records.len());

        let metric_count = records.iter().filter(|r| cfg.metric.value(r).is_some()).count();
        if metric_count < cfg.min_sample_size {
            debug!(
                metric = %cfg.metric,
                values = metric_count,
                min_sample_size = cfg.min_sample_size,
                "outlier detection skipped"
            );
            report.skipped = Some(SkipReason::InsufficientSample);
            return (records.to_vec(), report);
        }

        let mut remove: Vec<bool> = records.iter().map(|r| self.violates_hard_bounds(r)).collect();
        report.hard_bound_removals = remove.iter().filter(|&&r| r).count();

        let (positions, values): (Vec<usize>, Vec<f64>) = records
            .iter()
            .enumerate()
            .filter(|(i, _)| !remove[*i])
            .filter_map(|(i, r)| cfg.metric.value(r).map(|v| (i, v)))
            .unzip();

        if cfg.method == OutlierMethod::Iqr {
            report.fences = iqr_fences(&values, cfg.iqr_multiplier);
        }
        for (pos, flagged) in positions.into_iter().zip(self.statistical_flags(&values)) {
            if flagged {
                remove[pos] = true;
                report.statistical_removals += 1;
            }
        }

        let removed_count = remove.iter().filter(|&&r| r).count();
        if removed_count == records.len() && !records.is_empty() {
            warn!(
                records = records.len(),
                hard_bound_flags = report.hard_bound_removals,
                statistical_flags = report.statistical_removals,
                "outlier passes flagged every record, keeping unfiltered batch"
            );
            report.hard_bound_removals = 0;
            report.statistical_removals = 0;
            report.fallback_to_unfiltered = true;
            return (records.to_vec(), report);
        }

        let mut kept = Vec::with_capacity(records.len() - removed_count);
        for (i, (record, removed)) in records.iter().zip(&remove).enumerate() {
            if *removed {
                report.removed_indices.push(i);
                report.removed_ids.push(record.id.clone());
            } else {
                kept.push(record.clone());
            }
        }
        report.outliers_removed = removed_count;

        debug!(
            total = records.len(),
            hard_bounds = report.hard_bound_removals,
            statistical = report.statistical_removals,
            "outlier filtering complete"
        );

        (kept, report)
    }
}
