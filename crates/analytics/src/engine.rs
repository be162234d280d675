//! Market analysis engine.
//!
//! Combines filtering, outlier removal, statistics and market metrics behind
//! one configured entry point.

use realty_core::{Config, Error, Result, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::{
    activity::{calculate_activity_score, get_market_liquidity, ActivityScore, LiquidityMetrics},
    filters::{filter_records, FilterCriteria},
    investment::{analyze_investment_potential, InvestmentAnalysis},
    outliers::{OutlierDetector, OutlierReport},
    periods::{apply_window, PeriodCounts},
    segments::{self, PriceSummary, SegmentComparison},
    statistics::StatisticsReport,
};

/// Everything `MarketAnalyzer::analyze` produces for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub criteria: FilterCriteria,
    pub time_period_months: Option<u32>,
    /// Records passed in.
    pub input_records: usize,
    /// Records left after filtering and windowing.
    pub analyzed_records: usize,
    pub statistics: StatisticsReport,
    pub activity: ActivityScore,
    pub liquidity: LiquidityMetrics,
    /// `None` when there were too few priced records.
    pub investment: Option<InvestmentAnalysis>,
}

/// Market analysis engine.
#[derive(Debug, Clone)]
pub struct MarketAnalyzer {
    config: Config,
    /// Detector built from `config.outliers`.
    detector: OutlierDetector,
}

impl MarketAnalyzer {
    /// Create an analyzer; rejects an invalid configuration.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            detector: OutlierDetector::new(config.outliers.clone()),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Select comparable records.
    pub fn filter(
        &self,
        records: &[Transaction],
        criteria: &FilterCriteria,
    ) -> Result<Vec<Transaction>> {
        filter_records(records, criteria)
    }

    /// Indices of outlying values.
    pub fn detect_outliers(&self, values: &[f64]) -> Vec<usize> {
        self.detector.detect(values)
    }

    /// Remove outliers from a batch.
    pub fn remove_outliers(&self, records: &[Transaction]) -> (Vec<Transaction>, OutlierReport) {
        self.detector.filter_records(records)
    }

    /// Descriptive statistics, optionally with the filtered view.
    pub fn statistics(&self, records: &[Transaction], filter_outliers: bool) -> StatisticsReport {
        StatisticsReport::build(records, &self.config.outliers, filter_outliers)
    }

    /// Monthly and quarterly deal counts.
    pub fn period_counts(
        &self,
        records: &[Transaction],
        time_period_months: Option<u32>,
    ) -> PeriodCounts {
        PeriodCounts::from_records(&apply_window(records, time_period_months))
    }

    pub fn activity_score(
        &self,
        records: &[Transaction],
        time_period_months: Option<u32>,
    ) -> Result<ActivityScore> {
        calculate_activity_score(records, time_period_months, &self.config.market)
    }

    pub fn liquidity(
        &self,
        records: &[Transaction],
        time_period_months: Option<u32>,
    ) -> Result<LiquidityMetrics> {
        get_market_liquidity(records, time_period_months, &self.config.market)
    }

    pub fn investment_potential(&self, records: &[Transaction]) -> Result<InvestmentAnalysis> {
        analyze_investment_potential(records, &self.config.outliers, &self.config.market)
    }

    pub fn yearly_breakdown(&self, records: &[Transaction]) -> BTreeMap<i32, PriceSummary> {
        segments::yearly_breakdown(records)
    }

    pub fn property_type_breakdown(
        &self,
        records: &[Transaction],
    ) -> BTreeMap<String, PriceSummary> {
        segments::property_type_breakdown(records)
    }

    pub fn compare_segments<S: AsRef<str>>(
        &self,
        batches: &[(S, Vec<Transaction>)],
    ) -> SegmentComparison {
        segments::compare_segments(batches)
    }

    /// Run the full pipeline: filter, window, statistics, activity,
    /// liquidity and investment.
    ///
    /// Fails when the criteria are invalid or nothing is left to analyze.
    /// Investment analysis without enough priced records is reported as
    /// `None` instead of failing the whole report.
    pub fn analyze(
        &self,
        records: &[Transaction],
        criteria: &FilterCriteria,
        time_period_months: Option<u32>,
    ) -> Result<MarketReport> {
        let filtered = self.filter(records, criteria)?;
        let batch = apply_window(&filtered, time_period_months);
        if batch.is_empty() {
            return Err(Error::validation(format!(
                "no records left to analyze ({} input, {} after filtering)",
                records.len(),
                filtered.len()
            )));
        }

        let statistics = self.statistics(&batch, true);
        let activity = self.activity_score(&batch, time_period_months)?;
        let liquidity = self.liquidity(&batch, time_period_months)?;
        let investment = match self.investment_potential(&batch) {
            Ok(analysis) => Some(analysis),
            Err(err) if err.is_insufficient_data() => {
                debug!(error = %err, "investment analysis unavailable");
                None
            }
            Err(err) => return Err(err),
        };

        info!(
            input = records.len(),
            analyzed = batch.len(),
            outliers_removed = statistics.outlier_report.as_ref().map_or(0, |r| r.outliers_removed),
            activity_score = activity.activity_score,
            "market analysis complete"
        );

        Ok(MarketReport {
            criteria: criteria.clone(),
            time_period_months,
            input_records: records.len(),
            analyzed_records: batch.len(),
            statistics,
            activity,
            liquidity,
            investment,
        })
    }
}
