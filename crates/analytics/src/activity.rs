//! Market activity and liquidity.
//!
//! Both indicators are driven by deals per month, counted over months that
//! actually contain deals, and share the same half-over-half trend check.

use realty_core::{Error, MarketConfig, Result, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::periods::{apply_window, MonthKey, PeriodCounts, QuarterKey};

/// Score band edges in deals per month.
///
/// Rates between two edges interpolate linearly inside a 25-point band:
/// `[0, low)` → 0-25, `[low, moderate)` → 25-50, `[moderate, high)` → 50-75,
/// `[high, very_high)` → 75-100, and `very_high` or more scores 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelThresholds {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
    pub very_high: f64,
}

/// Band edges for the activity score.
pub const ACTIVITY_THRESHOLDS: LevelThresholds = LevelThresholds {
    low: 1.0,
    moderate: 3.0,
    high: 5.0,
    very_high: 10.0,
};

/// Band edges for the liquidity score.
pub const LIQUIDITY_THRESHOLDS: LevelThresholds = LevelThresholds {
    low: 0.5,
    moderate: 2.0,
    high: 5.0,
    very_high: 8.0,
};

/// Months with data required before a trend is classified.
pub const MIN_TREND_MONTHS: usize = 4;

impl LevelThresholds {
    /// Map a rate to a score in `[0, 100]`.
    pub fn score(&self, rate: f64) -> f64 {
        if !rate.is_finite() || rate <= 0.0 {
            return 0.0;
        }
        let edges = [0.0, self.low, self.moderate, self.high, self.very_high];
        for (band, pair) in edges.windows(2).enumerate() {
            let (lo, hi) = (pair[0], pair[1]);
            if rate < hi {
                let frac = (rate - lo) / (hi - lo);
                return (band as f64 * 25.0 + frac * 25.0).clamp(0.0, 100.0);
            }
        }
        100.0
    }

    /// Categorical level of a rate.
    pub fn level(&self, rate: f64) -> MarketLevel {
        if rate >= self.very_high {
            MarketLevel::VeryHigh
        } else if rate >= self.high {
            MarketLevel::High
        } else if rate >= self.moderate {
            MarketLevel::Moderate
        } else if rate >= self.low {
            MarketLevel::Low
        } else {
            MarketLevel::VeryLow
        }
    }
}

/// Categorical activity or liquidity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketLevel {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

/// Direction of deal counts across the observed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityTrend {
    Improving,
    Stable,
    Declining,
    /// Too few months with data to compare halves.
    InsufficientData,
}

/// Compare average monthly counts of the earlier and later half of the months.
///
/// A relative change within `noise_band` is stable. With an odd number of
/// months the later half gets the extra month.
pub fn half_over_half_trend(monthly: &BTreeMap<MonthKey, usize>, noise_band: f64) -> ActivityTrend {
    let counts: Vec<f64> = monthly.values().map(|&n| n as f64).collect();
    if counts.len() < MIN_TREND_MONTHS {
        return ActivityTrend::InsufficientData;
    }

    let (first, second) = counts.split_at(counts.len() / 2);
    let first_avg = first.iter().sum::<f64>() / first.len() as f64;
    let second_avg = second.iter().sum::<f64>() / second.len() as f64;
    if first_avg <= 0.0 {
        return ActivityTrend::Stable;
    }

    let change = (second_avg - first_avg) / first_avg;
    if change > noise_band {
        ActivityTrend::Improving
    } else if change < -noise_band {
        ActivityTrend::Declining
    } else {
        ActivityTrend::Stable
    }
}

/// Activity score of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityScore {
    pub activity_score: f64,
    pub activity_level: MarketLevel,
    pub trend: ActivityTrend,
    pub total_deals: usize,
    pub distinct_months: usize,
    pub deals_per_month: f64,
    pub time_period_months: Option<u32>,
    pub monthly_distribution: BTreeMap<MonthKey, usize>,
}

/// Liquidity indicators of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityMetrics {
    pub liquidity_score: f64,
    pub liquidity_rating: MarketLevel,
    /// Always populated; `insufficient_data` when too few months.
    pub trend_direction: ActivityTrend,
    pub total_deals: usize,
    pub avg_deals_per_month: f64,
    pub deals_per_quarter: f64,
    pub time_period_months: Option<u32>,
    pub quarterly_breakdown: BTreeMap<QuarterKey, usize>,
    pub monthly_breakdown: BTreeMap<MonthKey, usize>,
    pub most_active_quarter: Option<QuarterKey>,
}

fn windowed_counts(
    records: &[Transaction],
    months: Option<u32>,
    what: &str,
) -> Result<PeriodCounts> {
    if records.is_empty() {
        return Err(Error::validation(format!("{what} requires at least one record")));
    }
    if months == Some(0) {
        return Err(Error::validation(format!(
            "{what} time window must cover at least one month"
        )));
    }
    let windowed = apply_window(records, months);
    if windowed.is_empty() {
        return Err(Error::validation(format!("{what} window contains no records")));
    }
    Ok(PeriodCounts::from_records(&windowed))
}

/// Score market activity from deal frequency.
///
/// Fails with a validation error on an empty batch or a zero-month window.
pub fn calculate_activity_score(
    records: &[Transaction],
    time_period_months: Option<u32>,
    config: &MarketConfig,
) -> Result<ActivityScore> {
    let counts = windowed_counts(records, time_period_months, "activity score")?;
    let rate = counts.per_month();

    Ok(ActivityScore {
        activity_score: ACTIVITY_THRESHOLDS.score(rate),
        activity_level: ACTIVITY_THRESHOLDS.level(rate),
        trend: half_over_half_trend(&counts.monthly, config.trend_noise_band),
        total_deals: counts.total,
        distinct_months: counts.distinct_months(),
        deals_per_month: rate,
        time_period_months,
        monthly_distribution: counts.monthly,
    })
}

/// Liquidity indicators from deal velocity.
///
/// Fails with a validation error on an empty batch or a zero-month window.
pub fn get_market_liquidity(
    records: &[Transaction],
    time_period_months: Option<u32>,
    config: &MarketConfig,
) -> Result<LiquidityMetrics> {
    let counts = windowed_counts(records, time_period_months, "market liquidity")?;
    let rate = counts.per_month();

    Ok(LiquidityMetrics {
        liquidity_score: LIQUIDITY_THRESHOLDS.score(rate),
        liquidity_rating: LIQUIDITY_THRESHOLDS.level(rate),
        trend_direction: half_over_half_trend(&counts.monthly, config.trend_noise_band),
        total_deals: counts.total,
        avg_deals_per_month: rate,
        deals_per_quarter: counts.per_quarter(),
        time_period_months,
        most_active_quarter: counts.busiest_quarter().map(|(q, _)| q),
        quarterly_breakdown: counts.quarterly,
        monthly_breakdown: counts.monthly,
    })
}
