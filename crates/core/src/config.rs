//! Configuration structures for the analytics engine.
//!
//! The thresholds here are empirically tuned heuristics for small real-estate
//! samples, not analytically derived bounds. They are passed explicitly into
//! every operation; nothing reads process-wide settings.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Metric, OutlierMethod};

/// Main configuration for an analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Outlier detection configuration.
    pub outliers: OutlierConfig,
    /// Market metrics configuration.
    pub market: MarketConfig,
}

impl Config {
    /// Parse a (possibly partial) JSON document and validate it.
    ///
    /// Keys that are absent keep their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are consistent.
    pub fn validate(&self) -> Result<()> {
        self.outliers.validate()?;
        self.market.validate()
    }
}

/// Outlier detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Statistical method.
    pub method: OutlierMethod,
    /// Attribute the statistical pass runs on.
    pub metric: Metric,
    /// IQR fence multiplier (k).
    pub iqr_multiplier: f64,
    /// Apply the percentage pass in addition to IQR.
    pub use_percentage_backup: bool,
    /// Maximum relative deviation from the median.
    pub percentage_threshold: f64,
    /// Lowest sane price per square meter.
    pub price_per_area_min: f64,
    /// Highest sane price per square meter.
    pub price_per_area_max: f64,
    /// Amounts below this are treated as partial or family sales.
    pub min_deal_amount: f64,
    /// Skip detection entirely below this many values.
    pub min_sample_size: usize,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            method: OutlierMethod::Iqr,
            metric: Metric::PricePerArea,
            iqr_multiplier: 1.0,
            use_percentage_backup: true,
            percentage_threshold: 0.40,
            price_per_area_min: 1_000.0,
            price_per_area_max: 100_000.0,
            min_deal_amount: 100_000.0,
            min_sample_size: 10,
        }
    }
}

impl OutlierConfig {
    /// Check that all values are consistent.
    pub fn validate(&self) -> Result<()> {
        if !(self.iqr_multiplier.is_finite() && self.iqr_multiplier > 0.0) {
            return Err(Error::config("iqr_multiplier must be positive"));
        }
        if !(self.percentage_threshold.is_finite() && self.percentage_threshold > 0.0) {
            return Err(Error::config("percentage_threshold must be positive"));
        }
        if self.price_per_area_min < 0.0 || self.price_per_area_min > self.price_per_area_max {
            return Err(Error::config(
                "price_per_area_min must be non-negative and <= price_per_area_max",
            ));
        }
        if self.min_deal_amount < 0.0 {
            return Err(Error::config("min_deal_amount must be non-negative"));
        }
        Ok(())
    }
}

/// Market metrics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// IQR/median volatility instead of std-dev/mean.
    pub use_robust_volatility: bool,
    /// Remove outliers before fitting the price trend.
    pub use_robust_trend: bool,
    /// Relative half-over-half change treated as noise (0.10 = ±10%).
    pub trend_noise_band: f64,
    /// Investment analysis fails below this many priced records.
    pub min_price_points: usize,
    /// Trend and volatility are reported unavailable below this many points.
    pub min_trend_points: usize,
    /// Annual appreciation (%) beyond which the price trend is directional.
    pub price_trend_threshold_pct: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            use_robust_volatility: true,
            use_robust_trend: true,
            trend_noise_band: 0.10,
            min_price_points: 3,
            min_trend_points: 10,
            price_trend_threshold_pct: 2.0,
        }
    }
}

impl MarketConfig {
    /// Check that all values are consistent.
    pub fn validate(&self) -> Result<()> {
        if !(self.trend_noise_band.is_finite() && self.trend_noise_band >= 0.0) {
            return Err(Error::config("trend_noise_band must be non-negative"));
        }
        if self.min_price_points == 0 {
            return Err(Error::config("min_price_points must be at least 1"));
        }
        if self.min_trend_points < self.min_price_points {
            return Err(Error::config("min_trend_points must be >= min_price_points"));
        }
        if !(self.price_trend_threshold_pct.is_finite() && self.price_trend_threshold_pct >= 0.0) {
            return Err(Error::config("price_trend_threshold_pct must be non-negative"));
        }
        Ok(())
    }
}
