//! Investment potential: price trend, volatility and a combined score.

use chrono::NaiveDate;
use realty_core::{Error, MarketConfig, Metric, OutlierConfig, Result, Transaction};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics as _;
use std::collections::BTreeMap;
use tracing::debug;

use crate::activity::calculate_activity_score;
use crate::outliers::{OutlierDetector, OutlierReport};
use crate::periods::MonthKey;
use crate::statistics::{compute_statistics, median};

/// Weight of the price trend in the investment score.
pub const TREND_WEIGHT: f64 = 0.40;
/// Weight of price stability in the investment score.
pub const STABILITY_WEIGHT: f64 = 0.35;
/// Weight of market activity in the investment score.
pub const ACTIVITY_WEIGHT: f64 = 0.25;
/// Score used for a component that could not be computed.
pub const NEUTRAL_COMPONENT: f64 = 50.0;
/// Score points per percent of annual appreciation.
pub const APPRECIATION_POINTS_PER_PCT: f64 = 5.0;

/// Dispersion (%) above which each stability level starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityThresholds {
    pub stable: f64,
    pub moderate: f64,
    pub volatile: f64,
    pub very_volatile: f64,
}

pub const VOLATILITY_THRESHOLDS: VolatilityThresholds = VolatilityThresholds {
    stable: 10.0,
    moderate: 20.0,
    volatile: 30.0,
    very_volatile: 50.0,
};

impl VolatilityThresholds {
    /// Volatility score in `[0, 100]` and stability rating for a dispersion.
    pub fn classify(&self, dispersion_pct: f64) -> (f64, MarketStability) {
        let cv = dispersion_pct.max(0.0);
        let band = |lo: f64, hi: f64, base: f64| base + (cv - lo) / (hi - lo) * 25.0;

        if cv > self.very_volatile {
            (100.0, MarketStability::VeryVolatile)
        } else if cv > self.volatile {
            (band(self.volatile, self.very_volatile, 75.0), MarketStability::Volatile)
        } else if cv > self.moderate {
            (band(self.moderate, self.volatile, 50.0), MarketStability::Moderate)
        } else if cv > self.stable {
            (band(self.stable, self.moderate, 25.0), MarketStability::Stable)
        } else {
            (band(0.0, self.stable, 0.0), MarketStability::VeryStable)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTrend {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStability {
    VeryStable,
    Stable,
    Moderate,
    Volatile,
    VeryVolatile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Strong,
    Moderate,
    Caution,
}

impl Recommendation {
    /// Band of an investment score.
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Recommendation::Strong
        } else if score >= 45.0 {
            Recommendation::Moderate
        } else {
            Recommendation::Caution
        }
    }
}

/// How much priced data backs an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Excellent,
    Good,
    Fair,
    Limited,
}

impl DataQuality {
    pub fn from_points(n: usize) -> Self {
        match n {
            20.. => DataQuality::Excellent,
            10..=19 => DataQuality::Good,
            5..=9 => DataQuality::Fair,
            _ => DataQuality::Limited,
        }
    }
}

/// Least-squares fit of monthly median price per area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    /// Price-per-area change per month.
    pub slope_per_month: f64,
    /// Annualized slope as a percentage of the mean monthly median.
    pub appreciation_rate: f64,
    pub direction: PriceTrend,
    /// Monthly buckets the line was fitted on.
    pub months_fitted: usize,
}

/// Fit a price trend over dated price points.
///
/// Points are reduced to one median per calendar month, and the months are
/// placed on their real distance so gaps do not compress the slope. Needs
/// at least two months.
pub fn fit_price_trend(points: &[(NaiveDate, f64)], threshold_pct: f64) -> Option<TrendFit> {
    let mut buckets: BTreeMap<MonthKey, Vec<f64>> = BTreeMap::new();
    for &(date, value) in points {
        buckets.entry(MonthKey::of(date)).or_default().push(value);
    }
    if buckets.len() < 2 {
        return None;
    }

    let first = buckets.keys().next()?.ordinal();
    let (xs, ys): (Vec<f64>, Vec<f64>) = buckets
        .iter()
        .filter_map(|(month, values)| Some(((month.ordinal() - first) as f64, median(values)?)))
        .unzip();

    let x_mean = xs.iter().mean();
    let y_mean = ys.iter().mean();
    let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
    let sxy: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - x_mean) * (y - y_mean)).sum();
    if sxx <= 0.0 || y_mean <= 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let appreciation_rate = slope * 12.0 / y_mean * 100.0;
    let direction = if appreciation_rate > threshold_pct {
        PriceTrend::Increasing
    } else if appreciation_rate < -threshold_pct {
        PriceTrend::Decreasing
    } else {
        PriceTrend::Stable
    };

    Some(TrendFit {
        slope_per_month: slope,
        appreciation_rate,
        direction,
        months_fitted: xs.len(),
    })
}

/// Dispersion of price per area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volatility {
    /// IQR / median (robust) or std-dev / mean, in percent.
    pub dispersion_pct: f64,
    /// 0-100, higher is more volatile.
    pub score: f64,
    pub stability: MarketStability,
    pub robust: bool,
}

/// Measure dispersion of a set of prices.
pub fn price_volatility(values: &[f64], robust: bool) -> Option<Volatility> {
    let stats = compute_statistics(values);
    if stats.is_empty() {
        return None;
    }

    let (spread, center) = if robust {
        (stats.iqr(), stats.median)
    } else {
        (stats.std_dev, stats.mean)
    };
    if center <= 0.0 {
        return None;
    }

    let dispersion_pct = spread / center * 100.0;
    let (score, stability) = VOLATILITY_THRESHOLDS.classify(dispersion_pct);
    Some(Volatility {
        dispersion_pct,
        score,
        stability,
        robust,
    })
}

/// Investment view of a record batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentAnalysis {
    /// Priced points the analysis used, after the robust pass.
    pub sample_size: usize,
    pub avg_price_per_area: f64,
    pub median_price_per_area: f64,
    /// Change from the earliest to the latest priced deal.
    pub price_change_pct: Option<f64>,
    /// `None` when too few points for a meaningful fit.
    pub trend: Option<TrendFit>,
    /// `None` when too few points.
    pub volatility: Option<Volatility>,
    pub activity_score: f64,
    pub investment_score: f64,
    pub recommendation: Recommendation,
    pub data_quality: DataQuality,
    /// Outlier pass over price per area. Volatility and averages always use
    /// the filtered points; the trend uses them only with `use_robust_trend`.
    pub outlier_report: OutlierReport,
}

/// Combine trend, stability and activity into a 0-100 score.
pub fn investment_score(
    trend: Option<&TrendFit>,
    volatility: Option<&Volatility>,
    activity_score: f64,
) -> f64 {
    let trend_component = trend.map_or(NEUTRAL_COMPONENT, |t| {
        (NEUTRAL_COMPONENT + t.appreciation_rate * APPRECIATION_POINTS_PER_PCT).clamp(0.0, 100.0)
    });
    let stability_component = volatility.map_or(NEUTRAL_COMPONENT, |v| 100.0 - v.score);
    let activity_component = activity_score.clamp(0.0, 100.0);

    (TREND_WEIGHT * trend_component
        + STABILITY_WEIGHT * stability_component
        + ACTIVITY_WEIGHT * activity_component)
        .clamp(0.0, 100.0)
}

/// Priced points of a batch in date order.
fn sorted_price_points(records: &[Transaction]) -> Vec<(NaiveDate, f64)> {
    let mut points: Vec<(NaiveDate, f64)> = records
        .iter()
        .filter_map(|r| r.price_per_area().map(|p| (r.date, p)))
        .collect();
    points.sort_by_key(|&(date, _)| date);
    points
}

/// Analyze price appreciation, volatility and overall investment appeal.
///
/// Fails with a validation error on an empty batch and with
/// `InsufficientData` when fewer than `min_price_points` records carry a
/// price per area.
pub fn analyze_investment_potential(
    records: &[Transaction],
    outliers: &OutlierConfig,
    market: &MarketConfig,
) -> Result<InvestmentAnalysis> {
    if records.is_empty() {
        return Err(Error::validation("investment analysis requires at least one record"));
    }

    let priced: Vec<Transaction> = records
        .iter()
        .filter(|r| r.price_per_area().is_some())
        .cloned()
        .collect();
    if priced.len() < market.min_price_points {
        return Err(Error::insufficient_data(format!(
            "investment analysis needs at least {} records with price per area, got {}",
            market.min_price_points,
            priced.len()
        )));
    }

    let detector = OutlierDetector::new(OutlierConfig {
        metric: Metric::PricePerArea,
        ..outliers.clone()
    });
    let (filtered, outlier_report) = detector.filter_records(&priced);

    let points = sorted_price_points(&filtered);
    let prices: Vec<f64> = points.iter().map(|&(_, p)| p).collect();
    let stats = compute_statistics(&prices);

    let volatility = if points.len() >= market.min_trend_points {
        price_volatility(&prices, market.use_robust_volatility)
    } else {
        None
    };

    let raw_points;
    let trend_points = if market.use_robust_trend {
        &points
    } else {
        raw_points = sorted_price_points(&priced);
        &raw_points
    };
    let trend = if trend_points.len() >= market.min_trend_points {
        fit_price_trend(trend_points, market.price_trend_threshold_pct)
    } else {
        None
    };

    if trend.is_none() || volatility.is_none() {
        debug!(
            points = points.len(),
            trend_points = trend_points.len(),
            min_trend_points = market.min_trend_points,
            "price trend or volatility unavailable"
        );
    }

    let price_change_pct = match (prices.first(), prices.last()) {
        (Some(&first), Some(&last)) if prices.len() > 1 && first > 0.0 => {
            Some((last - first) / first * 100.0)
        }
        _ => None,
    };

    let activity_score = calculate_activity_score(records, None, market)?.activity_score;
    let score = investment_score(trend.as_ref(), volatility.as_ref(), activity_score);

    Ok(InvestmentAnalysis {
        sample_size: points.len(),
        avg_price_per_area: stats.mean,
        median_price_per_area: stats.median,
        price_change_pct,
        trend,
        volatility,
        activity_score,
        investment_score: score,
        recommendation: Recommendation::from_score(score),
        data_quality: DataQuality::from_points(points.len()),
        outlier_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn monthly_deal(id: usize, year: i32, month: u32, price_per_area: f64) -> Transaction {
        let date = NaiveDate::from_ymd_opt(year, month, 15).unwrap();
        let mut tx = Transaction::new(id.to_string(), date);
        tx.area = Some(100.0);
        tx.amount = Some(price_per_area * 100.0);
        tx
    }

    fn analyze_default(records: &[Transaction]) -> Result<InvestmentAnalysis> {
        analyze_investment_potential(records, &OutlierConfig::default(), &MarketConfig::default())
    }

    /// Ten flat months at 20,000 per sqm, then one 90,000 spike.
    fn flat_with_spike() -> Vec<Transaction> {
        let mut records: Vec<Transaction> =
            (0..10).map(|m| monthly_deal(m, 2024, m as u32 + 1, 20_000.0)).collect();
        records.push(monthly_deal(10, 2024, 11, 90_000.0));
        records
    }

    fn rising_market() -> Vec<Transaction> {
        (0..12)
            .map(|m| monthly_deal(m, 2024, m as u32 + 1, 20_000.0 + 200.0 * m as f64))
            .collect()
    }

    #[test]
    fn test_volatility_bands() {
        let t = VOLATILITY_THRESHOLDS;
        assert_eq!(t.classify(0.0), (0.0, MarketStability::VeryStable));
        assert_eq!(t.classify(5.0), (12.5, MarketStability::VeryStable));
        assert_eq!(t.classify(15.0), (37.5, MarketStability::Stable));
        assert_eq!(t.classify(25.0), (62.5, MarketStability::Moderate));
        assert_eq!(t.classify(40.0), (87.5, MarketStability::Volatile));
        assert_eq!(t.classify(80.0), (100.0, MarketStability::VeryVolatile));
    }

    #[test]
    fn test_trend_fit_linear() {
        let points: Vec<(NaiveDate, f64)> = (0..12)
            .map(|m| {
                let date = NaiveDate::from_ymd_opt(2024, m + 1, 1).unwrap();
                (date, 20_000.0 + 200.0 * m as f64)
            })
            .collect();
        let fit = fit_price_trend(&points, 2.0).unwrap();

        assert_relative_eq!(fit.slope_per_month, 200.0, epsilon = 1e-6);
        // 2400 per year over a mean of 21100
        assert_relative_eq!(fit.appreciation_rate, 2400.0 / 21_100.0 * 100.0, epsilon = 1e-9);
        assert_eq!(fit.direction, PriceTrend::Increasing);
        assert_eq!(fit.months_fitted, 12);
    }

    #[test]
    fn test_trend_fit_respects_month_gaps() {
        let d = |y, m| NaiveDate::from_ymd_opt(y, m, 1).unwrap();
        let points = vec![(d(2023, 1), 10_000.0), (d(2023, 2), 10_100.0), (d(2024, 1), 11_200.0)];
        let fit = fit_price_trend(&points, 2.0).unwrap();
        assert_relative_eq!(fit.slope_per_month, 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_trend_fit_needs_two_months() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(fit_price_trend(&[(d, 10_000.0), (d, 12_000.0)], 2.0).is_none());
        assert!(fit_price_trend(&[], 2.0).is_none());
    }

    #[test]
    fn test_robust_volatility_ignores_tail() {
        let mut values = vec![20_000.0; 10];
        values.push(90_000.0);
        let robust = price_volatility(&values, true).unwrap();
        let classic = price_volatility(&values, false).unwrap();
        assert_relative_eq!(robust.dispersion_pct, 0.0);
        assert_eq!(robust.stability, MarketStability::VeryStable);
        assert!(classic.dispersion_pct > robust.dispersion_pct);
        assert!(price_volatility(&[], true).is_none());
    }

    #[test]
    fn test_empty_batch_is_validation_error() {
        assert!(matches!(analyze_default(&[]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_too_few_priced_records() {
        let records = vec![
            monthly_deal(1, 2024, 1, 20_000.0),
            monthly_deal(2, 2024, 2, 21_000.0),
        ];
        let err = analyze_default(&records).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_small_sample_marks_trend_unavailable() {
        let records: Vec<Transaction> = (0..5)
            .map(|m| monthly_deal(m, 2024, m as u32 + 1, 20_000.0 + 500.0 * m as f64))
            .collect();
        let analysis = analyze_default(&records).unwrap();

        assert!(analysis.trend.is_none());
        assert!(analysis.volatility.is_none());
        assert_eq!(analysis.sample_size, 5);
        assert_eq!(analysis.data_quality, DataQuality::Fair);
        assert_relative_eq!(analysis.price_change_pct.unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rising_market() {
        let analysis = analyze_default(&rising_market()).unwrap();

        let trend = analysis.trend.unwrap();
        assert_eq!(trend.direction, PriceTrend::Increasing);
        assert_eq!(analysis.data_quality, DataQuality::Good);
        assert_eq!(analysis.outlier_report.outliers_removed, 0);
        assert_relative_eq!(analysis.avg_price_per_area, 21_100.0, epsilon = 1e-6);
        assert_relative_eq!(analysis.price_change_pct.unwrap(), 11.0, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_market_score() {
        let records: Vec<Transaction> =
            (0..12).map(|m| monthly_deal(m, 2024, m as u32 + 1, 20_000.0)).collect();
        let analysis = analyze_default(&records).unwrap();

        // 0.40 * 50 (flat) + 0.35 * 100 (no dispersion) + 0.25 * 25 (1 deal per month)
        assert_relative_eq!(analysis.investment_score, 61.25, epsilon = 1e-9);
        assert_eq!(analysis.recommendation, Recommendation::Moderate);
        assert_eq!(analysis.trend.unwrap().direction, PriceTrend::Stable);
    }

    #[test]
    fn test_single_spike_does_not_flip_robust_trend() {
        let records = flat_with_spike();

        let robust = analyze_default(&records).unwrap();
        assert_eq!(robust.trend.unwrap().direction, PriceTrend::Stable);
        assert_eq!(robust.outlier_report.outliers_removed, 1);

        let naive_config = MarketConfig {
            use_robust_trend: false,
            ..MarketConfig::default()
        };
        let naive =
            analyze_investment_potential(&records, &OutlierConfig::default(), &naive_config)
                .unwrap();
        assert_eq!(naive.trend.unwrap().direction, PriceTrend::Increasing);
    }

    #[test]
    fn test_raw_trend_keeps_filtered_volatility() {
        let records = flat_with_spike();

        let filtered_trend = MarketConfig {
            use_robust_volatility: false,
            ..MarketConfig::default()
        };
        let raw_trend = MarketConfig {
            use_robust_trend: false,
            ..filtered_trend.clone()
        };
        let outliers = OutlierConfig::default();
        let a = analyze_investment_potential(&records, &outliers, &filtered_trend).unwrap();
        let b = analyze_investment_potential(&records, &outliers, &raw_trend).unwrap();

        assert_eq!(b.trend.unwrap().direction, PriceTrend::Increasing);
        assert_eq!(a.volatility, b.volatility);
        assert_relative_eq!(b.volatility.unwrap().dispersion_pct, 0.0);
        assert_eq!(b.outlier_report.outliers_removed, 1);
        assert_eq!(b.sample_size, 10);
        assert_relative_eq!(b.avg_price_per_area, 20_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_score_bounds() {
        let extreme = TrendFit {
            slope_per_month: 1e9,
            appreciation_rate: 1e6,
            direction: PriceTrend::Increasing,
            months_fitted: 2,
        };
        let wild = Volatility {
            dispersion_pct: 500.0,
            score: 100.0,
            stability: MarketStability::VeryVolatile,
            robust: true,
        };
        for activity in [-10.0, 0.0, 50.0, 100.0, 400.0] {
            for trend in [None, Some(&extreme)] {
                for vol in [None, Some(&wild)] {
                    let score = investment_score(trend, vol, activity);
                    assert!((0.0..=100.0).contains(&score));
                }
            }
        }
    }

    #[test]
    fn test_recommendation_bands() {
        assert_eq!(Recommendation::from_score(85.0), Recommendation::Strong);
        assert_eq!(Recommendation::from_score(70.0), Recommendation::Strong);
        assert_eq!(Recommendation::from_score(50.0), Recommendation::Moderate);
        assert_eq!(Recommendation::from_score(10.0), Recommendation::Caution);
        assert_eq!(DataQuality::from_points(25), DataQuality::Excellent);
        assert_eq!(DataQuality::from_points(3), DataQuality::Limited);
    }
}
