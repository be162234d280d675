//! Robust statistics and market metrics for real-estate deals.
//!
//! This crate handles:
//! - Outlier detection (hard bounds, IQR, percentage backup)
//! - Raw and filtered descriptive statistics
//! - Monthly and quarterly bucketing
//! - Activity, liquidity and investment metrics
//! - Comparable-record filtering and segment breakdowns

pub mod activity;
pub mod engine;
pub mod filters;
pub mod investment;
pub mod outliers;
pub mod periods;
pub mod segments;
pub mod statistics;

pub use activity::{
    calculate_activity_score, get_market_liquidity, ActivityScore, ActivityTrend, LiquidityMetrics,
    MarketLevel,
};
pub use engine::{MarketAnalyzer, MarketReport};
pub use filters::{filter_records, FilterCriteria, TextMatch};
pub use investment::{
    analyze_investment_potential, DataQuality, InvestmentAnalysis, MarketStability, PriceTrend,
    Recommendation,
};
pub use outliers::{OutlierDetector, OutlierReport};
pub use periods::{MonthKey, PeriodCounts, QuarterKey};
pub use segments::{
    compare_segments, property_type_breakdown, yearly_breakdown, PriceSummary, SegmentComparison,
};
pub use statistics::{compute_statistics, DealStatistics, Statistics, StatisticsReport};
