//! End-to-end scenarios: raw deal JSON through ingestion and analysis.

use approx::assert_relative_eq;
use realty_analytics::{
    analyze_investment_potential, calculate_activity_score, filter_records, get_market_liquidity,
    FilterCriteria, MarketAnalyzer, StatisticsReport, TextMatch,
};
use realty_core::{Config, Error, MarketConfig, OutlierConfig, Transaction};
use realty_ingestion::parse_deals_json;

const AMOUNTS: [f64; 12] = [
    1_000_000.0,
    1_050_000.0,
    1_100_000.0,
    1_150_000.0,
    1_200_000.0,
    1_250_000.0,
    1_300_000.0,
    1_350_000.0,
    1_400_000.0,
    1_450_000.0,
    1_500_000.0,
    50_000_000.0,
];

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Twelve deals of 50 sqm over six months, the last one an entry error.
fn scenario_deals() -> Vec<Transaction> {
    let raw: Vec<String> = AMOUNTS
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            format!(
                concat!(
                    r#"{{"objectid": {}, "dealAmount": {}, "dealDate": "2024-{:02}-15T00:00:00", "#,
                    r#""assetArea": 50, "assetRoomNum": {}, "floorNo": "{}", "#,
                    r#""propertyTypeDescription": "{}"}}"#,
                ),
                i + 1,
                amount,
                i % 6 + 1,
                3 + i % 2,
                if i % 3 == 0 { "ground" } else { "2" },
                if i % 4 == 0 { "Garden Apartment" } else { "Apartment" },
            )
        })
        .collect();
    let json = format!("[{}]", raw.join(","));
    parse_deals_json(&json).unwrap()
}

#[test]
fn test_entry_error_removed_from_filtered_statistics() {
    init_tracing();
    let deals = scenario_deals();
    assert_eq!(deals.len(), 12);

    let report = StatisticsReport::build(&deals, &OutlierConfig::default(), true);
    let filtered = report.filtered.as_ref().unwrap();
    let outliers = report.outlier_report.as_ref().unwrap();

    assert_eq!(outliers.outliers_removed, 1);
    assert_eq!(outliers.removed_ids, vec!["12".to_string()]);
    assert_relative_eq!(filtered.amount.mean, 1_250_000.0, epsilon = 1e-6);
    assert!(report.statistics.amount.mean > 5_000_000.0);
    assert_eq!(filtered.total_records, 11);
}

#[test]
fn test_iqr_alone_catches_entry_error() {
    init_tracing();
    let config = OutlierConfig {
        price_per_area_max: 1e9,
        use_percentage_backup: false,
        ..OutlierConfig::default()
    };
    let report = StatisticsReport::build(&scenario_deals(), &config, true);
    let outliers = report.outlier_report.unwrap();

    assert_eq!(outliers.hard_bound_removals, 0);
    assert_eq!(outliers.statistical_removals, 1);
    assert_eq!(outliers.removed_indices, vec![11]);
}

#[test]
fn test_full_report_serializes() {
    init_tracing();
    let analyzer = MarketAnalyzer::new(&Config::default()).unwrap();
    let report = analyzer.analyze(&scenario_deals(), &FilterCriteria::default(), None).unwrap();

    assert_eq!(report.activity.distinct_months, 6);
    assert_relative_eq!(report.activity.deals_per_month, 2.0);
    assert_eq!(report.statistics.statistics.property_types["Apartment"], 9);
    assert_eq!(report.statistics.statistics.property_types["Garden Apartment"], 3);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["statistics"]["outlier_report"]["outliers_removed"], 1);
    assert!(json["statistics"]["filtered_statistics"].is_object());
    assert!(json["liquidity"]["trend_direction"].is_string());
    assert_eq!(json["activity"]["monthly_distribution"]["2024-03"], 2);
}

#[test]
fn test_empty_batch_is_rejected() {
    let config = MarketConfig::default();
    assert!(matches!(calculate_activity_score(&[], None, &config), Err(Error::Validation(_))));
    assert!(matches!(get_market_liquidity(&[], None, &config), Err(Error::Validation(_))));
    assert!(matches!(
        analyze_investment_potential(&[], &OutlierConfig::default(), &config),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_half_missing_area() {
    let deals: Vec<Transaction> = scenario_deals()
        .into_iter()
        .enumerate()
        .map(|(i, deal)| if i % 2 == 0 { deal.with_area(None) } else { deal })
        .collect();

    let report = StatisticsReport::build(&deals, &OutlierConfig::default(), false);
    assert_eq!(report.statistics.amount.count, 12);
    assert_eq!(report.statistics.area.count, 6);
    assert_eq!(report.statistics.price_per_area.count, 6);
}

#[test]
fn test_price_per_area_follows_edits() {
    let deal = scenario_deals().remove(0);
    assert_relative_eq!(deal.price_per_area().unwrap(), 20_000.0);

    let repriced = deal.with_amount(Some(1_500_000.0));
    assert_relative_eq!(repriced.price_per_area().unwrap(), 30_000.0);

    let resized = repriced.with_area(Some(75.0));
    assert_relative_eq!(resized.price_per_area().unwrap(), 20_000.0);
    assert!(resized.with_area(Some(0.0)).price_per_area().is_none());
}

#[test]
fn test_filtering_is_idempotent() {
    let deals = scenario_deals();
    let criteria = FilterCriteria {
        property_type: Some("garden".to_string()),
        property_type_match: TextMatch::Contains,
        min_rooms: Some(3.0),
        max_amount: Some(2_000_000.0),
        max_floor: Some(0),
        ..FilterCriteria::default()
    };

    let once = filter_records(&deals, &criteria).unwrap();
    let twice = filter_records(&once, &criteria).unwrap();
    assert_eq!(once, twice);
    // Of the garden apartments (1, 5, 9) only deal 1 is on the ground floor
    let ids: Vec<&str> = once.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["1"]);
}

#[test]
fn test_scores_stay_in_range() {
    let config = MarketConfig::default();
    let outliers = OutlierConfig::default();

    for size in [1usize, 3, 7, 15, 40, 120] {
        let deals: Vec<Transaction> = scenario_deals()
            .into_iter()
            .cycle()
            .take(size)
            .enumerate()
            .map(|(i, mut deal)| {
                deal.id = i.to_string();
                deal.amount = deal.amount.map(|a| a * (1.0 + (i % 5) as f64 * 0.3));
                deal
            })
            .collect();

        let activity = calculate_activity_score(&deals, None, &config).unwrap();
        assert!((0.0..=100.0).contains(&activity.activity_score));

        let liquidity = get_market_liquidity(&deals, Some(3), &config).unwrap();
        assert!((0.0..=100.0).contains(&liquidity.liquidity_score));

        match analyze_investment_potential(&deals, &outliers, &config) {
            Ok(analysis) => assert!((0.0..=100.0).contains(&analysis.investment_score)),
            Err(err) => assert!(err.is_insufficient_data()),
        }
    }
}
