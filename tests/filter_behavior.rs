//! Behavior-driven tests for the security filter.
//!
//! These tests verify HOW one security moves through the filter pipeline:
//! sector short-circuiting, strict threshold boundaries, the debt
//! exemption, and fault absorption at the evaluator boundary.

use goldscreen_tests::*;
use serde_json::json;

fn passing_summary(sector: &str) -> serde_json::Value {
    json!({
        "sector": sector,
        "longName": "Fixture Co",
        "currency": "USD",
        "trailingPE": 10.0,
        "returnOnEquity": 0.25,
        "grossMargins": 0.40,
        "totalDebt": 30.0,
        "totalStockholderEquity": 100.0
    })
}

fn summary_mode() -> ScreenerConfig {
    ScreenerConfig {
        statement_ratios: false,
        ..ScreenerConfig::default()
    }
}

fn evaluator_for(
    entries: Vec<(&str, FixtureSecurity)>,
    config: ScreenerConfig,
) -> (Arc<FixtureMetricSource>, SecurityEvaluator) {
    let source = Arc::new(FixtureMetricSource::new(entries));
    let evaluator = SecurityEvaluator::new(source.clone(), config);
    (source, evaluator)
}

// =============================================================================
// Sector exclusion: qualitative short-circuit
// =============================================================================

#[tokio::test]
async fn when_sector_is_excluded_evaluation_is_absent_regardless_of_ratios() {
    // Given: outstanding ratios but a blocklisted sector
    let (_, evaluator) = evaluator_for(
        vec![(
            "CHIP",
            FixtureSecurity::with_summary(passing_summary("Semiconductors")),
        )],
        summary_mode(),
    );

    // Then: the security never reaches a match record
    assert!(evaluator.evaluate(&ticker("CHIP")).await.is_none());
}

#[tokio::test]
async fn when_sector_is_excluded_no_statement_fetch_is_attempted() {
    let (source, evaluator) = evaluator_for(
        vec![(
            "TECH",
            FixtureSecurity::with_summary(passing_summary("Technology")).statements(
                statement_set(
                    &[
                        (line_items::NET_INCOME, 50.0),
                        (line_items::GROSS_PROFIT, 80.0),
                        (line_items::TOTAL_REVENUE, 200.0),
                    ],
                    &[
                        (line_items::TOTAL_DEBT, 10.0),
                        (line_items::TOTAL_EQUITY, 100.0),
                    ],
                ),
            ),
        )],
        ScreenerConfig::default(),
    );

    assert!(evaluator.evaluate(&ticker("TECH")).await.is_none());
    assert_eq!(
        source.statement_calls(),
        0,
        "sector rejection must short-circuit before statement work"
    );
}

#[tokio::test]
async fn when_sector_is_missing_security_is_still_evaluated() {
    // "Unknown" is not on the blocklist; the quantitative filters decide.
    let mut summary = passing_summary("ignored");
    summary.as_object_mut().expect("object").remove("sector");
    let (_, evaluator) = evaluator_for(
        vec![("NOSEC", FixtureSecurity::with_summary(summary))],
        summary_mode(),
    );

    let record = evaluator
        .evaluate(&ticker("NOSEC"))
        .await
        .expect("should pass on ratios alone");
    assert_eq!(record.sector, "Unknown");
}

// =============================================================================
// Boundary exactness: strict inequalities on every threshold
// =============================================================================

#[tokio::test]
async fn when_metric_sits_exactly_on_threshold_filter_fails() {
    for (key, boundary) in [
        ("trailingPE", json!(15.0)),
        ("returnOnEquity", json!(0.15)),
        ("grossMargins", json!(0.20)),
    ] {
        let mut summary = passing_summary("Consumer Defensive");
        summary[key] = boundary.clone();
        let (_, evaluator) = evaluator_for(
            vec![("EDGE", FixtureSecurity::with_summary(summary))],
            summary_mode(),
        );

        assert!(
            evaluator.evaluate(&ticker("EDGE")).await.is_none(),
            "{key} = {boundary} must fail its filter"
        );
    }
}

#[tokio::test]
async fn when_metric_is_just_inside_threshold_filter_passes() {
    let mut summary = passing_summary("Consumer Defensive");
    summary["trailingPE"] = json!(14.99);
    summary["returnOnEquity"] = json!(0.1501);
    summary["grossMargins"] = json!(0.2001);
    let (_, evaluator) = evaluator_for(
        vec![("EDGE", FixtureSecurity::with_summary(summary))],
        summary_mode(),
    );

    assert!(evaluator.evaluate(&ticker("EDGE")).await.is_some());
}

#[tokio::test]
async fn when_pe_is_non_positive_valuation_fails() {
    // 0 < P/E is the lower side of the valuation filter.
    let mut summary = passing_summary("Consumer Defensive");
    summary["trailingPE"] = json!(-3.5);
    let (_, evaluator) = evaluator_for(
        vec![("LOSS", FixtureSecurity::with_summary(summary))],
        summary_mode(),
    );

    assert!(evaluator.evaluate(&ticker("LOSS")).await.is_none());
}

#[tokio::test]
async fn when_debt_ratio_sits_exactly_on_ceiling_non_exempt_sector_fails() {
    let mut summary = passing_summary("Consumer Defensive");
    summary["totalDebt"] = json!(100.0);
    summary["totalStockholderEquity"] = json!(100.0);
    let (_, evaluator) = evaluator_for(
        vec![("LVRG", FixtureSecurity::with_summary(summary))],
        summary_mode(),
    );

    assert!(evaluator.evaluate(&ticker("LVRG")).await.is_none());
}

// =============================================================================
// Debt exemption: structural-leverage sectors
// =============================================================================

#[tokio::test]
async fn when_sector_is_exempt_high_leverage_does_not_disqualify() {
    let mut summary = passing_summary("Financial Services");
    summary["totalDebt"] = json!(250.0);
    summary["totalStockholderEquity"] = json!(100.0);
    let (_, evaluator) = evaluator_for(
        vec![("BANK", FixtureSecurity::with_summary(summary))],
        summary_mode(),
    );

    let record = evaluator
        .evaluate(&ticker("BANK"))
        .await
        .expect("exempt sector should pass");
    assert_eq!(record.de_ratio, 2.5);
    assert_eq!(
        record.tag,
        PassTag::DebtExempt {
            sector: String::from("Financial Services")
        }
    );
}

#[tokio::test]
async fn when_exempt_sector_fails_another_filter_exemption_does_not_save_it() {
    let mut summary = passing_summary("Utilities");
    summary["trailingPE"] = json!(22.0);
    let (_, evaluator) = evaluator_for(
        vec![("GRID", FixtureSecurity::with_summary(summary))],
        summary_mode(),
    );

    assert!(evaluator.evaluate(&ticker("GRID")).await.is_none());
}

#[tokio::test]
async fn when_exempt_sector_is_within_ceiling_tag_stays_standard() {
    let (_, evaluator) = evaluator_for(
        vec![(
            "SAFE",
            FixtureSecurity::with_summary(passing_summary("Utilities")),
        )],
        summary_mode(),
    );

    let record = evaluator.evaluate(&ticker("SAFE")).await.expect("passes");
    assert_eq!(record.tag, PassTag::Standard);
}

// =============================================================================
// Statement-derived ratio strategy
// =============================================================================

#[tokio::test]
async fn when_statements_are_present_ratios_come_from_line_items() {
    let mut summary = passing_summary("Consumer Defensive");
    // Provider-precomputed fields disagree with the statements; statement
    // mode must ignore them.
    summary["returnOnEquity"] = json!(0.01);
    summary["grossMargins"] = json!(0.01);

    let (_, evaluator) = evaluator_for(
        vec![(
            "CALC",
            FixtureSecurity::with_summary(summary).statements(statement_set(
                &[
                    (line_items::NET_INCOME, 40.0),
                    (line_items::GROSS_PROFIT, 90.0),
                    (line_items::TOTAL_REVENUE, 200.0),
                ],
                &[
                    (line_items::TOTAL_DEBT, 20.0),
                    (line_items::TOTAL_EQUITY, 200.0),
                ],
            )),
        )],
        ScreenerConfig::default(),
    );

    let record = evaluator.evaluate(&ticker("CALC")).await.expect("passes");
    assert_eq!(record.roe, 20.0);
    assert_eq!(record.gpm, 45.0);
    assert_eq!(record.de_ratio, 0.1);
}

#[tokio::test]
async fn when_statements_are_missing_statement_mode_rejects_via_sentinels() {
    let (_, evaluator) = evaluator_for(
        vec![(
            "THIN",
            FixtureSecurity::with_summary(passing_summary("Consumer Defensive")),
        )],
        ScreenerConfig::default(),
    );

    assert!(evaluator.evaluate(&ticker("THIN")).await.is_none());
}

#[tokio::test]
async fn when_balance_sheet_is_missing_debt_falls_back_to_summary_fields() {
    let (_, evaluator) = evaluator_for(
        vec![(
            "FBACK",
            FixtureSecurity::with_summary(passing_summary("Consumer Defensive")).statements(
                statement_set(
                    &[
                        (line_items::NET_INCOME, 40.0),
                        (line_items::GROSS_PROFIT, 90.0),
                        (line_items::TOTAL_REVENUE, 200.0),
                    ],
                    // No debt or equity line items survived the filing.
                    &[],
                ),
            ),
        )],
        ScreenerConfig::default(),
    );

    let record = evaluator.evaluate(&ticker("FBACK")).await.expect("passes");
    // Summary fallback: 30 debt over 100 equity.
    assert_eq!(record.de_ratio, 0.3);
}

// =============================================================================
// Fault absorption at the evaluator boundary
// =============================================================================

#[tokio::test]
async fn when_price_feed_fails_security_is_absent() {
    let (_, evaluator) = evaluator_for(
        vec![(
            "NOPX",
            FixtureSecurity::with_summary(passing_summary("Consumer Defensive")).without_price(),
        )],
        summary_mode(),
    );

    assert!(evaluator.evaluate(&ticker("NOPX")).await.is_none());
}

#[tokio::test]
async fn when_security_is_unknown_to_the_provider_evaluation_is_absent() {
    let (_, evaluator) = evaluator_for(Vec::new(), summary_mode());
    assert!(evaluator.evaluate(&ticker("GONE")).await.is_none());
}
