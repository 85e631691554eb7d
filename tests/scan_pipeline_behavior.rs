//! Behavior-driven tests for the full scan pipeline.
//!
//! These tests drive universe -> fan-out -> evaluation -> ranking -> report
//! with fixture collaborators and verify the run-level properties: ranking,
//! determinism, capping, and the fabricated three-ticker scenario.

use goldscreen_tests::*;
use serde_json::json;

fn summary(sector: &str, pe: f64, roe: f64, gpm: f64, debt: f64, equity: f64) -> serde_json::Value {
    json!({
        "sector": sector,
        "longName": format!("{sector} Fixture"),
        "currency": "USD",
        "trailingPE": pe,
        "returnOnEquity": roe,
        "grossMargins": gpm,
        "totalDebt": debt,
        "totalStockholderEquity": equity
    })
}

fn summary_mode() -> ScreenerConfig {
    ScreenerConfig {
        statement_ratios: false,
        ..ScreenerConfig::default()
    }
}

#[tokio::test]
async fn three_ticker_scenario_keeps_only_the_exempt_financial() {
    // Ticker A: exempt sector with heavy leverage, otherwise qualifying.
    // Ticker B: blocklisted sector with great ratios.
    // Ticker C: permitted sector but too expensive.
    let source = Arc::new(FixtureMetricSource::new(vec![
        (
            "AFIN",
            FixtureSecurity::with_summary(summary(
                "Financial Services",
                10.0,
                0.20,
                0.25,
                200.0,
                100.0,
            ))
            .price(55.5),
        ),
        (
            "BTEC",
            FixtureSecurity::with_summary(summary("Technology", 8.0, 0.30, 0.60, 10.0, 100.0)),
        ),
        (
            "CDEF",
            FixtureSecurity::with_summary(summary(
                "Consumer Defensive",
                20.0,
                0.22,
                0.30,
                10.0,
                100.0,
            )),
        ),
    ]));

    let report = fixture_orchestrator(source, summary_mode())
        .run(universe(&["AFIN", "BTEC", "CDEF"]))
        .await;

    assert_eq!(report.count, 1);
    assert_eq!(report.data.len(), 1);

    let record = &report.data[0];
    assert_eq!(record.symbol.as_str(), "AFIN");
    assert_eq!(record.pe, 10.0);
    assert_eq!(record.roe, 20.0);
    assert_eq!(record.gpm, 25.0);
    assert_eq!(record.de_ratio, 2.0);
    assert_eq!(record.price, 55.5);
    assert_eq!(
        record.tag,
        PassTag::DebtExempt {
            sector: String::from("Financial Services")
        }
    );
}

#[tokio::test]
async fn report_pe_column_is_non_decreasing_across_its_length() {
    let source = Arc::new(FixtureMetricSource::new(vec![
        (
            "AAA",
            FixtureSecurity::with_summary(summary("Healthcare", 13.0, 0.25, 0.5, 0.0, 100.0)),
        ),
        (
            "BBB",
            FixtureSecurity::with_summary(summary("Healthcare", 5.5, 0.25, 0.5, 0.0, 100.0)),
        ),
        (
            "CCC",
            FixtureSecurity::with_summary(summary("Utilities", 9.0, 0.25, 0.5, 0.0, 100.0)),
        ),
        (
            "DDD",
            FixtureSecurity::with_summary(summary("Healthcare", 9.0, 0.25, 0.5, 0.0, 100.0)),
        ),
    ]));

    let report = fixture_orchestrator(source, summary_mode())
        .run(universe(&["AAA", "BBB", "CCC", "DDD"]))
        .await;

    assert_eq!(report.count, 4);
    for pair in report.data.windows(2) {
        assert!(
            pair[0].pe <= pair[1].pe,
            "report must be sorted ascending by P/E"
        );
    }
    // Tie at 9.0: first-seen (set) order is preserved by the stable sort.
    assert_eq!(report.data[1].symbol.as_str(), "CCC");
    assert_eq!(report.data[2].symbol.as_str(), "DDD");
}

#[tokio::test]
async fn identical_inputs_produce_identical_match_records() {
    let entries = || {
        vec![
            (
                "AAA",
                FixtureSecurity::with_summary(summary("Healthcare", 7.0, 0.3, 0.5, 0.0, 100.0)),
            ),
            (
                "BBB",
                FixtureSecurity::with_summary(summary("Utilities", 11.0, 0.3, 0.5, 0.0, 100.0)),
            ),
        ]
    };

    let first = fixture_orchestrator(Arc::new(FixtureMetricSource::new(entries())), summary_mode())
        .run(universe(&["AAA", "BBB"]))
        .await;
    let second =
        fixture_orchestrator(Arc::new(FixtureMetricSource::new(entries())), summary_mode())
            .run(universe(&["AAA", "BBB"]))
            .await;

    // Everything except the generation timestamp is byte-identical.
    assert_eq!(first.data, second.data);
    assert_eq!(first.count, second.count);
}

#[tokio::test]
async fn scan_cap_truncates_the_universe_before_dispatch() {
    let source = Arc::new(FixtureMetricSource::new(
        ["AAA", "BBB", "CCC", "DDD"]
            .into_iter()
            .map(|symbol| {
                (
                    symbol,
                    FixtureSecurity::with_summary(summary("Healthcare", 8.0, 0.3, 0.5, 0.0, 100.0)),
                )
            })
            .collect(),
    ));
    let config = ScreenerConfig {
        scan_cap: 2,
        ..summary_mode()
    };

    let report = fixture_orchestrator(source, config)
        .run(universe(&["AAA", "BBB", "CCC", "DDD"]))
        .await;

    assert_eq!(report.count, 2);
}

#[tokio::test]
async fn failed_and_unknown_securities_never_block_report_emission() {
    let source = Arc::new(FixtureMetricSource::new(vec![
        (
            "GOOD",
            FixtureSecurity::with_summary(summary("Healthcare", 8.0, 0.3, 0.5, 0.0, 100.0)),
        ),
        (
            "NOPX",
            FixtureSecurity::with_summary(summary("Healthcare", 8.0, 0.3, 0.5, 0.0, 100.0))
                .without_price(),
        ),
    ]));

    let report = fixture_orchestrator(source, summary_mode())
        .run(universe(&["GOOD", "NOPX", "GONE"]))
        .await;

    assert_eq!(report.count, 1);
    assert_eq!(report.data[0].symbol.as_str(), "GOOD");
}

#[tokio::test]
async fn serialized_report_uses_the_published_field_names() {
    let source = Arc::new(FixtureMetricSource::new(vec![(
        "AAA",
        FixtureSecurity::with_summary(summary("Healthcare", 8.0, 0.3, 0.5, 0.0, 100.0)),
    )]));

    let report = fixture_orchestrator(source, summary_mode())
        .run(universe(&["AAA"]))
        .await;
    let value = serde_json::to_value(&report).expect("report serializes");

    for key in ["last_updated", "count", "data"] {
        assert!(value.get(key).is_some(), "report must expose '{key}'");
    }
    let record = &value["data"][0];
    for key in [
        "symbol", "name", "sector", "pe", "roe", "gpm", "de_ratio", "price", "currency", "tag",
    ] {
        assert!(record.get(key).is_some(), "record must expose '{key}'");
    }
    assert_eq!(record["tag"], json!("golden value"));
}

#[tokio::test]
async fn empty_universe_still_yields_a_writable_zero_match_report() {
    let report = fixture_orchestrator(
        Arc::new(FixtureMetricSource::new(Vec::new())),
        summary_mode(),
    )
    .run(universe(&[]))
    .await;

    assert_eq!(report.count, 0);
    assert!(serde_json::to_string(&report).is_ok());
}
