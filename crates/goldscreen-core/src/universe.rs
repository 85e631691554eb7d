//! Candidate universe aggregation.
//!
//! The universe is the union of several independent constituent sources:
//! scraped index-membership pages plus a static list covering exchanges
//! without a usable tabular page. Every source is independently fault
//! tolerant — the aggregate is whatever subset succeeded, possibly empty.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use tracing::{info, warn};

use crate::metric_source::SourceError;
use crate::Ticker;

/// One independent contributor of candidate tickers.
pub trait ConstituentSource: Send + Sync {
    /// Human-readable label for logging.
    fn label(&self) -> &str;

    /// Fetches this source's raw contribution, already normalized to the
    /// provider's ticker convention.
    fn fetch<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticker>, SourceError>> + Send + 'a>>;
}

/// Static large-cap list for markets poorly covered by scrapeable pages
/// (Tokyo, Zurich, Toronto, Sydney, Hong Kong).
pub struct ManualListSource {
    tickers: Vec<Ticker>,
}

pub const MANUAL_LARGE_CAPS: &[&str] = &[
    // Japan
    "7203.T", "6758.T", "9984.T", "6861.T", "8306.T", "9432.T", "7974.T",
    // Switzerland
    "NESN.SW", "NOVN.SW", "ROG.SW", "UBSG.SW", "ZURN.SW",
    // Canada
    "RY.TO", "TD.TO", "ENB.TO",
    // Australia
    "BHP.AX", "CBA.AX", "CSL.AX", "WBC.AX",
    // Hong Kong
    "0700.HK", "9988.HK", "1299.HK",
];

impl ManualListSource {
    pub fn new(symbols: &[&str]) -> Self {
        Self {
            tickers: symbols
                .iter()
                .filter_map(|raw| Ticker::parse(raw).ok())
                .collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(MANUAL_LARGE_CAPS)
    }
}

impl ConstituentSource for ManualListSource {
    fn label(&self) -> &str {
        "manual large-caps"
    }

    fn fetch<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticker>, SourceError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.tickers.clone()) })
    }
}

/// Builds the deduplicated candidate universe from all configured sources.
pub struct UniverseAggregator {
    sources: Vec<Box<dyn ConstituentSource>>,
}

impl UniverseAggregator {
    pub fn new(sources: Vec<Box<dyn ConstituentSource>>) -> Self {
        Self { sources }
    }

    /// Union of every source's contribution.
    ///
    /// A failing source contributes nothing and is logged; the aggregation
    /// itself never fails. The result is a set, so ticker order carries no
    /// meaning here — ranking happens in the final report.
    pub async fn aggregate(&self) -> BTreeSet<Ticker> {
        let mut universe = BTreeSet::new();

        for source in &self.sources {
            match source.fetch().await {
                Ok(tickers) => {
                    info!(
                        source = source.label(),
                        count = tickers.len(),
                        "collected constituents"
                    );
                    universe.extend(tickers);
                }
                Err(error) => {
                    warn!(
                        source = source.label(),
                        error = %error,
                        "constituent source degraded to empty contribution"
                    );
                }
            }
        }

        info!(count = universe.len(), "aggregated candidate universe");
        universe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource {
        label: &'static str,
        result: Result<Vec<&'static str>, &'static str>,
    }

    impl ConstituentSource for StaticSource {
        fn label(&self) -> &str {
            self.label
        }

        fn fetch<'a>(
            &'a self,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticker>, SourceError>> + Send + 'a>> {
            Box::pin(async move {
                match &self.result {
                    Ok(symbols) => Ok(symbols
                        .iter()
                        .map(|raw| Ticker::parse(raw).expect("test symbols are valid"))
                        .collect()),
                    Err(message) => Err(SourceError::unavailable(*message)),
                }
            })
        }
    }

    #[tokio::test]
    async fn unions_and_deduplicates_contributions() {
        let aggregator = UniverseAggregator::new(vec![
            Box::new(StaticSource {
                label: "a",
                result: Ok(vec!["AAPL", "BRK-B"]),
            }),
            Box::new(StaticSource {
                label: "b",
                result: Ok(vec!["BRK-B", "KO"]),
            }),
        ]);

        let universe = aggregator.aggregate().await;
        let symbols: Vec<&str> = universe.iter().map(Ticker::as_str).collect();
        assert_eq!(symbols, vec!["AAPL", "BRK-B", "KO"]);
    }

    #[tokio::test]
    async fn failing_sources_degrade_to_empty_contributions() {
        let aggregator = UniverseAggregator::new(vec![
            Box::new(StaticSource {
                label: "down",
                result: Err("503 from upstream"),
            }),
            Box::new(StaticSource {
                label: "up",
                result: Ok(vec!["SAP.DE"]),
            }),
        ]);

        let universe = aggregator.aggregate().await;
        assert_eq!(universe.len(), 1);
    }

    #[tokio::test]
    async fn all_sources_failing_yields_empty_universe() {
        let aggregator = UniverseAggregator::new(vec![Box::new(StaticSource {
            label: "down",
            result: Err("timeout"),
        })]);

        assert!(aggregator.aggregate().await.is_empty());
    }

    #[test]
    fn builtin_manual_list_is_fully_parseable() {
        let source = ManualListSource::builtin();
        assert_eq!(source.tickers.len(), MANUAL_LARGE_CAPS.len());
    }
}
