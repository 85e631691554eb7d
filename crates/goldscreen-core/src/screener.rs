//! Per-security filter evaluation.
//!
//! One evaluator instance is shared by the whole scan. Configuration is an
//! explicit immutable value injected at construction — thresholds, sector
//! sets, ratio strategy and concurrency are data, not ambient state — so the
//! evaluator is testable with fixture sources instead of live remote calls.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::metric_source::MetricSource;
use crate::ratios::{self, MARGIN_REJECT, PE_REJECT, ROE_REJECT};
use crate::{validate_currency_code, MatchRecord, PassTag, SecuritySnapshot, Ticker};

/// Full configuration surface of the screening pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenerConfig {
    /// Valuation ceiling: pass requires `0 < P/E < pe_threshold`.
    pub pe_threshold: f64,
    /// Quality floor: pass requires `ROE > roe_threshold`.
    pub roe_threshold: f64,
    /// Moat floor: pass requires `gross margin > margin_threshold`.
    pub margin_threshold: f64,
    /// Safety ceiling: pass requires `D/E < debt_threshold`, unless exempt.
    pub debt_threshold: f64,
    /// Qualitative blocklist of cyclical/complex/capital-intensive sectors.
    pub excluded_sectors: BTreeSet<String>,
    /// Sectors whose business model structurally relies on leverage; exempt
    /// from the debt ceiling entirely.
    pub exempted_debt_sectors: BTreeSet<String>,
    /// Recompute ROE and gross margin from statement line items (true) or
    /// read the provider's precomputed summary fields (false).
    pub statement_ratios: bool,
    /// Hard upper bound on securities evaluated in one run.
    pub scan_cap: usize,
    /// Bounded worker pool size for the scan fan-out.
    pub concurrency: usize,
}

pub const EXCLUDED_SECTORS: &[&str] = &[
    "Technology",
    "Biotechnology",
    "Basic Materials",
    "Energy",
    "Oil & Gas",
    "Mining",
    "Semiconductors",
    "Aerospace & Defense",
    "Capital Goods",
    "Industrials",
    "Real Estate",
    "Telecommunication Services",
];

pub const EXEMPTED_DEBT_SECTORS: &[&str] = &["Financial Services", "Utilities"];

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            pe_threshold: 15.0,
            roe_threshold: 0.15,
            margin_threshold: 0.20,
            debt_threshold: 1.0,
            excluded_sectors: sector_set(EXCLUDED_SECTORS),
            exempted_debt_sectors: sector_set(EXEMPTED_DEBT_SECTORS),
            statement_ratios: true,
            scan_cap: 2500,
            concurrency: 10,
        }
    }
}

pub fn sector_set(sectors: &[&str]) -> BTreeSet<String> {
    sectors.iter().map(|s| (*s).to_owned()).collect()
}

/// Evaluates one security against the configured filter set.
pub struct SecurityEvaluator {
    source: Arc<dyn MetricSource>,
    config: ScreenerConfig,
}

impl SecurityEvaluator {
    pub fn new(source: Arc<dyn MetricSource>, config: ScreenerConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Apply the full filter to one ticker.
    ///
    /// Every step is fault tolerant: a failed fetch, a missing field, or an
    /// undefined ratio resolves to `None` (or a sentinel that fails its
    /// filter) — no error crosses this boundary. Statement data is only
    /// fetched after the sector check passes.
    pub async fn evaluate(&self, ticker: &Ticker) -> Option<MatchRecord> {
        let summary = match self.source.summary(ticker).await {
            Ok(summary) => summary,
            Err(error) => {
                debug!(%ticker, %error, "summary fetch failed");
                return None;
            }
        };

        let sector = summary.sector().to_owned();
        if self.config.excluded_sectors.contains(&sector) {
            debug!(%ticker, %sector, "rejected by sector blocklist");
            return None;
        }

        let price = match self.source.fast_price(ticker).await {
            Ok(price) => price,
            Err(error) => {
                debug!(%ticker, %error, "price fetch failed");
                return None;
            }
        };

        // A missing statement set is not a rejection by itself: the ratio
        // calculator degrades to filter-failing sentinels or the summary
        // fallback, keeping one malformed filing from aborting anything.
        let statements = if self.config.statement_ratios {
            match self.source.statements(ticker).await {
                Ok(statements) => Some(statements),
                Err(error) => {
                    debug!(%ticker, %error, "statement fetch failed; using fallbacks");
                    None
                }
            }
        } else {
            None
        };

        // Sentinels per filter: P/E large (must be below ceiling), ROE and
        // margin below any passing floor.
        let pe = summary.metric("trailingPE", PE_REJECT);
        let (roe, gross_margin) = if self.config.statement_ratios {
            (
                ratios::return_on_equity(statements.as_ref()),
                ratios::gross_profit_margin(statements.as_ref()),
            )
        } else {
            (
                summary.metric("returnOnEquity", ROE_REJECT),
                summary.metric("grossMargins", MARGIN_REJECT),
            )
        };
        let debt_to_equity = ratios::debt_to_equity(statements.as_ref(), &summary);

        let snapshot = SecuritySnapshot {
            sector,
            pe,
            roe,
            gross_margin,
            debt_to_equity,
            price,
            name: summary
                .long_name()
                .unwrap_or(ticker.as_str())
                .to_owned(),
            currency: summary
                .currency()
                .and_then(|code| validate_currency_code(code).ok())
                .unwrap_or_else(|| String::from("USD")),
        };

        self.decide(ticker, &snapshot)
    }

    /// The four predicates, all strict inequalities on both relevant sides:
    /// a value sitting exactly on a threshold fails its filter.
    fn decide(&self, ticker: &Ticker, snapshot: &SecuritySnapshot) -> Option<MatchRecord> {
        let config = &self.config;

        let valuation_ok = snapshot.pe > 0.0 && snapshot.pe < config.pe_threshold;
        let quality_ok = snapshot.roe > config.roe_threshold;
        let moat_ok = snapshot.gross_margin > config.margin_threshold;

        let within_debt_ceiling = snapshot.debt_to_equity < config.debt_threshold;
        let debt_exempt = config.exempted_debt_sectors.contains(&snapshot.sector);
        let safety_ok = within_debt_ceiling || debt_exempt;

        if !(valuation_ok && quality_ok && moat_ok && safety_ok) {
            debug!(
                %ticker,
                valuation_ok,
                quality_ok,
                moat_ok,
                safety_ok,
                "rejected by quantitative filters"
            );
            return None;
        }

        let tag = if debt_exempt && !within_debt_ceiling {
            PassTag::DebtExempt {
                sector: snapshot.sector.clone(),
            }
        } else {
            PassTag::Standard
        };

        Some(MatchRecord::from_snapshot(ticker.clone(), snapshot, tag))
    }
}
