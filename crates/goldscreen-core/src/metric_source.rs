//! Remote metric provider contract and response types.
//!
//! This module defines the collaborator boundary for per-security data
//! (`MetricSource`) together with the narrow error taxonomy every fetch
//! resolves to. The evaluator collapses any failure here to an absent
//! result, but the distinction between "source unreachable", "missing
//! data" and "malformed response" is preserved for logging and tests.
//!
//! | Endpoint | Response | Description |
//! |----------|----------|-------------|
//! | [`summary`](MetricSource::summary) | [`SummaryRecord`] | Loosely-typed profile/ratio fields |
//! | [`statements`](MetricSource::statements) | [`StatementSet`] | Income statement + balance sheet history |
//! | [`fast_price`](MetricSource::fast_price) | `f64` | Last traded price |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

use crate::extract::safe_f64;
use crate::Ticker;

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// The upstream source could not be reached or answered with a
    /// transport/server failure.
    Unavailable,
    /// The upstream source throttled the request.
    RateLimited,
    /// The response arrived but the requested security/fields were absent.
    MissingData,
    /// The response arrived but could not be decoded.
    Malformed,
    InvalidRequest,
    Internal,
}

/// Structured error returned at every collaborator boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn missing_data(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MissingData,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Malformed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::MissingData => "source.missing_data",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Canonical statement line-item keys shared by all providers.
pub mod line_items {
    pub const NET_INCOME: &str = "netIncome";
    pub const GROSS_PROFIT: &str = "grossProfit";
    pub const TOTAL_REVENUE: &str = "totalRevenue";
    pub const TOTAL_DEBT: &str = "totalDebt";
    pub const TOTAL_EQUITY: &str = "totalStockholderEquity";
}

/// Loosely-typed profile and ratio fields for one security.
///
/// Fields mirror whatever the provider happened to return; any field may be
/// absent or carry an unexpected type. Numeric reads go through the safe
/// extractor with a caller-chosen rejection sentinel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryRecord {
    fields: Map<String, Value>,
}

impl SummaryRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Sector classification, `"Unknown"` when the provider omitted it.
    pub fn sector(&self) -> &str {
        self.text("sector").unwrap_or("Unknown")
    }

    pub fn long_name(&self) -> Option<&str> {
        self.text("longName")
    }

    pub fn currency(&self) -> Option<&str> {
        self.text("currency")
    }

    /// Numeric field read with a rejection sentinel on absence or junk.
    pub fn metric(&self, key: &str, reject: f64) -> f64 {
        safe_f64(&self.fields, key, reject)
    }
}

/// One reporting period's line items, keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiscalPeriod {
    pub end_date: Option<String>,
    pub items: std::collections::BTreeMap<String, f64>,
}

impl FiscalPeriod {
    pub fn item(&self, key: &str) -> Option<f64> {
        self.items.get(key).copied()
    }
}

/// Financial statement history for one security.
///
/// Periods are ordered most recent first, matching the provider's
/// descending reporting series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementSet {
    pub income: Vec<FiscalPeriod>,
    pub balance: Vec<FiscalPeriod>,
}

impl StatementSet {
    /// Latest-period income statement line item.
    pub fn latest_income(&self, key: &str) -> Option<f64> {
        self.income.first().and_then(|period| period.item(key))
    }

    /// Latest-period balance sheet line item.
    pub fn latest_balance(&self, key: &str) -> Option<f64> {
        self.balance.first().and_then(|period| period.item(key))
    }

    pub fn is_empty(&self) -> bool {
        self.income.is_empty() && self.balance.is_empty()
    }
}

/// Per-security metric provider contract.
///
/// Implementations must be `Send + Sync`; one instance is shared across the
/// whole scan fan-out. Every method may fail for any individual security
/// without affecting any other evaluation.
pub trait MetricSource: Send + Sync {
    /// Fetches the flattened summary/profile record.
    fn summary<'a>(
        &'a self,
        ticker: &'a Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<SummaryRecord, SourceError>> + Send + 'a>>;

    /// Fetches structured financial statement history.
    fn statements<'a>(
        &'a self,
        ticker: &'a Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<StatementSet, SourceError>> + Send + 'a>>;

    /// Fetches the fast-access last traded price.
    fn fast_price<'a>(
        &'a self,
        ticker: &'a Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<f64, SourceError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_record_defaults_sector_to_unknown() {
        let record = SummaryRecord::default();
        assert_eq!(record.sector(), "Unknown");
    }

    #[test]
    fn summary_record_reads_text_and_metrics() {
        let Value::Object(fields) = json!({
            "sector": "Utilities",
            "trailingPE": 11.5,
            "longName": "Grid Holdings"
        }) else {
            unreachable!("literal is an object");
        };
        let record = SummaryRecord::new(fields);

        assert_eq!(record.sector(), "Utilities");
        assert_eq!(record.long_name(), Some("Grid Holdings"));
        assert_eq!(record.metric("trailingPE", 9999.0), 11.5);
        assert_eq!(record.metric("grossMargins", -1.0), -1.0);
    }

    #[test]
    fn statement_set_reads_latest_period_first() {
        let mut latest = FiscalPeriod::default();
        latest
            .items
            .insert(line_items::NET_INCOME.to_owned(), 250.0);
        let mut older = FiscalPeriod::default();
        older.items.insert(line_items::NET_INCOME.to_owned(), 90.0);

        let statements = StatementSet {
            income: vec![latest, older],
            balance: Vec::new(),
        };

        assert_eq!(statements.latest_income(line_items::NET_INCOME), Some(250.0));
        assert_eq!(statements.latest_balance(line_items::TOTAL_DEBT), None);
    }

    #[test]
    fn source_error_exposes_kind_and_code() {
        let error = SourceError::missing_data("no quoteSummary result");
        assert_eq!(error.kind(), SourceErrorKind::MissingData);
        assert_eq!(error.code(), "source.missing_data");
        assert!(!error.retryable());
    }
}
