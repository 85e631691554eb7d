//! # Goldscreen Core
//!
//! Core screening pipeline for goldscreen, a batch value-investing screener.
//!
//! ## Overview
//!
//! One unattended run flows through four stages:
//!
//! - **Universe aggregation** — deduplicated candidate tickers from scraped
//!   index-membership pages plus a static manual list
//! - **Per-security evaluation** — fetch fundamentals and price, apply the
//!   qualitative sector filters and quantitative ratio filters
//! - **Scan orchestration** — bounded-concurrency fan-out, ranking by
//!   valuation, report assembly
//! - **Report** — write-once snapshot consumed by the CLI writer
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Yahoo metric provider, Wikipedia index scrapers |
//! | [`circuit_breaker`] | Circuit breaker for the metric provider |
//! | [`domain`] | Domain models (Ticker, MatchRecord, ScanReport) |
//! | [`error`] | Core error types |
//! | [`extract`] | Safe numeric extraction with rejection sentinels |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`metric_source`] | Remote metric provider contract |
//! | [`pacing`] | Request pacing for the scan fan-out |
//! | [`ratios`] | Financial ratio calculator |
//! | [`scan`] | Scan orchestrator |
//! | [`screener`] | Filter configuration and security evaluator |
//! | [`universe`] | Universe aggregation |
//!
//! ## Error Handling
//!
//! Everything below the orchestrator is fail-soft: collaborator calls return
//! a structured [`SourceError`], and the evaluator collapses any failure to
//! an absent result so one bad security never aborts a scan. Ratio
//! computations degrade to rejection sentinels instead of erroring. Only the
//! inability to persist the final report is fail-loud, and that path lives
//! in the CLI crate.
//!
//! ## Determinism
//!
//! Given identical collaborator responses, repeated runs produce identical
//! match records; only the generation timestamp differs. Fixture sources in
//! the test suite rely on this.

pub mod adapters;
pub mod circuit_breaker;
pub mod domain;
pub mod error;
pub mod extract;
pub mod http_client;
pub mod metric_source;
pub mod pacing;
pub mod ratios;
pub mod scan;
pub mod screener;
pub mod universe;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{IndexSpec, WikiIndexSource, YahooMetricSource};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Domain models
pub use domain::{
    validate_currency_code, MatchRecord, PassTag, ScanReport, SecuritySnapshot, Ticker,
    UtcDateTime,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

// Metric provider contract
pub use metric_source::{
    FiscalPeriod, MetricSource, SourceError, SourceErrorKind, StatementSet, SummaryRecord,
};

// Pacing
pub use pacing::ScanPacer;

// Scan orchestration
pub use scan::ScanOrchestrator;

// Screener
pub use screener::{ScreenerConfig, SecurityEvaluator};

// Universe aggregation
pub use universe::{ConstituentSource, ManualListSource, UniverseAggregator};
