use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::{Map, Number, Value};

use crate::circuit_breaker::CircuitBreaker;
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::metric_source::{
    line_items, FiscalPeriod, MetricSource, SourceError, StatementSet, SummaryRecord,
};
use crate::Ticker;

const REFERER: &str = "https://finance.yahoo.com/";
const SUMMARY_MODULES: &str = "summaryProfile,price,summaryDetail,financialData,defaultKeyStatistics";
const STATEMENT_MODULES: &str = "incomeStatementHistory,balanceSheetHistory";

// ============================================================================
// Yahoo Auth Manager - cookie/crumb session bootstrap
// ============================================================================

/// Manages Yahoo Finance cookie/crumb authentication.
///
/// The unofficial API requires a session cookie from fc.yahoo.com (held by
/// the transport's cookie jar) and a crumb token appended to every query.
#[derive(Debug)]
pub struct YahooAuthManager {
    crumb: std::sync::Mutex<Option<String>>,
    last_refresh: std::sync::Mutex<Option<Instant>>,
    refreshing: AtomicBool,
    auth_ttl_secs: u64,
}

impl Default for YahooAuthManager {
    fn default() -> Self {
        Self {
            crumb: std::sync::Mutex::new(None),
            last_refresh: std::sync::Mutex::new(None),
            refreshing: AtomicBool::new(false),
            auth_ttl_secs: 3600,
        }
    }
}

impl YahooAuthManager {
    fn is_crumb_valid(&self) -> bool {
        if self.crumb.lock().unwrap().is_none() {
            return false;
        }

        self.last_refresh
            .lock()
            .unwrap()
            .map(|last| last.elapsed().as_secs() < self.auth_ttl_secs)
            .unwrap_or(false)
    }

    /// Get the current crumb, refreshing the session if needed.
    pub async fn get_crumb(&self, http_client: &Arc<dyn HttpClient>) -> Result<String, SourceError> {
        if let Ok(crumb) = std::env::var("YAHOO_CRUMB") {
            if !crumb.is_empty() {
                return Ok(crumb);
            }
        }

        if self.is_crumb_valid() {
            if let Some(crumb) = self.crumb.lock().unwrap().clone() {
                return Ok(crumb);
            }
        }

        self.refresh(http_client).await?;

        self.crumb
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SourceError::unavailable("failed to obtain yahoo crumb"))
    }

    /// Invalidate cached auth; the next call bootstraps a fresh session.
    pub fn invalidate(&self) {
        *self.crumb.lock().unwrap() = None;
        *self.last_refresh.lock().unwrap() = None;
    }

    async fn refresh(&self, http_client: &Arc<dyn HttpClient>) -> Result<(), SourceError> {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            // Another task is already refreshing; give it a moment.
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            if self.is_crumb_valid() {
                return Ok(());
            }
        }

        let result = self.do_refresh(http_client).await;
        self.refreshing.store(false, Ordering::SeqCst);
        result
    }

    async fn do_refresh(&self, http_client: &Arc<dyn HttpClient>) -> Result<(), SourceError> {
        // Step 1: visit fc.yahoo.com so the session cookie lands in the jar.
        let cookie_request = HttpRequest::get("https://fc.yahoo.com")
            .with_header("referer", REFERER)
            .with_timeout_ms(10_000);

        let _ = http_client.execute(cookie_request).await.map_err(|e| {
            SourceError::unavailable(format!("failed to fetch yahoo cookie: {}", e.message()))
        })?;

        // Step 2: fetch the crumb token.
        let crumb_endpoints = [
            "https://query1.finance.yahoo.com/v1/test/getcrumb",
            "https://query2.finance.yahoo.com/v1/test/getcrumb",
        ];

        for endpoint in &crumb_endpoints {
            let crumb_request = HttpRequest::get(*endpoint)
                .with_header("referer", REFERER)
                .with_timeout_ms(10_000);

            match http_client.execute(crumb_request).await {
                Ok(response) if response.is_success() && !response.body.is_empty() => {
                    let body = response.body.trim();

                    if body.contains("<html") || body.contains("<!DOCTYPE") {
                        continue;
                    }
                    if body.to_lowercase().contains("too many requests") {
                        return Err(SourceError::rate_limited(
                            "yahoo rate limited while fetching crumb",
                        ));
                    }
                    if !body.is_empty() && body.len() < 100 && !body.contains(' ') {
                        *self.crumb.lock().unwrap() = Some(body.to_string());
                        *self.last_refresh.lock().unwrap() = Some(Instant::now());
                        return Ok(());
                    }
                }
                _ => continue,
            }
        }

        Err(SourceError::unavailable(
            "failed to fetch yahoo crumb from all endpoints",
        ))
    }
}

// ============================================================================
// Yahoo Metric Source
// ============================================================================

/// Yahoo-backed metric provider supporting both real API calls and a
/// deterministic seeded mock mode for offline runs and tests.
#[derive(Clone)]
pub struct YahooMetricSource {
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    auth_manager: Arc<YahooAuthManager>,
    use_real_api: bool,
}

impl Default for YahooMetricSource {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            auth_manager: Arc::new(YahooAuthManager::default()),
            use_real_api: false,
        }
    }
}

impl YahooMetricSource {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            use_real_api,
            ..Self::default()
        }
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    fn is_real_client(&self) -> bool {
        self.use_real_api
    }

    /// Execute an authenticated GET with crumb, retrying once with a fresh
    /// session after a 401/429.
    async fn fetch_with_auth(&self, base_endpoint: &str) -> Result<String, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable(
                "yahoo circuit breaker is open; skipping upstream call",
            ));
        }

        let mut refreshed = false;
        loop {
            let crumb = self.auth_manager.get_crumb(&self.http_client).await?;
            let separator = if base_endpoint.contains('?') { '&' } else { '?' };
            let endpoint = format!(
                "{base_endpoint}{separator}crumb={}",
                urlencoding::encode(&crumb)
            );

            let request = HttpRequest::get(endpoint)
                .with_header("referer", REFERER)
                .with_timeout_ms(10_000);

            let response = self.http_client.execute(request).await.map_err(|e| {
                self.circuit_breaker.record_failure();
                SourceError::unavailable(format!("yahoo transport error: {}", e.message()))
            })?;

            if (response.status == 401 || response.status == 429) && !refreshed {
                self.auth_manager.invalidate();
                refreshed = true;
                continue;
            }

            if response.status == 429 {
                self.circuit_breaker.record_failure();
                return Err(SourceError::rate_limited(
                    "yahoo returned status 429 after auth refresh",
                ));
            }

            if !response.is_success() {
                self.circuit_breaker.record_failure();
                return Err(SourceError::unavailable(format!(
                    "yahoo returned status {}",
                    response.status
                )));
            }

            self.circuit_breaker.record_success();
            return Ok(response.body);
        }
    }

    /// Mock-mode upstream probe: keeps the breaker wiring exercised without
    /// depending on response content.
    async fn probe_upstream(&self, endpoint: &str) -> Result<(), SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable(
                "yahoo circuit breaker is open; skipping upstream call",
            ));
        }

        let request = HttpRequest::get(endpoint).with_header("referer", REFERER);
        let response = self.http_client.execute(request).await.map_err(|e| {
            self.circuit_breaker.record_failure();
            SourceError::unavailable(format!("yahoo transport error: {}", e.message()))
        })?;

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(SourceError::unavailable(format!(
                "yahoo upstream returned status {}",
                response.status
            )));
        }

        self.circuit_breaker.record_success();
        Ok(())
    }
}

impl MetricSource for YahooMetricSource {
    fn summary<'a>(
        &'a self,
        ticker: &'a Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<SummaryRecord, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.is_real_client() {
                let endpoint = format!(
                    "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{}?modules={}",
                    urlencoding::encode(ticker.as_str()),
                    SUMMARY_MODULES,
                );
                let body = self.fetch_with_auth(&endpoint).await?;
                parse_summary(&body, ticker)
            } else {
                self.probe_upstream("https://query1.finance.yahoo.com/v10/finance/quoteSummary")
                    .await?;
                Ok(fake_summary(ticker))
            }
        })
    }

    fn statements<'a>(
        &'a self,
        ticker: &'a Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<StatementSet, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.is_real_client() {
                let endpoint = format!(
                    "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{}?modules={}",
                    urlencoding::encode(ticker.as_str()),
                    STATEMENT_MODULES,
                );
                let body = self.fetch_with_auth(&endpoint).await?;
                parse_statements(&body, ticker)
            } else {
                self.probe_upstream("https://query1.finance.yahoo.com/v10/finance/quoteSummary")
                    .await?;
                Ok(fake_statements(ticker))
            }
        })
    }

    fn fast_price<'a>(
        &'a self,
        ticker: &'a Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<f64, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.is_real_client() {
                let endpoint = format!(
                    "https://query1.finance.yahoo.com/v8/finance/chart/{}?range=1d&interval=1d",
                    urlencoding::encode(ticker.as_str()),
                );
                let body = self.fetch_with_auth(&endpoint).await?;
                parse_fast_price(&body, ticker)
            } else {
                self.probe_upstream("https://query1.finance.yahoo.com/v8/finance/chart")
                    .await?;
                Ok(fake_price(ticker))
            }
        })
    }
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryData,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryData {
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<Value>,
}

fn quote_summary_result(body: &str, ticker: &Ticker) -> Result<Value, SourceError> {
    let response: QuoteSummaryResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse quoteSummary: {e}")))?;

    if let Some(error) = &response.quote_summary.error {
        if !error.is_null() {
            let description = error
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unspecified provider error");
            return Err(SourceError::missing_data(format!(
                "yahoo quoteSummary error for {ticker}: {description}"
            )));
        }
    }

    response
        .quote_summary
        .result
        .and_then(|mut results| {
            if results.is_empty() {
                None
            } else {
                Some(results.swap_remove(0))
            }
        })
        .ok_or_else(|| {
            SourceError::missing_data(format!("no quoteSummary result for {ticker}"))
        })
}

/// Flatten quoteSummary modules into one loosely-typed record.
///
/// Yahoo wraps most numbers in `{raw, fmt}` objects; the raw value is kept
/// and the formatting metadata dropped. First write wins on key collisions
/// across modules, matching the provider's own client behavior.
fn parse_summary(body: &str, ticker: &Ticker) -> Result<SummaryRecord, SourceError> {
    let result = quote_summary_result(body, ticker)?;

    let Value::Object(modules) = result else {
        return Err(SourceError::malformed(format!(
            "quoteSummary result for {ticker} is not an object"
        )));
    };

    let mut fields = Map::new();
    for (_, module) in modules {
        let Value::Object(entries) = module else {
            continue;
        };
        for (key, value) in entries {
            if let Some(flattened) = flatten_value(value) {
                fields.entry(key).or_insert(flattened);
            }
        }
    }

    Ok(SummaryRecord::new(fields))
}

fn flatten_value(value: Value) -> Option<Value> {
    match value {
        Value::Object(map) => match map.get("raw") {
            Some(Value::Number(number)) => Some(Value::Number(number.clone())),
            _ => None,
        },
        Value::Array(_) => None,
        other @ (Value::String(_) | Value::Number(_) | Value::Bool(_)) => Some(other),
        Value::Null => None,
    }
}

fn parse_statements(body: &str, ticker: &Ticker) -> Result<StatementSet, SourceError> {
    let result = quote_summary_result(body, ticker)?;

    let income = statement_entries(
        &result,
        &["incomeStatementHistory", "incomeStatementHistory"],
        &[
            line_items::NET_INCOME,
            line_items::GROSS_PROFIT,
            line_items::TOTAL_REVENUE,
        ],
    );
    let mut balance = statement_entries(
        &result,
        &["balanceSheetHistory", "balanceSheetStatements"],
        &[line_items::TOTAL_EQUITY],
    );

    // Yahoo reports debt split by maturity; the screener's total is the sum
    // of whichever components the balance sheet carries.
    if let Some(entries) = nested_array(&result, &["balanceSheetHistory", "balanceSheetStatements"])
    {
        for (period, entry) in balance.iter_mut().zip(entries) {
            let short = raw_item(entry, "shortLongTermDebt");
            let long = raw_item(entry, "longTermDebt");
            if short.is_some() || long.is_some() {
                period.items.insert(
                    line_items::TOTAL_DEBT.to_owned(),
                    short.unwrap_or(0.0) + long.unwrap_or(0.0),
                );
            }
        }
    }

    let statements = StatementSet { income, balance };
    if statements.is_empty() {
        return Err(SourceError::missing_data(format!(
            "no statement history for {ticker}"
        )));
    }

    Ok(statements)
}

fn nested_array<'a>(result: &'a Value, path: &[&str]) -> Option<&'a Vec<Value>> {
    let mut current = result;
    for key in path {
        current = current.get(key)?;
    }
    current.as_array()
}

fn statement_entries(result: &Value, path: &[&str], keys: &[&str]) -> Vec<FiscalPeriod> {
    let Some(entries) = nested_array(result, path) else {
        return Vec::new();
    };

    entries
        .iter()
        .map(|entry| {
            let mut period = FiscalPeriod {
                end_date: entry
                    .get("endDate")
                    .and_then(|d| d.get("fmt"))
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                ..FiscalPeriod::default()
            };
            for key in keys {
                if let Some(value) = raw_item(entry, key) {
                    period.items.insert((*key).to_owned(), value);
                }
            }
            period
        })
        .collect()
}

fn raw_item(entry: &Value, key: &str) -> Option<f64> {
    match entry.get(key)? {
        Value::Number(number) => number.as_f64(),
        Value::Object(map) => map.get("raw").and_then(Value::as_f64),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<f64>,
}

fn parse_fast_price(body: &str, ticker: &Ticker) -> Result<f64, SourceError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse chart response: {e}")))?;

    if let Some(error) = &response.chart.error {
        if !error.is_null() {
            return Err(SourceError::missing_data(format!(
                "yahoo chart error for {ticker}"
            )));
        }
    }

    response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.meta.regular_market_price)
        .filter(|price| price.is_finite() && *price > 0.0)
        .ok_or_else(|| SourceError::missing_data(format!("no market price for {ticker}")))
}

// ============================================================================
// Deterministic fake data (mock mode)
// ============================================================================

const FAKE_SECTORS: &[&str] = &[
    "Consumer Defensive",
    "Financial Services",
    "Technology",
    "Utilities",
    "Healthcare",
    "Consumer Cyclical",
    "Industrials",
    "Communication Services",
];

fn ticker_seed(ticker: &Ticker) -> u64 {
    ticker.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(byte as u64)
    })
}

fn number(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn fake_summary(ticker: &Ticker) -> SummaryRecord {
    let seed = ticker_seed(ticker);
    let mut fields = Map::new();

    fields.insert(
        "sector".to_owned(),
        Value::String(FAKE_SECTORS[(seed % FAKE_SECTORS.len() as u64) as usize].to_owned()),
    );
    fields.insert(
        "longName".to_owned(),
        Value::String(format!("{} Holdings", ticker.as_str())),
    );
    fields.insert("currency".to_owned(), Value::String("USD".to_owned()));
    fields.insert(
        "trailingPE".to_owned(),
        number(6.0 + (seed % 240) as f64 / 10.0),
    );
    fields.insert(
        "returnOnEquity".to_owned(),
        number(0.05 + (seed % 30) as f64 / 100.0),
    );
    fields.insert(
        "grossMargins".to_owned(),
        number(0.10 + (seed % 60) as f64 / 100.0),
    );
    fields.insert(
        "totalDebt".to_owned(),
        number(40_000_000.0 + (seed % 900) as f64 * 1_000_000.0),
    );
    fields.insert(
        "totalStockholderEquity".to_owned(),
        number(500_000_000.0 + (seed % 400) as f64 * 1_000_000.0),
    );
    fields.insert("currentPrice".to_owned(), number(fake_price(ticker)));

    SummaryRecord::new(fields)
}

fn fake_statements(ticker: &Ticker) -> StatementSet {
    let seed = ticker_seed(ticker);
    let revenue = 1_000_000_000.0 + (seed % 800) as f64 * 10_000_000.0;
    let margin = 0.15 + (seed % 55) as f64 / 100.0;
    let equity = 600_000_000.0 + (seed % 500) as f64 * 2_000_000.0;
    let debt = equity * (0.2 + (seed % 14) as f64 / 10.0);

    let periods = (0..4).map(|age| {
        // Older periods shrink so the latest entry is always first and largest.
        let scale = 1.0 - age as f64 * 0.06;
        let mut income = FiscalPeriod {
            end_date: Some(format!("{}-12-31", 2024 - age)),
            ..FiscalPeriod::default()
        };
        income
            .items
            .insert(line_items::TOTAL_REVENUE.to_owned(), revenue * scale);
        income
            .items
            .insert(line_items::GROSS_PROFIT.to_owned(), revenue * scale * margin);
        income.items.insert(
            line_items::NET_INCOME.to_owned(),
            revenue * scale * margin * 0.45,
        );

        let mut balance = FiscalPeriod {
            end_date: income.end_date.clone(),
            ..FiscalPeriod::default()
        };
        balance
            .items
            .insert(line_items::TOTAL_EQUITY.to_owned(), equity * scale);
        balance
            .items
            .insert(line_items::TOTAL_DEBT.to_owned(), debt * scale);

        (income, balance)
    });

    let (income, balance): (Vec<FiscalPeriod>, Vec<FiscalPeriod>) = periods.unzip();
    StatementSet { income, balance }
}

fn fake_price(ticker: &Ticker) -> f64 {
    let seed = ticker_seed(ticker);
    20.0 + (seed % 5000) as f64 / 10.0
}
