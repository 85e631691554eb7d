use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::http_client::{HttpClient, HttpRequest};
use crate::metric_source::SourceError;
use crate::universe::ConstituentSource;
use crate::Ticker;

/// Location of one index-membership table on a reference page.
///
/// `table_index` counts every `<table>` element on the page, matching the
/// convention of generic read-all-tables extractors, so existing positions
/// can be carried over verbatim. A moved table or renamed column degrades to
/// an empty contribution; it never aborts the aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub label: &'static str,
    pub url: &'static str,
    pub table_index: usize,
    pub symbol_column: &'static str,
    pub exchange_suffix: Option<&'static str>,
}

impl IndexSpec {
    /// The built-in index set: US broad indices scrape without a suffix,
    /// European indices need their provider exchange suffix appended.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self {
                label: "S&P 500",
                url: "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies",
                table_index: 0,
                symbol_column: "Symbol",
                exchange_suffix: None,
            },
            Self {
                label: "Nasdaq-100",
                url: "https://en.wikipedia.org/wiki/Nasdaq-100",
                table_index: 4,
                symbol_column: "Symbol",
                exchange_suffix: None,
            },
            Self {
                label: "CAC 40",
                url: "https://en.wikipedia.org/wiki/CAC_40",
                table_index: 4,
                symbol_column: "Ticker",
                exchange_suffix: Some(".PA"),
            },
            Self {
                label: "DAX",
                url: "https://en.wikipedia.org/wiki/DAX",
                table_index: 4,
                symbol_column: "Ticker",
                exchange_suffix: Some(".DE"),
            },
            Self {
                label: "FTSE 100",
                url: "https://en.wikipedia.org/wiki/FTSE_100_Index",
                table_index: 4,
                symbol_column: "Ticker",
                exchange_suffix: Some(".L"),
            },
        ]
    }
}

/// Index-membership source backed by one tabular reference page.
pub struct WikiIndexSource {
    spec: IndexSpec,
    http_client: Arc<dyn HttpClient>,
}

impl WikiIndexSource {
    pub fn new(spec: IndexSpec, http_client: Arc<dyn HttpClient>) -> Self {
        Self { spec, http_client }
    }
}

impl ConstituentSource for WikiIndexSource {
    fn label(&self) -> &str {
        self.spec.label
    }

    fn fetch<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticker>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.spec.url).with_timeout_ms(15_000);
            let response = self.http_client.execute(request).await.map_err(|e| {
                SourceError::unavailable(format!(
                    "failed to fetch {}: {}",
                    self.spec.label,
                    e.message()
                ))
            })?;

            if !response.is_success() {
                return Err(SourceError::unavailable(format!(
                    "{} page returned status {}",
                    self.spec.label, response.status
                )));
            }

            extract_column(&response.body, &self.spec)
        })
    }
}

/// Extract and normalize the configured symbol column from raw page HTML.
///
/// Parsing is synchronous and pure so table-shape changes can be tested
/// against inline fixtures without a transport.
pub fn extract_column(html: &str, spec: &IndexSpec) -> Result<Vec<Ticker>, SourceError> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table").expect("static selector is valid");
    let row_selector = Selector::parse("tr").expect("static selector is valid");
    let cell_selector = Selector::parse("th, td").expect("static selector is valid");

    let table = document
        .select(&table_selector)
        .nth(spec.table_index)
        .ok_or_else(|| {
            SourceError::malformed(format!(
                "{} page has no table at position {}",
                spec.label, spec.table_index
            ))
        })?;

    let mut rows = table.select(&row_selector);
    let header = rows.next().ok_or_else(|| {
        SourceError::malformed(format!("{} table has no header row", spec.label))
    })?;

    let column = header
        .select(&cell_selector)
        .position(|cell| cell_text(&cell) == spec.symbol_column)
        .ok_or_else(|| {
            SourceError::malformed(format!(
                "{} table has no '{}' column",
                spec.label, spec.symbol_column
            ))
        })?;

    let mut tickers = Vec::new();
    for row in rows {
        let Some(cell) = row.select(&cell_selector).nth(column) else {
            continue;
        };
        let raw = cell_text(&cell);
        match Ticker::from_raw_listing(&raw, spec.exchange_suffix) {
            Some(ticker) => tickers.push(ticker),
            None => {
                if !raw.is_empty() {
                    debug!(source = spec.label, symbol = %raw, "skipping unparseable listing");
                }
            }
        }
    }

    Ok(tickers)
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_owned()
}
