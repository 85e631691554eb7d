use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Ticker, UtcDateTime, ValidationError};

/// Ephemeral per-evaluation view of one security's metrics.
///
/// Constructed fresh for every evaluation and discarded after the filter
/// decision. Numeric fields carry rejection sentinels (never errors) when the
/// provider data was missing or the computation was undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct SecuritySnapshot {
    pub sector: String,
    pub pe: f64,
    pub roe: f64,
    pub gross_margin: f64,
    pub debt_to_equity: f64,
    pub price: f64,
    pub name: String,
    pub currency: String,
}

/// Classification attached to a passing security.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassTag {
    /// All four filters passed on their own.
    Standard,
    /// The debt ceiling was waived because the sector structurally
    /// relies on leverage.
    DebtExempt { sector: String },
}

const STANDARD_TAG: &str = "golden value";

impl PassTag {
    pub fn render(&self) -> String {
        match self {
            Self::Standard => STANDARD_TAG.to_owned(),
            Self::DebtExempt { sector } => {
                format!("{STANDARD_TAG} (debt-exempt: {sector})")
            }
        }
    }
}

impl Serialize for PassTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.render())
    }
}

impl<'de> Deserialize<'de> for PassTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        if value == STANDARD_TAG {
            return Ok(Self::Standard);
        }

        let prefix = format!("{STANDARD_TAG} (debt-exempt: ");
        if let Some(rest) = value.strip_prefix(&prefix) {
            if let Some(sector) = rest.strip_suffix(')') {
                return Ok(Self::DebtExempt {
                    sector: sector.to_owned(),
                });
            }
        }

        Err(D::Error::custom(format!("unrecognized pass tag '{value}'")))
    }
}

/// One security that passed every active filter.
///
/// Immutable once created; field names match the persisted report schema.
/// Ratios are rounded to 2 decimals at construction, with return on equity
/// and gross margin expressed as percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub symbol: Ticker,
    pub name: String,
    pub sector: String,
    pub pe: f64,
    pub roe: f64,
    pub gpm: f64,
    pub de_ratio: f64,
    pub price: f64,
    pub currency: String,
    pub tag: PassTag,
}

impl MatchRecord {
    pub fn from_snapshot(symbol: Ticker, snapshot: &SecuritySnapshot, tag: PassTag) -> Self {
        Self {
            symbol,
            name: snapshot.name.clone(),
            sector: snapshot.sector.clone(),
            pe: round2(snapshot.pe),
            roe: round2(snapshot.roe * 100.0),
            gpm: round2(snapshot.gross_margin * 100.0),
            de_ratio: round2(snapshot.debt_to_equity),
            price: round2(snapshot.price),
            currency: snapshot.currency.clone(),
            tag,
        }
    }
}

/// Write-once result of a full scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub last_updated: String,
    pub count: usize,
    pub data: Vec<MatchRecord>,
}

impl ScanReport {
    pub fn new(generated_at: UtcDateTime, data: Vec<MatchRecord>) -> Self {
        Self {
            last_updated: generated_at.format_report(),
            count: data.len(),
            data,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Validate and normalize currency to an uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}
