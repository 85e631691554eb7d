use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_TICKER_LEN: usize = 15;

/// Normalized ticker identifier in the data provider's convention.
///
/// Unlike plain US equity symbols, global listings may start with a digit
/// (`7203.T`, `0700.HK`) and carry exchange suffixes, so validation accepts
/// any alphanumeric plus `.` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Parse and normalize a ticker to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTicker);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_TICKER_LEN {
            return Err(ValidationError::TickerTooLong {
                len,
                max: MAX_TICKER_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || ch == '.' || ch == '-';
            if !valid {
                return Err(ValidationError::TickerInvalidChar { ch, index });
            }
        }

        if !normalized.chars().any(|ch| ch.is_ascii_alphanumeric()) {
            return Err(ValidationError::TickerNoAlphanumeric { value: normalized });
        }

        Ok(Self(normalized))
    }

    /// Normalize a raw symbol scraped from an index-membership page.
    ///
    /// Index pages use `.` as the share-class separator while the provider
    /// uses `-` (`BRK.B` -> `BRK-B`); exchange suffixes such as `.PA` are
    /// appended after that replacement. Empty or invalid tokens yield `None`.
    pub fn from_raw_listing(raw: &str, exchange_suffix: Option<&str>) -> Option<Self> {
        let token = raw.trim();
        if token.is_empty() {
            return None;
        }

        let mut symbol = token.replace('.', "-");
        if let Some(suffix) = exchange_suffix {
            symbol.push_str(suffix);
        }

        Self::parse(&symbol).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Ticker {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Ticker {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}
