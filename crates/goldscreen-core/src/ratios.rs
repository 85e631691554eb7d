//! Financial ratio computation with sentinel-on-failure semantics.
//!
//! Statement lookups fail for structural reasons all the time (missing line
//! items, delisted securities, non-standard statement formats), so every
//! computation degrades to a deterministic sentinel that fails its filter
//! instead of propagating an error. One bad record must never abort a scan.

use crate::metric_source::{line_items, StatementSet, SummaryRecord};

/// Large sentinel for "must be below threshold" valuation reads.
pub const PE_REJECT: f64 = 9999.0;
/// Below-threshold sentinel for return-on-equity ("must be above" filter).
pub const ROE_REJECT: f64 = -1.0;
/// Below-threshold sentinel for gross margin ("must be above" filter).
pub const MARGIN_REJECT: f64 = -1.0;
/// Large sentinel for debt/equity ("must be below" filter).
pub const DEBT_REJECT: f64 = 9999.0;

/// Latest-period net income over latest-period total equity.
///
/// Requires positive equity; anything else resolves to [`ROE_REJECT`].
pub fn return_on_equity(statements: Option<&StatementSet>) -> f64 {
    let Some(statements) = statements else {
        return ROE_REJECT;
    };

    match (
        statements.latest_income(line_items::NET_INCOME),
        statements.latest_balance(line_items::TOTAL_EQUITY),
    ) {
        (Some(net_income), Some(total_equity)) if total_equity > 0.0 => net_income / total_equity,
        _ => ROE_REJECT,
    }
}

/// Latest-period gross profit over latest-period total revenue.
///
/// Requires positive revenue; anything else resolves to [`MARGIN_REJECT`].
pub fn gross_profit_margin(statements: Option<&StatementSet>) -> f64 {
    let Some(statements) = statements else {
        return MARGIN_REJECT;
    };

    match (
        statements.latest_income(line_items::GROSS_PROFIT),
        statements.latest_income(line_items::TOTAL_REVENUE),
    ) {
        (Some(gross_profit), Some(total_revenue)) if total_revenue > 0.0 => {
            gross_profit / total_revenue
        }
        _ => MARGIN_REJECT,
    }
}

/// Latest-period total debt over total equity, with a summary-record
/// fallback for securities whose balance sheet history is unavailable.
///
/// A balance sheet that is present but reports non-positive equity resolves
/// straight to [`DEBT_REJECT`] — negative equity is a disqualifier, not a
/// reason to consult the weaker source. The fallback reads the aggregate
/// `totalDebt` (reject 0.0: missing debt alone must not disqualify) and
/// `totalStockholderEquity` (reject -1.0: missing equity must) fields.
pub fn debt_to_equity(statements: Option<&StatementSet>, summary: &SummaryRecord) -> f64 {
    if let Some(statements) = statements {
        if let (Some(total_debt), Some(total_equity)) = (
            statements.latest_balance(line_items::TOTAL_DEBT),
            statements.latest_balance(line_items::TOTAL_EQUITY),
        ) {
            if total_equity > 0.0 {
                return total_debt / total_equity;
            }
            return DEBT_REJECT;
        }
    }

    let total_debt = summary.metric("totalDebt", 0.0);
    let total_equity = summary.metric("totalStockholderEquity", -1.0);
    if total_equity > 0.0 {
        return total_debt / total_equity;
    }

    DEBT_REJECT
}
