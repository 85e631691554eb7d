//! CLI argument definitions for goldscreen.
//!
//! There are no subcommands: a bare `goldscreen` invocation performs one
//! full scan-and-report cycle and exits. Flags only override the defaults
//! of the screening configuration.
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--output` | `data.json` | Report destination path |
//! | `--scan-cap` | `2500` | Max securities evaluated per run |
//! | `--concurrency` | `10` | Bounded worker pool size |
//! | `--requests-per-minute` | `600` | Provider request pacing |
//! | `--summary-ratios` | `false` | Use provider-precomputed ROE/margin |
//! | `--mock` | `false` | Deterministic offline data, no network |
//! | `--pretty` | `false` | Pretty-print the report JSON |
//!
//! # Examples
//!
//! ```bash
//! # One full scheduled scan
//! goldscreen
//!
//! # Faster smoke run against the lighter ratio strategy
//! goldscreen --scan-cap 50 --summary-ratios --pretty
//!
//! # Offline run with deterministic data
//! goldscreen --mock --output /tmp/data.json
//! ```

use std::path::PathBuf;

use clap::Parser;

use goldscreen_core::ScreenerConfig;

/// Goldscreen - batch value-investing screener.
///
/// Aggregates a global ticker universe, applies Buffett-style qualitative
/// and quantitative filters, and writes a ranked JSON snapshot report.
#[derive(Debug, Parser)]
#[command(
    name = "goldscreen",
    author,
    version,
    about = "Batch value screener producing a ranked JSON report"
)]
pub struct Cli {
    /// Report destination path.
    #[arg(long, default_value = "data.json")]
    pub output: PathBuf,

    /// Maximum number of securities evaluated in one run.
    ///
    /// Defensive bound against unbounded remote calls; the universe is
    /// truncated before dispatch.
    #[arg(long, default_value_t = 2500)]
    pub scan_cap: usize,

    /// Bounded worker pool size for the scan fan-out.
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// Provider request pacing across the whole scan.
    #[arg(long, default_value_t = 600)]
    pub requests_per_minute: u32,

    /// Read provider-precomputed ROE and gross margin instead of
    /// recomputing them from statement line items.
    #[arg(long, default_value_t = false)]
    pub summary_ratios: bool,

    /// Run against deterministic offline data instead of the network.
    #[arg(long, default_value_t = false)]
    pub mock: bool,

    /// Pretty-print the report JSON.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

impl Cli {
    pub fn screener_config(&self) -> ScreenerConfig {
        ScreenerConfig {
            statement_ratios: !self.summary_ratios,
            scan_cap: self.scan_cap,
            concurrency: self.concurrency,
            ..ScreenerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_parses_with_defaults() {
        let cli = Cli::parse_from(["goldscreen"]);
        assert_eq!(cli.scan_cap, 2500);
        assert_eq!(cli.concurrency, 10);
        assert!(!cli.mock);

        let config = cli.screener_config();
        assert!(config.statement_ratios);
        assert_eq!(config.pe_threshold, 15.0);
    }

    #[test]
    fn summary_ratios_flag_flips_the_strategy() {
        let cli = Cli::parse_from(["goldscreen", "--summary-ratios"]);
        assert!(!cli.screener_config().statement_ratios);
    }
}
