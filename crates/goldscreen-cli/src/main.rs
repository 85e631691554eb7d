mod cli;
mod error;
mod report;

use std::collections::BTreeSet;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use goldscreen_core::universe::ConstituentSource;
use goldscreen_core::{
    HttpClient, IndexSpec, ManualListSource, NoopHttpClient, ReqwestHttpClient, ScanOrchestrator,
    ScanPacer, SecurityEvaluator, Ticker, UniverseAggregator, WikiIndexSource, YahooMetricSource,
};

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    let http_client: Arc<dyn HttpClient> = if cli.mock {
        Arc::new(NoopHttpClient)
    } else {
        Arc::new(ReqwestHttpClient::new())
    };

    let universe = aggregate_universe(Arc::clone(&http_client)).await;

    let metric_source = Arc::new(YahooMetricSource::with_http_client(http_client));
    let evaluator = SecurityEvaluator::new(metric_source, cli.screener_config());
    let pacer = ScanPacer::per_minute(cli.requests_per_minute);
    let orchestrator = ScanOrchestrator::new(evaluator, pacer)?;

    let scan_report = orchestrator.run(universe).await;
    report::write_report(&scan_report, &cli.output, cli.pretty)?;

    info!(
        matches = scan_report.count,
        output = %cli.output.display(),
        "report written"
    );
    println!(
        "{} matches written to {}",
        scan_report.count,
        cli.output.display()
    );

    Ok(ExitCode::SUCCESS)
}

async fn aggregate_universe(http_client: Arc<dyn HttpClient>) -> BTreeSet<Ticker> {
    let mut sources: Vec<Box<dyn ConstituentSource>> = IndexSpec::builtin()
        .into_iter()
        .map(|spec| {
            Box::new(WikiIndexSource::new(spec, Arc::clone(&http_client)))
                as Box<dyn ConstituentSource>
        })
        .collect();
    sources.push(Box::new(ManualListSource::builtin()));

    UniverseAggregator::new(sources).aggregate().await
}
