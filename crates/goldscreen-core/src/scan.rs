//! Scan orchestration: bounded fan-out over the candidate universe.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::pacing::ScanPacer;
use crate::screener::SecurityEvaluator;
use crate::{MatchRecord, ScanReport, Ticker, UtcDateTime, ValidationError};

/// Fans the evaluator out across the universe and assembles the report.
///
/// Evaluations are fully independent: no shared mutable state, no ordering
/// dependency, no per-ticker retry. A failed evaluation is a permanent
/// absence for the run. The only hard bound on total work is the scan cap
/// applied before dispatch.
pub struct ScanOrchestrator {
    evaluator: Arc<SecurityEvaluator>,
    pacer: ScanPacer,
}

impl ScanOrchestrator {
    pub fn new(evaluator: SecurityEvaluator, pacer: ScanPacer) -> Result<Self, ValidationError> {
        if evaluator.config().concurrency == 0 {
            return Err(ValidationError::ZeroConcurrency);
        }

        Ok(Self {
            evaluator: Arc::new(evaluator),
            pacer,
        })
    }

    /// Run one full scan over the aggregated universe.
    ///
    /// Always completes and always yields a report; an empty universe or a
    /// fully-failed scan produces a zero-match report rather than an error.
    pub async fn run(&self, universe: BTreeSet<Ticker>) -> ScanReport {
        let config = self.evaluator.config();
        let candidates: Vec<Ticker> = universe.into_iter().take(config.scan_cap).collect();

        info!(
            candidates = candidates.len(),
            concurrency = config.concurrency,
            "starting scan"
        );

        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        let mut tasks = JoinSet::new();

        for (index, ticker) in candidates.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let evaluator = Arc::clone(&self.evaluator);
            let pacer = self.pacer.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("scan semaphore is never closed");
                pacer.acquire().await;
                (index, evaluator.evaluate(&ticker).await)
            });
        }

        let mut indexed: Vec<(usize, MatchRecord)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Some(record))) => indexed.push((index, record)),
                Ok((_, None)) => {}
                Err(error) => warn!(%error, "evaluation task aborted"),
            }
        }

        // Completion order is arbitrary; restore dispatch order first so the
        // P/E sort below is stable with first-seen tie-breaking.
        indexed.sort_by_key(|(index, _)| *index);
        let mut matches: Vec<MatchRecord> = indexed.into_iter().map(|(_, record)| record).collect();
        matches.sort_by(|a, b| a.pe.partial_cmp(&b.pe).unwrap_or(Ordering::Equal));

        info!(matches = matches.len(), "scan complete");
        ScanReport::new(UtcDateTime::now(), matches)
    }
}
