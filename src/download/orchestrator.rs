//! Top-level run: one producer per account feeding a shared download pool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::api::{Endpoints, Fetch};
use crate::download::gate::RateLimitGate;
use crate::download::state::{AccountReport, RunStats, StatsSnapshot};
use crate::download::walker::{PaginationWalker, WalkOptions};
use crate::download::worker::{DownloadWorkerPool, Downloader, PoolOptions};
use crate::error::{Error, Result, WalkError};
use crate::fs::{discover_accounts, ensure_dir};

/// Everything needed to run one crawl.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Accounts to crawl. Empty means every account found under the
    /// output root (update mode).
    pub accounts: Vec<String>,
    pub output_root: PathBuf,
    pub queue_capacity: usize,
    pub max_concurrent_walks: usize,
    pub cooldown: Duration,
    pub walk: WalkOptions,
    pub pool: PoolOptions,
}

/// Outcome of a whole run.
#[derive(Debug)]
pub struct RunReport {
    pub accounts: Vec<AccountReport>,
    pub stats: StatsSnapshot,
    pub rate_limit_events: u64,
    pub cancelled: bool,
}

impl RunReport {
    pub fn failed_accounts(&self) -> u64 {
        self.accounts.iter().filter(|a| a.failed()).count() as u64
    }

    /// Map the run to its overall result. Cancellation wins over account
    /// failures, which win over dropped items.
    pub fn into_result(self) -> Result<RunReport> {
        if self.cancelled {
            return Err(Error::Cancelled);
        }

        let failed = self.failed_accounts();
        if failed > 0 {
            return Err(Error::AccountsFailed { failed });
        }

        let missing = self.stats.total_missing();
        if missing > 0 {
            return Err(Error::CompletedWithDrops(missing));
        }

        Ok(self)
    }
}

/// Runs producers and the download pool to completion.
pub struct Orchestrator {
    fetcher: Arc<dyn Fetch>,
    endpoints: Arc<Endpoints>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(fetcher: Arc<dyn Fetch>, endpoints: Endpoints, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            endpoints: Arc::new(endpoints),
            cancel,
        }
    }

    /// Crawl every account in `plan` and wait until all items are written.
    ///
    /// Returns once every producer has finished and the queue has drained.
    /// Per-account failures are collected in the report, never propagated.
    pub async fn run(&self, plan: RunPlan) -> Result<RunReport> {
        ensure_dir(&plan.output_root)?;

        let accounts = if plan.accounts.is_empty() {
            let found = discover_accounts(&plan.output_root)?;
            tracing::info!(
                "Update mode: found {} account(s) in {}",
                found.len(),
                plan.output_root.display()
            );
            found
        } else {
            plan.accounts.clone()
        };

        let stats = Arc::new(RunStats::new());
        let gate = Arc::new(RateLimitGate::new(plan.cooldown, self.cancel.clone()));

        let (tx, rx) = mpsc::channel(plan.queue_capacity.max(1));
        let downloader = Arc::new(Downloader::new(
            self.fetcher.clone(),
            plan.output_root.clone(),
            plan.pool.clone(),
            self.cancel.clone(),
        ));
        let pool = DownloadWorkerPool::spawn(downloader, rx, stats.clone(), plan.pool.workers);

        let walker = Arc::new(PaginationWalker::new(
            self.fetcher.clone(),
            self.endpoints.clone(),
            gate.clone(),
            stats.clone(),
            plan.walk.clone(),
            self.cancel.clone(),
        ));
        let permits = Arc::new(Semaphore::new(plan.max_concurrent_walks.max(1)));
        let mut producers = JoinSet::new();

        for (index, account) in accounts.iter().enumerate() {
            let walker = walker.clone();
            let permits = permits.clone();
            let tx = tx.clone();
            let account = account.clone();

            producers.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => walker.walk(&account, &tx).await,
                    Err(_) => Err(WalkError::Cancelled),
                };
                (index, account, result)
            });
        }
        // Workers stop once every producer has dropped its sender.
        drop(tx);

        let mut reports: Vec<Option<AccountReport>> = accounts.iter().map(|_| None).collect();
        while let Some(joined) = producers.join_next().await {
            let (index, account, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    // The account is unknown here; its slot stays empty.
                    tracing::error!("Producer task failed: {}", e);
                    continue;
                }
            };

            let report = match result {
                Ok(summary) => AccountReport {
                    account,
                    summary: Some(summary),
                    error: None,
                },
                Err(WalkError::Cancelled) => AccountReport {
                    account,
                    summary: None,
                    error: None,
                },
                Err(e) => {
                    tracing::error!(account = %account, "Account walk failed: {}", e);
                    AccountReport {
                        account,
                        summary: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            reports[index] = Some(report);
        }

        pool.join().await;

        let reports = reports
            .into_iter()
            .zip(accounts)
            .map(|(report, account)| {
                report.unwrap_or_else(|| {
                    tracing::error!(account = %account, "Account walk did not finish");
                    AccountReport {
                        account,
                        summary: None,
                        error: Some("walk task aborted unexpectedly".to_string()),
                    }
                })
            })
            .collect();

        Ok(RunReport {
            accounts: reports,
            stats: stats.snapshot(),
            rate_limit_events: gate.events(),
            cancelled: self.cancel.is_cancelled(),
        })
    }
}
