// One harvest run: pick due accounts, dispatch each to backfill or
// incremental on checkpoint presence, record completions in the ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use roost_common::HarvestError;

use crate::backfill::{self, AccountStats};
use crate::fetcher::Timeline;
use crate::incremental;
use crate::queue::{is_due, Account, WorkQueue};
use crate::store::PostStore;

/// How many due accounts one run processes, in sheet order.
pub const BATCH_SIZE: usize = 10;

/// One account that failed this run.
#[derive(Debug)]
pub struct AccountFailure {
    pub handle: String,
    /// Stable reason code from [`HarvestError::reason`].
    pub reason: &'static str,
    pub detail: String,
}

/// Stats from a harvest run.
#[derive(Debug, Default)]
pub struct RunStats {
    /// Accounts that passed the due test, including any beyond the batch cap.
    pub due: usize,
    pub backfilled: u32,
    pub updated: u32,
    pub pages: u32,
    pub inserted: u32,
    pub duplicates: u32,
    pub failures: Vec<AccountFailure>,
}

impl RunStats {
    fn absorb(&mut self, account: AccountStats) {
        self.pages += account.pages;
        self.inserted += account.inserted;
        self.duplicates += account.duplicates;
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Harvest Run Complete ===")?;
        writeln!(f, "Accounts due:       {}", self.due)?;
        writeln!(f, "Backfilled:         {}", self.backfilled)?;
        writeln!(f, "Updated:            {}", self.updated)?;
        writeln!(f, "Pages fetched:      {}", self.pages)?;
        writeln!(f, "Posts inserted:     {}", self.inserted)?;
        writeln!(f, "Duplicates skipped: {}", self.duplicates)?;
        writeln!(f, "Failures:           {}", self.failures.len())?;
        for failure in &self.failures {
            writeln!(f, "  {} [{}] {}", failure.handle, failure.reason, failure.detail)?;
        }
        Ok(())
    }
}

pub struct Driver {
    fetcher: Arc<dyn Timeline>,
    store: Arc<dyn PostStore>,
    queue: Arc<dyn WorkQueue>,
}

impl Driver {
    pub fn new(
        fetcher: Arc<dyn Timeline>,
        store: Arc<dyn PostStore>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self {
            fetcher,
            store,
            queue,
        }
    }

    /// Run one harvest batch at the given instant.
    ///
    /// An account failure is recorded in the stats and the batch moves on;
    /// only a queue read failure aborts the whole run.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunStats, HarvestError> {
        let accounts = self.queue.accounts().await?;
        let today = now.date_naive();

        let due: Vec<&Account> = accounts
            .iter()
            .filter(|a| is_due(a.last_checked.as_deref(), today))
            .collect();
        let batch = &due[..due.len().min(BATCH_SIZE)];

        let mut stats = RunStats {
            due: due.len(),
            ..RunStats::default()
        };
        info!(
            total = accounts.len(),
            due = due.len(),
            batch = batch.len(),
            "Work queue loaded"
        );

        for &account in batch {
            if let Err(e) = self.harvest_account(account, now, &mut stats).await {
                error!(
                    handle = account.handle.as_str(),
                    reason = e.reason(),
                    error = %e,
                    "Account harvest failed, continuing with next"
                );
                stats.failures.push(AccountFailure {
                    handle: account.handle.clone(),
                    reason: e.reason(),
                    detail: e.to_string(),
                });
            }
        }

        Ok(stats)
    }

    async fn harvest_account(
        &self,
        account: &Account,
        now: DateTime<Utc>,
        stats: &mut RunStats,
    ) -> Result<(), HarvestError> {
        let handle = account.handle.as_str();

        let backfilled = match self.store.newest_id(handle).await? {
            Some(newest) => {
                info!(handle, newest, "Checkpoint found, pulling newer posts");
                let s = incremental::run(
                    self.fetcher.as_ref(),
                    self.store.as_ref(),
                    handle,
                    newest,
                    now,
                )
                .await?;
                stats.absorb(s);
                false
            }
            None => {
                info!(handle, "No checkpoint, backfilling the full timeline");
                let s =
                    backfill::run(self.fetcher.as_ref(), self.store.as_ref(), handle, now).await?;
                stats.absorb(s);
                true
            }
        };

        // Page tallies stand either way (the posts are committed), but the
        // completion counters only move once the ledger row is stamped.
        self.queue.mark_checked(account, now).await?;
        if backfilled {
            stats.backfilled += 1;
        } else {
            stats.updated += 1;
        }
        Ok(())
    }
}
