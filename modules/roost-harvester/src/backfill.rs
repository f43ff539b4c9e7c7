// Backfill: walk an account's visible history from its newest post back to
// the beginning of the timeline.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use roost_common::HarvestError;
use timeline_client::TimelinePost;

use crate::fetcher::{Boundary, Timeline, PAGE_SIZE};
use crate::store::{InsertOutcome, NewPost, PostStore};

/// Per-account tallies, folded into the run totals by the driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountStats {
    pub pages: u32,
    pub inserted: u32,
    pub duplicates: u32,
}

/// Insert every post of one fetched page, tallying outcomes. An empty page
/// leaves the tallies untouched, so `pages` counts pages that held posts.
pub(crate) async fn insert_page(
    store: &dyn PostStore,
    handle: &str,
    page: &[TimelinePost],
    now: DateTime<Utc>,
    stats: &mut AccountStats,
) -> Result<(), HarvestError> {
    if page.is_empty() {
        return Ok(());
    }
    stats.pages += 1;
    for post in page {
        let new_post = NewPost::from_timeline(handle, post, now)?;
        match store.insert(&new_post).await? {
            InsertOutcome::Inserted => stats.inserted += 1,
            InsertOutcome::Duplicate => {
                debug!(post_id = post.id, "Already stored, skipping");
                stats.duplicates += 1;
            }
        }
    }
    Ok(())
}

/// Fetch an account's full visible history.
///
/// The first call takes the newest posts; every following page continues
/// strictly below the oldest id the store holds, so an interrupted backfill
/// resumes where its data ends rather than where its loop died. An empty
/// page ends the walk.
pub async fn run(
    fetcher: &dyn Timeline,
    store: &dyn PostStore,
    handle: &str,
    now: DateTime<Utc>,
) -> Result<AccountStats, HarvestError> {
    let mut stats = AccountStats::default();

    info!(handle, "Backfill: fetching newest posts");
    let page = fetcher.fetch_page(handle, PAGE_SIZE, Boundary::Latest).await?;
    insert_page(store, handle, &page, now, &mut stats).await?;

    loop {
        let Some(oldest) = store.oldest_id(handle).await? else {
            // Nothing stored even after the initial fetch: the account has
            // no visible posts.
            info!(handle, "Backfill: timeline is empty");
            return Ok(stats);
        };

        let page = fetcher
            .fetch_page(handle, PAGE_SIZE, Boundary::OlderThan(oldest))
            .await?;
        if page.is_empty() {
            break;
        }
        insert_page(store, handle, &page, now, &mut stats).await?;
    }

    info!(
        handle,
        pages = stats.pages,
        inserted = stats.inserted,
        duplicates = stats.duplicates,
        "Backfill complete"
    );
    Ok(stats)
}
