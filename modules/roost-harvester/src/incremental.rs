// Incremental pull: fetch only what appeared since the last harvested post.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use roost_common::HarvestError;

use crate::backfill::{insert_page, AccountStats};
use crate::fetcher::{Boundary, Timeline, PAGE_SIZE};
use crate::store::PostStore;

/// Fetch everything newer than the newest stored post.
///
/// The boundary starts at the stored newest id and advances to the maximum
/// id of each fetched page, so the loop moves forward even when a page comes
/// back partially deduplicated. An empty page ends the walk.
pub async fn run(
    fetcher: &dyn Timeline,
    store: &dyn PostStore,
    handle: &str,
    newest: i64,
    now: DateTime<Utc>,
) -> Result<AccountStats, HarvestError> {
    let mut stats = AccountStats::default();
    let mut boundary = newest;

    loop {
        let page = fetcher
            .fetch_page(handle, PAGE_SIZE, Boundary::NewerThan(boundary))
            .await?;
        let Some(page_max) = page.iter().map(|p| p.id).max() else {
            // Empty page: caught up.
            break;
        };

        insert_page(store, handle, &page, now, &mut stats).await?;
        debug!(handle, boundary, page_max, "Newer page stored");
        boundary = boundary.max(page_max);
    }

    info!(
        handle,
        newest_seen = boundary,
        pages = stats.pages,
        inserted = stats.inserted,
        duplicates = stats.duplicates,
        "Incremental pull complete"
    );
    Ok(stats)
}
