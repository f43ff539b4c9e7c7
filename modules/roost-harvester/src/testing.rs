// Test mocks for the harvest pipeline.
//
// Three mocks matching the three trait boundaries:
// - ScriptedTimeline (Timeline) — HashMap-based (handle, boundary)→page
// - MemoryStore (PostStore) — stateful in-memory post table
// - MemoryQueue (WorkQueue) — fixed account rows, records mark_checked calls
//
// Plus a helper for constructing TimelinePost values.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use roost_common::HarvestError;
use timeline_client::{PostAuthor, TimelinePost};

use crate::fetcher::{Boundary, Timeline};
use crate::queue::{Account, WorkQueue, FIRST_DATA_ROW};
use crate::store::{InsertOutcome, NewPost, PostStore};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a timeline post with a valid timestamp and a body derived from
/// the id, authored by `handle`.
pub fn post(id: i64, handle: &str) -> TimelinePost {
    TimelinePost {
        id,
        created_at: Some("Wed Oct 10 20:19:24 +0000 2018".to_string()),
        full_text: Some(format!("post {id}")),
        text: None,
        user: Some(PostAuthor {
            screen_name: Some(handle.to_string()),
            name: None,
            rest: serde_json::Map::new(),
        }),
        rest: serde_json::Map::new(),
    }
}

// ---------------------------------------------------------------------------
// ScriptedTimeline
// ---------------------------------------------------------------------------

/// HashMap-based timeline. Returns `Err` for unregistered (handle, boundary)
/// pairs, so a test fails loudly when the code under test fetches a page the
/// scenario did not anticipate. Records every fetch it sees.
pub struct ScriptedTimeline {
    pages: HashMap<(String, Boundary), Vec<TimelinePost>>,
    pending_rate_limit: Mutex<Option<(String, Boundary)>>,
    calls: Mutex<Vec<(String, Boundary)>>,
}

impl ScriptedTimeline {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            pending_rate_limit: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register the page served for a (handle, boundary) fetch.
    pub fn on_fetch(mut self, handle: &str, boundary: Boundary, posts: Vec<TimelinePost>) -> Self {
        self.pages.insert((handle.to_string(), boundary), posts);
        self
    }

    /// Make the next matching fetch fail with the rate-limit signal, once.
    pub fn rate_limit_once(self, handle: &str, boundary: Boundary) -> Self {
        *self.pending_rate_limit.lock().unwrap() = Some((handle.to_string(), boundary));
        self
    }

    /// Every (handle, boundary) fetched, in call order.
    pub fn calls(&self) -> Vec<(String, Boundary)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Timeline for ScriptedTimeline {
    async fn fetch_page(
        &self,
        handle: &str,
        _count: u32,
        boundary: Boundary,
    ) -> Result<Vec<TimelinePost>, HarvestError> {
        let key = (handle.to_string(), boundary);
        self.calls.lock().unwrap().push(key.clone());

        {
            let mut pending = self.pending_rate_limit.lock().unwrap();
            if pending.as_ref() == Some(&key) {
                *pending = None;
                return Err(HarvestError::RateLimited(
                    "Rate limit exceeded".to_string(),
                ));
            }
        }

        self.pages.get(&key).cloned().ok_or_else(|| HarvestError::Api {
            status: 404,
            message: format!("ScriptedTimeline: no page registered for {handle} at {boundary:?}"),
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Stateful in-memory post table keyed by external id. Thread-safe via
/// interior Mutex. `insert` dedupes like the real table's primary key.
pub struct MemoryStore {
    posts: Mutex<HashMap<i64, NewPost>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-populate a stored post, as if an earlier run had harvested it.
    pub fn with_post(self, handle: &str, id: i64) -> Self {
        let stored = NewPost {
            post_id: id,
            author: handle.to_string(),
            content: None,
            created_at_raw: None,
            post_date: None,
            harvested_at: Utc::now(),
            payload: serde_json::json!({ "id": id }),
        };
        self.posts.lock().unwrap().insert(id, stored);
        self
    }

    // --- Assertion helpers ---

    pub fn len(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored external ids for one account, ascending.
    pub fn ids_for(&self, handle: &str) -> Vec<i64> {
        let posts = self.posts.lock().unwrap();
        let mut ids: Vec<i64> = posts
            .values()
            .filter(|p| p.author == handle)
            .map(|p| p.post_id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert(&self, post: &NewPost) -> Result<InsertOutcome, HarvestError> {
        let mut posts = self.posts.lock().unwrap();
        if posts.contains_key(&post.post_id) {
            return Ok(InsertOutcome::Duplicate);
        }
        posts.insert(post.post_id, post.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn oldest_id(&self, handle: &str) -> Result<Option<i64>, HarvestError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.author == handle)
            .map(|p| p.post_id)
            .min())
    }

    async fn newest_id(&self, handle: &str) -> Result<Option<i64>, HarvestError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.author == handle)
            .map(|p| p.post_id)
            .max())
    }
}

// ---------------------------------------------------------------------------
// MemoryQueue
// ---------------------------------------------------------------------------

/// Fixed account rows with rows numbered the way the sheet numbers them.
/// Records every `mark_checked` call for assertions.
pub struct MemoryQueue {
    accounts: Vec<Account>,
    reject_writes: bool,
    checked: Mutex<Vec<(String, DateTime<Utc>)>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self {
            accounts: Vec::new(),
            reject_writes: false,
            checked: Mutex::new(Vec::new()),
        }
    }

    /// Append an account row. Rows number from the sheet's first data row.
    pub fn with_account(mut self, handle: &str, last_checked: Option<&str>) -> Self {
        let row = FIRST_DATA_ROW + self.accounts.len() as u32;
        self.accounts.push(Account {
            handle: handle.to_string(),
            row,
            last_checked: last_checked.map(str::to_string),
        });
        self
    }

    /// Make every `mark_checked` call fail, as if the sheet rejected the
    /// write.
    pub fn rejecting_writes(mut self) -> Self {
        self.reject_writes = true;
        self
    }

    // --- Assertion helpers ---

    /// Handles marked checked, in call order.
    pub fn checked_handles(&self) -> Vec<String> {
        self.checked
            .lock()
            .unwrap()
            .iter()
            .map(|(handle, _)| handle.clone())
            .collect()
    }

    pub fn checked(&self) -> Vec<(String, DateTime<Utc>)> {
        self.checked.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn accounts(&self) -> Result<Vec<Account>, HarvestError> {
        Ok(self.accounts.clone())
    }

    async fn mark_checked(
        &self,
        account: &Account,
        at: DateTime<Utc>,
    ) -> Result<(), HarvestError> {
        if self.reject_writes {
            return Err(HarvestError::Queue(format!(
                "MemoryQueue: write rejected for {}",
                account.handle
            )));
        }
        self.checked.lock().unwrap().push((account.handle.clone(), at));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mock self-tests
// ---------------------------------------------------------------------------
