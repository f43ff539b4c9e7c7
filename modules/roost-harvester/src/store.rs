// Post persistence. PostStore is the trait seam; PgPostStore is Postgres,
// with the full API payload landing in a JSONB column.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::warn;

use roost_common::HarvestError;
use timeline_client::TimelinePost;

/// Source-format creation timestamps: `Wed Oct 10 20:19:24 +0000 2018`.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Outcome of an insert attempt. Duplicates are expected whenever a boundary
/// overlaps an earlier run, and are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// A post ready for persistence.
///
/// `author` is always the work-queue handle, not whatever casing the payload
/// carries — checkpoint queries filter on it, so insert and lookup must agree.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub post_id: i64,
    pub author: String,
    pub content: Option<String>,
    pub created_at_raw: Option<String>,
    pub post_date: Option<NaiveDate>,
    pub harvested_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl NewPost {
    /// Build a storable post from an API payload.
    ///
    /// An unparseable creation timestamp leaves `post_date` empty and is
    /// logged; the raw payload still holds whatever the API sent.
    pub fn from_timeline(
        handle: &str,
        post: &TimelinePost,
        now: DateTime<Utc>,
    ) -> Result<Self, HarvestError> {
        let post_date = match post.created_at.as_deref() {
            Some(raw) => match DateTime::parse_from_str(raw, CREATED_AT_FORMAT) {
                Ok(ts) => Some(ts.date_naive()),
                Err(e) => {
                    warn!(post_id = post.id, raw, error = %e, "Unparseable creation timestamp");
                    None
                }
            },
            None => None,
        };

        let payload = serde_json::to_value(post)
            .map_err(|e| HarvestError::Malformed(format!("post {}: {e}", post.id)))?;

        Ok(Self {
            post_id: post.id,
            author: handle.to_string(),
            content: post.content().map(str::to_string),
            created_at_raw: post.created_at.clone(),
            post_date,
            harvested_at: now,
            payload,
        })
    }
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert one post, deduplicating on its external id.
    async fn insert(&self, post: &NewPost) -> Result<InsertOutcome, HarvestError>;

    /// Oldest external id stored for an account, if any posts exist.
    async fn oldest_id(&self, handle: &str) -> Result<Option<i64>, HarvestError>;

    /// Newest external id stored for an account, if any posts exist.
    async fn newest_id(&self, handle: &str) -> Result<Option<i64>, HarvestError>;
}

pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<(), HarvestError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| HarvestError::Store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn insert(&self, post: &NewPost) -> Result<InsertOutcome, HarvestError> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts
                (post_id, author, content, created_at_raw, post_date, harvested_at, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (post_id) DO NOTHING
            "#,
        )
        .bind(post.post_id)
        .bind(&post.author)
        .bind(&post.content)
        .bind(&post.created_at_raw)
        .bind(post.post_date)
        .bind(post.harvested_at)
        .bind(&post.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| HarvestError::Store(e.to_string()))?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn oldest_id(&self, handle: &str) -> Result<Option<i64>, HarvestError> {
        sqlx::query_scalar::<_, Option<i64>>("SELECT MIN(post_id) FROM posts WHERE author = $1")
            .bind(handle)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HarvestError::Store(e.to_string()))
    }

    async fn newest_id(&self, handle: &str) -> Result<Option<i64>, HarvestError> {
        sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(post_id) FROM posts WHERE author = $1")
            .bind(handle)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HarvestError::Store(e.to_string()))
    }
}
