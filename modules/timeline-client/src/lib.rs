pub mod error;
pub mod types;

pub use error::{Result, TimelineError};
pub use types::{PostAuthor, TimelinePost};

use std::time::Duration;

/// Maximum page size the timeline endpoint honors per call.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Parameters for one `statuses/user_timeline` call.
///
/// `max_id` is inclusive and `since_id` exclusive, as the API defines them.
#[derive(Debug, Clone)]
pub struct TimelineQuery {
    pub screen_name: String,
    pub count: u32,
    pub max_id: Option<i64>,
    pub since_id: Option<i64>,
}

pub struct TimelineClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TimelineClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Fetch one page of a user's timeline, most recent posts first.
    ///
    /// Always requests extended mode (so `full_text` is populated) and native
    /// reposts. Rate limiting surfaces as `TimelineError::RateLimited` with
    /// the platform's own message; callers decide whether to wait and retry.
    pub async fn user_timeline(&self, query: &TimelineQuery) -> Result<Vec<TimelinePost>> {
        let url = format!("{}/statuses/user_timeline.json", self.base_url);

        let mut params: Vec<(&str, String)> = vec![
            ("screen_name", query.screen_name.clone()),
            ("count", query.count.to_string()),
            ("tweet_mode", "extended".to_string()),
            ("include_rts", "true".to_string()),
        ];
        if let Some(max_id) = query.max_id {
            params.push(("max_id", max_id.to_string()));
        }
        if let Some(since_id) = query.since_id {
            params.push(("since_id", since_id.to_string()));
        }

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            // 420 is the legacy rate-limit status on this API.
            if status.as_u16() == 429 || status.as_u16() == 420 {
                return Err(TimelineError::RateLimited { message });
            }
            return Err(TimelineError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let posts: Vec<TimelinePost> = resp.json().await?;
        tracing::debug!(
            screen_name = %query.screen_name,
            count = posts.len(),
            "Fetched timeline page"
        );
        Ok(posts)
    }
}

/// Pull the human-readable message out of an error body, falling back to the
/// raw body when it isn't the documented `{"errors":[...]}` shape.
fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<types::ApiErrorBody>(body) {
        Ok(parsed) => parsed
            .errors
            .into_iter()
            .find_map(|e| e.message)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => body.to_string(),
    }
}
