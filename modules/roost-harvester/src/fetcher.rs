// Trait seams between the harvest loops and the timeline API.
//
// Timeline is what the controllers and driver consume — ScriptedTimeline in
// testing.rs implements it for deterministic tests: no network, no cooldown
// waits. PageSource abstracts the raw endpoint call so the rate-limit policy
// in PageFetcher can be exercised the same way.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use roost_common::HarvestError;
use timeline_client::{TimelineClient, TimelinePost, TimelineQuery, MAX_PAGE_SIZE};

/// How many posts to request per page. The endpoint caps at 200 regardless.
pub const PAGE_SIZE: u32 = 200;

/// Wait before the single retry after a rate-limit response.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(900);

/// Pause before each continuation page of an account, to stay well inside
/// the request window.
pub const PAGE_DELAY: Duration = Duration::from_secs(5);

/// Where in an account's timeline to fetch from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// The most recent posts, no cursor.
    Latest,
    /// Posts strictly older than this id.
    OlderThan(i64),
    /// Posts strictly newer than this id.
    NewerThan(i64),
}

#[async_trait]
pub trait Timeline: Send + Sync {
    /// Fetch one page of posts for `handle`, most recent first.
    async fn fetch_page(
        &self,
        handle: &str,
        count: u32,
        boundary: Boundary,
    ) -> Result<Vec<TimelinePost>, HarvestError>;
}

/// The raw timeline call behind `PageFetcher`.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn user_timeline(&self, query: &TimelineQuery)
        -> timeline_client::Result<Vec<TimelinePost>>;
}

#[async_trait]
impl PageSource for TimelineClient {
    async fn user_timeline(
        &self,
        query: &TimelineQuery,
    ) -> timeline_client::Result<Vec<TimelinePost>> {
        TimelineClient::user_timeline(self, query).await
    }
}

/// Production fetcher: boundary mapping, count clamping, page pacing, and the
/// wait-once-then-retry rate-limit policy.
pub struct PageFetcher<S> {
    source: S,
    cooldown: Duration,
    page_delay: Duration,
}

impl<S: PageSource> PageFetcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cooldown: RATE_LIMIT_COOLDOWN,
            page_delay: PAGE_DELAY,
        }
    }

    /// Override the waits. Tests pass zero durations.
    pub fn with_delays(mut self, cooldown: Duration, page_delay: Duration) -> Self {
        self.cooldown = cooldown;
        self.page_delay = page_delay;
        self
    }

    fn query_for(handle: &str, count: u32, boundary: Boundary) -> TimelineQuery {
        let count = count.min(MAX_PAGE_SIZE);
        let (max_id, since_id) = match boundary {
            Boundary::Latest => (None, None),
            // max_id is inclusive on the API side; subtract one so the post
            // we already hold is excluded. Ids are positive, no underflow.
            Boundary::OlderThan(id) => {
                debug_assert!(id > 0);
                (Some(id - 1), None)
            }
            // since_id is already exclusive.
            Boundary::NewerThan(id) => (None, Some(id)),
        };
        TimelineQuery {
            screen_name: handle.to_string(),
            count,
            max_id,
            since_id,
        }
    }
}

#[async_trait]
impl<S: PageSource> Timeline for PageFetcher<S> {
    async fn fetch_page(
        &self,
        handle: &str,
        count: u32,
        boundary: Boundary,
    ) -> Result<Vec<TimelinePost>, HarvestError> {
        // Continuation pages follow an account already in flight; pace them.
        if !matches!(boundary, Boundary::Latest) {
            tokio::time::sleep(self.page_delay).await;
        }

        let query = Self::query_for(handle, count, boundary);
        match self.source.user_timeline(&query).await {
            Ok(posts) => Ok(posts),
            Err(timeline_client::TimelineError::RateLimited { message }) => {
                warn!(
                    handle,
                    cooldown_secs = self.cooldown.as_secs(),
                    message = message.as_str(),
                    "Rate limited, waiting before one retry"
                );
                tokio::time::sleep(self.cooldown).await;
                info!(handle, "Cooldown over, retrying fetch");
                Ok(self.source.user_timeline(&query).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;
    use timeline_client::TimelineError;

    #[test]
    fn latest_carries_no_cursor() {
        let q = PageFetcher::<TimelineClient>::query_for("alice", 200, Boundary::Latest);
        assert_eq!(q.max_id, None);
        assert_eq!(q.since_id, None);
        assert_eq!(q.screen_name, "alice");
    }

    #[test]
    fn older_than_makes_the_inclusive_bound_strict() {
        let q = PageFetcher::<TimelineClient>::query_for("alice", 200, Boundary::OlderThan(1000));
        assert_eq!(q.max_id, Some(999));
        assert_eq!(q.since_id, None);
    }

    #[test]
    fn newer_than_maps_straight_to_since_id() {
        let q = PageFetcher::<TimelineClient>::query_for("alice", 200, Boundary::NewerThan(1000));
        assert_eq!(q.since_id, Some(1000));
        assert_eq!(q.max_id, None);
    }

    #[test]
    fn count_is_clamped_to_the_endpoint_maximum() {
        let q = PageFetcher::<TimelineClient>::query_for("alice", 10_000, Boundary::Latest);
        assert_eq!(q.count, 200);
    }

    /// Fails with the rate-limit signal a fixed number of times, then serves
    /// the page. Records every query it sees.
    struct FlakySource {
        rate_limits_remaining: Mutex<u32>,
        calls: Mutex<Vec<TimelineQuery>>,
        page: Vec<TimelinePost>,
    }

    impl FlakySource {
        fn new(rate_limits: u32, page: Vec<TimelinePost>) -> Self {
            Self {
                rate_limits_remaining: Mutex::new(rate_limits),
                calls: Mutex::new(Vec::new()),
                page,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageSource for FlakySource {
        async fn user_timeline(
            &self,
            query: &TimelineQuery,
        ) -> timeline_client::Result<Vec<TimelinePost>> {
            self.calls.lock().unwrap().push(query.clone());
            let mut remaining = self.rate_limits_remaining.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TimelineError::RateLimited {
                    message: "Rate limit exceeded".to_string(),
                });
            }
            Ok(self.page.clone())
        }
    }

    fn post(id: i64) -> TimelinePost {
        serde_json::from_value(serde_json::json!({ "id": id, "text": "t" })).unwrap()
    }

    #[tokio::test]
    async fn only_continuation_pages_are_paced() {
        let source = FlakySource::new(0, vec![post(42)]);
        let fetcher = PageFetcher::new(source)
            .with_delays(Duration::ZERO, Duration::from_millis(50));

        let started = Instant::now();
        fetcher
            .fetch_page("alice", PAGE_SIZE, Boundary::Latest)
            .await
            .unwrap();
        assert!(
            started.elapsed() < Duration::from_millis(50),
            "initial fetch must not wait"
        );

        let started = Instant::now();
        fetcher
            .fetch_page("alice", PAGE_SIZE, Boundary::OlderThan(42))
            .await
            .unwrap();
        assert!(
            started.elapsed() >= Duration::from_millis(50),
            "older continuation page not paced"
        );

        let started = Instant::now();
        fetcher
            .fetch_page("alice", PAGE_SIZE, Boundary::NewerThan(42))
            .await
            .unwrap();
        assert!(
            started.elapsed() >= Duration::from_millis(50),
            "newer continuation page not paced"
        );
    }

    #[tokio::test]
    async fn rate_limited_once_waits_and_retries() {
        let source = FlakySource::new(1, vec![post(42)]);
        let fetcher = PageFetcher::new(source)
            .with_delays(Duration::from_millis(50), Duration::ZERO);

        let started = Instant::now();
        let page = fetcher
            .fetch_page("alice", PAGE_SIZE, Boundary::Latest)
            .await
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(fetcher.source.call_count(), 2);
        assert!(started.elapsed() >= Duration::from_millis(50), "cooldown not observed");
    }

    #[tokio::test]
    async fn second_rate_limit_propagates() {
        let source = FlakySource::new(2, vec![post(42)]);
        let fetcher = PageFetcher::new(source).with_delays(Duration::ZERO, Duration::ZERO);

        let err = fetcher
            .fetch_page("alice", PAGE_SIZE, Boundary::Latest)
            .await
            .unwrap_err();

        assert_eq!(err.reason(), "rate_limited");
        // One retry, never more.
        assert_eq!(fetcher.source.call_count(), 2);
    }

    #[tokio::test]
    async fn api_errors_propagate_without_retry() {
        struct Failing(Mutex<u32>);

        #[async_trait]
        impl PageSource for Failing {
            async fn user_timeline(
                &self,
                _query: &TimelineQuery,
            ) -> timeline_client::Result<Vec<TimelinePost>> {
                *self.0.lock().unwrap() += 1;
                Err(TimelineError::Api {
                    status: 401,
                    message: "Invalid or expired token".to_string(),
                })
            }
        }

        let fetcher = PageFetcher::new(Failing(Mutex::new(0)))
            .with_delays(Duration::ZERO, Duration::ZERO);

        let err = fetcher
            .fetch_page("alice", PAGE_SIZE, Boundary::Latest)
            .await
            .unwrap_err();

        assert_eq!(err.reason(), "api");
        assert_eq!(*fetcher.source.0.lock().unwrap(), 1);
    }
}
