use thiserror::Error;

/// Errors surfaced by the harvest pipeline.
///
/// Each variant maps to a stable reason code via [`HarvestError::reason`], so
/// run summaries and alerting can group failures without matching on display
/// text.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Work queue error: {0}")]
    Queue(String),

    #[error("Malformed data: {0}")]
    Malformed(String),
}

impl HarvestError {
    /// Stable machine-readable code for this failure class.
    pub fn reason(&self) -> &'static str {
        match self {
            HarvestError::RateLimited(_) => "rate_limited",
            HarvestError::Network(_) => "network",
            HarvestError::Api { .. } => "api",
            HarvestError::Store(_) => "store",
            HarvestError::Queue(_) => "queue",
            HarvestError::Malformed(_) => "malformed",
        }
    }
}

impl From<timeline_client::TimelineError> for HarvestError {
    fn from(err: timeline_client::TimelineError) -> Self {
        use timeline_client::TimelineError;
        match err {
            TimelineError::RateLimited { message } => HarvestError::RateLimited(message),
            TimelineError::Network(msg) => HarvestError::Network(msg),
            TimelineError::Api { status, message } => HarvestError::Api { status, message },
        }
    }
}

impl From<sheets_client::SheetsError> for HarvestError {
    fn from(err: sheets_client::SheetsError) -> Self {
        HarvestError::Queue(err.to_string())
    }
}
