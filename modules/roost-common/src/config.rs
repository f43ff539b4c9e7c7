use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Timeline API
    pub timeline_api_base: String,
    pub timeline_api_token: String,

    // Work-queue spreadsheet
    pub sheets_api_base: String,
    pub sheets_api_token: String,
    pub spreadsheet_id: String,
    pub worksheet: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            timeline_api_base: env::var("TIMELINE_API_BASE")
                .unwrap_or_else(|_| "https://api.twitter.com/1.1".to_string()),
            timeline_api_token: required_env("TIMELINE_API_TOKEN"),
            sheets_api_base: env::var("SHEETS_API_BASE")
                .unwrap_or_else(|_| "https://sheets.googleapis.com".to_string()),
            sheets_api_token: required_env("SHEETS_API_TOKEN"),
            spreadsheet_id: required_env("SPREADSHEET_ID"),
            worksheet: env::var("WORKSHEET").unwrap_or_else(|_| "Accounts".to_string()),
        }
    }

    /// Log the loaded configuration without the credentials.
    pub fn log_redacted(&self) {
        tracing::info!(
            timeline_api_base = self.timeline_api_base.as_str(),
            sheets_api_base = self.sheets_api_base.as_str(),
            spreadsheet_id = self.spreadsheet_id.as_str(),
            worksheet = self.worksheet.as_str(),
            "Config loaded (tokens and database URL redacted)"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
