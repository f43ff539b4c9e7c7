pub mod error;

pub use error::{Result, SheetsError};

use serde::Deserialize;
use std::time::Duration;

pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

/// One read of a cell range.
///
/// The API omits trailing empty cells, so rows may be shorter than the
/// requested width, and `values` is absent entirely for an empty range.
#[derive(Debug, Clone, Deserialize)]
pub struct ValueRange {
    pub range: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

impl SheetsClient {
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

    /// Read a range of cells, e.g. `Accounts!A2:B`.
    pub async fn values_get(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, spreadsheet_id, range
        );

        let resp = self.client.get(&url).bearer_auth(&self.token).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// Overwrite a single cell (or range) with raw, unparsed values.
    pub async fn values_update(
        &self,
        spreadsheet_id: &str,
        range: &str,
        value: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, spreadsheet_id, range
        );

        let body = serde_json::json!({ "values": [[value]] });

        let resp = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(range, "Updated sheet cell");
        Ok(())
    }
}
