// The work queue is a spreadsheet: one account per row, handle in column A,
// last-checked timestamp in column B. Row 1 is the header.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

use roost_common::HarvestError;
use sheets_client::SheetsClient;

/// Timestamp format written to and parsed from the ledger column.
pub const CHECKED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// First data row of the sheet (1-based; row 1 is the header).
pub(crate) const FIRST_DATA_ROW: u32 = 2;

/// One account row from the queue.
#[derive(Debug, Clone)]
pub struct Account {
    pub handle: String,
    /// 1-based sheet row, used to address the ledger cell on write-back.
    pub row: u32,
    /// Raw last-checked cell contents; empty or absent means never checked.
    pub last_checked: Option<String>,
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// All account rows, in sheet order.
    async fn accounts(&self) -> Result<Vec<Account>, HarvestError>;

    /// Record a successful pass over an account.
    async fn mark_checked(&self, account: &Account, at: DateTime<Utc>)
        -> Result<(), HarvestError>;
}

/// Whether an account is due for a harvest pass.
///
/// Due when never checked, or when the recorded date (day granularity) is
/// before today. A cell that does not parse counts as due and is logged.
pub fn is_due(last_checked: Option<&str>, today: NaiveDate) -> bool {
    let raw = match last_checked {
        None => return true,
        Some(raw) if raw.trim().is_empty() => return true,
        Some(raw) => raw.trim(),
    };
    match NaiveDateTime::parse_from_str(raw, CHECKED_AT_FORMAT) {
        Ok(ts) => ts.date() < today,
        Err(e) => {
            warn!(raw, error = %e, "Unparseable last-checked cell, treating as due");
            true
        }
    }
}

/// Map raw sheet rows onto accounts.
///
/// `rows[0]` is sheet row `FIRST_DATA_ROW`. A row with a blank handle is
/// skipped but still occupies its row number, so write-backs land on the
/// right cell. A missing second cell reads as never checked (the values API
/// drops trailing empty cells).
fn accounts_from_rows(rows: &[Vec<String>]) -> Vec<Account> {
    let mut accounts = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let handle = match row.first() {
            Some(h) if !h.trim().is_empty() => h.trim().to_string(),
            _ => continue, // blank row
        };
        accounts.push(Account {
            handle,
            row: FIRST_DATA_ROW + i as u32,
            last_checked: row.get(1).map(|s| s.to_string()),
        });
    }
    accounts
}

/// Spreadsheet-backed queue.
pub struct SheetQueue {
    client: SheetsClient,
    spreadsheet_id: String,
    worksheet: String,
}

impl SheetQueue {
    pub fn new(client: SheetsClient, spreadsheet_id: &str, worksheet: &str) -> Self {
        Self {
            client,
            spreadsheet_id: spreadsheet_id.to_string(),
            worksheet: worksheet.to_string(),
        }
    }
}

#[async_trait]
impl WorkQueue for SheetQueue {
    async fn accounts(&self) -> Result<Vec<Account>, HarvestError> {
        let range = format!("{}!A{}:B", self.worksheet, FIRST_DATA_ROW);
        let data = self.client.values_get(&self.spreadsheet_id, &range).await?;
        Ok(accounts_from_rows(&data.values))
    }

    async fn mark_checked(
        &self,
        account: &Account,
        at: DateTime<Utc>,
    ) -> Result<(), HarvestError> {
        let range = format!("{}!B{}", self.worksheet, account.row);
        let stamp = at.format(CHECKED_AT_FORMAT).to_string();
        self.client
            .values_update(&self.spreadsheet_id, &range, &stamp)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn never_checked_is_due() {
        assert!(is_due(None, day(2024, 5, 15)));
        assert!(is_due(Some(""), day(2024, 5, 15)));
        assert!(is_due(Some("   "), day(2024, 5, 15)));
    }

    #[test]
    fn checked_on_an_earlier_day_is_due() {
        assert!(is_due(Some("2024-05-14 23:59:59"), day(2024, 5, 15)));
        assert!(is_due(Some("2000-01-01 00:00:00"), day(2024, 5, 15)));
    }

    #[test]
    fn checked_earlier_today_is_not_due() {
        // Day granularity: an early-morning check covers the whole day.
        assert!(!is_due(Some("2024-05-15 00:00:01"), day(2024, 5, 15)));
    }

    #[test]
    fn checked_in_the_future_is_not_due() {
        assert!(!is_due(Some("2099-01-01 00:00:00"), day(2024, 5, 15)));
    }

    #[test]
    fn garbage_cell_is_due() {
        assert!(is_due(Some("last tuesday"), day(2024, 5, 15)));
        assert!(is_due(Some("2024-05-14"), day(2024, 5, 15))); // date only, wrong format
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn blank_rows_are_skipped_without_renumbering() {
        let rows = vec![
            row(&["alice", "2024-05-14 09:00:00"]),
            row(&["", "2024-05-01 00:00:00"]),
            row(&[]),
            row(&["bob"]),
        ];

        let accounts = accounts_from_rows(&rows);

        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].handle, "alice");
        assert_eq!(accounts[0].row, 2);
        assert_eq!(
            accounts[0].last_checked.as_deref(),
            Some("2024-05-14 09:00:00")
        );
        // bob sits on sheet row 5; the skipped rows must not shift him up,
        // or his ledger stamp would land in someone else's cell.
        assert_eq!(accounts[1].handle, "bob");
        assert_eq!(accounts[1].row, 5);
    }

    #[test]
    fn ragged_rows_read_as_never_checked() {
        let accounts = accounts_from_rows(&[row(&["carol"])]);

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].last_checked, None);
        assert!(is_due(accounts[0].last_checked.as_deref(), day(2024, 5, 15)));
    }

    #[test]
    fn handles_are_trimmed() {
        let accounts = accounts_from_rows(&[row(&["  dave  ", ""])]);
        assert_eq!(accounts[0].handle, "dave");
    }
}
