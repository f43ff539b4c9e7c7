use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roost_common::Config;
use roost_harvester::driver::Driver;
use roost_harvester::fetcher::PageFetcher;
use roost_harvester::queue::SheetQueue;
use roost_harvester::store::PgPostStore;
use sheets_client::SheetsClient;
use timeline_client::TimelineClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("roost_harvester=info".parse()?),
        )
        .init();

    info!("Roost harvester starting...");

    // Load config
    let config = Config::from_env();
    config.log_redacted();

    // Connect to Postgres
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // Run migrations
    let store = PgPostStore::new(pool);
    store.migrate().await?;

    let timeline = TimelineClient::new(&config.timeline_api_base, &config.timeline_api_token);
    let sheets = SheetsClient::new(&config.sheets_api_base, &config.sheets_api_token);
    let queue = SheetQueue::new(sheets, &config.spreadsheet_id, &config.worksheet);

    // Create and run the driver
    let driver = Driver::new(
        Arc::new(PageFetcher::new(timeline)),
        Arc::new(store),
        Arc::new(queue),
    );

    let stats = driver.run(Utc::now()).await?;
    info!("Harvest run complete. {stats}");

    Ok(())
}
