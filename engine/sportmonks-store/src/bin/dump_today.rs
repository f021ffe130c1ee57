//! Dump a day's raw fixtures JSON to a file, odds and lineups included.
//! Handy for eyeballing what the API actually sends before changing the
//! column selection.

use chrono::Utc;
use sportmonks_client::FixtureFilters;
use sportmonks_store::StoreConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "fixtures_dump.json".to_string());

    let config = StoreConfig::from_env()?;
    let client = config.api.client()?;

    let filters = FixtureFilters {
        leagues: config.loader.leagues.iter().flat_map(|job| job.league_ids.clone()).collect(),
        markets: config.loader.markets.clone(),
        bookmakers: config.loader.bookmakers.clone(),
    };
    let includes: Vec<&str> = config.loader.includes.iter().map(String::as_str).collect();

    let today = Utc::now().date_naive();
    let fixtures = client.fixtures_by_date(today, &filters, &includes).await?;

    std::fs::write(&path, serde_json::to_string_pretty(&fixtures)?)?;
    info!(%today, path, "wrote fixtures dump");

    Ok(())
}
