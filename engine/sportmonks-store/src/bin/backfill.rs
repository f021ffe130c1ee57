use anyhow::Context;
use chrono::NaiveDate;
use sportmonks_store::{NightlyLoader, StoreConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: backfill <start YYYY-MM-DD> <end YYYY-MM-DD>");
        std::process::exit(2);
    }

    let start = NaiveDate::parse_from_str(&args[1], "%Y-%m-%d").context("invalid start date")?;
    let end = NaiveDate::parse_from_str(&args[2], "%Y-%m-%d").context("invalid end date")?;

    info!(%start, %end, "backfilling fixtures");

    let config = StoreConfig::from_env()?;
    let loader = NightlyLoader::new(config).await?;

    match loader.load_range(start, end).await {
        Ok(()) => info!("backfill complete"),
        Err(e) => {
            error!("backfill failed: {e:#}");
            return Err(e);
        }
    }

    Ok(())
}
