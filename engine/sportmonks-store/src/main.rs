use sportmonks_store::{NightlyLoader, StoreConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("starting SportMonks nightly loader");

    let config = StoreConfig::from_env()?;
    info!(fetch_time = %config.scheduler.nightly_fetch_time, "loaded configuration");

    let loader = NightlyLoader::new(config).await?;

    if let Err(e) = loader.run().await {
        error!("scheduler failed: {e:#}");
        return Err(e);
    }

    Ok(())
}
