use sportmonks_store::{NightlyLoader, StoreConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("loading today's data immediately");

    let config = StoreConfig::from_env()?;
    let loader = NightlyLoader::new(config).await?;

    match loader.run_once().await {
        Ok(()) => info!("load complete"),
        Err(e) => {
            error!("load failed: {e:#}");
            return Err(e);
        }
    }

    Ok(())
}
