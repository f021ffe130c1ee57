//! Reference tables
//!
//! Continents, countries, bookmakers, markets, leagues and seasons change
//! rarely and are small; each nightly run just replaces them wholesale.
//! Seasons carries `league_id` too; the fixtures tables join against it
//! to back-fill season names.

use anyhow::{Context, Result};
use sportmonks_client::{SportMonks, Table};
use tracing::info;

use crate::writer::{IfExists, PgWriter};

/// Replace the six reference tables from the API.
pub async fn load_reference_tables(client: &SportMonks, writer: &PgWriter) -> Result<()> {
    let id_name = ["id".to_string(), "name".to_string()];
    let season_columns =
        ["id".to_string(), "name".to_string(), "league_id".to_string()];

    let continents = client.continents(&[]).await.context("failed to fetch continents")?;
    replace_table(writer, "Continents", &Table::from_response(&continents)?.select(&id_name))
        .await?;

    let countries = client.countries(&[]).await.context("failed to fetch countries")?;
    replace_table(writer, "Countries", &Table::from_response(&countries)?.select(&id_name))
        .await?;

    let bookmakers = client.bookmakers().await.context("failed to fetch bookmakers")?;
    replace_table(writer, "Bookmakers", &Table::from_response(&bookmakers)?.select(&id_name))
        .await?;

    let markets = client.markets().await.context("failed to fetch markets")?;
    replace_table(writer, "Markets", &Table::from_response(&markets)?.select(&id_name)).await?;

    let leagues = client.leagues(&[]).await.context("failed to fetch leagues")?;
    replace_table(writer, "Leagues", &Table::from_response(&leagues)?.select(&id_name)).await?;

    let seasons = client.seasons(&[]).await.context("failed to fetch seasons")?;
    replace_table(writer, "Seasons", &Table::from_response(&seasons)?.select(&season_columns))
        .await?;

    Ok(())
}

async fn replace_table(writer: &PgWriter, name: &str, table: &Table) -> Result<()> {
    let written = writer.write_table(name, table, IfExists::Replace).await?;
    info!(table = name, rows = written, "replaced reference table");
    Ok(())
}
