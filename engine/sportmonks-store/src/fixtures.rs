//! Fixture load flow
//!
//! One fixtures fetch per league feeds three destinations: the per-league
//! fixtures table (lineup and odds stripped off first), the wide per-market
//! odds tables, and the `<table>_players` lineup table. Fixture rows go in
//! before odds and player rows so foreign keys resolve, and the single
//! fetch keeps the API call count down.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use sportmonks_client::{Error as ApiError, FixtureFilters, SportMonks, Table};
use tracing::{info, warn};

use crate::config::{LeagueJob, LoaderConfig};
use crate::odds;
use crate::writer::{IfExists, PgWriter};

/// Fetch fixtures for a date range and store them under the job's table.
pub async fn load_fixtures_range(
    client: &SportMonks,
    writer: &PgWriter,
    loader: &LoaderConfig,
    job: &LeagueJob,
    start: NaiveDate,
    end: NaiveDate,
    if_exists: IfExists,
) -> Result<()> {
    let filters = FixtureFilters {
        leagues: job.league_ids.clone(),
        markets: loader.markets.clone(),
        bookmakers: loader.bookmakers.clone(),
    };
    let includes: Vec<&str> = loader.includes.iter().map(String::as_str).collect();

    let fixtures = match client.fixtures_between(start, end, &filters, &includes).await {
        Ok(fixtures) => fixtures,
        Err(ApiError::NoData) => {
            info!(table = %job.table, %start, %end, "no fixtures in range");
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to fetch fixtures for {}", job.table))
        }
    };

    store_fixtures(writer, loader, &job.table, fixtures, if_exists).await
}

/// Same flow for a handful of specific fixtures, given by their ids.
pub async fn load_fixtures_by_ids(
    client: &SportMonks,
    writer: &PgWriter,
    loader: &LoaderConfig,
    fixture_ids: &[i64],
    table_name: &str,
    if_exists: IfExists,
) -> Result<()> {
    let filters = FixtureFilters {
        leagues: Vec::new(),
        markets: loader.markets.clone(),
        bookmakers: loader.bookmakers.clone(),
    };
    let includes: Vec<&str> = loader.includes.iter().map(String::as_str).collect();

    let fixtures = match client.fixtures(fixture_ids, &filters, &includes).await {
        Ok(fixtures) => fixtures,
        Err(ApiError::NoData) => {
            info!(table = table_name, ?fixture_ids, "no fixtures for ids");
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to fetch fixtures {fixture_ids:?}"))
        }
    };

    store_fixtures(writer, loader, table_name, fixtures, if_exists).await
}

/// Store a fixtures payload: the main table from a stripped copy, then the
/// odds and lineup side tables from the full payload.
async fn store_fixtures(
    writer: &PgWriter,
    loader: &LoaderConfig,
    table_name: &str,
    fixtures: Value,
    if_exists: IfExists,
) -> Result<()> {
    let mut stripped = fixtures.clone();
    strip_includes(&mut stripped, &["lineup", "odds"]);
    split_stats(&mut stripped);

    let mut table = Table::from_response(&stripped)
        .with_context(|| format!("fixtures for {table_name} are not tabular"))?
        .select(&loader.fixture_columns);
    table.rename(&loader.column_renames);

    let written = writer.write_table(table_name, &table, if_exists).await?;
    info!(table = table_name, rows = written, "wrote fixtures");

    writer.backfill_season_names(table_name).await?;

    if loader.includes.iter().any(|i| i == "odds") {
        write_odds_tables(writer, table_name, &fixtures, &loader.markets, if_exists).await?;
    }

    if loader.includes.iter().any(|i| i == "lineup") {
        write_lineup_table(writer, table_name, &fixtures, if_exists).await?;
    }

    Ok(())
}

/// Write one wide odds table per market that produced rows.
async fn write_odds_tables(
    writer: &PgWriter,
    base_table: &str,
    fixtures: &Value,
    markets: &[i64],
    if_exists: IfExists,
) -> Result<()> {
    for market in odds::collect_market_rows(fixtures, markets) {
        let name = format!("{}_{}", base_table, market.market_name.replace(' ', "_"));
        let table = Table::from_records(&market.rows)
            .with_context(|| format!("odds rows for {name} are not tabular"))?;

        let written = writer.write_table(&name, &table, if_exists).await?;
        info!(table = %name, rows = written, "wrote odds");
    }

    Ok(())
}

/// Pool every fixture's lineup into one `<table>_players` table.
async fn write_lineup_table(
    writer: &PgWriter,
    base_table: &str,
    fixtures: &Value,
    if_exists: IfExists,
) -> Result<()> {
    let mut players: Vec<Value> = Vec::new();
    for fixture in as_records(fixtures) {
        if let Some(lineup) = fixture.get("lineup").and_then(Value::as_array) {
            players.extend(lineup.iter().cloned());
        }
    }

    if players.is_empty() {
        info!(table = base_table, "no lineups included");
        return Ok(());
    }

    let name = format!("{base_table}_players");
    match Table::from_records(&players) {
        Ok(table) => {
            let written = writer.write_table(&name, &table, if_exists).await?;
            info!(table = %name, rows = written, "wrote lineups");
        }
        Err(e) => warn!(table = %name, error = %e, "lineup rows are not tabular, skipping"),
    }

    Ok(())
}

/// Remove the named includes from every fixture record.
pub fn strip_includes(fixtures: &mut Value, includes: &[&str]) {
    for fixture in as_records_mut(fixtures) {
        if let Some(obj) = fixture.as_object_mut() {
            for include in includes {
                obj.remove(*include);
            }
        }
    }
}

/// Replace the two-entry `stats` include with `home` and `away` objects so
/// the record flattens to one row. Anything other than exactly two entries
/// becomes a pair of empty objects.
pub fn split_stats(fixtures: &mut Value) {
    for fixture in as_records_mut(fixtures) {
        let Some(obj) = fixture.as_object_mut() else {
            continue;
        };
        let Some(stats) = obj.remove("stats") else {
            continue;
        };

        match stats {
            Value::Array(mut entries) if entries.len() == 2 => {
                let away = entries.pop().unwrap_or(Value::Null);
                let home = entries.pop().unwrap_or(Value::Null);
                obj.insert("home".to_string(), home);
                obj.insert("away".to_string(), away);
            }
            Value::Array(entries) => {
                info!(len = entries.len(), "unexpected stats length");
                obj.insert("home".to_string(), Value::Object(Map::new()));
                obj.insert("away".to_string(), Value::Object(Map::new()));
            }
            other => {
                obj.insert("stats".to_string(), other);
            }
        }
    }
}

fn as_records(fixtures: &Value) -> &[Value] {
    match fixtures {
        Value::Array(records) => records,
        Value::Object(_) => std::slice::from_ref(fixtures),
        _ => &[],
    }
}

fn as_records_mut(fixtures: &mut Value) -> &mut [Value] {
    match fixtures {
        Value::Array(records) => records,
        Value::Object(_) => std::slice::from_mut(fixtures),
        _ => &mut [],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_removes_the_named_includes_only() {
        let mut fixtures = json!([
            { "id": 1, "lineup": [1, 2], "odds": [3], "stats": [] }
        ]);

        strip_includes(&mut fixtures, &["lineup", "odds"]);

        assert_eq!(fixtures, json!([{ "id": 1, "stats": [] }]));
    }

    #[test]
    fn strip_handles_a_single_fixture_object() {
        let mut fixture = json!({ "id": 1, "odds": [] });
        strip_includes(&mut fixture, &["odds"]);
        assert_eq!(fixture, json!({ "id": 1 }));
    }

    #[test]
    fn stats_split_into_home_and_away() {
        let mut fixtures = json!([{
            "id": 1,
            "stats": [
                { "team_id": 10, "corners": 7 },
                { "team_id": 20, "corners": 2 }
            ]
        }]);

        split_stats(&mut fixtures);

        assert_eq!(
            fixtures,
            json!([{
                "id": 1,
                "home": { "team_id": 10, "corners": 7 },
                "away": { "team_id": 20, "corners": 2 }
            }])
        );
    }

    #[test]
    fn short_stats_become_empty_objects() {
        let mut fixtures = json!([{ "id": 1, "stats": [{ "team_id": 10 }] }]);

        split_stats(&mut fixtures);

        assert_eq!(fixtures, json!([{ "id": 1, "home": {}, "away": {} }]));
    }

    #[test]
    fn fixtures_without_stats_are_untouched() {
        let mut fixtures = json!([{ "id": 1 }]);
        split_stats(&mut fixtures);
        assert_eq!(fixtures, json!([{ "id": 1 }]));
    }

    #[test]
    fn stripped_fixtures_flatten_to_the_configured_columns() {
        let loader = crate::config::StoreConfig::default().loader;
        let mut fixtures = json!([{
            "id": 11867285,
            "league_id": 8,
            "season_id": 16036,
            "localTeam": { "id": 19, "name": "Arsenal", "short_code": "ARS" },
            "visitorTeam": { "id": 18, "name": "Chelsea", "short_code": "CHE" },
            "scores": { "localteam_score": 2, "visitorteam_score": 1 },
            "time": { "status": "FT", "starting_at": { "date_time": "2020-01-01 17:30:00" } },
            "stats": [
                { "corners": 7, "shots": { "total": 10, "ongoal": 4 } },
                { "corners": 2, "shots": { "total": 6, "ongoal": 1 } }
            ]
        }]);

        split_stats(&mut fixtures);
        let mut table =
            Table::from_response(&fixtures).unwrap().select(&loader.fixture_columns);
        table.rename(&loader.column_renames);

        let id = table.column_index("id").unwrap();
        let home_team = table.column_index("home_team").unwrap();
        let home_corners = table.column_index("home_corners").unwrap();
        let referee = table.column_index("referee").unwrap();

        let row = &table.rows()[0];
        assert_eq!(row[id], json!(11867285));
        assert_eq!(row[home_team], json!("Arsenal"));
        assert_eq!(row[home_corners], json!(7));
        // not in the payload: padded, not an error
        assert_eq!(row[referee], Value::Null);
    }
}
