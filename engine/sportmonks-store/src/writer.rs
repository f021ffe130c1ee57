//! PostgreSQL writer for flattened API data
//!
//! Tables are derived from the data: column types are inferred from the
//! JSON values and the DDL is generated per load. Table names and column
//! sets are data-driven, so everything goes through runtime `sqlx::query`
//! rather than the compile-checked macros.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use sportmonks_client::Table;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

/// What to do when the target table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfExists {
    /// Refuse the write
    Fail,
    /// Drop and recreate the table
    Replace,
    /// Insert into the existing table, widening it if columns are new
    Append,
}

/// Postgres bind parameters are a 16-bit count per statement; chunk rows
/// so one INSERT stays comfortably under it.
const MAX_BIND_PARAMS: usize = 60_000;

/// SQL column types the writer infers from JSON values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlType {
    Boolean,
    BigInt,
    Double,
    Text,
}

impl SqlType {
    fn ddl(self) -> &'static str {
        match self {
            SqlType::Boolean => "boolean",
            SqlType::BigInt => "bigint",
            SqlType::Double => "double precision",
            SqlType::Text => "text",
        }
    }
}

/// Writes [`Table`]s to PostgreSQL
pub struct PgWriter {
    pool: PgPool,
}

impl PgWriter {
    /// Connect a pool against the configured database
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .context("failed to connect to database")?;

        Ok(Self { pool })
    }

    /// The underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Write a table under the given name, returning the row count written.
    pub async fn write_table(
        &self,
        name: &str,
        table: &Table,
        if_exists: IfExists,
    ) -> Result<u64> {
        if table.columns().is_empty() {
            debug!(table = name, "nothing to write, no columns");
            return Ok(0);
        }

        info!(table = name, rows = table.len(), ?if_exists, "writing table");

        let types = infer_column_types(table);
        let exists = self.table_exists(name).await?;

        match if_exists {
            IfExists::Fail if exists => bail!("table \"{name}\" already exists"),
            IfExists::Fail => self.create_table(name, table.columns(), &types).await?,
            IfExists::Replace => {
                if exists {
                    let drop = format!("DROP TABLE {}", quote_ident(name));
                    sqlx::query(&drop).execute(&self.pool).await?;
                }
                self.create_table(name, table.columns(), &types).await?;
            }
            IfExists::Append => {
                if exists {
                    self.widen_table(name, table.columns(), &types).await?;
                } else {
                    self.create_table(name, table.columns(), &types).await?;
                }
            }
        }

        self.insert_rows(name, table, &types).await
    }

    /// Add a `season` column to a fixtures table and fill it with the
    /// season name from the `"Seasons"` reference table.
    pub async fn backfill_season_names(&self, name: &str) -> Result<()> {
        let table = quote_ident(name);

        let alter = format!("ALTER TABLE {table} ADD COLUMN IF NOT EXISTS season text");
        sqlx::query(&alter)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to add season column to \"{name}\""))?;

        let update = format!(
            "UPDATE {table} SET season = s.name FROM {seasons} s WHERE {table}.season_id = s.id",
            seasons = quote_ident("Seasons"),
        );
        sqlx::query(&update)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to backfill season names in \"{name}\""))?;

        Ok(())
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = $1)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create_table(&self, name: &str, columns: &[String], types: &[SqlType]) -> Result<()> {
        let ddl = create_table_sql(name, columns, types);
        debug!(%ddl, "creating table");
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to create table \"{name}\""))?;
        Ok(())
    }

    /// Add any columns the existing table does not have yet. Appending a
    /// load whose column set drifted from an earlier one must not fail.
    async fn widen_table(&self, name: &str, columns: &[String], types: &[SqlType]) -> Result<()> {
        let existing: Vec<String> = sqlx::query_scalar(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        for (column, ty) in columns.iter().zip(types) {
            if !existing.contains(column) {
                info!(table = name, column, "widening table with new column");
                let alter = format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    quote_ident(name),
                    quote_ident(column),
                    ty.ddl()
                );
                sqlx::query(&alter).execute(&self.pool).await?;
            }
        }

        Ok(())
    }

    async fn insert_rows(&self, name: &str, table: &Table, types: &[SqlType]) -> Result<u64> {
        let rows_per_chunk = (MAX_BIND_PARAMS / table.columns().len()).max(1);
        let mut written = 0u64;

        for chunk in table.rows().chunks(rows_per_chunk) {
            let sql = insert_sql(name, table.columns(), chunk.len());
            let mut query = sqlx::query(&sql);

            for row in chunk {
                for (value, ty) in row.iter().zip(types) {
                    query = match ty {
                        SqlType::Boolean => query.bind(value.as_bool()),
                        SqlType::BigInt => query.bind(value.as_i64()),
                        SqlType::Double => query.bind(value.as_f64()),
                        SqlType::Text => query.bind(text_value(value)),
                    };
                }
            }

            let result = query
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to insert into \"{name}\""))?;
            written += result.rows_affected();
        }

        Ok(written)
    }
}

/// Quote an identifier for Postgres, escaping embedded quotes
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn infer_column_types(table: &Table) -> Vec<SqlType> {
    (0..table.columns().len())
        .map(|i| infer_column_type(table.rows().iter().map(|row| &row[i])))
        .collect()
}

/// Pick the narrowest SQL type that can hold every value in the column.
/// Nulls are ignored; a column of nothing but nulls becomes text.
fn infer_column_type<'a>(values: impl Iterator<Item = &'a Value>) -> SqlType {
    let mut saw_bool = false;
    let mut saw_int = false;
    let mut saw_float = false;
    let mut saw_other = false;

    for value in values {
        match value {
            Value::Null => {}
            Value::Bool(_) => saw_bool = true,
            Value::Number(n) => {
                if n.is_i64() {
                    saw_int = true;
                } else {
                    saw_float = true;
                }
            }
            Value::String(_) | Value::Array(_) | Value::Object(_) => saw_other = true,
        }
    }

    if saw_other || (saw_bool && (saw_int || saw_float)) {
        SqlType::Text
    } else if saw_bool {
        SqlType::Boolean
    } else if saw_float {
        SqlType::Double
    } else if saw_int {
        SqlType::BigInt
    } else {
        SqlType::Text
    }
}

fn create_table_sql(name: &str, columns: &[String], types: &[SqlType]) -> String {
    let cols = columns
        .iter()
        .zip(types)
        .map(|(column, ty)| format!("{} {}", quote_ident(column), ty.ddl()))
        .collect::<Vec<_>>()
        .join(", ");

    format!("CREATE TABLE {} ({})", quote_ident(name), cols)
}

fn insert_sql(name: &str, columns: &[String], rows: usize) -> String {
    let cols = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");

    let values = (0..rows)
        .map(|row| {
            let placeholders = (0..columns.len())
                .map(|col| format!("${}", row * columns.len() + col + 1))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({placeholders})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {} ({}) VALUES {}", quote_ident(name), cols, values)
}

/// Text representation of a value bound into a text column. Numbers and
/// booleans that land in a text column (mixed-type data) are stringified.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiers_are_quoted_and_escaped() {
        assert_eq!(quote_ident("Premier_League"), "\"Premier_League\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn integer_columns_become_bigint() {
        let values = [json!(1), json!(2), Value::Null];
        assert_eq!(infer_column_type(values.iter()), SqlType::BigInt);
    }

    #[test]
    fn mixed_numeric_columns_become_double() {
        let values = [json!(1), json!(2.5)];
        assert_eq!(infer_column_type(values.iter()), SqlType::Double);
    }

    #[test]
    fn boolean_columns_become_boolean() {
        let values = [json!(true), Value::Null, json!(false)];
        assert_eq!(infer_column_type(values.iter()), SqlType::Boolean);
    }

    #[test]
    fn strings_and_mixed_types_fall_back_to_text() {
        assert_eq!(infer_column_type([json!("x")].iter()), SqlType::Text);
        assert_eq!(infer_column_type([json!(true), json!(1)].iter()), SqlType::Text);
        assert_eq!(infer_column_type([Value::Null].iter()), SqlType::Text);
    }

    #[test]
    fn create_table_sql_types_every_column() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let types = vec![SqlType::BigInt, SqlType::Text];

        assert_eq!(
            create_table_sql("Leagues", &columns, &types),
            "CREATE TABLE \"Leagues\" (\"id\" bigint, \"name\" text)"
        );
    }

    #[test]
    fn insert_sql_numbers_placeholders_across_rows() {
        let columns = vec!["id".to_string(), "name".to_string()];

        assert_eq!(
            insert_sql("Leagues", &columns, 2),
            "INSERT INTO \"Leagues\" (\"id\", \"name\") VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn text_values_stringify_non_strings() {
        assert_eq!(text_value(&Value::Null), None);
        assert_eq!(text_value(&json!("x")), Some("x".to_string()));
        assert_eq!(text_value(&json!(2.5)), Some("2.5".to_string()));
        assert_eq!(text_value(&json!(true)), Some("true".to_string()));
    }

    #[test]
    fn column_types_infer_per_column() {
        let records = vec![
            json!({ "id": 1, "name": "Arsenal", "winner": true }),
            json!({ "id": 2, "name": "Chelsea", "winner": null }),
        ];
        let table = Table::from_records(&records).unwrap();

        assert_eq!(
            infer_column_types(&table),
            vec![SqlType::BigInt, SqlType::Text, SqlType::Boolean]
        );
    }
}
