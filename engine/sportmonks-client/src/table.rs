//! Flat tabular view of API responses
//!
//! Fixture and reference payloads are trees of JSON objects; the database
//! loader wants rows and columns. A [`Table`] flattens nested objects into
//! dot-separated column paths (`localTeam.name`, `scores.ft_score`), takes
//! the union of columns across records, and pads absent values with null.
//!
//! Records that contain arrays below the root cannot be represented as one
//! row each and are rejected; strip or reshape those includes first.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A column-ordered flat table of JSON scalars
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Flatten a response payload: a single record or a list of records.
    pub fn from_response(response: &Value) -> Result<Self> {
        match response {
            Value::Object(_) => Self::from_records(std::slice::from_ref(response)),
            Value::Array(records) => Self::from_records(records),
            other => Err(Error::UnexpectedResponse(format!(
                "cannot tabulate a {}",
                type_name(other)
            ))),
        }
    }

    /// Flatten a list of record objects into one row each.
    ///
    /// Columns are ordered by first appearance; a record missing a column
    /// another record has gets null there.
    pub fn from_records(records: &[Value]) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut flattened: Vec<Vec<(usize, Value)>> = Vec::with_capacity(records.len());

        for record in records {
            let Value::Object(map) = record else {
                return Err(Error::UnexpectedResponse(format!(
                    "record is a {}, not an object",
                    type_name(record)
                )));
            };

            let mut row = Vec::with_capacity(map.len());
            let mut path = String::new();
            flatten_object(map, &mut path, &mut |column, value| {
                let slot = *index.entry(column.to_string()).or_insert_with(|| {
                    columns.push(column.to_string());
                    columns.len() - 1
                });
                row.push((slot, value.clone()));
            })?;
            flattened.push(row);
        }

        let rows = flattened
            .into_iter()
            .map(|sparse| {
                let mut row = vec![Value::Null; columns.len()];
                for (slot, value) in sparse {
                    row[slot] = value;
                }
                row
            })
            .collect();

        Ok(Table { columns, rows })
    }

    /// Column names, in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows, aligned to [`Table::columns`]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Keep only the named columns, in the given order.
    ///
    /// A requested column the data never had comes back all-null rather
    /// than failing the load.
    pub fn select(&self, names: &[String]) -> Table {
        let slots: Vec<Option<usize>> =
            names.iter().map(|name| self.column_index(name)).collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                slots
                    .iter()
                    .map(|slot| slot.map_or(Value::Null, |i| row[i].clone()))
                    .collect()
            })
            .collect();

        Table { columns: names.to_vec(), rows }
    }

    /// Rename columns according to a `(from, to)` map; names not present
    /// are ignored.
    pub fn rename(&mut self, renames: &[(String, String)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = renames.iter().find(|(from, _)| from == column) {
                *column = to.clone();
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Walk an object depth-first, emitting `(dotted.path, scalar)` pairs.
fn flatten_object(
    map: &Map<String, Value>,
    path: &mut String,
    emit: &mut impl FnMut(&str, &Value),
) -> Result<()> {
    for (key, value) in map {
        let saved = path.len();
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(key);

        match value {
            Value::Object(inner) => flatten_object(inner, path, emit)?,
            Value::Array(_) => return Err(Error::NotTabular),
            scalar => emit(path, scalar),
        }

        path.truncate(saved);
    }

    Ok(())
}
