//! Raw query execution with JSON-shaped results.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;
use tracing::debug;

use crate::{DbError, DbHandle};

/// Execute arbitrary SQL and return the rows as a JSON array of objects.
pub async fn run_query(handle: &DbHandle, sql: &str) -> Result<Value, DbError> {
    let client = handle.connect().await?;

    debug!(sql, "executing query");
    let rows = client
        .query(sql, &[])
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;

    Ok(Value::Array(rows.iter().map(row_to_json).collect()))
}

/// Convert one row into a JSON object keyed by column name.
pub fn row_to_json(row: &Row) -> Value {
    let mut object = serde_json::Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), cell_to_json(row, idx));
    }
    Value::Object(object)
}

/// Decode a single cell by its declared type. Types without a mapping
/// fall back to a text read, then to null.
fn cell_to_json(row: &Row, idx: usize) -> Value {
    let type_name = row.columns()[idx].type_().name();
    match type_name {
        "bool" => opt(row.try_get::<_, Option<bool>>(idx)),
        "int2" => opt(row.try_get::<_, Option<i16>>(idx)),
        "int4" => opt(row.try_get::<_, Option<i32>>(idx)),
        "int8" => opt(row.try_get::<_, Option<i64>>(idx)),
        "float4" => opt(row.try_get::<_, Option<f32>>(idx)),
        "float8" => opt(row.try_get::<_, Option<f64>>(idx)),
        "text" | "varchar" | "bpchar" | "name" => opt(row.try_get::<_, Option<String>>(idx)),
        "json" | "jsonb" => row
            .try_get::<_, Option<Value>>(idx)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),
        "uuid" => row
            .try_get::<_, Option<uuid::Uuid>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),
        "date" => row
            .try_get::<_, Option<NaiveDate>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        // Enums and anything else text-like; otherwise give up on the cell.
        _ => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

fn opt<T: Into<Value>>(cell: Result<Option<T>, tokio_postgres::Error>) -> Value {
    cell.ok()
        .flatten()
        .map(Into::into)
        .unwrap_or(Value::Null)
}
