use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tokio_postgres::{Client, Row, Statement};

use crate::error::SqlMapError;
use crate::results::Execution;
use crate::translation::command_tag;
use crate::types::RowValues;

use super::params::Params;

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `SqlMapError` if the column cannot be decoded.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, SqlMapError> {
    let type_info = row.columns()[idx].type_();

    match type_info.name() {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Int))
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Float))
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Bool))
        }
        "timestamp" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Timestamp))
        }
        "timestamptz" => {
            let val: Option<DateTime<Utc>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| {
                RowValues::Timestamp(v.and_time(NaiveTime::MIN))
            }))
        }
        "json" | "jsonb" => {
            let val: Option<Value> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string())))
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Blob))
        }
        other => {
            // text, varchar, bpchar, name and anything else that decodes as a string
            let val: Option<String> = row.try_get(idx).map_err(|e| {
                SqlMapError::ExecutionError(format!("unsupported postgres column type {other}: {e}"))
            })?;
            Ok(val.map_or(RowValues::Null, RowValues::Text))
        }
    }
}

/// Build an execution using statement metadata for column names.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_execution_from_statement(
    stmt: &Statement,
    rows: &[Row],
) -> Result<Execution, SqlMapError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut execution = Execution::with_capacity(rows.len());
    execution.set_column_names(column_names);

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        execution.add_row_values(row_values);
    }
    execution.set_rowcount(i64::try_from(rows.len()).unwrap_or(i64::MAX));
    Ok(execution)
}

/// Prepare and run one statement on `client`.
///
/// # Errors
/// Returns `SqlMapError::PostgresError` if preparing or executing fails.
pub async fn run_statement(
    client: &Client,
    sql: &str,
    params: &Params<'_>,
) -> Result<Execution, SqlMapError> {
    let stmt = client.prepare(sql).await?;
    let mut execution = if stmt.columns().is_empty() {
        let affected = client.execute(&stmt, params.as_refs()).await?;
        let mut execution = Execution::with_capacity(0);
        execution.set_rowcount(i64::try_from(affected).unwrap_or(i64::MAX));
        execution
    } else {
        let rows = client.query(&stmt, params.as_refs()).await?;
        build_execution_from_statement(&stmt, &rows)?
    };
    execution.set_status_message(command_tag(sql, execution.rowcount()));
    Ok(execution)
}
