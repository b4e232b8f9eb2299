use rusqlite::types::Value;
use rusqlite::{Statement, params_from_iter};

use crate::error::SqlMapError;
use crate::results::Execution;
use crate::translation::command_tag;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlMapError` if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, SqlMapError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Buffer every row a row-producing statement returns.
///
/// # Errors
/// Returns `SqlMapError::SqliteError` if stepping the statement fails.
pub fn build_execution(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<Execution, SqlMapError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut execution = Execution::with_capacity(10);
    execution.set_column_names(column_names);

    let mut rows_iter = stmt.query(params_from_iter(params.iter()))?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        execution.add_row_values(row_values);
    }

    let rowcount = i64::try_from(execution.row_len()).unwrap_or(i64::MAX);
    execution.set_rowcount(rowcount);
    Ok(execution)
}

/// Prepare and run one statement.
///
/// Row-producing statements (`SELECT`, `... RETURNING`) are buffered and report the number of
/// rows returned; everything else reports the rows it changed.
///
/// # Errors
/// Returns `SqlMapError::SqliteError` if preparing or executing fails.
pub fn run_statement(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[Value],
) -> Result<Execution, SqlMapError> {
    let mut stmt = conn.prepare(sql)?;
    let mut execution = if stmt.column_count() > 0 {
        build_execution(&mut stmt, params)?
    } else {
        let affected = stmt.execute(params_from_iter(params.iter()))?;
        let mut execution = Execution::with_capacity(0);
        execution.set_rowcount(i64::try_from(affected).unwrap_or(i64::MAX));
        execution
    };
    execution.set_status_message(command_tag(sql, execution.rowcount()));
    Ok(execution)
}
