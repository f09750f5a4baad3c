use crate::{
    QueryDefinitions,
    parameters::{self, ParameterValue},
    query::QueryDef,
    result::QueryResult,
};
use rusqlite::Connection;

// Implement trait for converting generic ParameterValue to SQLite-specific ToSql
impl From<ParameterValue> for Box<dyn rusqlite::ToSql> {
    fn from(param_value: ParameterValue) -> Self {
        match param_value {
            ParameterValue::String(s) => Box::new(s),
            ParameterValue::Integer(i) => Box::new(i),
            ParameterValue::Float(f) => Box::new(f),
            ParameterValue::Boolean(b) => Box::new(b as i32), // SQLite represents booleans as integers
            ParameterValue::Date(d) => Box::new(d),           // stored as YYYY-MM-DD text
        }
    }
}

/// SQL with `?N` placeholders and the matching SQLite values
struct PreparedStatement {
    sql: String,
    params: Vec<Box<dyn rusqlite::ToSql>>,
}

fn prepare_statement_sqlite(
    query: &QueryDef,
    request_params_obj: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<PreparedStatement> {
    let generic_statement = parameters::prepare_statement(
        &query.sql,
        &query.parameters,
        request_params_obj,
        &|idx| format!("?{idx}"),
    )?;

    Ok(PreparedStatement {
        sql: generic_statement.sql,
        params: generic_statement
            .values
            .into_iter()
            .map(Into::into)
            .collect(),
    })
}

/// Convert one SQLite column value to JSON
pub fn value_ref_to_json(value: rusqlite::types::ValueRef<'_>) -> serde_json::Value {
    match value {
        rusqlite::types::ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        rusqlite::types::ValueRef::Real(r) => serde_json::Value::from(r),
        rusqlite::types::ValueRef::Text(s) => {
            serde_json::Value::String(String::from_utf8_lossy(s).to_string())
        }
        rusqlite::types::ValueRef::Blob(b) => serde_json::Value::Array(
            b.iter()
                .map(|&byte| serde_json::Value::Number(byte.into()))
                .collect(),
        ),
        rusqlite::types::ValueRef::Null => serde_json::Value::Null,
    }
}

fn request_object(
    request_params: &serde_json::Value,
) -> anyhow::Result<&serde_json::Map<String, serde_json::Value>> {
    request_params.as_object().ok_or_else(|| {
        crate::CatalogueError::new_parameter_type_mismatch("object", request_params.to_string())
            .into()
    })
}

/// Run a read query, handing each row to `on_row` as soon as it is fetched.
/// The returned result carries the executed SQL and the number of rows streamed.
pub fn query_each_sqlite(
    conn: &Connection,
    queries: &QueryDefinitions,
    query_name: &str,
    request_params: &serde_json::Value,
    on_row: &mut dyn FnMut(serde_json::Value) -> anyhow::Result<()>,
) -> anyhow::Result<QueryResult> {
    let query = queries.get(query_name)?;
    let prepared = prepare_statement_sqlite(query, request_object(request_params)?)?;
    let mut stmt = conn.prepare(&prepared.sql)?;

    // Resolve each returned field to its column position once, before reading rows
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let positions: Vec<Option<usize>> = query
        .returns
        .iter()
        .map(|field| column_names.iter().position(|name| name == field))
        .collect();

    let mut rows = stmt.query(rusqlite::params_from_iter(prepared.params.iter()))?;
    let mut count = 0u64;
    while let Some(row) = rows.next()? {
        let mut obj = serde_json::Map::new();
        for (field_name, position) in query.returns.iter().zip(&positions) {
            let value = match position {
                Some(idx) => value_ref_to_json(row.get_ref(*idx)?),
                None => serde_json::Value::Null,
            };
            obj.insert(field_name.clone(), value);
        }
        on_row(serde_json::Value::Object(obj))?;
        count += 1;
    }

    Ok(QueryResult {
        sql_statement: prepared.sql,
        data: vec![],
        rows_affected: count,
    })
}

/// Run a write query (INSERT/UPDATE/DELETE) in autocommit mode and report affected rows
pub fn execute_sqlite(
    conn: &Connection,
    queries: &QueryDefinitions,
    query_name: &str,
    request_params: &serde_json::Value,
) -> anyhow::Result<QueryResult> {
    let query = queries.get(query_name)?;
    let prepared = prepare_statement_sqlite(query, request_object(request_params)?)?;
    let mut stmt = conn.prepare(&prepared.sql)?;
    let affected = stmt.execute(rusqlite::params_from_iter(prepared.params.iter()))?;

    Ok(QueryResult {
        sql_statement: prepared.sql,
        data: vec![],
        rows_affected: affected as u64,
    })
}

/// Execute queries with SQLite backend.
/// Reads collect their rows into `data`; writes report `rows_affected`.
pub fn query_run_sqlite(
    conn: &Connection,
    queries: &QueryDefinitions,
    query_name: &str,
    request_params: &serde_json::Value,
) -> anyhow::Result<QueryResult> {
    if queries.get(query_name)?.is_read() {
        let mut data = Vec::new();
        let mut result = query_each_sqlite(conn, queries, query_name, request_params, &mut |row| {
            data.push(row);
            Ok(())
        })?;
        result.data = data;
        Ok(result)
    } else {
        execute_sqlite(conn, queries, query_name, request_params)
    }
}
