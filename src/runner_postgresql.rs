use crate::{
    CatalogueError, QueryDefinitions,
    parameters::{self, ParameterValue},
    query::QueryDef,
    result::QueryResult,
};
use futures::TryStreamExt;
use tokio_postgres::Client;
use tokio_postgres::types::ToSql;

// PostgreSQL type OIDs for the column types the catalogue uses
const POSTGRES_TYPE_OID_BOOL: u32 = 16;
const POSTGRES_TYPE_OID_BYTEA: u32 = 17;
const POSTGRES_TYPE_OID_INT2: u32 = 21;
const POSTGRES_TYPE_OID_INT4: u32 = 23;
const POSTGRES_TYPE_OID_INT8: u32 = 20;
const POSTGRES_TYPE_OID_FLOAT4: u32 = 700;
const POSTGRES_TYPE_OID_FLOAT8: u32 = 701;
const POSTGRES_TYPE_OID_TEXT: u32 = 25;
const POSTGRES_TYPE_OID_VARCHAR: u32 = 1043;
const POSTGRES_TYPE_OID_BPCHAR: u32 = 1042;
const POSTGRES_TYPE_OID_DATE: u32 = 1082;
const POSTGRES_TYPE_OID_TIMESTAMP: u32 = 1114;
const POSTGRES_TYPE_OID_TIMESTAMPTZ: u32 = 1184;
const POSTGRES_TYPE_OID_JSON: u32 = 114;
const POSTGRES_TYPE_OID_JSONB: u32 = 3802;

/// Convert a generic ParameterValue directly to PostgreSQL ToSql trait object.
/// Integers bind as INT4 to match the catalogue's INTEGER columns.
fn parameter_value_to_postgresql_tosql(
    param_value: ParameterValue,
) -> Result<Box<dyn ToSql + Sync>, CatalogueError> {
    let boxed: Box<dyn ToSql + Sync> = match param_value {
        ParameterValue::String(s) => Box::new(s),
        ParameterValue::Integer(i) => {
            let value = i32::try_from(i).map_err(|_| {
                CatalogueError::new_parameter_type_mismatch("integer (32-bit)", i.to_string())
            })?;
            Box::new(value)
        }
        ParameterValue::Float(f) => Box::new(f),
        ParameterValue::Boolean(b) => Box::new(b),
        ParameterValue::Date(d) => Box::new(d),
    };
    Ok(boxed)
}

// Prepared statement with PostgreSQL positional parameters ($1, $2, ...)
struct PreparedStatement {
    sql: String,
    params: Vec<Box<dyn ToSql + Sync>>,
}

impl PreparedStatement {
    fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

fn prepare_statement_postgresql(
    query: &QueryDef,
    request_params_obj: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<PreparedStatement> {
    let generic_statement = parameters::prepare_statement(
        &query.sql,
        &query.parameters,
        request_params_obj,
        &|idx| format!("${idx}"),
    )?;

    Ok(PreparedStatement {
        sql: generic_statement.sql,
        params: generic_statement
            .values
            .into_iter()
            .map(parameter_value_to_postgresql_tosql)
            .collect::<Result<_, _>>()?,
    })
}

fn to_json_value<T: serde::Serialize>(value: T) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(value).map_err(Into::into)
}

/// Convert a PostgreSQL column value based on the given type.
/// NULLs become JSON null; dates print as `YYYY-MM-DD`.
/// A column type with no conversion fails the row rather than printing a placeholder.
pub fn postgres_type_to_json_conversion(
    column_type: &tokio_postgres::types::Type,
    row: &tokio_postgres::Row,
    idx: usize,
) -> anyhow::Result<serde_json::Value> {
    let oid = column_type.oid();
    match oid {
        POSTGRES_TYPE_OID_BOOL => to_json_value(row.try_get::<_, Option<bool>>(idx)?),
        POSTGRES_TYPE_OID_INT2 => to_json_value(row.try_get::<_, Option<i16>>(idx)?),
        POSTGRES_TYPE_OID_INT4 => to_json_value(row.try_get::<_, Option<i32>>(idx)?),
        POSTGRES_TYPE_OID_INT8 => to_json_value(row.try_get::<_, Option<i64>>(idx)?),
        POSTGRES_TYPE_OID_FLOAT4 => to_json_value(row.try_get::<_, Option<f32>>(idx)?),
        POSTGRES_TYPE_OID_FLOAT8 => to_json_value(row.try_get::<_, Option<f64>>(idx)?),
        POSTGRES_TYPE_OID_TEXT | POSTGRES_TYPE_OID_VARCHAR | POSTGRES_TYPE_OID_BPCHAR => {
            to_json_value(row.try_get::<_, Option<String>>(idx)?)
        }
        POSTGRES_TYPE_OID_DATE => {
            let val: Option<chrono::NaiveDate> = row.try_get(idx)?;
            to_json_value(val.map(|d| d.format("%Y-%m-%d").to_string()))
        }
        POSTGRES_TYPE_OID_TIMESTAMP => {
            let val: Option<chrono::NaiveDateTime> = row.try_get(idx)?;
            to_json_value(val.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()))
        }
        POSTGRES_TYPE_OID_TIMESTAMPTZ => {
            let val: Option<chrono::DateTime<chrono::Utc>> = row.try_get(idx)?;
            to_json_value(val.map(|t| t.to_rfc3339()))
        }
        POSTGRES_TYPE_OID_BYTEA => to_json_value(row.try_get::<_, Option<Vec<u8>>>(idx)?),
        POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => {
            to_json_value(row.try_get::<_, Option<serde_json::Value>>(idx)?)
        }
        _ => Err(unsupported_column_type(column_type)),
    }
}

fn unsupported_column_type(column_type: &tokio_postgres::types::Type) -> anyhow::Error {
    anyhow::anyhow!(
        "unsupported PostgreSQL column type {} (OID {}); cast it in the query",
        column_type.name(),
        column_type.oid()
    )
}

// Convert a single PostgreSQL row to a JSON object ordered by `returns`
fn row_to_json_object(
    row: &tokio_postgres::Row,
    returns: &[String],
) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    let mut obj = serde_json::Map::new();
    let columns = row.columns();

    for field_name in returns {
        let value = match columns.iter().position(|col| col.name() == field_name) {
            Some(idx) => postgres_type_to_json_conversion(columns[idx].type_(), row, idx)?,
            None => serde_json::Value::Null,
        };
        obj.insert(field_name.clone(), value);
    }

    Ok(obj)
}

fn request_object(
    request_params: &serde_json::Value,
) -> anyhow::Result<&serde_json::Map<String, serde_json::Value>> {
    request_params.as_object().ok_or_else(|| {
        CatalogueError::new_parameter_type_mismatch("object", request_params.to_string()).into()
    })
}

/// Run a read query, streaming rows from the server and handing each one to `on_row`
pub async fn query_each_postgresql(
    client: &Client,
    queries: &QueryDefinitions,
    query_name: &str,
    request_params: &serde_json::Value,
    on_row: &mut dyn FnMut(serde_json::Value) -> anyhow::Result<()>,
) -> anyhow::Result<QueryResult> {
    let query = queries.get(query_name)?;
    let prepared = prepare_statement_postgresql(query, request_object(request_params)?)?;

    let rows = client
        .query_raw(
            prepared.sql.as_str(),
            prepared.params.iter().map(|p| p.as_ref() as &dyn ToSql),
        )
        .await?;
    futures::pin_mut!(rows);

    let mut count = 0u64;
    while let Some(row) = rows.try_next().await? {
        let obj = row_to_json_object(&row, &query.returns)?;
        on_row(serde_json::Value::Object(obj))?;
        count += 1;
    }

    Ok(QueryResult {
        sql_statement: prepared.sql,
        data: vec![],
        rows_affected: count,
    })
}

/// Run a write query in autocommit mode and report affected rows
pub async fn execute_postgresql(
    client: &Client,
    queries: &QueryDefinitions,
    query_name: &str,
    request_params: &serde_json::Value,
) -> anyhow::Result<QueryResult> {
    let query = queries.get(query_name)?;
    let prepared = prepare_statement_postgresql(query, request_object(request_params)?)?;

    let affected = client
        .execute(prepared.sql.as_str(), &prepared.param_refs())
        .await?;

    Ok(QueryResult {
        sql_statement: prepared.sql,
        data: vec![],
        rows_affected: affected,
    })
}

/// Execute queries with PostgreSQL backend.
/// Reads collect their rows into `data`; writes report `rows_affected`.
pub async fn query_run_postgresql(
    client: &Client,
    queries: &QueryDefinitions,
    query_name: &str,
    request_params: &serde_json::Value,
) -> anyhow::Result<QueryResult> {
    if queries.get(query_name)?.is_read() {
        let mut data = Vec::new();
        let mut result = query_each_postgresql(client, queries, query_name, request_params, &mut |row| {
            data.push(row);
            Ok(())
        })
        .await?;
        result.data = data;
        Ok(result)
    } else {
        execute_postgresql(client, queries, query_name, request_params).await
    }
}
