use crate::{
    result::{CatalogueError, Result},
    str_utils::is_in_quotes,
};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;
use std::str::FromStr;

// Regex compiled once as a lazy static for performance
pub static PARAMETER_REGEX: once_cell::sync::Lazy<Regex> =
    once_cell::sync::Lazy::new(|| Regex::new(r"@(\w+)").unwrap());
static TRANSACTION_KEYWORD_REGEX: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
    Regex::new(r"(?i)\b(BEGIN|COMMIT|ROLLBACK|SAVEPOINT|START\s+TRANSACTION|END\s+TRANSACTION)\b")
        .unwrap()
});

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parameter type enums for database operations
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterType {
    Integer,
    String,
    Float,
    Boolean,
    /// Calendar date, written as `YYYY-MM-DD` in request parameters
    Date,
}

impl FromStr for ParameterType {
    type Err = CatalogueError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "integer" => Ok(ParameterType::Integer),
            "string" => Ok(ParameterType::String),
            "float" => Ok(ParameterType::Float),
            "boolean" => Ok(ParameterType::Boolean),
            "date" => Ok(ParameterType::Date),
            _ => Err(CatalogueError::new_parameter_type_mismatch(
                "integer, string, float, boolean or date",
                s,
            )),
        }
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParameterType::Integer => "integer",
            ParameterType::String => "string",
            ParameterType::Float => "float",
            ParameterType::Boolean => "boolean",
            ParameterType::Date => "date",
        };
        write!(f, "{s}")
    }
}

/// Parameter definition for SQL queries
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

/// Database-agnostic value bound to a placeholder.
/// Each backend converts these into its own `ToSql` representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl ParameterValue {
    /// Bind a JSON request value to the declared parameter type
    pub fn from_json(value: &serde_json::Value, param_type: &ParameterType) -> Result<Self> {
        let mismatch = || CatalogueError::new_parameter_type_mismatch(param_type.to_string(), value.to_string());
        match param_type {
            ParameterType::String => value
                .as_str()
                .map(|s| ParameterValue::String(s.to_string()))
                .ok_or_else(mismatch),
            ParameterType::Integer => value
                .as_i64()
                .map(ParameterValue::Integer)
                .ok_or_else(mismatch),
            ParameterType::Float => value
                .as_f64()
                .map(ParameterValue::Float)
                .ok_or_else(mismatch),
            ParameterType::Boolean => value
                .as_bool()
                .map(ParameterValue::Boolean)
                .ok_or_else(mismatch),
            ParameterType::Date => value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
                .map(ParameterValue::Date)
                .ok_or_else(mismatch),
        }
    }
}

/// SQL with `@name` parameters rewritten to backend placeholders,
/// plus the bound values in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub sql: String,
    pub values: Vec<ParameterValue>,
}

/// Rewrite `@name` occurrences outside quotes using `placeholder_gen(index)` (1-based)
/// and bind each parameter from the request object.
/// A name used more than once reuses its first placeholder index.
pub fn prepare_statement(
    sql: &str,
    parameters: &[Parameter],
    request_params: &serde_json::Map<String, serde_json::Value>,
    placeholder_gen: &dyn Fn(usize) -> String,
) -> Result<PreparedStatement> {
    let mut prepared_sql = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut indices: HashMap<&str, usize> = HashMap::new();
    let mut last_end = 0;

    for cap in PARAMETER_REGEX.captures_iter(sql) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if is_in_quotes(sql, whole.start()) {
            continue;
        }

        let name = name.as_str();
        let index = match indices.get(name) {
            Some(&index) => index,
            None => {
                let param_def = parameters
                    .iter()
                    .find(|p| p.name == name)
                    .ok_or_else(|| CatalogueError::new_parameter_not_provided(name))?;
                let value = request_params
                    .get(name)
                    .ok_or_else(|| CatalogueError::new_parameter_not_provided(name))?;
                values.push(ParameterValue::from_json(value, &param_def.param_type)?);
                indices.insert(name, values.len());
                values.len()
            }
        };

        prepared_sql.push_str(&sql[last_end..whole.start()]);
        prepared_sql.push_str(&placeholder_gen(index));
        last_end = whole.end();
    }
    prepared_sql.push_str(&sql[last_end..]);

    Ok(PreparedStatement {
        sql: prepared_sql,
        values,
    })
}

/// Parse parameters from SQL while respecting quote boundaries.
/// Every `@param` defaults to String; "args" in the query definition may override the type.
pub fn parse_parameters_with_quotes(sql: &str) -> Vec<Parameter> {
    extract_parameters_with_regex(sql, &PARAMETER_REGEX)
        .into_iter()
        .map(|name| Parameter {
            name,
            param_type: ParameterType::String,
        })
        .collect()
}

/// Helper function to extract unique parameter names with regex, respecting quotes
/// Returns in order of first appearance in the SQL
pub fn extract_parameters_with_regex(statement: &str, regex: &Regex) -> Vec<String> {
    let mut params = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for cap in regex.captures_iter(statement) {
        if let (Some(named_match), Some(name)) = (cap.get(0), cap.get(1)) {
            if !is_in_quotes(statement, named_match.start()) && seen.insert(name.as_str()) {
                params.push(name.as_str().to_string());
            }
        }
    }

    params
}

/// Check if SQL contains transaction control keywords outside quoted literals.
/// Statements run in autocommit mode, so explicit transaction control is not allowed.
pub fn contains_transaction_keywords(sql: &str) -> bool {
    TRANSACTION_KEYWORD_REGEX
        .find_iter(sql)
        .any(|m| !is_in_quotes(sql, m.start()))
}
