use crate::{
    parameters::{self, Parameter, ParameterType},
    result::{CatalogueError, Result},
};
use std::str::FromStr;

/// Represents a parsed SQL query with parameters
#[derive(Debug, Clone)]
pub struct QueryDef {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    /// Columns to read from each row, in print order. Empty for writes.
    pub returns: Vec<String>,
}

impl QueryDef {
    /// Create a new QueryDef from SQL string and an optional args object, parsing parameters
    pub fn from_sql(
        sql: &str,
        args: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Self> {
        Self::check_transaction_keywords(sql)?;

        let mut parameters = parameters::parse_parameters_with_quotes(sql);
        if let Some(args) = args {
            for param in &mut parameters {
                if let Some(arg_def) = args.get(&param.name) {
                    Self::parse_parameter_type(param, arg_def)?;
                }
            }
        }

        Ok(QueryDef {
            sql: sql.to_string(),
            parameters,
            returns: Vec::new(),
        })
    }

    /// A definition with `returns` produces rows; anything else reports affected rows
    pub fn is_read(&self) -> bool {
        !self.returns.is_empty()
    }

    fn check_transaction_keywords(sql: &str) -> Result<()> {
        let got = "Query contains BEGIN, COMMIT, ROLLBACK, SAVEPOINT, START TRANSACTION, or END TRANSACTION";
        if parameters::contains_transaction_keywords(sql) {
            let expected = "SQL without explicit transaction keywords";
            Err(CatalogueError::new_parameter_type_mismatch(expected, got))
        } else {
            Ok(())
        }
    }

    fn parse_parameter_type(param: &mut Parameter, arg_def: &serde_json::Value) -> Result<()> {
        if let Some(type_val) = arg_def.get("type") {
            let type_str = type_val.as_str().ok_or_else(|| {
                CatalogueError::new_parameter_type_mismatch("string type name", type_val.to_string())
            })?;
            param.param_type = ParameterType::from_str(type_str)?;
        }
        Ok(())
    }
}
