use crate::QueryDef;
use crate::result::CatalogueError;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Definitions of every statement the catalogue runner knows, compiled into the binary
pub const CATALOGUE_QUERIES_JSON: &str = include_str!("../../queries/catalogue.json");

/// Collection of parsed SQL query definitions loaded from JSON configuration
#[derive(Debug, Clone)]
pub struct QueryDefinitions {
    /// Named query definitions keyed by their identifying name
    pub definitions: HashMap<String, QueryDef>,
}

impl QueryDefinitions {
    /// Load the ticket catalogue definitions shipped with the crate
    pub fn catalogue() -> anyhow::Result<Self> {
        let json: serde_json::Value = serde_json::from_str(CATALOGUE_QUERIES_JSON)?;
        Self::from_json(json)
    }

    /// Load query definitions from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Self::from_json(json)
    }

    /// Load query definitions from a serde_json::Value object
    pub fn from_json(json: serde_json::Value) -> anyhow::Result<Self> {
        let json_map = match json.as_object() {
            Some(map) => map,
            None => {
                let expected = "object";
                let got = json.to_string();
                let err = CatalogueError::new_parameter_type_mismatch(expected, got);
                return Err(err.into());
            }
        };

        let mut definitions = HashMap::new();
        for (name, value) in json_map {
            let map = value.as_object().ok_or_else(|| {
                let expected = "object";
                let got = format!("{name}: {value}");
                CatalogueError::new_parameter_type_mismatch(expected, got)
            })?;

            let sql = map.get("query").and_then(|q| q.as_str()).ok_or_else(|| {
                let expected = "required 'query' field with string value";
                let got = format!("{name}: missing 'query' field");
                CatalogueError::new_parameter_type_mismatch(expected, got)
            })?;

            let args = map.get("args").and_then(|a| a.as_object());
            let mut query_def = QueryDef::from_sql(sql, args)?;

            if let Some(returns_val) = map.get("returns") {
                let Some(returns_array) = returns_val.as_array() else {
                    let expected = "array of strings";
                    let got = returns_val.to_string();
                    return Err(CatalogueError::new_parameter_type_mismatch(expected, got).into());
                };
                // Deduplicate but keep the declared order
                let mut seen = HashSet::new();
                query_def.returns = returns_array
                    .iter()
                    .filter_map(|v| v.as_str())
                    .filter(|item| seen.insert(*item))
                    .map(|s| s.to_string())
                    .collect();
            }

            definitions.insert(name.clone(), query_def);
        }
        Ok(QueryDefinitions { definitions })
    }

    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Result<&QueryDef, CatalogueError> {
        self.definitions
            .get(name)
            .ok_or_else(|| CatalogueError::new_query_not_found(name))
    }
}
