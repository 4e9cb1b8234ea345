//! JSON conversion for CLI input and output

use serde_json::{Map, Value as Json};

use super::CliError;
use crate::{SqlQuery, value::type_name};

/// Unpacks a JSON array of records
pub fn records_from_json(v: Json) -> Result<Vec<Json>, CliError> {
    match v {
        Json::Array(records) => Ok(records),
        other => Err(CliError::NotAnArray(type_name(&other))),
    }
}

/// Converts a compiled query to `{"query": ..., "params": {...}}`
pub fn query_to_json(query: &SqlQuery) -> Json {
    let params: Map<String, Json> = query
        .params
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();

    let mut out = Map::new();
    out.insert("query".to_string(), Json::String(query.text.clone()));
    out.insert("params".to_string(), Json::Object(params));
    Json::Object(out)
}
