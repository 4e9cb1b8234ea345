//! Select the records of a data set that match a filter

use serde_json::Value as Json;
use tracing::debug;

use super::{CliError, load_filter, records_from_json};
use crate::{DEFAULT_MAX_DEPTH, matches};

/// Options for the match command
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// The filter document, as JSON text
    pub filter: String,
    /// JSON array of records
    pub input: Option<String>,
    /// Nesting limit for the filter
    pub max_depth: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            filter: String::new(),
            input: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Returns the records that satisfy the filter, in input order
pub fn execute_match(options: &MatchOptions) -> Result<Vec<Json>, CliError> {
    let operators = load_filter(&options.filter, options.max_depth)?;

    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let records = records_from_json(serde_json::from_str(json_str)?)?;
    let total = records.len();

    let mut selected = Vec::new();
    for record in records {
        if matches(&record, &operators)? {
            selected.push(record);
        }
    }

    debug!(total, selected = selected.len(), "filtered records");
    Ok(selected)
}
