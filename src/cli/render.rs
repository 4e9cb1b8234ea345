//! Render a filter as a parameterized SQL condition

use super::{CliError, load_filter};
use crate::{DEFAULT_MAX_DEPTH, SqlQuery, compile_with_depth};

/// Options for the sql command
#[derive(Debug, Clone)]
pub struct SqlOptions {
    /// The filter document, as JSON text
    pub filter: String,
    /// Nesting limit for both deserialization and compilation
    pub max_depth: usize,
}

impl Default for SqlOptions {
    fn default() -> Self {
        SqlOptions {
            filter: String::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Compiles the filter to SQL
pub fn execute_sql(options: &SqlOptions) -> Result<SqlQuery, CliError> {
    let operators = load_filter(&options.filter, options.max_depth)?;
    Ok(compile_with_depth(&operators, options.max_depth)?)
}
