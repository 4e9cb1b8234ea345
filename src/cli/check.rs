//! Validate a filter document

use super::{CliError, load_filter};
use crate::{DEFAULT_MAX_DEPTH, Operator};

/// Options for the check command
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// The filter document, as JSON text
    pub filter: String,
    /// Nesting limit for the filter
    pub max_depth: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            filter: String::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Deserializes the filter and returns its top-level operators
pub fn execute_check(options: &CheckOptions) -> Result<Vec<Operator>, CliError> {
    load_filter(&options.filter, options.max_depth)
}
