//! CLI support for querymatch
//!
//! Provides programmatic access to the `querymatch` commands so they can be
//! embedded in other tools.

mod check;
mod convert;
mod filter;
mod render;

pub use check::{CheckOptions, execute_check};
pub use convert::{query_to_json, records_from_json};
pub use filter::{MatchOptions, execute_match};
pub use render::{SqlOptions, execute_sql};

use std::io;

use serde::Deserialize;
use serde_json::Value as Json;
use thiserror::Error;

use crate::{CompileError, EvalError, Operator, ParseError, deserialize_with_depth};

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    /// Filter document is malformed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Filter could not be evaluated against a record
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// Filter could not be rendered as SQL
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// JSON parsing error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No input provided
    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,

    /// Records were not given as an array
    #[error("Input must be a JSON array of records, got {0}")]
    NotAnArray(&'static str),
}

/// Parses filter text and deserializes the whole document.
fn load_filter(filter: &str, max_depth: usize) -> Result<Vec<Operator>, CliError> {
    let document = read_filter(filter, max_depth)?;
    let operators = deserialize_with_depth(&document, max_depth).collect::<Result<Vec<_>, _>>()?;
    Ok(operators)
}

/// Reads filter text as JSON, bounded by the filter depth limit instead of
/// serde_json's fixed one.
///
/// A filter level opens at most two brackets, its mapping and the array
/// holding it, and a list operand adds one more. Text nested deeper than
/// that can never deserialize.
fn read_filter(filter: &str, max_depth: usize) -> Result<Json, CliError> {
    let limit = max_depth.saturating_mul(2).saturating_add(2);
    if bracket_depth(filter) > limit {
        return Err(ParseError::DepthExceeded { max_depth }.into());
    }

    let mut de = serde_json::Deserializer::from_str(filter);
    de.disable_recursion_limit();
    let document = Json::deserialize(&mut de)?;
    de.end()?;
    Ok(document)
}

/// Deepest bracket nesting in JSON text, ignoring brackets inside strings.
fn bracket_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    let mut in_string = false;
    let mut escaped = false;

    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}
