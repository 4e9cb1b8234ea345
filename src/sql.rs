//! SQL rendering of operator trees.
//!
//! An operator tree compiles into a boolean SQL condition with named bind
//! parameters (`:name`) plus the map of values to bind:
//!
//! ```
//! use querymatch::{compile, parse_filter, Scalar};
//! use serde_json::json;
//!
//! let filter = parse_filter(&json!({"num": {"$gt": 42}})).unwrap();
//! let query = compile(&filter).unwrap();
//!
//! assert_eq!(query.text, "num > :num0");
//! assert_eq!(query.params["num0"], Scalar::Integer(42));
//! ```
//!
//! Field names are written into the SQL text verbatim; only values are
//! bound. Callers must not pass untrusted field names.
//!
//! # Parameter names
//!
//! Every field gets a stem made of its ASCII letters and digits, followed by
//! a per-field counter: `num0`, `num1`, ... A stem ending in a digit is
//! separated from the counter by `_` (`ab1_0`), so names stay unique. Such
//! fields get `col1_0` rather than a plain `col10`; the names of every other
//! field are exactly `<stem><counter>`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::LazyLock,
};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::{
    ast::{Keyword, Operator},
    parser::DEFAULT_MAX_DEPTH,
    value::Scalar,
};

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z0-9]").expect("static pattern is valid"));

/// Always-true and always-false conditions, used where a construct has
/// nothing to render.
const TRUE_CONDITION: &str = "1 = 1";
const FALSE_CONDITION: &str = "1 = 0";

/// A compiled SQL condition.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    /// Boolean SQL expression with `:name` placeholders
    pub text: String,
    /// Values for every placeholder in `text`, keyed without the colon
    pub params: BTreeMap<String, Scalar>,
}

/// Errors raised while compiling an operator tree to SQL.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Tree nests deeper than the configured limit
    #[error("max depth of {max_depth} exceeded")]
    DepthExceeded { max_depth: usize },

    /// A value operator with no enclosing field binding
    #[error("'{0}' has no field to compare against")]
    MissingFieldContext(Keyword),

    /// A field binding beneath another field binding
    #[error("field '{inner}' is bound inside field '{outer}'")]
    NestedField { outer: String, inner: String },
}

/// Parameter naming state for one compilation.
///
/// Maps each field to a cleaned, collision-free stem and counts the
/// parameters already bound per field. A context must not be shared
/// between compilations that run concurrently; reusing one across
/// sequential compilations keeps parameter names unique across all of them.
#[derive(Debug, Default)]
pub struct BuilderContext {
    stems: HashMap<String, String>,
    counters: HashMap<String, usize>,
}

impl BuilderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the parameter stem for a field, assigning one on first use.
    pub fn stem(&mut self, field: &str) -> String {
        if let Some(stem) = self.stems.get(field) {
            return stem.clone();
        }

        let mut stem = NON_ALPHANUMERIC.replace_all(field, "").into_owned();

        if stem.is_empty() {
            stem = format!("p{}n", self.stems.len());
        }

        // parameter names cannot start with a digit
        if stem.starts_with(|c: char| c.is_ascii_digit()) {
            stem.insert(0, 'a');
        }

        if self.is_taken(&stem) {
            let mut suffix = self.stems.len();
            while self.is_taken(&format!("{stem}{suffix}")) {
                suffix += 1;
            }
            stem = format!("{stem}{suffix}");
        }

        self.stems.insert(field.to_string(), stem.clone());
        stem
    }

    fn is_taken(&self, stem: &str) -> bool {
        self.stems.values().any(|taken| taken == stem)
    }

    /// Returns the next unused parameter name for a field.
    pub fn next_param(&mut self, field: &str) -> String {
        let stem = self.stem(field);
        let counter = self.counters.entry(field.to_string()).or_insert(0);

        let name = if stem.ends_with(|c: char| c.is_ascii_digit()) {
            format!("{stem}_{counter}")
        } else {
            format!("{stem}{counter}")
        };
        *counter += 1;
        name
    }
}

/// SQL text together with whether it is enclosed in one outer pair of
/// parentheses.
struct Fragment {
    text: String,
    wrapped: bool,
}

impl Fragment {
    fn bare(text: String) -> Self {
        Fragment {
            text,
            wrapped: false,
        }
    }

    fn wrapped(text: String) -> Self {
        Fragment {
            text,
            wrapped: true,
        }
    }

    fn negated(self) -> Self {
        let text = if self.wrapped {
            format!("not {}", self.text)
        } else {
            format!("not ({})", self.text)
        };
        Fragment::bare(text)
    }
}

#[derive(Debug, Clone, Copy)]
enum Connective {
    And,
    Or,
}

impl Connective {
    fn separator(self) -> &'static str {
        match self {
            Connective::And => " AND ",
            Connective::Or => " OR ",
        }
    }

    /// Condition equivalent to joining zero children.
    fn identity(self) -> &'static str {
        match self {
            Connective::And => TRUE_CONDITION,
            Connective::Or => FALSE_CONDITION,
        }
    }
}

/// Walks operator trees and renders them, binding parameters into one map.
pub struct Compiler<'c> {
    ctx: &'c mut BuilderContext,
    params: BTreeMap<String, Scalar>,
    max_depth: usize,
}

/// Compiles top-level operators into one SQL condition with the default
/// nesting limit.
pub fn compile(operators: &[Operator]) -> Result<SqlQuery, CompileError> {
    compile_with_depth(operators, DEFAULT_MAX_DEPTH)
}

/// Compiles top-level operators into one SQL condition, failing once the
/// tree nests deeper than `max_depth`.
pub fn compile_with_depth(operators: &[Operator], max_depth: usize) -> Result<SqlQuery, CompileError> {
    let mut ctx = BuilderContext::new();
    Compiler::new(&mut ctx, max_depth).compile(operators)
}

impl<'c> Compiler<'c> {
    pub fn new(ctx: &'c mut BuilderContext, max_depth: usize) -> Self {
        Compiler {
            ctx,
            params: BTreeMap::new(),
            max_depth,
        }
    }

    /// Joins the fragments of all operators with `AND`, parenthesizing each
    /// one when there is more than one.
    ///
    /// No operators compile to an always-true condition.
    pub fn compile(mut self, operators: &[Operator]) -> Result<SqlQuery, CompileError> {
        let fragments = operators
            .iter()
            .map(|operator| self.fragment(operator, None, 0))
            .collect::<Result<Vec<_>, _>>()?;

        let text = match fragments.as_slice() {
            [] => TRUE_CONDITION.to_string(),
            [single] => single.text.clone(),
            many => many
                .iter()
                .map(|fragment| format!("({})", fragment.text))
                .collect::<Vec<_>>()
                .join(Connective::And.separator()),
        };

        debug!(
            fragments = fragments.len(),
            params = self.params.len(),
            "compiled filter to sql"
        );

        Ok(SqlQuery {
            text,
            params: self.params,
        })
    }

    fn fragment(
        &mut self,
        operator: &Operator,
        field: Option<&str>,
        depth: usize,
    ) -> Result<Fragment, CompileError> {
        if depth > self.max_depth {
            return Err(CompileError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }

        match operator {
            Operator::Field { key, operator } => match field {
                None => self.fragment(operator, Some(key.as_str()), depth + 1),
                Some(outer) => Err(CompileError::NestedField {
                    outer: outer.to_string(),
                    inner: key.clone(),
                }),
            },
            Operator::Eq(operand) => self.comparison(field, Keyword::Eq, "=", operand),
            Operator::Gt(operand) => self.comparison(field, Keyword::Gt, ">", operand),
            Operator::Gte(operand) => self.comparison(field, Keyword::Gte, ">=", operand),
            Operator::Lt(operand) => self.comparison(field, Keyword::Lt, "<", operand),
            Operator::Lte(operand) => self.comparison(field, Keyword::Lte, "<=", operand),
            Operator::Ne(operand) => self.comparison(field, Keyword::Ne, "<>", operand),
            Operator::In(operands) => {
                self.membership(field, Keyword::In, "IN", FALSE_CONDITION, operands)
            }
            Operator::NotIn(operands) => {
                self.membership(field, Keyword::Nin, "NOT IN", TRUE_CONDITION, operands)
            }
            Operator::Exists(expected) => existence(field, *expected),
            Operator::And(children) => self.logical(Connective::And, children, field, depth),
            Operator::Or(children) => self.logical(Connective::Or, children, field, depth),
            // no NOR keyword in generic SQL
            Operator::Nor(children) => Ok(self
                .logical(Connective::Or, children, field, depth)?
                .negated()),
            Operator::Not(child) => Ok(self.fragment(child, field, depth + 1)?.negated()),
        }
    }

    fn comparison(
        &mut self,
        field: Option<&str>,
        keyword: Keyword,
        sql_operator: &str,
        operand: &Scalar,
    ) -> Result<Fragment, CompileError> {
        let field = field.ok_or(CompileError::MissingFieldContext(keyword))?;
        let param = self.bind(field, operand);
        Ok(Fragment::bare(format!("{field} {sql_operator} :{param}")))
    }

    fn membership(
        &mut self,
        field: Option<&str>,
        keyword: Keyword,
        sql_operator: &str,
        when_empty: &str,
        operands: &[Scalar],
    ) -> Result<Fragment, CompileError> {
        let field = field.ok_or(CompileError::MissingFieldContext(keyword))?;

        if operands.is_empty() {
            return Ok(Fragment::bare(when_empty.to_string()));
        }

        let params = operands
            .iter()
            .map(|operand| format!(":{}", self.bind(field, operand)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Fragment::bare(format!("{field} {sql_operator} ({params})")))
    }

    fn logical(
        &mut self,
        connective: Connective,
        children: &[Operator],
        field: Option<&str>,
        depth: usize,
    ) -> Result<Fragment, CompileError> {
        if children.is_empty() {
            return Ok(Fragment::bare(connective.identity().to_string()));
        }

        let parts = children
            .iter()
            .map(|child| {
                self.fragment(child, field, depth + 1)
                    .map(|fragment| format!("({})", fragment.text))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let text = parts.join(connective.separator());
        if parts.len() > 1 {
            Ok(Fragment::wrapped(format!("({text})")))
        } else {
            Ok(Fragment::wrapped(text))
        }
    }

    fn bind(&mut self, field: &str, operand: &Scalar) -> String {
        let name = self.ctx.next_param(field);
        self.params.insert(name.clone(), operand.clone());
        name
    }
}

fn existence(field: Option<&str>, expected: bool) -> Result<Fragment, CompileError> {
    let field = field.ok_or(CompileError::MissingFieldContext(Keyword::Exists))?;
    let test = if expected { "IS NOT NULL" } else { "IS NULL" };
    Ok(Fragment::bare(format!("{field} {test}")))
}
