use std::cmp::Ordering;

use serde_json::{Map, Value as Json};
use thiserror::Error;
use tracing::trace;

use crate::{
    ast::{Keyword, Operator},
    value::{Scalar, type_name},
};

/// A field looked up in a record, handed to the operator bound to it.
///
/// Lives only for the evaluation of one binding.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    /// The record the field was looked up in
    pub record: &'a Map<String, Json>,
    pub key: &'a str,
    /// Whether the key is present (a present `null` counts)
    pub exists: bool,
    /// The stored value, `None` when the key is absent
    pub value: Option<&'a Json>,
}

/// What an operator is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// A bare value, e.g. the record itself at the top level
    Value(&'a Json),
    /// The value of a field, together with its presence
    Field(FieldContext<'a>),
}

impl<'a> Subject<'a> {
    /// The value comparisons look at; `None` for an absent field.
    pub fn value(&self) -> Option<&'a Json> {
        match self {
            Subject::Value(value) => Some(value),
            Subject::Field(ctx) => ctx.value,
        }
    }
}

impl<'a> From<&'a Json> for Subject<'a> {
    fn from(value: &'a Json) -> Self {
        Subject::Value(value)
    }
}

/// Errors that can occur while evaluating an operator tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Ordering between incomparable values, or a field bound on anything
    /// but a record
    #[error("Type error: {0}")]
    TypeError(String),

    /// `$exists` evaluated outside of a field binding
    #[error("Context error: {0}")]
    ContextError(String),
}

/// Checks whether a record satisfies every operator.
///
/// An empty operator list matches every record.
///
/// # Examples
///
/// ```
/// use querymatch::{matches, parse_filter};
/// use serde_json::json;
///
/// let filter = parse_filter(&json!({"num": {"$gt": 42}})).unwrap();
///
/// assert!(matches(&json!({"num": 43}), &filter).unwrap());
/// assert!(!matches(&json!({"num": 42}), &filter).unwrap());
/// ```
pub fn matches(record: &Json, operators: &[Operator]) -> Result<bool, EvalError> {
    all_hold(operators, Subject::Value(record))
}

impl Operator {
    /// Evaluates this operator against a subject.
    ///
    /// `$eq` and `$in` never match an absent field, `$ne` and `$nin` always
    /// do. Ordering operators fail on an absent field or on a value of a
    /// kind the operand cannot be ordered against.
    pub fn eval(&self, subject: Subject<'_>) -> Result<bool, EvalError> {
        match self {
            Operator::Eq(expected) => Ok(equals(subject, expected)),
            Operator::Ne(expected) => Ok(!equals(subject, expected)),
            Operator::Gt(bound) => Ok(ordering(subject, Keyword::Gt, bound)? == Ordering::Greater),
            Operator::Gte(bound) => Ok(ordering(subject, Keyword::Gte, bound)? != Ordering::Less),
            Operator::Lt(bound) => Ok(ordering(subject, Keyword::Lt, bound)? == Ordering::Less),
            Operator::Lte(bound) => Ok(ordering(subject, Keyword::Lte, bound)? != Ordering::Greater),
            Operator::In(options) => Ok(options.iter().any(|option| equals(subject, option))),
            Operator::NotIn(options) => Ok(!options.iter().any(|option| equals(subject, option))),
            Operator::Exists(expected) => match subject {
                Subject::Field(ctx) => Ok(ctx.exists == *expected),
                Subject::Value(_) => Err(EvalError::ContextError(
                    "$exists can only be used beneath a field".to_string(),
                )),
            },
            Operator::And(children) => all_hold(children, subject),
            Operator::Or(children) => any_holds(children, subject),
            Operator::Nor(children) => Ok(!any_holds(children, subject)?),
            Operator::Not(child) => Ok(!child.eval(subject)?),
            Operator::Field { key, operator } => bind(key, operator, subject),
        }
    }
}

/// Evaluates `operator` against the value stored under `key`.
///
/// Only a bare record can be bound: a field binding beneath another one is a
/// type error, as is a record that is not an object.
fn bind(key: &str, operator: &Operator, subject: Subject<'_>) -> Result<bool, EvalError> {
    let record = match subject {
        Subject::Value(Json::Object(record)) => record,
        Subject::Value(other) => {
            return Err(EvalError::TypeError(format!(
                "Cannot look up field '{key}' on {}; only objects have fields",
                type_name(other)
            )));
        }
        Subject::Field(outer) => {
            return Err(EvalError::TypeError(format!(
                "Cannot bind field '{key}' inside field '{}'",
                outer.key
            )));
        }
    };

    let value = record.get(key);
    trace!(field = %key, exists = value.is_some(), "binding field");

    operator.eval(Subject::Field(FieldContext {
        record,
        key,
        exists: value.is_some(),
        value,
    }))
}

fn equals(subject: Subject<'_>, expected: &Scalar) -> bool {
    subject.value().is_some_and(|actual| expected.equals(actual))
}

fn ordering(subject: Subject<'_>, keyword: Keyword, bound: &Scalar) -> Result<Ordering, EvalError> {
    let Some(actual) = subject.value() else {
        return Err(EvalError::TypeError(format!(
            "Cannot apply {keyword} to a missing field"
        )));
    };

    bound.compare(actual).ok_or_else(|| {
        EvalError::TypeError(format!(
            "Cannot apply {keyword} between {} and {}",
            type_name(actual),
            bound.type_name()
        ))
    })
}

fn all_hold(operators: &[Operator], subject: Subject<'_>) -> Result<bool, EvalError> {
    for operator in operators {
        if !operator.eval(subject)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_holds(operators: &[Operator], subject: Subject<'_>) -> Result<bool, EvalError> {
    for operator in operators {
        if operator.eval(subject)? {
            return Ok(true);
        }
    }
    Ok(false)
}
