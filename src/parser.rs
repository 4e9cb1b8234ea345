use std::mem;

use serde_json::{Map, Value as Json, map};
use thiserror::Error;
use tracing::trace;

use crate::{
    ast::{Keyword, OperandShape, Operator},
    value::{Scalar, type_name},
};

/// Nesting limit used by [`deserialize`].
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Errors raised while turning a filter document into an operator tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Filter nests deeper than the configured limit
    #[error("max depth of {max_depth} exceeded")]
    DepthExceeded { max_depth: usize },

    /// The document handed to the deserializer is not an object
    #[error("filter must be an object, got {0}")]
    InvalidRoot(&'static str),

    /// Field names and operator keywords share one level
    #[error("inconsistent kind at key '{0}': cannot mix fields and operators in one level")]
    MixedKind(String),

    /// `$`-prefixed key that is not a known operator
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// Operand does not have the shape the operator requires
    #[error("'{operator}' expects {expected}, got {found}")]
    TypeMismatch {
        operator: Keyword,
        expected: OperandShape,
        found: &'static str,
    },

    /// A sub-expression produced fewer operators than required
    #[error("too few operators under '{context}', expected at least {expected}")]
    TooFew { context: String, expected: usize },

    /// A sub-expression produced more operators than allowed
    #[error("too many operators under '{context}', expected at most {expected}")]
    TooMany { context: String, expected: usize },
}

/// What the keys of one mapping level have turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelKind {
    Unset,
    Field,
    Operator,
}

enum State<'a> {
    /// Not started; the level is validated on the first call to `next`
    Pending(&'a Json),
    Entries(map::Iter<'a>),
    Done,
}

/// Lazy deserializer for the top level of a filter document.
///
/// Yields one [`Operator`] per top-level key, in document order. The first
/// error ends the sequence: operators yielded before it stay visible to the
/// caller, nothing is yielded after it. Nested levels are read eagerly
/// because their operator counts have to be checked.
///
/// # Examples
///
/// ```
/// use querymatch::{Operator, Scalar, deserialize};
/// use serde_json::json;
///
/// let filter = json!({"num": {"$gt": 42}});
/// let operators: Vec<Operator> = deserialize(&filter).collect::<Result<_, _>>().unwrap();
///
/// assert_eq!(
///     operators,
///     vec![Operator::field("num", Operator::Gt(Scalar::Integer(42)))]
/// );
/// ```
pub struct Deserializer<'a> {
    state: State<'a>,
    parser: Parser,
    kind: LevelKind,
}

/// Deserializes a filter document with the default nesting limit.
pub fn deserialize(expression: &Json) -> Deserializer<'_> {
    deserialize_with_depth(expression, DEFAULT_MAX_DEPTH)
}

/// Deserializes a filter document, failing once nesting exceeds `max_depth`.
pub fn deserialize_with_depth(expression: &Json, max_depth: usize) -> Deserializer<'_> {
    Deserializer {
        state: State::Pending(expression),
        parser: Parser { max_depth },
        kind: LevelKind::Unset,
    }
}

/// Deserializes a whole filter document up front.
///
/// Either every top-level operator is returned or none is.
pub fn parse_filter(expression: &Json) -> Result<Vec<Operator>, ParseError> {
    deserialize(expression).collect()
}

impl Iterator for Deserializer<'_> {
    type Item = Result<Operator, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match mem::replace(&mut self.state, State::Done) {
            State::Pending(expression) => match self.parser.open(expression, 0) {
                Ok(entries) => {
                    self.state = State::Entries(entries.iter());
                    self.next()
                }
                Err(e) => Some(Err(e)),
            },
            State::Entries(mut entries) => {
                let (key, value) = entries.next()?;
                let result = self.parser.entry(&mut self.kind, key, value, 0);
                if result.is_ok() {
                    self.state = State::Entries(entries);
                }
                Some(result)
            }
            State::Done => None,
        }
    }
}

impl std::iter::FusedIterator for Deserializer<'_> {}

/// Recursive descent over nested levels.
///
/// Every nested level costs one pass through `level`, `entry` and either
/// `field` or `operator`, so stack use grows linearly with nesting.
#[derive(Debug, Clone, Copy)]
struct Parser {
    max_depth: usize,
}

impl Parser {
    fn open<'a>(self, expression: &'a Json, depth: usize) -> Result<&'a Map<String, Json>, ParseError> {
        if depth > self.max_depth {
            return Err(ParseError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }

        match expression {
            Json::Object(entries) => {
                trace!(depth, keys = entries.len(), "deserializing filter level");
                Ok(entries)
            }
            other => Err(ParseError::InvalidRoot(type_name(other))),
        }
    }

    /// Parses a nested mapping, which must produce at least one operator.
    fn level(self, expression: &Json, depth: usize, context: &str) -> Result<Vec<Operator>, ParseError> {
        let entries = self.open(expression, depth)?;
        if entries.is_empty() {
            return Err(too_few(context));
        }

        let mut kind = LevelKind::Unset;
        let mut operators = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            operators.push(self.entry(&mut kind, key, value, depth)?);
        }
        Ok(operators)
    }

    fn entry(
        self,
        kind: &mut LevelKind,
        key: &str,
        value: &Json,
        depth: usize,
    ) -> Result<Operator, ParseError> {
        if Keyword::is_operator_key(key) {
            set_kind(kind, LevelKind::Operator, key)?;
            let keyword =
                Keyword::from_key(key).ok_or_else(|| ParseError::UnknownOperator(key.to_string()))?;
            self.operator(keyword, value, depth)
        } else {
            set_kind(kind, LevelKind::Field, key)?;
            self.field(key, value, depth)
        }
    }

    fn operator(self, keyword: Keyword, value: &Json, depth: usize) -> Result<Operator, ParseError> {
        match keyword {
            Keyword::And => Ok(Operator::And(self.expression_list(keyword, value, depth)?)),
            Keyword::Or => Ok(Operator::Or(self.expression_list(keyword, value, depth)?)),
            Keyword::Nor => Ok(Operator::Nor(self.expression_list(keyword, value, depth)?)),
            Keyword::Not => {
                if !value.is_object() {
                    return Err(mismatch(keyword, value));
                }
                // several predicates under one `$not` are negated together
                let operators = self.level(value, depth + 1, keyword.as_str())?;
                Ok(Operator::negate(Operator::conjoin(operators)))
            }
            _ => value_operator(keyword, value),
        }
    }

    fn field(self, key: &str, value: &Json, depth: usize) -> Result<Operator, ParseError> {
        if value.is_object() {
            let operators = self.level(value, depth + 1, key)?;
            return Ok(Operator::field(key, Operator::conjoin(operators)));
        }

        // `{"field": 1}` is shorthand for `{"field": {"$eq": 1}}`
        let operand = scalar_operand(Keyword::Eq, value)?;
        Ok(Operator::field(key, Operator::Eq(operand)))
    }

    /// Operand of `$and`, `$or` and `$nor`: an array of sub-expressions,
    /// each producing exactly one operator.
    fn expression_list(
        self,
        keyword: Keyword,
        value: &Json,
        depth: usize,
    ) -> Result<Vec<Operator>, ParseError> {
        let Json::Array(elements) = value else {
            return Err(mismatch(keyword, value));
        };

        let mut operators = Vec::with_capacity(elements.len());
        for element in elements {
            if !element.is_object() {
                return Err(mismatch(keyword, element));
            }
            let mut parsed = self.level(element, depth + 1, keyword.as_str())?;
            if parsed.len() > 1 {
                return Err(ParseError::TooMany {
                    context: keyword.as_str().to_string(),
                    expected: 1,
                });
            }
            operators.extend(parsed.pop());
        }
        Ok(operators)
    }
}

fn set_kind(current: &mut LevelKind, kind: LevelKind, key: &str) -> Result<(), ParseError> {
    match *current {
        LevelKind::Unset => {
            *current = kind;
            Ok(())
        }
        seen if seen == kind => Ok(()),
        _ => Err(ParseError::MixedKind(key.to_string())),
    }
}

fn value_operator(keyword: Keyword, value: &Json) -> Result<Operator, ParseError> {
    let operator = match keyword {
        Keyword::Eq => Operator::Eq(scalar_operand(keyword, value)?),
        Keyword::Gt => Operator::Gt(scalar_operand(keyword, value)?),
        Keyword::Gte => Operator::Gte(scalar_operand(keyword, value)?),
        Keyword::Lt => Operator::Lt(scalar_operand(keyword, value)?),
        Keyword::Lte => Operator::Lte(scalar_operand(keyword, value)?),
        Keyword::Ne => Operator::Ne(scalar_operand(keyword, value)?),
        Keyword::In => Operator::In(list_operand(keyword, value)?),
        Keyword::Nin => Operator::NotIn(list_operand(keyword, value)?),
        Keyword::Exists => match value {
            Json::Bool(expected) => Operator::Exists(*expected),
            other => return Err(mismatch(keyword, other)),
        },
        Keyword::And | Keyword::Or | Keyword::Nor | Keyword::Not => {
            unreachable!("logical operators handled in Parser::operator")
        }
    };
    Ok(operator)
}

fn too_few(context: &str) -> ParseError {
    ParseError::TooFew {
        context: context.to_string(),
        expected: 1,
    }
}

fn scalar_operand(keyword: Keyword, value: &Json) -> Result<Scalar, ParseError> {
    Scalar::from_json(value).ok_or_else(|| mismatch(keyword, value))
}

fn list_operand(keyword: Keyword, value: &Json) -> Result<Vec<Scalar>, ParseError> {
    let Json::Array(elements) = value else {
        return Err(mismatch(keyword, value));
    };

    elements
        .iter()
        .map(|element| scalar_operand(keyword, element))
        .collect()
}

fn mismatch(keyword: Keyword, found: &Json) -> ParseError {
    ParseError::TypeMismatch {
        operator: keyword,
        expected: keyword.operand_shape(),
        found: type_name(found),
    }
}
