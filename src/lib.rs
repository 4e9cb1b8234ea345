//! Mongo-style filter documents for JSON records and SQL.
//!
//! A filter document such as `{"num": {"$gt": 42}}` is deserialized into a
//! tree of [`Operator`]s. The same tree can then be
//!
//! - evaluated against records with [`matches`], and
//! - compiled into a parameterized SQL condition with [`compile`].
//!
//! ```
//! use querymatch::{compile, matches, parse_filter};
//! use serde_json::json;
//!
//! let records = vec![json!({"num": 41}), json!({"num": 43}), json!({"num": 44})];
//! let filter = parse_filter(&json!({"num": {"$gt": 42}})).unwrap();
//!
//! let selected: Vec<_> = records
//!     .iter()
//!     .filter(|record| matches(record, &filter).unwrap())
//!     .collect();
//! assert_eq!(selected, vec![&json!({"num": 43}), &json!({"num": 44})]);
//!
//! let query = compile(&filter).unwrap();
//! assert_eq!(query.text, "num > :num0");
//! ```
pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod evaluator;
pub mod parser;
pub mod sql;
pub mod value;

pub use ast::{Keyword, Operator};
pub use evaluator::{EvalError, FieldContext, Subject, matches};
pub use parser::{
    DEFAULT_MAX_DEPTH, Deserializer, ParseError, deserialize, deserialize_with_depth, parse_filter,
};
pub use sql::{BuilderContext, CompileError, Compiler, SqlQuery, compile, compile_with_depth};
pub use value::Scalar;
