//! # Operator Tree
//!
//! This module defines the intermediate representation that filter
//! documents are compiled into. Both consumers of the crate work on it:
//!
//! - **[`crate::evaluator`]** - evaluates a tree against one JSON record
//! - **[`crate::sql`]** - renders a tree as a parameterized SQL condition
//!
//! ## Submodules
//!
//! - **[keyword]** - the `$`-prefixed operator keywords and their operand shapes
//! - **[operator]** - the [`Operator`] node type
//!
//! ## Filter documents
//!
//! A filter document is a JSON object. At any one level its keys are either
//! all field names or all operator keywords:
//!
//! ```text
//! {"num": {"$gt": 42}}                        field, then operator
//! {"$or": [{"a": 1}, {"b": {"$lt": 3}}]}      operator at the root
//! {"tag": {"$in": ["x", "y"], "$ne": "z"}}    two operators, implicitly AND-ed
//! ```
//!
//! Mixing the two kinds at one level is rejected by the deserializer.
pub mod keyword;
pub mod operator;

pub use keyword::{Keyword, OPERATOR_MARKER, OperandShape};
pub use operator::Operator;
