use crate::{ast::Keyword, value::Scalar};

/// A node of the operator tree.
///
/// Trees are produced by the deserializer and never mutated afterwards; the
/// evaluator and the SQL compiler both walk them by shared reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    // Comparison
    /// Equal (`$eq`), also produced for a bare scalar under a field
    Eq(Scalar),
    /// Greater than (`$gt`)
    Gt(Scalar),
    /// Greater than or equal (`$gte`)
    Gte(Scalar),
    /// Less than (`$lt`)
    Lt(Scalar),
    /// Less than or equal (`$lte`)
    Lte(Scalar),
    /// Not equal (`$ne`)
    Ne(Scalar),

    // Membership
    /// Value is one of the operands (`$in`)
    In(Vec<Scalar>),
    /// Value is none of the operands (`$nin`)
    NotIn(Vec<Scalar>),

    /// Field presence matches the flag (`$exists`).
    ///
    /// Only meaningful beneath a [`Operator::Field`].
    Exists(bool),

    // Logical
    /// All children hold (`$and`)
    And(Vec<Operator>),
    /// At least one child holds (`$or`)
    Or(Vec<Operator>),
    /// No child holds (`$nor`)
    Nor(Vec<Operator>),
    /// The child does not hold (`$not`)
    Not(Box<Operator>),

    /// Binds `operator` to the value stored under `key` in the record.
    ///
    /// The key is used verbatim: dots are not path separators.
    ///
    /// # Example
    /// ```text
    /// {"num": {"$gt": 42}}  =>  Field { key: "num", operator: Gt(42) }
    /// ```
    Field {
        key: String,
        operator: Box<Operator>,
    },
}

impl Operator {
    pub fn field(key: impl Into<String>, operator: Operator) -> Self {
        Operator::Field {
            key: key.into(),
            operator: Box::new(operator),
        }
    }

    pub fn negate(operator: Operator) -> Self {
        Operator::Not(Box::new(operator))
    }

    /// Wraps several operators into a single one, conjoining them when
    /// there is more than one.
    pub(crate) fn conjoin(mut operators: Vec<Operator>) -> Self {
        if operators.len() == 1
            && let Some(operator) = operators.pop()
        {
            return operator;
        }
        Operator::And(operators)
    }

    /// The keyword this node was written with, if any.
    ///
    /// Field bindings have no keyword of their own.
    pub fn keyword(&self) -> Option<Keyword> {
        let keyword = match self {
            Operator::Eq(_) => Keyword::Eq,
            Operator::Gt(_) => Keyword::Gt,
            Operator::Gte(_) => Keyword::Gte,
            Operator::Lt(_) => Keyword::Lt,
            Operator::Lte(_) => Keyword::Lte,
            Operator::Ne(_) => Keyword::Ne,
            Operator::In(_) => Keyword::In,
            Operator::NotIn(_) => Keyword::Nin,
            Operator::Exists(_) => Keyword::Exists,
            Operator::And(_) => Keyword::And,
            Operator::Or(_) => Keyword::Or,
            Operator::Nor(_) => Keyword::Nor,
            Operator::Not(_) => Keyword::Not,
            Operator::Field { .. } => return None,
        };
        Some(keyword)
    }
}
