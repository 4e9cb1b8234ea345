use std::fmt;

/// Leading character that marks a mapping key as an operator keyword.
pub const OPERATOR_MARKER: char = '$';

/// Operator keywords recognised in filter documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Comparison
    /// `$eq`
    Eq,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$ne`
    Ne,

    // Membership
    /// `$in`
    In,
    /// `$nin`
    Nin,

    // Existence
    /// `$exists`
    Exists,

    // Logical
    /// `$and`
    And,
    /// `$or`
    Or,
    /// `$nor`
    Nor,
    /// `$not`
    Not,
}

/// Shape an operator expects its operand to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// A single boolean, number or string
    Scalar,
    /// An array of scalars
    ScalarList,
    /// A single boolean
    Boolean,
    /// An array of sub-expressions (mappings)
    ExpressionList,
    /// A single sub-expression (mapping)
    Expression,
}

impl Keyword {
    pub const ALL: [Keyword; 13] = [
        Keyword::Eq,
        Keyword::Gt,
        Keyword::Gte,
        Keyword::Lt,
        Keyword::Lte,
        Keyword::Ne,
        Keyword::In,
        Keyword::Nin,
        Keyword::Exists,
        Keyword::And,
        Keyword::Or,
        Keyword::Nor,
        Keyword::Not,
    ];

    /// Looks up a mapping key, marker included (`"$gt"`).
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kw| kw.as_str() == key)
    }

    /// Whether a mapping key is written in operator form.
    ///
    /// This says nothing about whether the operator is known.
    pub fn is_operator_key(key: &str) -> bool {
        key.starts_with(OPERATOR_MARKER)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Eq => "$eq",
            Keyword::Gt => "$gt",
            Keyword::Gte => "$gte",
            Keyword::Lt => "$lt",
            Keyword::Lte => "$lte",
            Keyword::Ne => "$ne",
            Keyword::In => "$in",
            Keyword::Nin => "$nin",
            Keyword::Exists => "$exists",
            Keyword::And => "$and",
            Keyword::Or => "$or",
            Keyword::Nor => "$nor",
            Keyword::Not => "$not",
        }
    }

    pub fn operand_shape(self) -> OperandShape {
        match self {
            Keyword::Eq
            | Keyword::Gt
            | Keyword::Gte
            | Keyword::Lt
            | Keyword::Lte
            | Keyword::Ne => OperandShape::Scalar,
            Keyword::In | Keyword::Nin => OperandShape::ScalarList,
            Keyword::Exists => OperandShape::Boolean,
            Keyword::And | Keyword::Or | Keyword::Nor => OperandShape::ExpressionList,
            Keyword::Not => OperandShape::Expression,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for OperandShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperandShape::Scalar => "a scalar",
            OperandShape::ScalarList => "an array of scalars",
            OperandShape::Boolean => "a boolean",
            OperandShape::ExpressionList => "an array of objects",
            OperandShape::Expression => "an object",
        };
        f.write_str(name)
    }
}
