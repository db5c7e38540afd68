//! Operator table: DSL operator tokens and what they mean.
//!
//! Tokens are matched exactly (`eq`, `notILike`, ...). A leading `__` is
//! accepted on every token, so `__gte` and `gte` are the same operator.

use serde::Serialize;
use std::fmt;

/// A leaf comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    // Equality / comparison
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    // Pattern
    Like,
    NotLike,
    ILike,
    NotILike,
    StartsWith,
    EndsWith,
    Substring,
    Regexp,
    NotRegexp,
    IRegexp,
    NotIRegexp,
    // Range
    Between,
    NotBetween,
    // Set
    In,
    NotIn,
    // Array
    Overlap,
    Contains,
    Contained,
    Any,
    All,
    // Truth test (`IS NOT <value>`)
    Not,
    // Reference to another column
    Col,
}

/// Logical combinator tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// Shape of operand an operator requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// A single scalar (string, number, boolean or null).
    Scalar,
    /// An array of scalars.
    List,
    /// A two-element array.
    Range,
    /// A (possibly dotted) field reference string.
    FieldRef,
}

/// Every token in the table, with its operator.
const OPERATORS: &[(&str, Operator)] = &[
    ("eq", Operator::Eq),
    ("ne", Operator::Ne),
    ("gt", Operator::Gt),
    ("lt", Operator::Lt),
    ("gte", Operator::Gte),
    ("lte", Operator::Lte),
    ("like", Operator::Like),
    ("notLike", Operator::NotLike),
    ("iLike", Operator::ILike),
    ("notILike", Operator::NotILike),
    ("startsWith", Operator::StartsWith),
    ("endsWith", Operator::EndsWith),
    ("substring", Operator::Substring),
    ("regexp", Operator::Regexp),
    ("notRegexp", Operator::NotRegexp),
    ("iRegexp", Operator::IRegexp),
    ("notIRegexp", Operator::NotIRegexp),
    ("between", Operator::Between),
    ("notBetween", Operator::NotBetween),
    ("in", Operator::In),
    ("notIn", Operator::NotIn),
    ("overlap", Operator::Overlap),
    ("contains", Operator::Contains),
    ("contained", Operator::Contained),
    ("any", Operator::Any),
    ("all", Operator::All),
    ("not", Operator::Not),
    ("col", Operator::Col),
];

fn strip_prefix(token: &str) -> &str {
    token.strip_prefix("__").unwrap_or(token)
}

impl Operator {
    /// Look up a leaf operator token. `not` resolves here as the truth
    /// test; callers that see a nested filter under `not` treat it as the
    /// logical combinator instead.
    pub fn from_token(token: &str) -> Option<Self> {
        let bare = strip_prefix(token);
        OPERATORS
            .iter()
            .find(|(name, _)| *name == bare)
            .map(|(_, op)| *op)
    }

    pub fn token(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }

    pub fn operand_shape(self) -> OperandShape {
        match self {
            Operator::Between | Operator::NotBetween => OperandShape::Range,
            Operator::In
            | Operator::NotIn
            | Operator::Overlap
            | Operator::Contains
            | Operator::Contained
            | Operator::Any
            | Operator::All => OperandShape::List,
            Operator::Col => OperandShape::FieldRef,
            _ => OperandShape::Scalar,
        }
    }

    /// Whether the operator needs array support in the target dialect.
    pub fn is_array(self) -> bool {
        matches!(
            self,
            Operator::Overlap
                | Operator::Contains
                | Operator::Contained
                | Operator::Any
                | Operator::All
        )
    }

    /// Whether the operator is a pattern match.
    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            Operator::Like
                | Operator::NotLike
                | Operator::ILike
                | Operator::NotILike
                | Operator::StartsWith
                | Operator::EndsWith
                | Operator::Substring
                | Operator::Regexp
                | Operator::NotRegexp
                | Operator::IRegexp
                | Operator::NotIRegexp
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl LogicalOp {
    pub fn from_token(token: &str) -> Option<Self> {
        match strip_prefix(token) {
            "and" => Some(LogicalOp::And),
            "or" => Some(LogicalOp::Or),
            "not" => Some(LogicalOp::Not),
            _ => None,
        }
    }
}

/// Whether `token` is any known operator or combinator.
pub fn is_operator_token(token: &str) -> bool {
    Operator::from_token(token).is_some() || LogicalOp::from_token(token).is_some()
}
