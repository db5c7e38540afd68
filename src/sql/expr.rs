//! Expression AST - the core of SQL expression building.
//!
//! This module provides a strongly-typed AST for SQL expressions
//! with exhaustive pattern matching enforced by the compiler.

use super::dialect::{Dialect, SqlDialect};
use super::query::Query;
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Every variant must be handled in `to_tokens_for_dialect()` - the compiler
/// enforces this.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column {
        table: Option<String>,
        column: String,
    },

    /// Literal values
    Literal(Literal),

    /// Array literal: ARRAY[a, b, ...]
    Array(Vec<Expr>),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Unary operation: op expr
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },

    /// Function call: name(args...)
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// BETWEEN: expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// IS [NOT] value, for boolean truth tests
    Is {
        expr: Box<Expr>,
        value: Box<Expr>,
        negated: bool,
    },

    /// Quantified comparison: expr op ANY(array) / expr op ALL(array)
    Quantified {
        expr: Box<Expr>,
        op: BinaryOperator,
        quantifier: Quantifier,
        array: Box<Expr>,
    },

    /// EXISTS (SELECT ...)
    Exists(Box<Query>),

    /// Wildcard: * or table.*
    Star { table: Option<String> },

    /// Parenthesized expression
    Paren(Box<Expr>),

    /// Raw SQL expression passed directly to output without escaping.
    ///
    /// # Security Warning
    ///
    /// **Never pass untrusted input to this variant.** Raw SQL is not
    /// sanitized. Its only producer is the subquery-fragment path of the
    /// filter compiler, which is gated by `RawFragmentPolicy`.
    Raw(String),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Pattern
    Like,
    NotLike,
    ILike,
    NotILike,
    Regex {
        negated: bool,
        case_insensitive: bool,
    },
    // Array
    Overlap,
    Contains,
    ContainedBy,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
}

/// ANY / ALL quantifier for array comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
}

impl Expr {
    /// Convert this expression to a token stream (default dialect).
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    /// Convert this expression to a token stream for a specific dialect.
    ///
    /// This handles dialect-specific features like `ILIKE` emulation.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column { table, column } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            Expr::Literal(lit) => {
                ts.push(match lit {
                    Literal::Int(n) => Token::LitInt(*n),
                    Literal::Float(f) => Token::LitFloat(*f),
                    Literal::String(s) => Token::LitString(s.clone()),
                    Literal::Bool(b) => Token::LitBool(*b),
                    Literal::Null => Token::LitNull,
                });
            }

            Expr::Array(items) => {
                ts.push(Token::Array).push(Token::LBracket);
                emit_list(&mut ts, items, dialect);
                ts.push(Token::RBracket);
            }

            Expr::BinaryOp { left, op, right } => {
                if let BinaryOperator::Regex {
                    negated,
                    case_insensitive,
                } = *op
                {
                    if dialect.regex_as_function() {
                        if negated {
                            ts.push(Token::Not).space();
                        }
                        let mut args = vec![(**left).clone(), (**right).clone()];
                        if case_insensitive {
                            args.push(lit_str("i"));
                        }
                        ts.append(&func("regexp_matches", args).to_tokens_for_dialect(dialect));
                        return ts;
                    }
                }
                if lowers_operands(*op, dialect) {
                    // No case-insensitive operator: compare lowered operands
                    ts.append(&lower(left).to_tokens_for_dialect(dialect));
                    ts.space();
                    ts.extend(case_sensitive_tokens(*op));
                    ts.space();
                    ts.append(&lower(right).to_tokens_for_dialect(dialect));
                } else {
                    ts.append(&left.to_tokens_for_dialect(dialect));
                    ts.space();
                    ts.extend(binary_op_tokens(*op));
                    ts.space();
                    ts.append(&right.to_tokens_for_dialect(dialect));
                }
            }

            Expr::UnaryOp { op, expr } => {
                ts.push(match op {
                    UnaryOperator::Not => Token::Not,
                });
                ts.space();
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }

            Expr::Function {
                name,
                args,
                distinct,
            } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                emit_list(&mut ts, args, dialect);
                ts.rparen();
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                // "x IN ()" is invalid SQL: it is FALSE, "x NOT IN ()" is TRUE
                if values.is_empty() {
                    ts.push(if *negated { Token::True } else { Token::False });
                } else {
                    ts.append(&expr.to_tokens_for_dialect(dialect));
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    emit_list(&mut ts, values, dialect);
                    ts.rparen();
                }
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::Between).space();
                ts.append(&low.to_tokens_for_dialect(dialect));
                ts.space().push(Token::And).space();
                ts.append(&high.to_tokens_for_dialect(dialect));
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space();
                ts.push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }

            Expr::Is {
                expr,
                value,
                negated,
            } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space().push(Token::Is);
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space();
                // truth keywords, never the dialect's boolean literal
                match value.as_ref() {
                    Expr::Literal(Literal::Bool(true)) => ts.push(Token::True),
                    Expr::Literal(Literal::Bool(false)) => ts.push(Token::False),
                    Expr::Literal(Literal::Null) => ts.push(Token::Null),
                    other => ts.append(&other.to_tokens_for_dialect(dialect)),
                };
            }

            Expr::Quantified {
                expr,
                op,
                quantifier,
                array,
            } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space();
                ts.extend(binary_op_tokens(*op));
                ts.space();
                ts.push(match quantifier {
                    Quantifier::Any => Token::Any,
                    Quantifier::All => Token::All,
                });
                ts.lparen();
                ts.append(&array.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::Exists(query) => {
                ts.push(Token::Exists).space().lparen();
                ts.append(&query.to_inline_tokens(dialect));
                ts.rparen();
            }

            Expr::Star { table } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone())).push(Token::Dot);
                }
                ts.push(Token::Star);
            }

            Expr::Paren(inner) => {
                ts.lparen();
                ts.append(&inner.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::Raw(sql) => {
                ts.push(Token::Raw(sql.clone()));
            }
        }

        ts
    }
}

fn emit_list(ts: &mut TokenStream, items: &[Expr], dialect: Dialect) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.append(&item.to_tokens_for_dialect(dialect));
    }
}

fn lowers_operands(op: BinaryOperator, dialect: Dialect) -> bool {
    match op {
        BinaryOperator::ILike | BinaryOperator::NotILike => !dialect.supports_ilike(),
        BinaryOperator::Regex {
            case_insensitive: true,
            ..
        } => !dialect.supports_case_insensitive_regex(),
        _ => false,
    }
}

fn lower(expr: &Expr) -> Expr {
    func("LOWER", vec![expr.clone()])
}

fn case_sensitive_tokens(op: BinaryOperator) -> Vec<Token> {
    match op {
        BinaryOperator::ILike => binary_op_tokens(BinaryOperator::Like),
        BinaryOperator::NotILike => binary_op_tokens(BinaryOperator::NotLike),
        BinaryOperator::Regex { negated, .. } => binary_op_tokens(BinaryOperator::Regex {
            negated,
            case_insensitive: false,
        }),
        other => binary_op_tokens(other),
    }
}

fn binary_op_tokens(op: BinaryOperator) -> Vec<Token> {
    match op {
        BinaryOperator::Eq => vec![Token::Eq],
        BinaryOperator::Ne => vec![Token::Ne],
        BinaryOperator::Lt => vec![Token::Lt],
        BinaryOperator::Gt => vec![Token::Gt],
        BinaryOperator::Lte => vec![Token::Lte],
        BinaryOperator::Gte => vec![Token::Gte],
        BinaryOperator::And => vec![Token::And],
        BinaryOperator::Or => vec![Token::Or],
        BinaryOperator::Like => vec![Token::Like],
        BinaryOperator::NotLike => vec![Token::Not, Token::Space, Token::Like],
        BinaryOperator::ILike => vec![Token::ILike],
        BinaryOperator::NotILike => vec![Token::Not, Token::Space, Token::ILike],
        BinaryOperator::Regex {
            negated,
            case_insensitive,
        } => vec![Token::RegexMatch {
            negated,
            case_insensitive,
        }],
        BinaryOperator::Overlap => vec![Token::Overlap],
        BinaryOperator::Contains => vec![Token::Contains],
        BinaryOperator::ContainedBy => vec![Token::ContainedBy],
    }
}

// =============================================================================
// Expression Constructors
// =============================================================================

/// Create a qualified column reference (table.column).
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

/// Create an integer literal.
pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

/// Create a string literal.
pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

/// Create a star (*) expression.
pub fn star() -> Expr {
    Expr::Star { table: None }
}

/// Generic function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
    }
}

/// COUNT(*)
pub fn count_star() -> Expr {
    func("COUNT", vec![star()])
}

/// AND together a list of conditions, parenthesizing OR children.
///
/// Returns `None` for an empty list.
pub fn conjunction(conditions: Vec<Expr>) -> Option<Expr> {
    combine(conditions, BinaryOperator::And)
}

/// OR together a list of conditions.
///
/// Returns `None` for an empty list.
pub fn disjunction(conditions: Vec<Expr>) -> Option<Expr> {
    combine(conditions, BinaryOperator::Or)
}

fn combine(conditions: Vec<Expr>, op: BinaryOperator) -> Option<Expr> {
    let multiple = conditions.len() > 1;
    conditions
        .into_iter()
        .map(|c| if multiple { parenthesize(c) } else { c })
        .reduce(|left, right| Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
}

fn parenthesize(expr: Expr) -> Expr {
    match expr {
        Expr::BinaryOp {
            op: BinaryOperator::And | BinaryOperator::Or,
            ..
        } => Expr::Paren(Box::new(expr)),
        other => other,
    }
}

// =============================================================================
// Expression Extension Trait (for fluent API)
// =============================================================================

/// Extension trait for fluent expression building.
pub trait ExprExt {
    fn binary(self, op: BinaryOperator, other: impl Into<Expr>) -> Expr;
    fn eq(self, other: impl Into<Expr>) -> Expr;
    fn and(self, other: impl Into<Expr>) -> Expr;
    fn alias(self, alias: &str) -> super::query::SelectExpr;
}

impl ExprExt for Expr {
    fn binary(self, op: BinaryOperator, other: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self),
            op,
            right: Box::new(other.into()),
        }
    }

    fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Eq, other)
    }

    fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    fn alias(self, alias: &str) -> super::query::SelectExpr {
        super::query::SelectExpr::new(self).with_alias(alias)
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit_str(s)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Literal(Literal::Bool(b))
    }
}
