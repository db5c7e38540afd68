//! Rendering a [`QueryPlan`] into SQL through the query builder.
//!
//! The root relation is aliased by its entity name and every join by its
//! `->`-joined association path, so column references in the plan map
//! one-to-one onto qualified identifiers here.

use serde_json::Value;

use super::dialect::{Dialect, SqlDialect};
use super::expr::{
    conjunction, disjunction, func, table_col, BinaryOperator, Expr, ExprExt, Literal, Quantifier,
    UnaryOperator,
};
use super::query::{JoinType, OrderByExpr, Query, SelectExpr, SortDir, TableRef};
use super::token::{Token, TokenStream};
use crate::catalog::{AssociationKind, EntityDef, SchemaCatalog};
use crate::compiler::PATH_SEPARATOR;
use crate::error::{QueryError, QueryResult};
use crate::operator::{LogicalOp, Operator};
use crate::plan::{
    ColumnRef, Comparison, FragmentScope, JoinSpec, Operand, Predicate, QueryPlan, RawFragment,
    SortTarget, Target,
};
use crate::request::SortDirection;

/// Alias of the wrapped statement in a count query.
pub const COUNT_ALIAS: &str = "subquery";

/// Renders plans for one dialect.
pub struct PlanRenderer<'a> {
    catalog: &'a SchemaCatalog,
    dialect: Dialect,
}

impl<'a> PlanRenderer<'a> {
    pub fn new(catalog: &'a SchemaCatalog, dialect: Dialect) -> Self {
        Self { catalog, dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Render the statement text for a plan.
    pub fn render(&self, plan: &QueryPlan) -> QueryResult<String> {
        let sql = self.build(plan)?.to_sql(self.dialect);
        tracing::debug!(
            entity = %plan.entity,
            dialect = %self.dialect,
            sql = %sql,
            "rendered plan"
        );
        Ok(sql)
    }

    /// Render the pagination-free count statement for a plan.
    pub fn render_count(&self, plan: &QueryPlan) -> QueryResult<String> {
        let inner = self.render(&plan.without_pagination())?;
        Ok(count_statement(&inner, self.dialect))
    }

    /// Build the SELECT for a plan without serializing it.
    pub fn build(&self, plan: &QueryPlan) -> QueryResult<Query> {
        let root = self.entity(&plan.entity)?;

        let mut select: Vec<SelectExpr> = plan
            .projection
            .fields
            .iter()
            .map(|field| column_select(&root.name, root.column_of(field), field))
            .collect();

        let mut query = Query::new().from(table_ref(root, &root.name));

        for join in plan.all_joins() {
            let target = self.entity(&join.target_entity)?;
            let output_prefix = join.path.replace(PATH_SEPARATOR, ".");
            for field in &join.projected_fields {
                select.push(
                    table_col(&join.path, target.column_of(field))
                        .alias(&format!("{}.{}", output_prefix, field)),
                );
            }
            query = self.join(query, join, target)?;
        }

        for aggregate in &plan.aggregates {
            select.push(
                func(
                    &aggregate.function,
                    vec![column(&aggregate.field.column)],
                )
                .alias(&aggregate.alias),
            );
        }

        query = query.select(select);

        if let Some(predicate) = &plan.predicate {
            query = query.filter(self.predicate(predicate)?);
        }
        if !plan.group_by.is_empty() {
            query = query.group_by(plan.group_by.iter().map(column).collect());
        }
        if let Some(having) = &plan.having {
            query = query.having(self.predicate(having)?);
        }
        if let Some(sort) = &plan.sort {
            let expr = match &sort.target {
                SortTarget::Field(field) => column(&field.column),
                SortTarget::Aggregate(alias) => Expr::Column {
                    table: None,
                    column: alias.clone(),
                },
            };
            let dir = match sort.direction {
                SortDirection::Asc => SortDir::Asc,
                SortDirection::Desc => SortDir::Desc,
            };
            query = query.order_by(vec![OrderByExpr::new(expr, dir)]);
        }
        if let Some(pagination) = &plan.pagination {
            query = query.paginate(pagination.limit, pagination.offset);
        }

        Ok(query)
    }

    fn entity(&self, name: &str) -> QueryResult<&'a EntityDef> {
        self.catalog
            .entity(name)
            .ok_or_else(|| QueryError::EntityNotFound(name.to_string()))
    }

    fn join(&self, query: Query, join: &JoinSpec, target: &EntityDef) -> QueryResult<Query> {
        let assoc = &join.association;
        let source = self.entity(&assoc.source)?;
        let join_type = if join.required {
            JoinType::Inner
        } else {
            JoinType::Left
        };
        let source_col = table_col(&join.parent, source.column_of(&assoc.source_key));
        let target_col = table_col(&join.path, target.column_of(&assoc.target_key));

        match (assoc.kind, &assoc.through) {
            (AssociationKind::BelongsToMany, Some(through)) => {
                let through_alias = format!("{}{}{}", join.path, PATH_SEPARATOR, through.table);
                let through_ref = TableRef::new(&through.table)
                    .with_schema(through.schema.as_deref())
                    .with_alias(&through_alias);
                Ok(query
                    .join(
                        join_type,
                        through_ref,
                        source_col.eq(table_col(&through_alias, &through.source_fk)),
                    )
                    .join(
                        join_type,
                        table_ref(target, &join.path),
                        table_col(&through_alias, &through.target_fk).eq(target_col),
                    ))
            }
            (AssociationKind::BelongsToMany, None) => Err(QueryError::InvalidRequest(format!(
                "association {} has no junction table",
                assoc.alias
            ))),
            _ => Ok(query.join(
                join_type,
                table_ref(target, &join.path),
                source_col.eq(target_col),
            )),
        }
    }

    fn predicate(&self, predicate: &Predicate) -> QueryResult<Expr> {
        match predicate {
            Predicate::Comparison(comparison)
            | Predicate::AssociationQualified { comparison, .. } => self.comparison(comparison),
            Predicate::Logical { op, children } => {
                let exprs = children
                    .iter()
                    .map(|c| self.predicate(c))
                    .collect::<QueryResult<Vec<_>>>()?;
                let always = || Expr::Literal(Literal::Bool(true));
                Ok(match op {
                    LogicalOp::And => conjunction(exprs).unwrap_or_else(always),
                    LogicalOp::Or => {
                        disjunction(exprs).unwrap_or(Expr::Literal(Literal::Bool(false)))
                    }
                    LogicalOp::Not => Expr::UnaryOp {
                        op: UnaryOperator::Not,
                        expr: Box::new(Expr::Paren(Box::new(
                            conjunction(exprs).unwrap_or_else(always),
                        ))),
                    },
                })
            }
            Predicate::RawSubquery(fragment) => self.raw_fragment(fragment),
            Predicate::GlobalPattern { pattern } => {
                Err(QueryError::UnboundPattern(pattern.clone()))
            }
        }
    }

    fn raw_fragment(&self, fragment: &RawFragment) -> QueryResult<Expr> {
        let raw = Expr::Paren(Box::new(Expr::Raw(fragment.sql.clone())));
        match &fragment.scope {
            FragmentScope::Field(field) => Ok(column(&field.column).eq(raw)),
            FragmentScope::Exists {
                source,
                association,
            } => {
                let owner = self.entity(&association.source)?;
                let target = self.entity(&association.target)?;
                let alias = association.alias.as_str();
                let source_col = table_col(source, owner.column_of(&association.source_key));
                let target_col = table_col(alias, target.column_of(&association.target_key));

                let inner = Query::new().select(vec![Expr::Literal(Literal::Int(1))]);
                let inner = match &association.through {
                    Some(through) => inner
                        .from(
                            TableRef::new(&through.table)
                                .with_schema(through.schema.as_deref())
                                .with_alias(&through.table),
                        )
                        .inner_join(
                            table_ref(target, alias),
                            table_col(&through.table, &through.target_fk).eq(target_col),
                        )
                        .filter(source_col.eq(table_col(&through.table, &through.source_fk))),
                    None => inner.from(table_ref(target, alias)).filter(source_col.eq(target_col)),
                };
                Ok(Expr::Exists(Box::new(inner.filter(raw))))
            }
        }
    }

    fn comparison(&self, comparison: &Comparison) -> QueryResult<Expr> {
        let (left, name) = match &comparison.target {
            Target::Field(field) => (column(&field.column), field.name.as_str()),
            Target::Aggregate(aggregate) => (
                func(&aggregate.function, vec![column(&aggregate.field.column)]),
                aggregate.alias.as_str(),
            ),
        };
        let operator = comparison.operator;
        let operand = &comparison.operand;
        let at = || format!("{}.{}", name, operator);

        if operator.is_array() && !self.dialect.supports_array_operators() {
            return Err(QueryError::invalid_shape(
                &at(),
                format!("array operators are not supported by {}", self.dialect),
            ));
        }

        let expr = match operator {
            Operator::Eq | Operator::Ne => match operand {
                Operand::Value(Value::Null) => Expr::IsNull {
                    expr: Box::new(left),
                    negated: operator == Operator::Ne,
                },
                _ => {
                    let op = if operator == Operator::Eq {
                        BinaryOperator::Eq
                    } else {
                        BinaryOperator::Ne
                    };
                    left.binary(op, self.scalar_or_column(operand, &at)?)
                }
            },
            Operator::Gt => left.binary(BinaryOperator::Gt, self.scalar_or_column(operand, &at)?),
            Operator::Lt => left.binary(BinaryOperator::Lt, self.scalar_or_column(operand, &at)?),
            Operator::Gte => left.binary(BinaryOperator::Gte, self.scalar_or_column(operand, &at)?),
            Operator::Lte => left.binary(BinaryOperator::Lte, self.scalar_or_column(operand, &at)?),
            Operator::Like => left.binary(BinaryOperator::Like, scalar(operand, &at)?),
            Operator::NotLike => left.binary(BinaryOperator::NotLike, scalar(operand, &at)?),
            Operator::ILike => left.binary(BinaryOperator::ILike, scalar(operand, &at)?),
            Operator::NotILike => left.binary(BinaryOperator::NotILike, scalar(operand, &at)?),
            Operator::StartsWith => {
                left.binary(BinaryOperator::Like, pattern(operand, "", "%", &at)?)
            }
            Operator::EndsWith => {
                left.binary(BinaryOperator::Like, pattern(operand, "%", "", &at)?)
            }
            Operator::Substring => {
                left.binary(BinaryOperator::Like, pattern(operand, "%", "%", &at)?)
            }
            Operator::Regexp | Operator::NotRegexp | Operator::IRegexp | Operator::NotIRegexp => {
                let op = BinaryOperator::Regex {
                    negated: matches!(operator, Operator::NotRegexp | Operator::NotIRegexp),
                    case_insensitive: matches!(operator, Operator::IRegexp | Operator::NotIRegexp),
                };
                left.binary(op, scalar(operand, &at)?)
            }
            Operator::Between | Operator::NotBetween => match operand {
                Operand::Range(low, high) => Expr::Between {
                    expr: Box::new(left),
                    low: Box::new(literal(low)),
                    high: Box::new(literal(high)),
                    negated: operator == Operator::NotBetween,
                },
                _ => return Err(QueryError::invalid_shape(&at(), "expected a range")),
            },
            Operator::In | Operator::NotIn => Expr::In {
                expr: Box::new(left),
                values: list(operand, &at)?,
                negated: operator == Operator::NotIn,
            },
            Operator::Overlap => {
                left.binary(BinaryOperator::Overlap, Expr::Array(list(operand, &at)?))
            }
            Operator::Contains => {
                left.binary(BinaryOperator::Contains, Expr::Array(list(operand, &at)?))
            }
            Operator::Contained => {
                left.binary(BinaryOperator::ContainedBy, Expr::Array(list(operand, &at)?))
            }
            Operator::Any | Operator::All => Expr::Quantified {
                expr: Box::new(left),
                op: BinaryOperator::Eq,
                quantifier: if operator == Operator::Any {
                    Quantifier::Any
                } else {
                    Quantifier::All
                },
                array: Box::new(Expr::Array(list(operand, &at)?)),
            },
            Operator::Not => Expr::Is {
                expr: Box::new(left),
                value: Box::new(scalar(operand, &at)?),
                negated: true,
            },
            Operator::Col => match operand {
                Operand::Column(field) => left.eq(column(&field.column)),
                _ => return Err(QueryError::invalid_shape(&at(), "expected a field reference")),
            },
        };
        Ok(expr)
    }

    fn scalar_or_column(&self, operand: &Operand, at: &dyn Fn() -> String) -> QueryResult<Expr> {
        match operand {
            Operand::Column(field) => Ok(column(&field.column)),
            other => scalar(other, at),
        }
    }
}

/// `SELECT COUNT(*) FROM (<statement>) AS subquery`
pub fn count_statement(statement: &str, dialect: Dialect) -> String {
    let mut ts = TokenStream::new();
    ts.push(Token::Select)
        .space()
        .push(Token::FunctionName("count".into()))
        .lparen()
        .push(Token::Star)
        .rparen()
        .space()
        .push(Token::From)
        .space()
        .lparen()
        .push(Token::Raw(statement.to_string()))
        .rparen()
        .space()
        .push(Token::As)
        .space()
        .push(Token::Ident(COUNT_ALIAS.into()));
    ts.serialize(dialect)
}

fn table_ref(entity: &EntityDef, alias: &str) -> TableRef {
    TableRef::new(&entity.table)
        .with_schema(entity.schema.as_deref())
        .with_alias(alias)
}

fn column(column: &ColumnRef) -> Expr {
    table_col(&column.table, &column.column)
}

fn column_select(table: &str, column: &str, field: &str) -> SelectExpr {
    let select = SelectExpr::new(table_col(table, column));
    if column == field {
        select
    } else {
        select.with_alias(field)
    }
}

fn literal(value: &Value) -> Expr {
    Expr::Literal(match value {
        Value::Null => Literal::Null,
        Value::Bool(b) => Literal::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Literal::Int(i),
            None => Literal::Float(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Literal::String(s.clone()),
        // operands are shape-checked at compile time
        other => Literal::String(other.to_string()),
    })
}

fn scalar(operand: &Operand, at: &dyn Fn() -> String) -> QueryResult<Expr> {
    match operand {
        Operand::Value(value) => Ok(literal(value)),
        _ => Err(QueryError::invalid_shape(&at(), "expected a scalar value")),
    }
}

fn list(operand: &Operand, at: &dyn Fn() -> String) -> QueryResult<Vec<Expr>> {
    match operand {
        Operand::List(values) => Ok(values.iter().map(literal).collect()),
        _ => Err(QueryError::invalid_shape(&at(), "expected an array")),
    }
}

fn pattern(
    operand: &Operand,
    prefix: &str,
    suffix: &str,
    at: &dyn Fn() -> String,
) -> QueryResult<Expr> {
    match operand {
        Operand::Value(Value::String(s)) => Ok(Expr::Literal(Literal::String(format!(
            "{}{}{}",
            prefix, s, suffix
        )))),
        _ => Err(QueryError::invalid_shape(&at(), "pattern must be a string")),
    }
}
