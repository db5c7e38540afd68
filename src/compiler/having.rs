//! HAVING predicates keyed by aggregate alias.

use serde_json::Value;

use super::filter::{build_operand, combine, compile_clauses};
use super::joins::JoinResolver;
use crate::error::{QueryError, QueryResult};
use crate::operator::LogicalOp;
use crate::plan::{AggregateExpr, Comparison, Predicate, Target};
use crate::request::{FieldCondition, FilterRequest, FilterTerm};

const PATH: &str = "having";

/// Validate and compile the having mapping against the built aggregates.
///
/// Every key is checked against the aggregate aliases before any operator
/// is interpreted.
pub fn compile(
    resolver: &mut JoinResolver<'_>,
    having: Option<&Value>,
    aggregates: &[AggregateExpr],
) -> QueryResult<Option<Predicate>> {
    let Some(having) = having else {
        return Ok(None);
    };
    if !having.is_object() {
        return Err(QueryError::invalid_shape(PATH, "having should be an object"));
    }
    check_keys(having, aggregates)?;

    let filter = FilterRequest::parse(having, PATH)?;
    compile_filter(resolver, &filter, aggregates)
}

fn check_keys(value: &Value, aggregates: &[AggregateExpr]) -> QueryResult<()> {
    let Some(obj) = value.as_object() else {
        return Ok(());
    };
    for (key, inner) in obj {
        if LogicalOp::from_token(key).is_some() {
            match inner {
                Value::Array(items) => {
                    for item in items {
                        check_keys(item, aggregates)?;
                    }
                }
                other => check_keys(other, aggregates)?,
            }
        } else if !aggregates.iter().any(|a| a.alias == *key) {
            return Err(QueryError::HavingFieldNotAggregate(key.clone()));
        }
    }
    Ok(())
}

fn compile_filter(
    resolver: &mut JoinResolver<'_>,
    filter: &FilterRequest,
    aggregates: &[AggregateExpr],
) -> QueryResult<Option<Predicate>> {
    let mut parts = Vec::with_capacity(filter.terms.len());
    for term in &filter.terms {
        let compiled = match term {
            FilterTerm::Logical { op, children } => {
                let mut compiled = Vec::with_capacity(children.len());
                for child in children {
                    if let Some(pred) = compile_filter(resolver, child, aggregates)? {
                        compiled.push(pred);
                    }
                }
                combine(*op, compiled)
            }
            FilterTerm::Field { key, condition } => {
                let aggregate = aggregates
                    .iter()
                    .find(|a| a.alias == *key)
                    .ok_or_else(|| QueryError::HavingFieldNotAggregate(key.clone()))?;
                let FieldCondition::Operators(clauses) = condition else {
                    return Err(QueryError::invalid_shape(
                        key,
                        "having conditions should be an operator map",
                    ));
                };
                compile_clauses(clauses, key, &mut |operator, value| {
                    let operand = build_operand(operator, value, key, &mut |reference| {
                        resolver.resolve_field(reference).map(|(field, _)| field)
                    })?;
                    Ok(Predicate::Comparison(Comparison {
                        target: Target::Aggregate(aggregate.clone()),
                        operator,
                        operand,
                    }))
                })?
            }
        };
        if let Some(pred) = compiled {
            parts.push(pred);
        }
    }
    Ok(Predicate::all(parts))
}
