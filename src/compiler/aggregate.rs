//! Aggregate projections, aliased `{function}_{field}`.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use super::joins::JoinResolver;
use crate::error::{QueryError, QueryResult};
use crate::plan::AggregateExpr;

static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Alias of an aggregate. HAVING keys and aggregate sorts match on it.
pub fn alias(function: &str, field: &str) -> String {
    format!("{}_{}", function, field)
}

/// Build aggregate expressions in request order.
pub fn build(
    resolver: &mut JoinResolver<'_>,
    aggregates: Option<&Map<String, Value>>,
) -> QueryResult<Vec<AggregateExpr>> {
    let Some(aggregates) = aggregates else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(aggregates.len());
    for (function, field) in aggregates {
        if !FUNCTION_NAME.is_match(function) {
            return Err(QueryError::InvalidRequest(format!(
                "aggregate function {:?} is not a plain identifier",
                function
            )));
        }
        let field_name = field.as_str().ok_or_else(|| {
            QueryError::InvalidRequest(format!(
                "aggregate {} expects a field name",
                function
            ))
        })?;
        let (field, _) = resolver.resolve_field(field_name)?;
        out.push(AggregateExpr {
            function: function.clone(),
            alias: alias(function, field_name),
            field,
        });
    }
    Ok(out)
}
