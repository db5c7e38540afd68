//! Declarative read requests and the typed filter AST parsed from them.
//!
//! A request arrives as camelCase JSON:
//!
//! ```json
//! {
//!   "modelName": "film",
//!   "filters": { "rental_rate": { "gte": 2.99 }, "actors.first_name": { "like": "John%" } },
//!   "select": ["title", "rental_rate", "language.name"],
//!   "pagination": { "limit": 2, "offset": 0 },
//!   "sorting": { "field": "title", "direction": "ASC" },
//!   "joinOptions": { "actors": "INNER" }
//! }
//! ```
//!
//! `filters` and `having` stay as JSON on the request and are parsed into a
//! [`FilterRequest`] by the compiler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{QueryError, QueryResult};
use crate::operator::{LogicalOp, Operator};

// ============================================================================
// Request envelope
// ============================================================================

/// A declarative read request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub model_name: String,
    pub filters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorting: Option<Sorting>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    /// Aggregate function name to field, in request order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub join_options: BTreeMap<String, JoinStrength>,
    #[serde(default)]
    pub global_search: bool,
}

impl QueryRequest {
    /// Minimal request for `model_name` with no filters.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            filters: Value::Object(Map::new()),
            select: None,
            pagination: Pagination::default(),
            sorting: None,
            group_by: Vec::new(),
            aggregates: None,
            having: None,
            join_options: BTreeMap::new(),
            global_search: false,
        }
    }

    pub fn from_json(json: &str) -> QueryResult<Self> {
        serde_json::from_str(json).map_err(|e| QueryError::InvalidRequest(e.to_string()))
    }

    pub fn from_value(value: Value) -> QueryResult<Self> {
        serde_json::from_value(value).map_err(|e| QueryError::InvalidRequest(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl Pagination {
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorting {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

/// Join strength requested for an association.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinStrength {
    #[serde(rename = "INNER", alias = "inner")]
    Inner,
    #[default]
    #[serde(
        rename = "LEFT",
        alias = "left",
        alias = "LEFT OUTER",
        alias = "left outer"
    )]
    Left,
}

impl JoinStrength {
    pub fn is_required(self) -> bool {
        self == JoinStrength::Inner
    }

    /// Strength requested in `joinOptions` for an association, looked up by
    /// dotted path first and then by alias.
    pub fn lookup(options: &BTreeMap<String, JoinStrength>, path: &str, alias: &str) -> Self {
        options
            .get(path)
            .or_else(|| options.get(alias))
            .copied()
            .unwrap_or_default()
    }
}

// ============================================================================
// Filter AST
// ============================================================================

/// A parsed filter: every key of the JSON object becomes one term, and
/// terms are AND-ed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRequest {
    pub terms: Vec<FilterTerm>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterTerm {
    /// `and` / `or` over a list of filters, `not` over exactly one.
    Logical {
        op: LogicalOp,
        children: Vec<FilterRequest>,
    },
    /// A field, dotted association path or bare association key.
    Field {
        key: String,
        condition: FieldCondition,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    /// `{"subquery": "<sql>"}`
    Subquery(String),
    /// An operator map such as `{"gte": 1, "lt": 5}`.
    Operators(Vec<OperatorClause>),
    /// A filter applied to the target of an association.
    Nested(FilterRequest),
    /// A bare value; only meaningful in global-search mode.
    Scalar(Value),
}

/// One entry of an operator map.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorClause {
    Compare { operator: Operator, operand: Value },
    /// `and` / `or` over a list of operator maps, `not` over one.
    Logical {
        op: LogicalOp,
        children: Vec<Vec<OperatorClause>>,
    },
}

const SUBQUERY_MARKER: &str = "subquery";

impl FilterRequest {
    /// Parse a JSON filter object. `path` names the location for errors.
    pub fn parse(value: &Value, path: &str) -> QueryResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| QueryError::invalid_shape(path, "filters should be an object"))?;

        let mut terms = Vec::with_capacity(obj.len());
        for (key, v) in obj {
            let child_path = join_path(path, key);
            let term = match LogicalOp::from_token(key) {
                Some(op) => FilterTerm::Logical {
                    op,
                    children: parse_filter_children(op, v, &child_path)?,
                },
                None => FilterTerm::Field {
                    key: key.clone(),
                    condition: FieldCondition::parse(v, &child_path)?,
                },
            };
            terms.push(term);
        }
        Ok(FilterRequest { terms })
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// First field key found in this filter, depth first.
    pub fn first_field_key(&self) -> Option<&str> {
        self.terms.iter().find_map(|term| match term {
            FilterTerm::Field { key, .. } => Some(key.as_str()),
            FilterTerm::Logical { children, .. } => {
                children.iter().find_map(|c| c.first_field_key())
            }
        })
    }

    /// Every scalar value in the filter, in request order.
    pub fn scalar_values(&self) -> Vec<Value> {
        let mut out = Vec::new();
        for term in &self.terms {
            match term {
                FilterTerm::Logical { children, .. } => {
                    for child in children {
                        out.extend(child.scalar_values());
                    }
                }
                FilterTerm::Field { condition, .. } => condition.collect_scalars(&mut out),
            }
        }
        out
    }
}

impl FieldCondition {
    fn parse(value: &Value, path: &str) -> QueryResult<Self> {
        let Some(obj) = value.as_object() else {
            return Ok(FieldCondition::Scalar(value.clone()));
        };

        if let Some(marker) = obj.get(SUBQUERY_MARKER) {
            return match (marker.as_str(), obj.len()) {
                (Some(sql), 1) => Ok(FieldCondition::Subquery(sql.to_string())),
                _ => Err(QueryError::invalid_shape(
                    path,
                    "a subquery marker must be the only key and hold a string",
                )),
            };
        }

        match classify(value) {
            Some(true) => Ok(FieldCondition::Operators(parse_operator_map(obj, path)?)),
            _ => Ok(FieldCondition::Nested(FilterRequest::parse(value, path)?)),
        }
    }

    fn collect_scalars(&self, out: &mut Vec<Value>) {
        match self {
            FieldCondition::Subquery(_) => {}
            FieldCondition::Scalar(v) => push_scalars(v, out),
            FieldCondition::Nested(filter) => out.extend(filter.scalar_values()),
            FieldCondition::Operators(clauses) => collect_clause_scalars(clauses, out),
        }
    }
}

fn collect_clause_scalars(clauses: &[OperatorClause], out: &mut Vec<Value>) {
    for clause in clauses {
        match clause {
            OperatorClause::Compare { operand, .. } => push_scalars(operand, out),
            OperatorClause::Logical { children, .. } => {
                for child in children {
                    collect_clause_scalars(child, out);
                }
            }
        }
    }
}

fn push_scalars(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|v| push_scalars(v, out)),
        Value::Object(_) | Value::Null => {}
        scalar => out.push(scalar.clone()),
    }
}

/// Decide whether an object is an operator map (`Some(true)`), a filter
/// (`Some(false)`), or cannot tell because it only holds empty combinators.
fn classify(value: &Value) -> Option<bool> {
    let obj = match value {
        Value::Object(obj) => obj,
        // a scalar under `not` is the IS NOT truth test
        _ => return Some(true),
    };
    if obj
        .keys()
        .any(|k| Operator::from_token(k).is_some() && LogicalOp::from_token(k).is_none())
    {
        return Some(true);
    }
    if obj.keys().any(|k| LogicalOp::from_token(k).is_none()) {
        return Some(false);
    }
    obj.values().find_map(|v| match v {
        Value::Array(items) => items.iter().find_map(classify),
        other => classify(other),
    })
}

fn parse_filter_children(
    op: LogicalOp,
    value: &Value,
    path: &str,
) -> QueryResult<Vec<FilterRequest>> {
    match (op, value) {
        (LogicalOp::Not, v) => Ok(vec![FilterRequest::parse(v, path)?]),
        (_, Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| FilterRequest::parse(item, &format!("{}[{}]", path, i)))
            .collect(),
        _ => Err(QueryError::invalid_shape(
            path,
            "and/or expects an array of filters",
        )),
    }
}

fn parse_operator_map(obj: &Map<String, Value>, path: &str) -> QueryResult<Vec<OperatorClause>> {
    let mut clauses = Vec::with_capacity(obj.len());
    for (token, operand) in obj {
        let child_path = join_path(path, token);
        let clause = match (LogicalOp::from_token(token), operand) {
            (Some(LogicalOp::Not), Value::Object(inner)) => OperatorClause::Logical {
                op: LogicalOp::Not,
                children: vec![parse_operator_map(inner, &child_path)?],
            },
            (Some(op @ (LogicalOp::And | LogicalOp::Or)), Value::Array(items)) => {
                let children = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let item_path = format!("{}[{}]", child_path, i);
                        item.as_object()
                            .ok_or_else(|| {
                                QueryError::invalid_shape(
                                    &item_path,
                                    "conditions should be an object",
                                )
                            })
                            .and_then(|inner| parse_operator_map(inner, &item_path))
                    })
                    .collect::<QueryResult<Vec<_>>>()?;
                OperatorClause::Logical { op, children }
            }
            (Some(LogicalOp::And | LogicalOp::Or), _) => {
                return Err(QueryError::invalid_shape(
                    &child_path,
                    "and/or expects an array of conditions",
                ))
            }
            _ => {
                let operator = Operator::from_token(token)
                    .ok_or_else(|| QueryError::UnknownOperator(token.clone()))?;
                OperatorClause::Compare {
                    operator,
                    operand: operand.clone(),
                }
            }
        };
        clauses.push(clause);
    }
    Ok(clauses)
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}
