//! Filter compilation: [`FilterRequest`] into a [`Predicate`] tree.
//!
//! Keys resolve in this order: logical combinator, local field, association
//! alias, field of a directly associated entity. Dotted keys walk
//! association paths of any depth. Every association reached registers a
//! join with the [`JoinResolver`].

use serde_json::Value;

use super::joins::JoinResolver;
use super::subquery;
use super::RawFragmentPolicy;
use crate::catalog::EntityDef;
use crate::error::{QueryError, QueryResult};
use crate::operator::{LogicalOp, OperandShape, Operator};
use crate::plan::{ColumnRef, Comparison, FieldRef, Operand, Predicate, Target};
use crate::request::{FieldCondition, FilterRequest, FilterTerm, OperatorClause};

/// The relation a filter is being compiled against.
#[derive(Debug, Clone)]
struct Scope<'a> {
    entity: &'a EntityDef,
    /// Association aliases from the root; empty at the root.
    segments: Vec<String>,
    /// SQL alias of the relation.
    sql_alias: String,
}

impl<'a> Scope<'a> {
    fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    fn child(&self, alias: &str) -> Vec<String> {
        let mut segments = self.segments.clone();
        segments.push(alias.to_string());
        segments
    }
}

/// Column a field term compares against, with the join that owns it.
struct FieldTarget {
    field: FieldRef,
    join: Option<String>,
}

pub struct FilterCompiler<'r, 'a> {
    resolver: &'r mut JoinResolver<'a>,
    raw_fragments: RawFragmentPolicy,
}

impl<'r, 'a> FilterCompiler<'r, 'a> {
    pub fn new(resolver: &'r mut JoinResolver<'a>, raw_fragments: RawFragmentPolicy) -> Self {
        Self {
            resolver,
            raw_fragments,
        }
    }

    /// Compile a filter against the root entity.
    pub fn compile(&mut self, filter: &FilterRequest) -> QueryResult<Option<Predicate>> {
        let root = self.resolver.root();
        let scope = Scope {
            entity: root,
            segments: Vec::new(),
            sql_alias: root.name.clone(),
        };
        self.compile_in(filter, &scope)
    }

    fn compile_in(
        &mut self,
        filter: &FilterRequest,
        scope: &Scope<'a>,
    ) -> QueryResult<Option<Predicate>> {
        let mut parts = Vec::with_capacity(filter.terms.len());
        for term in &filter.terms {
            if let Some(pred) = self.compile_term(term, scope)? {
                parts.push(pred);
            }
        }
        Ok(Predicate::all(parts))
    }

    fn compile_term(
        &mut self,
        term: &FilterTerm,
        scope: &Scope<'a>,
    ) -> QueryResult<Option<Predicate>> {
        match term {
            FilterTerm::Logical { op, children } => {
                let mut compiled = Vec::with_capacity(children.len());
                for child in children {
                    if let Some(pred) = self.compile_in(child, scope)? {
                        compiled.push(pred);
                    }
                }
                Ok(combine(*op, compiled))
            }
            FilterTerm::Field { key, condition } => self.compile_field(key, condition, scope),
        }
    }

    fn compile_field(
        &mut self,
        key: &str,
        condition: &FieldCondition,
        scope: &Scope<'a>,
    ) -> QueryResult<Option<Predicate>> {
        if let FieldCondition::Subquery(sql) = condition {
            let catalog = self.resolver.catalog();
            return subquery::build(
                catalog,
                scope.entity,
                &scope.sql_alias,
                key,
                sql,
                self.raw_fragments,
            )
            .map(Some);
        }

        if key.contains('.') {
            return self.compile_dotted(key, condition, scope);
        }

        let catalog = self.resolver.catalog();
        let entity = scope.entity;

        if let Some(def) = entity.field(key) {
            let target = FieldTarget {
                field: FieldRef {
                    name: qualified_name(scope, key),
                    column: ColumnRef::new(&scope.sql_alias, &def.column),
                },
                join: (!scope.is_root()).then(|| scope.sql_alias.clone()),
            };
            return self.compile_condition(key, condition, &target);
        }

        if catalog.association(&entity.name, key).is_some() {
            return self.compile_association(key, scope.child(key), condition);
        }

        if let Some(assoc) = catalog.association_with_field(&entity.name, key) {
            let segments = scope.child(&assoc.alias);
            let target = self.join_field(&segments, key, key)?;
            return self.compile_condition(key, condition, &target);
        }

        Err(QueryError::unknown_field(&entity.name, key))
    }

    /// `assoc.field` or `assoc.nested_assoc` (with a nested filter).
    fn compile_dotted(
        &mut self,
        key: &str,
        condition: &FieldCondition,
        scope: &Scope<'a>,
    ) -> QueryResult<Option<Predicate>> {
        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, head)) = parts.split_last() else {
            return Err(QueryError::unknown_field(&scope.entity.name, key));
        };
        let mut segments = scope.segments.clone();
        segments.extend(head.iter().map(|s| s.to_string()));

        if matches!(condition, FieldCondition::Nested(_)) {
            let owner = self.owner_of(&segments)?;
            if self.resolver.catalog().association(&owner.name, last).is_some() {
                segments.push(last.to_string());
                return self.compile_association(key, segments, condition);
            }
        }

        let target = self.join_field(&segments, last, key)?;
        self.compile_condition(key, condition, &target)
    }

    /// Entity reached by walking `segments` from the root, without joining.
    fn owner_of(&self, segments: &[String]) -> QueryResult<&'a EntityDef> {
        let catalog = self.resolver.catalog();
        let mut entity = self.resolver.root();
        for segment in segments {
            let assoc = catalog
                .association(&entity.name, segment)
                .ok_or_else(|| QueryError::unknown_association(&entity.name, segment))?;
            entity = catalog
                .entity(&assoc.target)
                .ok_or_else(|| QueryError::EntityNotFound(assoc.target.clone()))?;
        }
        Ok(entity)
    }

    /// Join `segments` and bind `field` on the joined entity.
    fn join_field(
        &mut self,
        segments: &[String],
        field: &str,
        name: &str,
    ) -> QueryResult<FieldTarget> {
        let catalog = self.resolver.catalog();
        let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
        let join = self.resolver.ensure(&refs)?;
        let entity = catalog
            .entity(&join.target_entity)
            .ok_or_else(|| QueryError::EntityNotFound(join.target_entity.clone()))?;
        let def = entity
            .field(field)
            .ok_or_else(|| QueryError::unknown_field(&entity.name, field))?;
        Ok(FieldTarget {
            field: FieldRef {
                name: name.to_string(),
                column: ColumnRef::new(&join.path, &def.column),
            },
            join: Some(join.path.clone()),
        })
    }

    /// A bare association key: the nested filter applies to the target.
    fn compile_association(
        &mut self,
        key: &str,
        segments: Vec<String>,
        condition: &FieldCondition,
    ) -> QueryResult<Option<Predicate>> {
        let nested = match condition {
            FieldCondition::Nested(nested) => nested,
            FieldCondition::Operators(_) => {
                return Err(QueryError::invalid_shape(
                    key,
                    "an association key takes a nested filter, not an operator map",
                ))
            }
            FieldCondition::Scalar(_) => {
                return Err(QueryError::invalid_shape(key, "conditions should be an object"))
            }
            FieldCondition::Subquery(_) => {
                return Err(QueryError::invalid_shape(key, "subquery fragment in field position"))
            }
        };

        let catalog = self.resolver.catalog();
        let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
        let join = self.resolver.ensure(&refs)?;
        let entity = catalog
            .entity(&join.target_entity)
            .ok_or_else(|| QueryError::EntityNotFound(join.target_entity.clone()))?;
        for term in &nested.terms {
            if let FilterTerm::Field { key, .. } = term {
                if entity.has_field(key) {
                    JoinResolver::project(join, key);
                }
            }
        }

        let scope = Scope {
            entity,
            sql_alias: join.path.clone(),
            segments,
        };
        self.compile_in(nested, &scope)
    }

    fn compile_condition(
        &mut self,
        key: &str,
        condition: &FieldCondition,
        target: &FieldTarget,
    ) -> QueryResult<Option<Predicate>> {
        match condition {
            FieldCondition::Operators(clauses) => {
                let resolver = &mut *self.resolver;
                compile_clauses(clauses, key, &mut |operator, value| {
                    let operand = build_operand(operator, value, key, &mut |reference| {
                        resolver.resolve_field(reference).map(|(field, _)| field)
                    })?;
                    let comparison = Comparison {
                        target: Target::Field(target.field.clone()),
                        operator,
                        operand,
                    };
                    Ok(match &target.join {
                        Some(alias) => Predicate::AssociationQualified {
                            alias: alias.clone(),
                            comparison,
                        },
                        None => Predicate::Comparison(comparison),
                    })
                })
            }
            // `{}` or only empty combinators: no condition on this field
            FieldCondition::Nested(nested) if nested.first_field_key().is_none() => Ok(None),
            FieldCondition::Nested(nested) => Err(QueryError::UnknownOperator(
                nested.first_field_key().unwrap_or(key).to_string(),
            )),
            FieldCondition::Scalar(_) => {
                Err(QueryError::invalid_shape(key, "conditions should be an object"))
            }
            FieldCondition::Subquery(_) => {
                Err(QueryError::invalid_shape(key, "subquery fragment in field position"))
            }
        }
    }
}

fn qualified_name(scope: &Scope<'_>, field: &str) -> String {
    if scope.is_root() {
        field.to_string()
    } else {
        format!("{}.{}", scope.segments.join("."), field)
    }
}

/// Wrap compiled children in a logical node; empty input compiles to
/// nothing.
pub(crate) fn combine(op: LogicalOp, mut children: Vec<Predicate>) -> Option<Predicate> {
    match (op, children.len()) {
        (_, 0) => None,
        (LogicalOp::Not, _) => Some(Predicate::Logical {
            op: LogicalOp::Not,
            children: vec![Predicate::all(children)?],
        }),
        (LogicalOp::And, _) => Predicate::all(children),
        (LogicalOp::Or, 1) => children.pop(),
        (LogicalOp::Or, _) => Some(Predicate::Logical {
            op: LogicalOp::Or,
            children,
        }),
    }
}

/// Compile an operator map. Several operators on one field are AND-ed.
pub(crate) fn compile_clauses(
    clauses: &[OperatorClause],
    path: &str,
    leaf: &mut dyn FnMut(Operator, &Value) -> QueryResult<Predicate>,
) -> QueryResult<Option<Predicate>> {
    let mut parts = Vec::with_capacity(clauses.len());
    for clause in clauses {
        match clause {
            OperatorClause::Compare { operator, operand } => parts.push(leaf(*operator, operand)?),
            OperatorClause::Logical { op, children } => {
                let mut compiled = Vec::with_capacity(children.len());
                for child in children {
                    if let Some(pred) = compile_clauses(child, path, leaf)? {
                        compiled.push(pred);
                    }
                }
                if let Some(pred) = combine(*op, compiled) {
                    parts.push(pred);
                }
            }
        }
    }
    Ok(Predicate::all(parts))
}

/// Check an operand against the shape its operator needs.
pub(crate) fn build_operand(
    operator: Operator,
    value: &Value,
    path: &str,
    resolve_column: &mut dyn FnMut(&str) -> QueryResult<FieldRef>,
) -> QueryResult<Operand> {
    let at = format!("{}.{}", path, operator);
    match operator.operand_shape() {
        OperandShape::Scalar => {
            if !is_scalar(value) {
                return Err(QueryError::invalid_shape(&at, "expected a scalar value"));
            }
            if value.is_null()
                && !matches!(operator, Operator::Eq | Operator::Ne | Operator::Not)
            {
                return Err(QueryError::invalid_shape(
                    &at,
                    "null is only accepted by eq, ne and not",
                ));
            }
            if operator == Operator::Not && !(value.is_boolean() || value.is_null()) {
                return Err(QueryError::invalid_shape(&at, "not takes true, false or null"));
            }
            if operator.is_pattern() && !value.is_string() {
                return Err(QueryError::invalid_shape(&at, "pattern must be a string"));
            }
            Ok(Operand::Value(value.clone()))
        }
        OperandShape::List => match value {
            Value::Array(items) if items.iter().all(is_scalar) => Ok(Operand::List(items.clone())),
            _ => Err(QueryError::invalid_shape(&at, "expected an array of scalars")),
        },
        OperandShape::Range => match value {
            Value::Array(items) if items.len() == 2 && items.iter().all(is_scalar) => {
                Ok(Operand::Range(items[0].clone(), items[1].clone()))
            }
            _ => Err(QueryError::invalid_shape(&at, "expected a two-element array")),
        },
        OperandShape::FieldRef => match value {
            Value::String(reference) => Ok(Operand::Column(resolve_column(reference)?)),
            _ => Err(QueryError::invalid_shape(&at, "expected a field reference")),
        },
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Global search: one `%value%` pattern per scalar in the filter, OR-ed.
pub fn global_search(filter: &FilterRequest) -> Option<Predicate> {
    let patterns = filter
        .scalar_values()
        .into_iter()
        .map(|value| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            Predicate::GlobalPattern {
                pattern: format!("%{}%", text),
            }
        })
        .collect();
    combine(LogicalOp::Or, patterns)
}
