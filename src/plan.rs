//! The compiled, immutable query plan.
//!
//! A [`QueryPlan`] is produced once per request by
//! [`crate::compiler::PlanAssembler`] and consumed by the renderer and the
//! execution engine. Column references carry the SQL alias of the relation
//! they belong to: the entity name for the root, the `->`-joined association
//! path for joins.

use serde::Serialize;
use serde_json::Value;

use crate::catalog::Association;
use crate::operator::{LogicalOp, Operator};
use crate::request::{Pagination, SortDirection};

/// A storage column on a relation in the statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnRef {
    /// SQL alias of the relation (entity name or join path).
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// A resolved field: the name as requested plus its storage column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRef {
    /// Field as written in the request (`title`, `language.name`).
    pub name: String,
    pub column: ColumnRef,
}

/// An aggregate projection `function(field) AS function_field`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateExpr {
    pub function: String,
    pub field: FieldRef,
    pub alias: String,
}

/// Left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Field(FieldRef),
    Aggregate(AggregateExpr),
}

/// Right-hand side of a comparison, already shape-checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Value(Value),
    List(Vec<Value>),
    Range(Value, Value),
    Column(FieldRef),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub target: Target,
    pub operator: Operator,
    pub operand: Operand,
}

/// Where a raw fragment is embedded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentScope {
    /// `field = (<sql>)`
    Field(FieldRef),
    /// `EXISTS (SELECT 1 FROM <target> ... WHERE <join keys> AND (<sql>))`
    Exists {
        /// SQL alias of the owning relation.
        source: String,
        association: Association,
    },
}

/// A caller-supplied SQL fragment, embedded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawFragment {
    pub sql: String,
    pub scope: FragmentScope,
}

/// Predicate tree node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Comparison(Comparison),
    Logical {
        op: LogicalOp,
        children: Vec<Predicate>,
    },
    /// A comparison evaluated against a joined association.
    AssociationQualified {
        /// SQL alias of the join (`actors`, `actors->films`).
        alias: String,
        comparison: Comparison,
    },
    RawSubquery(RawFragment),
    /// Global-search term: a LIKE pattern with no column bound to it.
    GlobalPattern { pattern: String },
}

impl Predicate {
    /// AND a list of predicates; a single child is returned as is.
    pub fn all(mut children: Vec<Predicate>) -> Option<Predicate> {
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(Predicate::Logical {
                op: LogicalOp::And,
                children,
            }),
        }
    }

    /// Visit every comparison in the tree.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            Predicate::Comparison(c) | Predicate::AssociationQualified { comparison: c, .. } => {
                out.push(c)
            }
            Predicate::Logical { children, .. } => {
                children.iter().for_each(|c| c.collect_comparisons(out))
            }
            Predicate::RawSubquery(_) | Predicate::GlobalPattern { .. } => {}
        }
    }
}

/// A resolved association join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinSpec {
    /// Association alias on the parent entity.
    pub alias: String,
    /// SQL alias of the joined relation.
    pub path: String,
    /// SQL alias of the parent relation.
    pub parent: String,
    pub target_entity: String,
    pub association: Association,
    /// INNER when true, LEFT OUTER otherwise.
    pub required: bool,
    pub projected_fields: Vec<String>,
    pub nested: Vec<JoinSpec>,
}

impl JoinSpec {
    /// This join followed by all nested joins, depth first.
    pub fn flatten(&self) -> Vec<&JoinSpec> {
        let mut out = vec![self];
        for child in &self.nested {
            out.extend(child.flatten());
        }
        out
    }
}

/// Root-entity projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Projection {
    /// Entity-local field names; never contain a separator.
    pub fields: Vec<String>,
    /// No explicit select was given and every local field is projected.
    pub wildcard: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortTarget {
    Field(FieldRef),
    /// Sort by an aggregate alias.
    Aggregate(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortSpec {
    pub target: SortTarget,
    pub direction: SortDirection,
}

/// The complete description of one read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub entity: String,
    pub projection: Projection,
    pub predicate: Option<Predicate>,
    pub joins: Vec<JoinSpec>,
    pub group_by: Vec<ColumnRef>,
    pub having: Option<Predicate>,
    pub aggregates: Vec<AggregateExpr>,
    pub sort: Option<SortSpec>,
    pub pagination: Option<Pagination>,
}

impl QueryPlan {
    /// The same plan with limit/offset removed.
    pub fn without_pagination(&self) -> QueryPlan {
        QueryPlan {
            pagination: None,
            ..self.clone()
        }
    }

    /// Every join in the plan, depth first.
    pub fn all_joins(&self) -> Vec<&JoinSpec> {
        self.joins.iter().flat_map(|j| j.flatten()).collect()
    }

    /// Find a join by its SQL alias.
    pub fn join(&self, path: &str) -> Option<&JoinSpec> {
        self.all_joins().into_iter().find(|j| j.path == path)
    }
}
