//! GROUP BY normalization.
//!
//! Once a request groups (explicit group-by or any aggregate), every
//! non-aggregated output column must be grouped. The set is the explicit
//! entries first, then the flat projection, then joined projections, each
//! resolved to its storage column and deduplicated.

use std::collections::HashSet;

use super::joins::JoinResolver;
use crate::error::{QueryError, QueryResult};
use crate::plan::{ColumnRef, JoinSpec, Projection};

pub fn normalize(
    resolver: &mut JoinResolver<'_>,
    explicit: &[String],
    projection: &Projection,
    grouping: bool,
) -> QueryResult<Vec<ColumnRef>> {
    if !grouping {
        return Ok(Vec::new());
    }

    let mut set = ColumnSet::default();
    for entry in explicit {
        let (field, _) = resolver.resolve_field(entry)?;
        set.insert(field.column);
    }

    let root = resolver.root();
    for field in &projection.fields {
        set.insert(ColumnRef::new(&root.name, root.column_of(field)));
    }

    let catalog = resolver.catalog();
    for join in resolver.joins().iter().flat_map(JoinSpec::flatten) {
        if join.projected_fields.is_empty() {
            continue;
        }
        let target = catalog
            .entity(&join.target_entity)
            .ok_or_else(|| QueryError::EntityNotFound(join.target_entity.clone()))?;
        for field in &join.projected_fields {
            set.insert(ColumnRef::new(&join.path, target.column_of(field)));
        }
    }

    Ok(set.columns)
}

#[derive(Default)]
struct ColumnSet {
    seen: HashSet<ColumnRef>,
    columns: Vec<ColumnRef>,
}

impl ColumnSet {
    fn insert(&mut self, column: ColumnRef) {
        if self.seen.insert(column.clone()) {
            self.columns.push(column);
        }
    }
}
