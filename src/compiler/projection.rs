//! Output projection: flat root fields plus per-join field lists.

use super::joins::JoinResolver;
use crate::error::{QueryError, QueryResult};
use crate::plan::Projection;

/// Build the projection from the requested select list.
///
/// Dotted entries land in their join's projection; the flat list only ever
/// holds fields of the root entity.
pub fn build(
    resolver: &mut JoinResolver<'_>,
    select: Option<&[String]>,
) -> QueryResult<Projection> {
    let Some(select) = select else {
        return Ok(Projection {
            fields: resolver.root().field_names(),
            wildcard: true,
        });
    };

    let mut fields: Vec<String> = Vec::with_capacity(select.len());
    for entry in select {
        let segments: Vec<&str> = entry.split('.').collect();
        match segments.split_last() {
            Some((field, [])) => {
                let root = resolver.root();
                if !root.has_field(field) {
                    return Err(QueryError::unknown_field(&root.name, field));
                }
                if !fields.iter().any(|f| f == field) {
                    fields.push(field.to_string());
                }
            }
            Some((field, path)) => {
                let catalog = resolver.catalog();
                let join = resolver.ensure(path)?;
                let target = catalog
                    .entity(&join.target_entity)
                    .ok_or_else(|| QueryError::EntityNotFound(join.target_entity.clone()))?;
                if !target.has_field(field) {
                    return Err(QueryError::unknown_field(&target.name, field));
                }
                JoinResolver::project(join, field);
            }
            None => return Err(QueryError::unknown_field(&resolver.root().name, entry)),
        }
    }

    Ok(Projection {
        fields,
        wildcard: false,
    })
}
