//! Raw subquery fragments (`{"subquery": "<sql>"}`).
//!
//! Fragments are opaque: never parsed, validated or escaped. They are
//! embedded verbatim by the renderer, either as `field = (<sql>)` or as a
//! correlated `EXISTS` over an association.

use super::RawFragmentPolicy;
use crate::catalog::{EntityDef, SchemaCatalog};
use crate::error::{QueryError, QueryResult};
use crate::plan::{ColumnRef, FieldRef, FragmentScope, Predicate, RawFragment};

/// Build the predicate for a subquery marker found under `key`.
pub fn build(
    catalog: &SchemaCatalog,
    entity: &EntityDef,
    sql_alias: &str,
    key: &str,
    sql: &str,
    policy: RawFragmentPolicy,
) -> QueryResult<Predicate> {
    if policy == RawFragmentPolicy::Reject {
        return Err(QueryError::RawSubqueryRejected(key.to_string()));
    }

    let scope = if let Some(def) = entity.field(key) {
        FragmentScope::Field(FieldRef {
            name: key.to_string(),
            column: ColumnRef::new(sql_alias, &def.column),
        })
    } else if let Some(assoc) = catalog.association(&entity.name, key) {
        FragmentScope::Exists {
            source: sql_alias.to_string(),
            association: assoc.clone(),
        }
    } else {
        return Err(QueryError::unknown_field(&entity.name, key));
    };

    tracing::warn!(entity = %entity.name, key, "embedding raw subquery fragment");
    Ok(Predicate::RawSubquery(RawFragment {
        sql: sql.to_string(),
        scope,
    }))
}
