//! Association path resolution into a deduplicated join tree.

use std::collections::BTreeMap;

use crate::catalog::{Association, EntityDef, SchemaCatalog};
use crate::error::{QueryError, QueryResult};
use crate::plan::{ColumnRef, FieldRef, JoinSpec};
use crate::request::JoinStrength;

/// Separator of SQL aliases for nested joins.
pub const PATH_SEPARATOR: &str = "->";

/// Collects the joins a compile needs, one per alias per parent.
pub struct JoinResolver<'a> {
    catalog: &'a SchemaCatalog,
    root: &'a EntityDef,
    join_options: &'a BTreeMap<String, JoinStrength>,
    joins: Vec<JoinSpec>,
}

impl<'a> JoinResolver<'a> {
    pub fn new(
        catalog: &'a SchemaCatalog,
        root: &'a EntityDef,
        join_options: &'a BTreeMap<String, JoinStrength>,
    ) -> Self {
        Self {
            catalog,
            root,
            join_options,
            joins: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &'a SchemaCatalog {
        self.catalog
    }

    pub fn root(&self) -> &'a EntityDef {
        self.root
    }

    /// Ensure a join exists for every segment of `segments`, walking from the
    /// root entity. Returns the innermost join.
    ///
    /// The first registration of an alias decides its strength; later
    /// registrations reuse the existing join.
    pub fn ensure(&mut self, segments: &[&str]) -> QueryResult<&mut JoinSpec> {
        if segments.is_empty() {
            return Err(QueryError::InvalidRequest(
                "empty association path".to_string(),
            ));
        }

        let mut steps: Vec<&'a Association> = Vec::with_capacity(segments.len());
        let mut owner = self.root.name.as_str();
        for segment in segments {
            let assoc = self
                .catalog
                .association(owner, segment)
                .ok_or_else(|| QueryError::unknown_association(owner, segment))?;
            owner = assoc.target.as_str();
            steps.push(assoc);
        }

        let options = self.join_options;
        let mut parent = self.root.name.clone();
        let mut dotted: Vec<&str> = Vec::with_capacity(segments.len());
        let mut level = &mut self.joins;
        let mut idx = 0;

        for (i, assoc) in steps.into_iter().enumerate() {
            if i > 0 {
                parent = level[idx].path.clone();
                level = &mut level[idx].nested;
            }
            dotted.push(assoc.alias.as_str());

            idx = match level.iter().position(|j| j.alias == assoc.alias) {
                Some(existing) => existing,
                None => {
                    let path = dotted.join(".");
                    let strength = JoinStrength::lookup(options, &path, &assoc.alias);
                    tracing::trace!(path = %path, required = strength.is_required(), "new join");
                    level.push(JoinSpec {
                        alias: assoc.alias.clone(),
                        path: dotted.join(PATH_SEPARATOR),
                        parent: parent.clone(),
                        target_entity: assoc.target.clone(),
                        association: assoc.clone(),
                        required: strength.is_required(),
                        projected_fields: Vec::new(),
                        nested: Vec::new(),
                    });
                    level.len() - 1
                }
            };
        }

        Ok(&mut level[idx])
    }

    /// Resolve a possibly dotted field reference relative to the root
    /// entity, creating joins for the association segments.
    pub fn resolve_field(&mut self, reference: &str) -> QueryResult<(FieldRef, Option<String>)> {
        let segments: Vec<&str> = reference.split('.').collect();
        let (field, path) = match segments.split_last() {
            Some((field, [])) => {
                let root = self.root;
                let def = root
                    .field(field)
                    .ok_or_else(|| QueryError::unknown_field(&root.name, field))?;
                return Ok((
                    FieldRef {
                        name: reference.to_string(),
                        column: ColumnRef::new(&root.name, &def.column),
                    },
                    None,
                ));
            }
            Some((field, path)) => (*field, path),
            None => return Err(QueryError::unknown_field(&self.root.name, reference)),
        };

        let catalog = self.catalog;
        let join = self.ensure(path)?;
        let target = catalog
            .entity(&join.target_entity)
            .ok_or_else(|| QueryError::EntityNotFound(join.target_entity.clone()))?;
        let def = target
            .field(field)
            .ok_or_else(|| QueryError::unknown_field(&target.name, field))?;
        let sql_alias = join.path.clone();
        Ok((
            FieldRef {
                name: reference.to_string(),
                column: ColumnRef::new(&sql_alias, &def.column),
            },
            Some(sql_alias),
        ))
    }

    /// Append `field` to a join's projection, keeping the first occurrence.
    pub fn project(join: &mut JoinSpec, field: &str) {
        if !join.projected_fields.iter().any(|f| f == field) {
            join.projected_fields.push(field.to_string());
        }
    }

    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    pub fn into_joins(self) -> Vec<JoinSpec> {
        self.joins
    }
}
