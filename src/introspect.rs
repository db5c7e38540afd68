//! Schema tree introspection over the catalog's association graph.
//!
//! Walks are bounded by a caller-supplied depth and guarded against cycles
//! with the set of entities on the current path, so mutually associated
//! entities (`film` ↔ `actor`) terminate even when the depth would allow
//! another lap.

use serde::Serialize;

use crate::catalog::{AssociationKind, SchemaCatalog, Through};
use crate::error::{QueryError, QueryResult};

/// Why a walk stopped at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TreeMarker {
    #[serde(rename = "Depth limit reached")]
    DepthLimitReached,
    #[serde(rename = "Cycle detected")]
    CycleDetected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Associations {
    Children(Vec<AssociationNode>),
    Marker(TreeMarker),
}

/// One entity with its fields and association subtrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityTree {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    pub associations: Associations,
}

impl EntityTree {
    fn marker(name: &str, marker: TreeMarker) -> Self {
        Self {
            name: name.to_string(),
            fields: None,
            associations: Associations::Marker(marker),
        }
    }

    pub fn children(&self) -> &[AssociationNode] {
        match &self.associations {
            Associations::Children(children) => children,
            Associations::Marker(_) => &[],
        }
    }

    pub fn marker_kind(&self) -> Option<TreeMarker> {
        match self.associations {
            Associations::Marker(marker) => Some(marker),
            Associations::Children(_) => None,
        }
    }
}

/// An association edge plus the subtree of its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationNode {
    pub alias: String,
    pub kind: AssociationKind,
    pub source_key: String,
    pub target_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub through: Option<Through>,
    #[serde(flatten)]
    pub tree: EntityTree,
}

pub struct SchemaIntrospector<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> SchemaIntrospector<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Tree rooted at `entity`.
    pub fn tree(&self, entity: &str, depth: usize) -> QueryResult<EntityTree> {
        if !self.catalog.contains(entity) {
            return Err(QueryError::EntityNotFound(entity.to_string()));
        }
        let mut path = Vec::new();
        Ok(self.walk(entity, depth, &mut path))
    }

    /// One tree per entity, in declaration order.
    pub fn forest(&self, depth: usize) -> Vec<EntityTree> {
        self.catalog
            .entities()
            .map(|e| self.walk(&e.name, depth, &mut Vec::new()))
            .collect()
    }

    fn walk(&self, entity: &str, depth: usize, path: &mut Vec<String>) -> EntityTree {
        if depth == 0 {
            return EntityTree::marker(entity, TreeMarker::DepthLimitReached);
        }
        let Some(def) = self.catalog.entity(entity) else {
            return EntityTree::marker(entity, TreeMarker::DepthLimitReached);
        };

        path.push(entity.to_string());
        let children = self
            .catalog
            .associations(entity)
            .into_iter()
            .map(|assoc| {
                let tree = if path.iter().any(|p| *p == assoc.target) {
                    EntityTree::marker(&assoc.target, TreeMarker::CycleDetected)
                } else {
                    self.walk(&assoc.target, depth - 1, path)
                };
                AssociationNode {
                    alias: assoc.alias.clone(),
                    kind: assoc.kind,
                    source_key: assoc.source_key.clone(),
                    target_key: assoc.target_key.clone(),
                    through: assoc.through.clone(),
                    tree,
                }
            })
            .collect();
        path.pop();

        EntityTree {
            name: def.name.clone(),
            fields: Some(def.field_names()),
            associations: Associations::Children(children),
        }
    }

    /// Every field reachable from `entity` as a dotted path
    /// (`title`, `language.name`, `actor.first_name`), up to `depth`
    /// association hops.
    pub fn field_paths(&self, entity: &str, depth: usize) -> QueryResult<Vec<String>> {
        if !self.catalog.contains(entity) {
            return Err(QueryError::EntityNotFound(entity.to_string()));
        }
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_fields(entity, "", depth, &mut path, &mut out);
        Ok(out)
    }

    fn collect_fields(
        &self,
        entity: &str,
        prefix: &str,
        depth: usize,
        path: &mut Vec<String>,
        out: &mut Vec<String>,
    ) {
        let Some(def) = self.catalog.entity(entity) else {
            return;
        };
        out.extend(def.fields.iter().map(|f| format!("{}{}", prefix, f.name)));
        if depth == 0 {
            return;
        }

        path.push(entity.to_string());
        for assoc in self.catalog.associations(entity) {
            if path.iter().any(|p| *p == assoc.target) {
                continue;
            }
            let nested = format!("{}{}.", prefix, assoc.alias);
            self.collect_fields(&assoc.target, &nested, depth - 1, path, out);
        }
        path.pop();
    }
}
