//! Schema catalog - the read-only description of entities and associations.
//!
//! The catalog is a directed graph where every entity is a node and every
//! declared association is an edge from the owning entity to its target:
//!
//! ```text
//!   film ──language (belongs_to)──▶ language
//!    │
//!    └──actors (belongs_to_many via film_actor)──▶ actor ──films──▶ film
//! ```
//!
//! It is built once (from TOML via [`SchemaCatalog::from_toml_str`] or
//! programmatically via [`CatalogBuilder`]) and then shared read-only across
//! every compilation. There are no mutating accessors after `build()`.

mod loader;

pub use loader::CatalogFile;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while materializing a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Entity {0} is declared more than once")]
    DuplicateEntity(String),

    #[error("Entity {entity} declares {member} more than once")]
    DuplicateMember { entity: String, member: String },

    #[error("Association {alias} on {entity} targets unknown entity {target}")]
    UnknownTarget {
        entity: String,
        alias: String,
        target: String,
    },

    #[error("Association {alias} on {entity} references unknown key {key} on {on}")]
    UnknownKey {
        entity: String,
        alias: String,
        key: String,
        on: String,
    },

    #[error("Unsupported association kind: {0}")]
    UnsupportedAssociationKind(String),

    #[error("Association {alias} on {entity} is many-to-many but declares no through table")]
    MissingThrough { entity: String, alias: String },
}

// ============================================================================
// Association kinds
// ============================================================================

/// Kind of a declared association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// The owning entity holds the foreign key (`film.language_id`).
    BelongsTo,
    /// The target holds a unique foreign key back to the owner.
    HasOne,
    /// The target holds a foreign key back to the owner.
    HasMany,
    /// Linked through a junction table.
    BelongsToMany,
}

impl FromStr for AssociationKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "belongsto" => Ok(AssociationKind::BelongsTo),
            "hasone" => Ok(AssociationKind::HasOne),
            "hasmany" => Ok(AssociationKind::HasMany),
            "belongstomany" | "manytomany" => Ok(AssociationKind::BelongsToMany),
            _ => Err(CatalogError::UnsupportedAssociationKind(s.to_string())),
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssociationKind::BelongsTo => write!(f, "belongs_to"),
            AssociationKind::HasOne => write!(f, "has_one"),
            AssociationKind::HasMany => write!(f, "has_many"),
            AssociationKind::BelongsToMany => write!(f, "belongs_to_many"),
        }
    }
}

// ============================================================================
// Entities and associations
// ============================================================================

/// A field on an entity and the storage column backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub column: String,
    pub nullable: bool,
}

impl FieldDef {
    /// Field stored in a column of the same name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            column: name.into(),
            nullable: true,
        }
    }

    pub fn with_column(mut self, column: &str) -> Self {
        self.column = column.into();
        self
    }
}

/// An entity (table) in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    pub name: String,
    pub table: String,
    pub schema: Option<String>,
    pub primary_key: String,
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Entity stored in a table of the same name, keyed by `primary_key`.
    pub fn new(name: &str, primary_key: &str) -> Self {
        Self {
            name: name.into(),
            table: name.into(),
            schema: None,
            primary_key: primary_key.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add plain fields stored under their own names.
    pub fn with_fields(mut self, names: &[&str]) -> Self {
        self.fields.extend(names.iter().map(|n| FieldDef::new(n)));
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Storage column for a field, falling back to the field name itself.
    pub fn column_of<'a>(&'a self, name: &'a str) -> &'a str {
        self.field(name).map(|f| f.column.as_str()).unwrap_or(name)
    }
}

/// Junction table of a many-to-many association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Through {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Junction column pointing at the owning entity.
    pub source_fk: String,
    /// Junction column pointing at the target entity.
    pub target_fk: String,
}

/// A declared association from one entity to another.
///
/// Join condition:
/// - `BelongsTo` / `HasOne` / `HasMany`: `source.source_key = target.target_key`
/// - `BelongsToMany`: `source.source_key = through.source_fk` and
///   `through.target_fk = target.target_key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Association {
    pub alias: String,
    pub source: String,
    pub target: String,
    pub kind: AssociationKind,
    pub source_key: String,
    pub target_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub through: Option<Through>,
}

impl Association {
    pub fn belongs_to(alias: &str, target: &str, foreign_key: &str, target_key: &str) -> Self {
        Self::direct(alias, target, AssociationKind::BelongsTo, foreign_key, target_key)
    }

    pub fn has_one(alias: &str, target: &str, source_key: &str, foreign_key: &str) -> Self {
        Self::direct(alias, target, AssociationKind::HasOne, source_key, foreign_key)
    }

    pub fn has_many(alias: &str, target: &str, source_key: &str, foreign_key: &str) -> Self {
        Self::direct(alias, target, AssociationKind::HasMany, source_key, foreign_key)
    }

    pub fn belongs_to_many(
        alias: &str,
        target: &str,
        source_key: &str,
        through: Through,
        target_key: &str,
    ) -> Self {
        Self {
            alias: alias.into(),
            source: String::new(),
            target: target.into(),
            kind: AssociationKind::BelongsToMany,
            source_key: source_key.into(),
            target_key: target_key.into(),
            through: Some(through),
        }
    }

    fn direct(
        alias: &str,
        target: &str,
        kind: AssociationKind,
        source_key: &str,
        target_key: &str,
    ) -> Self {
        Self {
            alias: alias.into(),
            source: String::new(),
            target: target.into(),
            kind,
            source_key: source_key.into(),
            target_key: target_key.into(),
            through: None,
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// The immutable schema catalog.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    graph: DiGraph<EntityDef, Association>,
    entity_index: HashMap<String, NodeIndex>,
}

impl SchemaCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Look up an entity by name.
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entity_index.get(name).map(|idx| &self.graph[*idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entity_index.contains_key(name)
    }

    /// All entities in declaration order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Associations declared on `entity`, in declaration order.
    pub fn associations(&self, entity: &str) -> Vec<&Association> {
        let Some(idx) = self.entity_index.get(entity) else {
            return Vec::new();
        };
        // petgraph walks adjacency lists newest-first; edge ids follow insertion
        let mut edges: Vec<_> = self.graph.edges(*idx).collect();
        edges.sort_by_key(|e| e.id());
        edges.into_iter().map(|e| e.weight()).collect()
    }

    /// Association on `entity` declared under `alias`.
    pub fn association(&self, entity: &str, alias: &str) -> Option<&Association> {
        self.associations(entity)
            .into_iter()
            .find(|a| a.alias == alias)
    }

    /// First association of `entity` whose target declares `field`.
    pub fn association_with_field(&self, entity: &str, field: &str) -> Option<&Association> {
        self.associations(entity).into_iter().find(|a| {
            self.entity(&a.target)
                .map(|target| target.has_field(field))
                .unwrap_or(false)
        })
    }
}

/// Builder that validates entities and associations before freezing them.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entities: Vec<EntityDef>,
    associations: Vec<Association>,
}

impl CatalogBuilder {
    pub fn entity(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self
    }

    /// Declare an association owned by `source`.
    pub fn association(mut self, source: &str, mut association: Association) -> Self {
        association.source = source.into();
        self.associations.push(association);
        self
    }

    pub fn build(self) -> Result<SchemaCatalog, CatalogError> {
        let mut graph = DiGraph::new();
        let mut entity_index = HashMap::new();

        for entity in self.entities {
            if entity_index.contains_key(&entity.name) {
                return Err(CatalogError::DuplicateEntity(entity.name));
            }
            let mut seen = std::collections::HashSet::new();
            for field in &entity.fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(CatalogError::DuplicateMember {
                        entity: entity.name.clone(),
                        member: field.name.clone(),
                    });
                }
            }
            let name = entity.name.clone();
            let idx = graph.add_node(entity);
            entity_index.insert(name, idx);
        }

        for association in self.associations {
            validate_association(&graph, &entity_index, &association)?;
            let from = entity_index[&association.source];
            let to = entity_index[&association.target];
            let duplicate = graph
                .edges(from)
                .any(|e| e.weight().alias == association.alias);
            if duplicate {
                return Err(CatalogError::DuplicateMember {
                    entity: association.source,
                    member: association.alias,
                });
            }
            graph.add_edge(from, to, association);
        }

        Ok(SchemaCatalog {
            graph,
            entity_index,
        })
    }
}

fn validate_association(
    graph: &DiGraph<EntityDef, Association>,
    entity_index: &HashMap<String, NodeIndex>,
    association: &Association,
) -> Result<(), CatalogError> {
    let source = entity_index
        .get(&association.source)
        .map(|idx| &graph[*idx])
        .ok_or_else(|| CatalogError::UnknownTarget {
            entity: association.source.clone(),
            alias: association.alias.clone(),
            target: association.source.clone(),
        })?;
    let target = entity_index
        .get(&association.target)
        .map(|idx| &graph[*idx])
        .ok_or_else(|| CatalogError::UnknownTarget {
            entity: association.source.clone(),
            alias: association.alias.clone(),
            target: association.target.clone(),
        })?;

    let unknown_key = |key: &str, on: &str| CatalogError::UnknownKey {
        entity: association.source.clone(),
        alias: association.alias.clone(),
        key: key.to_string(),
        on: on.to_string(),
    };

    if !source.has_field(&association.source_key) {
        return Err(unknown_key(&association.source_key, &source.name));
    }
    if !target.has_field(&association.target_key) {
        return Err(unknown_key(&association.target_key, &target.name));
    }

    match (association.kind, &association.through) {
        (AssociationKind::BelongsToMany, None) => Err(CatalogError::MissingThrough {
            entity: association.source.clone(),
            alias: association.alias.clone(),
        }),
        _ => Ok(()),
    }
}
