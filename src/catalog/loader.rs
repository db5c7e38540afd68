//! TOML catalog format.
//!
//! ```toml
//! [[entity]]
//! name = "film"
//! primary_key = "film_id"
//! fields = ["film_id", "title", { name = "rate", column = "rental_rate", nullable = false }]
//!
//! [[entity.association]]
//! alias = "language"
//! kind = "belongs_to"
//! target = "language"
//! source_key = "language_id"
//!
//! [[entity.association]]
//! alias = "actors"
//! kind = "belongs_to_many"
//! target = "actor"
//! through = { table = "film_actor", source_fk = "film_id", target_fk = "actor_id" }
//! ```
//!
//! Omitted join keys follow the shared-key-name convention: the primary key
//! of the entity on the "one" side names the column on both sides.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::{
    Association, AssociationKind, CatalogError, EntityDef, FieldDef, SchemaCatalog, Through,
};

/// Raw catalog document as it appears on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityEntry {
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub primary_key: String,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
    #[serde(default, rename = "association")]
    pub associations: Vec<AssociationEntry>,
}

/// A field is either a bare name or a table with column overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        column: Option<String>,
        #[serde(default = "default_nullable")]
        nullable: bool,
    },
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociationEntry {
    pub alias: String,
    pub kind: String,
    pub target: String,
    #[serde(default)]
    pub source_key: Option<String>,
    #[serde(default)]
    pub target_key: Option<String>,
    #[serde(default)]
    pub through: Option<ThroughEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThroughEntry {
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub source_fk: String,
    pub target_fk: String,
}

impl From<FieldEntry> for FieldDef {
    fn from(entry: FieldEntry) -> Self {
        match entry {
            FieldEntry::Name(name) => FieldDef::new(&name),
            FieldEntry::Detailed {
                name,
                column,
                nullable,
            } => FieldDef {
                column: column.unwrap_or_else(|| name.clone()),
                name,
                nullable,
            },
        }
    }
}

impl CatalogFile {
    /// Resolve kinds and default keys, then validate through the builder.
    pub fn into_catalog(self) -> Result<SchemaCatalog, CatalogError> {
        let primary_keys: std::collections::HashMap<String, String> = self
            .entities
            .iter()
            .map(|e| (e.name.clone(), e.primary_key.clone()))
            .collect();

        let mut builder = SchemaCatalog::builder();
        let mut pending = Vec::new();

        for entry in self.entities {
            let mut entity = EntityDef::new(&entry.name, &entry.primary_key);
            if let Some(table) = &entry.table {
                entity = entity.with_table(table);
            }
            if let Some(schema) = &entry.schema {
                entity = entity.with_schema(schema);
            }
            entity.fields = entry.fields.into_iter().map(FieldDef::from).collect();
            builder = builder.entity(entity);

            for assoc in entry.associations {
                pending.push((entry.name.clone(), entry.primary_key.clone(), assoc));
            }
        }

        for (source, source_pk, entry) in pending {
            let kind: AssociationKind = entry.kind.parse()?;
            let target_pk = primary_keys
                .get(&entry.target)
                .cloned()
                .ok_or_else(|| CatalogError::UnknownTarget {
                    entity: source.clone(),
                    alias: entry.alias.clone(),
                    target: entry.target.clone(),
                })?;

            let (default_source, default_target) = match kind {
                AssociationKind::BelongsTo => (target_pk.clone(), target_pk),
                AssociationKind::HasOne | AssociationKind::HasMany => {
                    (source_pk.clone(), source_pk)
                }
                AssociationKind::BelongsToMany => (source_pk, target_pk),
            };

            let association = Association {
                alias: entry.alias,
                source: String::new(),
                target: entry.target,
                kind,
                source_key: entry.source_key.unwrap_or(default_source),
                target_key: entry.target_key.unwrap_or(default_target),
                through: entry.through.map(|t| Through {
                    table: t.table,
                    schema: t.schema,
                    source_fk: t.source_fk,
                    target_fk: t.target_fk,
                }),
            };
            builder = builder.association(&source, association);
        }

        builder.build()
    }
}

impl SchemaCatalog {
    /// Parse and validate a catalog from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        file.into_catalog()
    }

    /// Load a catalog from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_toml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            entities = catalog.len(),
            "loaded schema catalog"
        );
        Ok(catalog)
    }
}
