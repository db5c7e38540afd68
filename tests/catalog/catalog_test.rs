#[path = "../common/mod.rs"]
mod common;

use quarry::catalog::{AssociationKind, CatalogError, SchemaCatalog};

#[test]
fn test_load_demo_catalog() {
    let catalog = common::sakila();

    assert_eq!(catalog.len(), 6);
    let names: Vec<_> = catalog.entities().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["film", "language", "actor", "category", "customer", "payment"]
    );
}

#[test]
fn test_column_overrides() {
    let catalog = common::sakila();
    let film = catalog.entity("film").unwrap();

    assert_eq!(film.column_of("cost"), "replacement_cost");
    assert!(!film.field("cost").unwrap().nullable);
    assert_eq!(film.column_of("title"), "title");

    let customer = catalog.entity("customer").unwrap();
    assert_eq!(customer.column_of("active"), "activebool");
    assert!(customer.field("active").unwrap().nullable);
}

#[test]
fn test_default_keys_follow_primary_keys() {
    let catalog = common::sakila();

    let language = catalog.association("film", "language").unwrap();
    assert_eq!(language.kind, AssociationKind::BelongsTo);
    assert_eq!(language.source, "film");
    assert_eq!(language.source_key, "language_id");
    assert_eq!(language.target_key, "language_id");

    let films = catalog.association("language", "films").unwrap();
    assert_eq!(films.kind, AssociationKind::HasMany);
    assert_eq!(films.source_key, "language_id");
    assert_eq!(films.target_key, "language_id");

    let actor = catalog.association("film", "actor").unwrap();
    assert_eq!(actor.kind, AssociationKind::BelongsToMany);
    assert_eq!(actor.source_key, "film_id");
    assert_eq!(actor.target_key, "actor_id");
    let through = actor.through.as_ref().unwrap();
    assert_eq!(through.table, "film_actor");
    assert_eq!(through.source_fk, "film_id");
    assert_eq!(through.target_fk, "actor_id");
}

#[test]
fn test_associations_in_declaration_order() {
    let catalog = common::sakila();
    let aliases: Vec<_> = catalog
        .associations("film")
        .into_iter()
        .map(|a| a.alias.as_str())
        .collect();
    assert_eq!(aliases, vec!["language", "actor", "category"]);
    assert!(catalog.associations("category").is_empty());
    assert!(catalog.associations("studio").is_empty());
}

#[test]
fn test_association_with_field() {
    let catalog = common::sakila();

    // language is declared before category and both carry `name`
    let assoc = catalog.association_with_field("film", "name").unwrap();
    assert_eq!(assoc.alias, "language");

    let assoc = catalog.association_with_field("film", "first_name").unwrap();
    assert_eq!(assoc.alias, "actor");

    assert!(catalog.association_with_field("film", "email").is_none());
}

#[test]
fn test_unknown_target() {
    let err = SchemaCatalog::from_toml_str(
        r#"
[[entity]]
name = "film"
primary_key = "film_id"
fields = ["film_id", "studio_id"]

[[entity.association]]
alias = "studio"
kind = "belongs_to"
target = "studio"
"#,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::UnknownTarget { ref alias, ref target, .. } if alias == "studio" && target == "studio"
    ));
}

#[test]
fn test_unknown_key() {
    let err = SchemaCatalog::from_toml_str(
        r#"
[[entity]]
name = "film"
primary_key = "film_id"
fields = ["film_id"]

[[entity.association]]
alias = "language"
kind = "belongs_to"
target = "language"

[[entity]]
name = "language"
primary_key = "language_id"
fields = ["language_id", "name"]
"#,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::UnknownKey { ref key, ref on, .. } if key == "language_id" && on == "film"
    ));
}

#[test]
fn test_many_to_many_requires_through() {
    let err = SchemaCatalog::from_toml_str(
        r#"
[[entity]]
name = "film"
primary_key = "film_id"
fields = ["film_id"]

[[entity.association]]
alias = "actor"
kind = "many_to_many"
target = "actor"

[[entity]]
name = "actor"
primary_key = "actor_id"
fields = ["actor_id"]
"#,
    )
    .unwrap_err();

    assert!(matches!(err, CatalogError::MissingThrough { ref alias, .. } if alias == "actor"));
}

#[test]
fn test_unsupported_kind() {
    let err = SchemaCatalog::from_toml_str(
        r#"
[[entity]]
name = "film"
primary_key = "film_id"
fields = ["film_id"]

[[entity.association]]
alias = "sequel"
kind = "morph_to"
target = "film"
"#,
    )
    .unwrap_err();

    assert!(matches!(err, CatalogError::UnsupportedAssociationKind(ref k) if k == "morph_to"));
}

#[test]
fn test_duplicate_entity() {
    let err = SchemaCatalog::from_toml_str(
        r#"
[[entity]]
name = "film"
primary_key = "film_id"
fields = ["film_id"]

[[entity]]
name = "film"
primary_key = "film_id"
fields = ["film_id"]
"#,
    )
    .unwrap_err();

    assert!(matches!(err, CatalogError::DuplicateEntity(ref name) if name == "film"));
}

#[test]
fn test_parse_error() {
    let err = SchemaCatalog::from_toml_str("[[entity]\nname = ").unwrap_err();
    assert!(matches!(err, CatalogError::ParseError(_)));
}
