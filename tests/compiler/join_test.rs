#[path = "../common/mod.rs"]
mod common;

use quarry::catalog::AssociationKind;
use quarry::compiler::JoinResolver;
use serde_json::json;
use std::collections::BTreeMap;

#[test]
fn test_optional_join_by_default() {
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"actor.first_name": {"like": "John%"}}
    }))
    .unwrap();

    let join = &plan.joins[0];
    assert_eq!(join.path, "actor");
    assert_eq!(join.parent, "film");
    assert_eq!(join.target_entity, "actor");
    assert_eq!(join.association.kind, AssociationKind::BelongsToMany);
    assert!(!join.required);
    assert!(join.nested.is_empty());
}

#[test]
fn test_join_options_make_join_required() {
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"actor.first_name": {"like": "John%"}},
        "joinOptions": {"actor": "INNER"}
    }))
    .unwrap();

    assert_eq!(plan.joins.len(), 1);
    assert!(plan.joins[0].required);
}

#[test]
fn test_join_options_by_dotted_path() {
    let plan = common::compile(json!({
        "modelName": "actor",
        "filters": {"films.language.name": {"eq": "English"}},
        "joinOptions": {"films.language": "INNER", "language": "LEFT"}
    }))
    .unwrap();

    assert!(!plan.join("films").unwrap().required);
    assert!(plan.join("films->language").unwrap().required);
}

#[test]
fn test_same_alias_joined_once() {
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {
            "actor.first_name": {"like": "J%"},
            "or": [{"actor.last_name": {"eq": "DAVIS"}}, {"actor": {"last_name": {"eq": "WOOD"}}}]
        },
        "select": ["title", "actor.first_name", "actor.last_name"]
    }))
    .unwrap();

    assert_eq!(plan.joins.len(), 1);
    assert_eq!(plan.all_joins().len(), 1);
    assert_eq!(
        plan.joins[0].projected_fields,
        vec!["last_name", "first_name"]
    );
}

#[test]
fn test_nested_joins_form_a_tree() {
    let plan = common::compile(json!({
        "modelName": "actor",
        "filters": {"films.category.name": {"eq": "Horror"}},
        "select": ["first_name", "films.title", "films.language.name"]
    }))
    .unwrap();

    assert_eq!(plan.joins.len(), 1);
    let films = &plan.joins[0];
    assert_eq!(films.projected_fields, vec!["title"]);
    let nested: Vec<_> = films.nested.iter().map(|j| j.path.as_str()).collect();
    assert_eq!(nested, vec!["films->category", "films->language"]);

    let order: Vec<_> = plan.all_joins().iter().map(|j| j.path.as_str()).collect();
    assert_eq!(order, vec!["films", "films->category", "films->language"]);
}

#[test]
fn test_resolver_rejects_unknown_segment_before_joining() {
    let catalog = common::sakila();
    let film = catalog.entity("film").unwrap();
    let options = BTreeMap::new();
    let mut resolver = JoinResolver::new(&catalog, film, &options);

    let err = resolver.ensure(&["actor", "agent"]).unwrap_err();
    assert_eq!(err.to_string(), "Association agent not found for model actor");
    // the valid prefix was not registered
    assert!(resolver.joins().is_empty());
}

#[test]
fn test_resolver_first_registration_wins() {
    let catalog = common::sakila();
    let film = catalog.entity("film").unwrap();
    let options = BTreeMap::new();
    let mut resolver = JoinResolver::new(&catalog, film, &options);

    resolver.ensure(&["language"]).unwrap().required = true;
    let again = resolver.ensure(&["language"]).unwrap();
    assert!(again.required);
    assert_eq!(resolver.into_joins().len(), 1);
}

#[test]
fn test_resolve_field() {
    let catalog = common::sakila();
    let film = catalog.entity("film").unwrap();
    let options = BTreeMap::new();
    let mut resolver = JoinResolver::new(&catalog, film, &options);

    let (field, join) = resolver.resolve_field("cost").unwrap();
    assert_eq!(field.column.table, "film");
    assert_eq!(field.column.column, "replacement_cost");
    assert_eq!(join, None);

    let (field, join) = resolver.resolve_field("language.name").unwrap();
    assert_eq!(field.name, "language.name");
    assert_eq!(field.column.table, "language");
    assert_eq!(join.as_deref(), Some("language"));

    let err = resolver.resolve_field("language.code").unwrap_err();
    assert_eq!(err.to_string(), "Field code not found in model language");
}
