#[path = "../common/mod.rs"]
mod common;

use quarry::introspect::{SchemaIntrospector, TreeMarker};
use serde_json::json;

#[test]
fn test_forest_covers_every_entity() {
    let catalog = common::sakila();
    let forest = SchemaIntrospector::new(&catalog).forest(1);

    let names: Vec<_> = forest.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["film", "language", "actor", "category", "customer", "payment"]
    );
}

#[test]
fn test_depth_zero_is_marker_only() {
    let catalog = common::sakila();
    let forest = SchemaIntrospector::new(&catalog).forest(0);

    for tree in &forest {
        assert!(tree.fields.is_none());
        assert_eq!(tree.marker_kind(), Some(TreeMarker::DepthLimitReached));
    }
    assert_eq!(
        serde_json::to_value(&forest[0]).unwrap(),
        json!({"name": "film", "associations": "Depth limit reached"})
    );
}

#[test]
fn test_depth_one_film_tree() {
    let catalog = common::sakila();
    let tree = SchemaIntrospector::new(&catalog).tree("category", 1).unwrap();
    assert_eq!(
        serde_json::to_value(&tree).unwrap(),
        json!({"name": "category", "fields": ["category_id", "name"], "associations": []})
    );

    let tree = SchemaIntrospector::new(&catalog).tree("film", 1).unwrap();
    let value = serde_json::to_value(&tree).unwrap();
    assert_eq!(value["associations"].as_array().unwrap().len(), 3);
    assert_eq!(
        value["associations"][1],
        json!({
            "alias": "actor",
            "kind": "belongs_to_many",
            "sourceKey": "film_id",
            "targetKey": "actor_id",
            "through": {"table": "film_actor", "source_fk": "film_id", "target_fk": "actor_id"},
            "name": "actor",
            "associations": "Depth limit reached"
        })
    );
}

#[test]
fn test_mutual_associations_terminate() {
    let catalog = common::sakila();
    let tree = SchemaIntrospector::new(&catalog).tree("customer", 10).unwrap();

    let payments = &tree.children()[0];
    assert_eq!(payments.alias, "payments");
    assert_eq!(payments.tree.name, "payment");

    let back = &payments.tree.children()[0];
    assert_eq!(back.alias, "customer");
    assert_eq!(back.tree.marker_kind(), Some(TreeMarker::CycleDetected));
    assert_eq!(
        serde_json::to_value(&back.tree).unwrap(),
        json!({"name": "customer", "associations": "Cycle detected"})
    );
}

#[test]
fn test_cycle_guard_is_per_path() {
    let catalog = common::sakila();
    let tree = SchemaIntrospector::new(&catalog).tree("language", 3).unwrap();

    // film is expanded under language; only edges back onto the path stop
    let film = &tree.children()[0].tree;
    assert_eq!(film.name, "film");
    let aliases: Vec<_> = film.children().iter().map(|c| c.alias.as_str()).collect();
    assert_eq!(aliases, vec!["language", "actor", "category"]);
    assert_eq!(
        film.children()[0].tree.marker_kind(),
        Some(TreeMarker::CycleDetected)
    );

    let actor = &film.children()[1].tree;
    let actor_films = &actor.children()[0];
    assert_eq!(actor_films.tree.marker_kind(), Some(TreeMarker::CycleDetected));
}

#[test]
fn test_field_paths() {
    let catalog = common::sakila();
    let paths = SchemaIntrospector::new(&catalog)
        .field_paths("actor", 2)
        .unwrap();

    assert_eq!(&paths[..3], &["actor_id", "first_name", "last_name"]);
    assert!(paths.contains(&"films.title".to_string()));
    assert!(paths.contains(&"films.language.name".to_string()));
    assert!(paths.contains(&"films.category.name".to_string()));
    // actor is already on the path
    assert!(!paths.iter().any(|p| p.starts_with("films.actor.")));
}

#[test]
fn test_field_paths_depth_zero_is_local() {
    let catalog = common::sakila();
    let paths = SchemaIntrospector::new(&catalog)
        .field_paths("language", 0)
        .unwrap();
    assert_eq!(paths, vec!["language_id", "name"]);
}

#[test]
fn test_unknown_entity() {
    let catalog = common::sakila();
    let err = SchemaIntrospector::new(&catalog)
        .field_paths("studio", 1)
        .unwrap_err();
    assert_eq!(err.to_string(), "Model studio not found");
}
