#[path = "../common/mod.rs"]
mod common;

use quarry::operator::Operator;
use quarry::plan::{ColumnRef, Comparison, FieldRef, Operand, Predicate, SortTarget, Target};
use quarry::request::{Pagination, SortDirection};
use serde_json::json;

fn film_example() -> serde_json::Value {
    json!({
        "modelName": "film",
        "filters": {"rental_rate": {"gte": 2.99}},
        "select": ["title", "rental_rate"],
        "pagination": {"limit": 2, "offset": 0},
        "sorting": {"field": "title", "direction": "ASC"}
    })
}

#[test]
fn test_film_example_plan() {
    let plan = common::compile(film_example()).unwrap();

    assert_eq!(plan.entity, "film");
    assert_eq!(
        plan.predicate,
        Some(Predicate::Comparison(Comparison {
            target: Target::Field(FieldRef {
                name: "rental_rate".to_string(),
                column: ColumnRef::new("film", "rental_rate"),
            }),
            operator: Operator::Gte,
            operand: Operand::Value(json!(2.99)),
        }))
    );
    assert_eq!(plan.projection.fields, vec!["title", "rental_rate"]);
    assert!(plan.joins.is_empty());
    assert!(plan.group_by.is_empty());
    assert!(plan.having.is_none());
    assert!(plan.aggregates.is_empty());

    let sort = plan.sort.as_ref().unwrap();
    assert!(matches!(&sort.target, SortTarget::Field(f) if f.name == "title"));
    assert_eq!(sort.direction, SortDirection::Asc);

    assert_eq!(
        plan.pagination,
        Some(Pagination {
            limit: Some(2),
            offset: Some(0)
        })
    );
}

#[test]
fn test_compilation_is_deterministic() {
    assert_eq!(
        common::compile(film_example()).unwrap(),
        common::compile(film_example()).unwrap()
    );
}

#[test]
fn test_unknown_entity_fails_first() {
    let err = common::compile(json!({
        "modelName": "studio",
        "filters": {"name": {"likee": 1}, "and": "nope"},
        "select": ["nothing.here"],
        "aggregates": {"bad fn": 1},
        "having": {"avg_price": {"gt": 1}},
        "sorting": {"field": "missing"}
    }))
    .unwrap_err();

    assert_eq!(err.kind(), "EntityNotFound");
    assert_eq!(err.to_string(), "Model studio not found");
}

#[test]
fn test_unknown_entity_fails_before_filter_shape() {
    let err = common::compile(json!({"modelName": "studio", "filters": "title"})).unwrap_err();
    assert_eq!(err.kind(), "EntityNotFound");
}

#[test]
fn test_pagination_with_either_bound() {
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {},
        "pagination": {"limit": 10}
    }))
    .unwrap();
    assert_eq!(
        plan.pagination,
        Some(Pagination {
            limit: Some(10),
            offset: None
        })
    );

    let plan =
        common::compile(json!({"modelName": "film", "filters": {}, "pagination": {}})).unwrap();
    assert_eq!(plan.pagination, None);
}

#[test]
fn test_without_pagination_keeps_everything_else() {
    let plan = common::compile(film_example()).unwrap();
    let unpaged = plan.without_pagination();

    assert_eq!(unpaged.pagination, None);
    assert_eq!(unpaged.predicate, plan.predicate);
    assert_eq!(unpaged.projection, plan.projection);
    assert_eq!(unpaged.sort, plan.sort);
}

#[test]
fn test_sort_on_association_field() {
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {},
        "sorting": {"field": "language.name", "direction": "desc"}
    }))
    .unwrap();

    assert!(plan.join("language").is_some());
    let sort = plan.sort.unwrap();
    assert!(matches!(
        sort.target,
        SortTarget::Field(FieldRef { ref column, .. }) if *column == ColumnRef::new("language", "name")
    ));
    assert_eq!(sort.direction, SortDirection::Desc);
}

#[test]
fn test_sort_on_unknown_field() {
    let err = common::compile(json!({
        "modelName": "film",
        "filters": {},
        "sorting": {"field": "popularity"}
    }))
    .unwrap_err();
    assert_eq!(err.kind(), "UnknownField");
}

#[test]
fn test_plan_serializes() {
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"actor.first_name": {"like": "John%"}},
        "select": ["title"],
        "joinOptions": {"actor": "INNER"}
    }))
    .unwrap();

    let value = serde_json::to_value(&plan).unwrap();
    assert_eq!(value["entity"], "film");
    assert_eq!(value["predicate"]["kind"], "association_qualified");
    assert_eq!(value["predicate"]["alias"], "actor");
    assert_eq!(value["predicate"]["comparison"]["operator"], "like");
    assert_eq!(value["joins"][0]["required"], true);
    assert_eq!(value["joins"][0]["association"]["kind"], "belongs_to_many");
}
