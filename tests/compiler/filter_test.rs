#[path = "../common/mod.rs"]
mod common;

use quarry::compiler::{CompileOptions, PlanAssembler, RawFragmentPolicy};
use quarry::operator::{LogicalOp, Operator};
use quarry::plan::{ColumnRef, Comparison, FieldRef, FragmentScope, Operand, Predicate, Target};
use serde_json::{json, Value};

fn field(name: &str, table: &str, column: &str) -> FieldRef {
    FieldRef {
        name: name.to_string(),
        column: ColumnRef::new(table, column),
    }
}

fn film_cmp(name: &str, operator: Operator, value: Value) -> Predicate {
    Predicate::Comparison(Comparison {
        target: Target::Field(field(name, "film", name)),
        operator,
        operand: Operand::Value(value),
    })
}

fn predicate(filters: Value) -> Option<Predicate> {
    common::compile(json!({"modelName": "film", "filters": filters}))
        .unwrap()
        .predicate
}

fn error_kind(filters: Value) -> &'static str {
    common::compile(json!({"modelName": "film", "filters": filters}))
        .unwrap_err()
        .kind()
}

#[test]
fn test_empty_filters() {
    assert_eq!(predicate(json!({})), None);
    assert_eq!(predicate(json!({"and": []})), None);
}

#[test]
fn test_empty_operator_maps_compile_to_nothing() {
    assert_eq!(predicate(json!({"title": {}})), None);
    assert_eq!(predicate(json!({"title": {"or": []}})), None);
    assert_eq!(predicate(json!({"title": {"and": [], "or": []}})), None);
    assert_eq!(
        predicate(json!({"title": {}, "length": {"gt": 90}})),
        Some(film_cmp("length", Operator::Gt, json!(90)))
    );

    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"language.name": {"or": []}}
    }))
    .unwrap();
    assert_eq!(plan.predicate, None);
}

#[test]
fn test_simple_comparison() {
    assert_eq!(
        predicate(json!({"rental_rate": {"gte": 2.99}})),
        Some(film_cmp("rental_rate", Operator::Gte, json!(2.99)))
    );
}

#[test]
fn test_prefixed_operator_tokens() {
    assert_eq!(
        predicate(json!({"rental_rate": {"__gte": 2.99}})),
        predicate(json!({"rental_rate": {"gte": 2.99}}))
    );
}

#[test]
fn test_multiple_operators_on_one_field_are_anded() {
    assert_eq!(
        predicate(json!({"length": {"gt": 60, "lt": 120}})),
        Some(Predicate::Logical {
            op: LogicalOp::And,
            children: vec![
                film_cmp("length", Operator::Gt, json!(60)),
                film_cmp("length", Operator::Lt, json!(120)),
            ],
        })
    );
}

#[test]
fn test_and_is_conjunction_of_parts() {
    let a = json!({"title": {"like": "A%"}});
    let b = json!({"rental_rate": {"gt": 1}});
    let compiled = predicate(json!({"and": [a.clone(), b.clone()]}));

    assert_eq!(
        compiled,
        Some(Predicate::Logical {
            op: LogicalOp::And,
            children: vec![predicate(a.clone()).unwrap(), predicate(b.clone()).unwrap()],
        })
    );
    // an implicit AND over sibling keys compiles to the same tree
    assert_eq!(
        compiled,
        predicate(json!({"title": {"like": "A%"}, "rental_rate": {"gt": 1}}))
    );
}

#[test]
fn test_or_is_disjunction_of_parts() {
    let a = json!({"rating": {"eq": "PG"}});
    let b = json!({"and": [{"length": {"lt": 90}}, {"rating": {"eq": "G"}}]});

    assert_eq!(
        predicate(json!({"or": [a.clone(), b.clone()]})),
        Some(Predicate::Logical {
            op: LogicalOp::Or,
            children: vec![predicate(a).unwrap(), predicate(b).unwrap()],
        })
    );
}

#[test]
fn test_logical_inside_operator_map() {
    assert_eq!(
        predicate(json!({"rating": {"or": [{"eq": "PG"}, {"eq": "G"}]}})),
        Some(Predicate::Logical {
            op: LogicalOp::Or,
            children: vec![
                film_cmp("rating", Operator::Eq, json!("PG")),
                film_cmp("rating", Operator::Eq, json!("G")),
            ],
        })
    );
}

#[test]
fn test_not_wraps_children() {
    assert_eq!(
        predicate(json!({"not": {"rating": {"eq": "NC-17"}}})),
        Some(Predicate::Logical {
            op: LogicalOp::Not,
            children: vec![film_cmp("rating", Operator::Eq, json!("NC-17"))],
        })
    );
}

#[test]
fn test_unknown_operator_at_any_depth() {
    for filters in [
        json!({"title": {"likee": "A%"}}),
        json!({"title": {"like": "A%", "likee": "B%"}}),
        json!({"and": [{"title": {"like": "A%"}}, {"or": [{"length": {"gtee": 1}}]}]}),
        json!({"rating": {"or": [{"eq": "PG"}, {"bogus": "G"}]}}),
        json!({"not": {"not": {"length": {"between_ish": [1, 2]}}}}),
        json!({"language": {"name": {"equals": "English"}}}),
    ] {
        assert_eq!(
            common::compile(json!({"modelName": "film", "filters": filters.clone()}))
                .unwrap_err()
                .kind(),
            "UnknownOperator",
            "filters: {}",
            filters
        );
    }
}

#[test]
fn test_unknown_field() {
    let err = common::compile(json!({"modelName": "film", "filters": {"studio": {"eq": 1}}}))
        .unwrap_err();
    assert_eq!(err.to_string(), "Field studio not found in model film");
}

#[test]
fn test_unknown_association_in_path() {
    let err = common::compile(json!({
        "modelName": "film",
        "filters": {"studio.name": {"eq": "MGM"}}
    }))
    .unwrap_err();
    assert_eq!(err.to_string(), "Association studio not found for model film");
}

#[test]
fn test_invalid_shapes() {
    assert_eq!(error_kind(json!({"title": "ACADEMY"})), "InvalidFilterShape");
    assert_eq!(error_kind(json!({"length": {"between": [1]}})), "InvalidFilterShape");
    assert_eq!(error_kind(json!({"rating": {"in": "PG"}})), "InvalidFilterShape");
    assert_eq!(error_kind(json!({"length": {"gt": null}})), "InvalidFilterShape");
    assert_eq!(error_kind(json!({"and": {"title": {"eq": "A"}}})), "InvalidFilterShape");
    assert_eq!(error_kind(json!({"language": {"eq": 1}})), "InvalidFilterShape");

    let err = common::compile(json!({"modelName": "film", "filters": ["title"]})).unwrap_err();
    assert_eq!(err.kind(), "InvalidFilterShape");
}

#[test]
fn test_null_equality() {
    assert_eq!(
        predicate(json!({"description": {"eq": null}})),
        Some(film_cmp("description", Operator::Eq, Value::Null))
    );
}

#[test]
fn test_not_takes_only_truth_values() {
    assert_eq!(
        predicate(json!({"special_features": {"not": null}})),
        Some(film_cmp("special_features", Operator::Not, Value::Null))
    );
    assert_eq!(
        predicate(json!({"rating": {"not": true}})),
        Some(film_cmp("rating", Operator::Not, json!(true)))
    );

    assert_eq!(error_kind(json!({"title": {"not": "ACE"}})), "InvalidFilterShape");
    assert_eq!(error_kind(json!({"length": {"not": 90}})), "InvalidFilterShape");
}

#[test]
fn test_operand_shapes() {
    let Some(Predicate::Comparison(between)) = predicate(json!({"length": {"between": [60, 90]}}))
    else {
        panic!("expected a comparison");
    };
    assert_eq!(between.operand, Operand::Range(json!(60), json!(90)));

    let Some(Predicate::Comparison(within)) = predicate(json!({"rating": {"in": ["G", "PG"]}}))
    else {
        panic!("expected a comparison");
    };
    assert_eq!(within.operand, Operand::List(vec![json!("G"), json!("PG")]));
}

#[test]
fn test_column_reference_uses_storage_column() {
    let Some(Predicate::Comparison(cmp)) = predicate(json!({"rental_rate": {"col": "cost"}})) else {
        panic!("expected a comparison");
    };
    assert_eq!(cmp.operator, Operator::Col);
    assert_eq!(
        cmp.operand,
        Operand::Column(field("cost", "film", "replacement_cost"))
    );
}

#[test]
fn test_association_field_by_dotted_path() {
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"actor.first_name": {"like": "John%"}}
    }))
    .unwrap();

    assert_eq!(plan.joins.len(), 1);
    let join = &plan.joins[0];
    assert_eq!(join.alias, "actor");
    assert!(!join.required);

    assert_eq!(
        plan.predicate,
        Some(Predicate::AssociationQualified {
            alias: "actor".to_string(),
            comparison: Comparison {
                target: Target::Field(field("actor.first_name", "actor", "first_name")),
                operator: Operator::Like,
                operand: Operand::Value(json!("John%")),
            },
        })
    );
}

#[test]
fn test_association_field_by_bare_name() {
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"first_name": {"startsWith": "PEN"}}
    }))
    .unwrap();

    assert_eq!(plan.joins[0].alias, "actor");
    assert!(matches!(
        plan.predicate,
        Some(Predicate::AssociationQualified { ref alias, .. }) if alias == "actor"
    ));
}

#[test]
fn test_nested_association_filter() {
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"language": {"name": {"eq": "English"}}}
    }))
    .unwrap();

    let join = plan.join("language").unwrap();
    assert_eq!(join.projected_fields, vec!["name"]);
    assert_eq!(
        plan.predicate,
        Some(Predicate::AssociationQualified {
            alias: "language".to_string(),
            comparison: Comparison {
                target: Target::Field(field("language.name", "language", "name")),
                operator: Operator::Eq,
                operand: Operand::Value(json!("English")),
            },
        })
    );
}

#[test]
fn test_multi_hop_path() {
    let plan = common::compile(json!({
        "modelName": "actor",
        "filters": {"films.language.name": {"eq": "English"}}
    }))
    .unwrap();

    let inner = plan.join("films->language").unwrap();
    assert_eq!(inner.parent, "films");
    assert_eq!(inner.target_entity, "language");
    assert!(matches!(
        plan.predicate,
        Some(Predicate::AssociationQualified { ref alias, .. }) if alias == "films->language"
    ));
}

#[test]
fn test_raw_subquery_fragments() {
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"film_id": {"subquery": "SELECT film_id FROM inventory WHERE store_id = 1"}}
    }))
    .unwrap();
    let Some(Predicate::RawSubquery(fragment)) = plan.predicate else {
        panic!("expected a raw fragment");
    };
    assert_eq!(fragment.sql, "SELECT film_id FROM inventory WHERE store_id = 1");
    assert_eq!(
        fragment.scope,
        FragmentScope::Field(field("film_id", "film", "film_id"))
    );

    let catalog = common::sakila();
    let request = common::request(json!({
        "modelName": "film",
        "filters": {"film_id": {"subquery": "SELECT 1"}}
    }));
    let err = PlanAssembler::new(&catalog)
        .with_options(CompileOptions {
            raw_fragments: RawFragmentPolicy::Reject,
        })
        .assemble(&request)
        .unwrap_err();
    assert_eq!(err.kind(), "RawSubqueryRejected");
}

#[test]
fn test_global_search_patterns() {
    let plan = common::compile(json!({
        "modelName": "film",
        "globalSearch": true,
        "filters": {"title": "ACADEMY", "actor.first_name": {"like": "JOHN"}}
    }))
    .unwrap();

    assert!(plan.joins.is_empty());
    assert_eq!(
        plan.predicate,
        Some(Predicate::Logical {
            op: LogicalOp::Or,
            children: vec![
                Predicate::GlobalPattern {
                    pattern: "%ACADEMY%".to_string()
                },
                Predicate::GlobalPattern {
                    pattern: "%JOHN%".to_string()
                },
            ],
        })
    );
}
