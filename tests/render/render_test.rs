#[path = "../common/mod.rs"]
mod common;

use quarry::sql::{count_statement, Dialect, PlanRenderer};
use serde_json::json;

fn sql(request: serde_json::Value, dialect: Dialect) -> String {
    common::render(&common::compile(request).unwrap(), dialect)
}

#[test]
fn test_film_example() {
    let request = json!({
        "modelName": "film",
        "filters": {"rental_rate": {"gte": 2.99}},
        "select": ["title", "rental_rate"],
        "pagination": {"limit": 2, "offset": 0},
        "sorting": {"field": "title", "direction": "ASC"}
    });

    insta::assert_snapshot!(sql(request, Dialect::Postgres), @r#"
    SELECT
      "film"."title",
      "film"."rental_rate"
    FROM "film" AS "film"
    WHERE "film"."rental_rate" >= 2.99
    ORDER BY "film"."title" ASC
    LIMIT 2 OFFSET 0
    "#);
}

#[test]
fn test_required_many_to_many_join() {
    let request = json!({
        "modelName": "film",
        "filters": {"actor.first_name": {"like": "John%"}},
        "select": ["title"],
        "joinOptions": {"actor": "INNER"}
    });

    insta::assert_snapshot!(sql(request, Dialect::Postgres), @r#"
    SELECT
      "film"."title"
    FROM "film" AS "film"
    INNER JOIN "film_actor" AS "actor->film_actor" ON "film"."film_id" = "actor->film_actor"."film_id"
    INNER JOIN "actor" AS "actor" ON "actor->film_actor"."actor_id" = "actor"."actor_id"
    WHERE "actor"."first_name" LIKE 'John%'
    "#);
}

#[test]
fn test_join_projection_and_column_alias() {
    let request = json!({
        "modelName": "film",
        "filters": {},
        "select": ["title", "cost", "language.name"]
    });

    insta::assert_snapshot!(sql(request, Dialect::Postgres), @r#"
    SELECT
      "film"."title",
      "film"."replacement_cost" AS "cost",
      "language"."name" AS "language.name"
    FROM "film" AS "film"
    LEFT OUTER JOIN "language" AS "language" ON "film"."language_id" = "language"."language_id"
    "#);
}

#[test]
fn test_nested_join_aliases() {
    let request = json!({
        "modelName": "customer",
        "filters": {"payments.amount": {"gt": 5}},
        "select": ["email", "payments.customer.active"]
    });

    insta::assert_snapshot!(sql(request, Dialect::DuckDb), @r#"
    SELECT
      "customer"."email",
      "payments->customer"."activebool" AS "payments.customer.active"
    FROM "customer" AS "customer"
    LEFT OUTER JOIN "payment" AS "payments" ON "customer"."customer_id" = "payments"."customer_id"
    LEFT OUTER JOIN "customer" AS "payments->customer" ON "payments"."customer_id" = "payments->customer"."customer_id"
    WHERE "payments"."amount" > 5
    "#);
}

#[test]
fn test_grouped_aggregate_with_having() {
    let request = json!({
        "modelName": "film",
        "filters": {},
        "groupBy": ["rating"],
        "aggregates": {"avg": "rental_rate"},
        "having": {"avg_rental_rate": {"gt": 3.5}},
        "sorting": {"field": "avg_rental_rate", "direction": "DESC"}
    });

    insta::assert_snapshot!(sql(request, Dialect::MySql), @r"
    SELECT
      `film`.`rating`,
      AVG(`film`.`rental_rate`) AS `avg_rental_rate`
    FROM `film` AS `film`
    GROUP BY `film`.`rating`
    HAVING AVG(`film`.`rental_rate`) > 3.5
    ORDER BY `avg_rental_rate` DESC
    ");
}

#[test]
fn test_operator_rendering() {
    let request = json!({
        "modelName": "film",
        "filters": {
            "description": {"eq": null},
            "rating": {"in": ["G", "PG"]},
            "length": {"between": [60, 90]},
            "title": {"startsWith": "ACE"},
            "special_features": {"contains": ["Trailers"]}
        },
        "select": ["title"]
    });

    let rendered = sql(request, Dialect::Postgres);
    assert!(rendered.ends_with(
        "WHERE \"film\".\"description\" IS NULL \
         AND \"film\".\"rating\" IN ('G', 'PG') \
         AND \"film\".\"length\" BETWEEN 60 AND 90 \
         AND \"film\".\"title\" LIKE 'ACE%' \
         AND \"film\".\"special_features\" @> ARRAY['Trailers']"
    ), "{}", rendered);
}

#[test]
fn test_logical_grouping() {
    let request = json!({
        "modelName": "film",
        "filters": {
            "or": [
                {"rating": {"eq": "G"}},
                {"and": [{"length": {"lt": 60}}, {"rating": {"ne": "PG"}}]}
            ],
            "not": {"title": {"eq": "ACADEMY DINOSAUR"}}
        },
        "select": ["title"]
    });

    let rendered = sql(request, Dialect::Postgres);
    assert!(rendered.ends_with(
        "WHERE (\"film\".\"rating\" = 'G' OR (\"film\".\"length\" < 60 AND \"film\".\"rating\" <> 'PG')) \
         AND NOT (\"film\".\"title\" = 'ACADEMY DINOSAUR')"
    ), "{}", rendered);
}

#[test]
fn test_case_insensitive_match_per_dialect() {
    let request = json!({
        "modelName": "film",
        "filters": {"title": {"iLike": "%ace%"}},
        "select": ["title"]
    });

    let pg = sql(request.clone(), Dialect::Postgres);
    assert!(pg.ends_with("WHERE \"film\".\"title\" ILIKE '%ace%'"), "{}", pg);

    let mysql = sql(request, Dialect::MySql);
    assert!(
        mysql.ends_with("WHERE LOWER(`film`.`title`) LIKE LOWER('%ace%')"),
        "{}",
        mysql
    );
}

#[test]
fn test_truth_test_per_dialect() {
    let request = json!({
        "modelName": "customer",
        "filters": {"active": {"not": true}},
        "select": ["email"]
    });

    let pg = sql(request.clone(), Dialect::Postgres);
    assert!(pg.ends_with("WHERE \"customer\".\"activebool\" IS NOT TRUE"), "{}", pg);

    let mysql = sql(request, Dialect::MySql);
    assert!(mysql.ends_with("WHERE `customer`.`activebool` IS NOT TRUE"), "{}", mysql);

    let unset = sql(
        json!({"modelName": "customer", "filters": {"email": {"not": null}}}),
        Dialect::MySql,
    );
    assert!(unset.ends_with("WHERE `customer`.`email` IS NOT NULL"), "{}", unset);

    let err = common::compile(json!({
        "modelName": "film",
        "filters": {"title": {"not": "ACE"}}
    }))
    .unwrap_err();
    assert_eq!(err.kind(), "InvalidFilterShape");
}

#[test]
fn test_regex_per_dialect() {
    let request = json!({
        "modelName": "film",
        "filters": {"title": {"iRegexp": "^ace"}},
        "select": ["title"]
    });

    let pg = sql(request.clone(), Dialect::Postgres);
    assert!(pg.ends_with("WHERE \"film\".\"title\" ~* '^ace'"), "{}", pg);

    let duck = sql(request, Dialect::DuckDb);
    assert!(
        duck.ends_with("WHERE REGEXP_MATCHES(\"film\".\"title\", '^ace', 'i')"),
        "{}",
        duck
    );
}

#[test]
fn test_empty_select_falls_back_to_every_field() {
    let rendered = sql(
        json!({"modelName": "language", "filters": {}, "select": []}),
        Dialect::Postgres,
    );
    insta::assert_snapshot!(rendered, @r#"
    SELECT
      "language"."language_id",
      "language"."name"
    FROM "language" AS "language"
    "#);
}

#[test]
fn test_array_operators_rejected_without_support() {
    let catalog = common::sakila();
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"special_features": {"overlap": ["Trailers"]}}
    }))
    .unwrap();

    assert!(PlanRenderer::new(&catalog, Dialect::Postgres).render(&plan).is_ok());
    let err = PlanRenderer::new(&catalog, Dialect::MySql)
        .render(&plan)
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidFilterShape");
}

#[test]
fn test_raw_fragment_embedding() {
    let rendered = sql(
        json!({
            "modelName": "film",
            "filters": {
                "film_id": {"subquery": "SELECT film_id FROM inventory"},
                "language": {"subquery": "name = 'English'"}
            },
            "select": ["title"]
        }),
        Dialect::Postgres,
    );

    assert!(rendered.ends_with(
        "WHERE \"film\".\"film_id\" = (SELECT film_id FROM inventory) \
         AND EXISTS (SELECT 1 FROM \"language\" AS \"language\" \
         WHERE \"film\".\"language_id\" = \"language\".\"language_id\" AND (name = 'English'))"
    ), "{}", rendered);
}

#[test]
fn test_global_pattern_is_not_renderable() {
    let catalog = common::sakila();
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"title": "ACADEMY"},
        "globalSearch": true
    }))
    .unwrap();

    let err = PlanRenderer::new(&catalog, Dialect::Postgres)
        .render(&plan)
        .unwrap_err();
    assert_eq!(err.kind(), "UnboundPattern");
}

#[test]
fn test_mysql_offset_without_limit() {
    let rendered = sql(
        json!({"modelName": "language", "filters": {}, "pagination": {"offset": 20}}),
        Dialect::MySql,
    );
    assert!(rendered.ends_with("LIMIT 18446744073709551615 OFFSET 20"), "{}", rendered);
}

#[test]
fn test_count_statement_drops_pagination() {
    let catalog = common::sakila();
    let plan = common::compile(json!({
        "modelName": "film",
        "filters": {"rental_rate": {"gte": 2.99}},
        "select": ["title"],
        "pagination": {"limit": 2, "offset": 4}
    }))
    .unwrap();

    let renderer = PlanRenderer::new(&catalog, Dialect::Postgres);
    let count = renderer.render_count(&plan).unwrap();
    let unpaged = renderer.render(&plan.without_pagination()).unwrap();

    assert_eq!(count, count_statement(&unpaged, Dialect::Postgres));
    assert!(count.starts_with("SELECT COUNT(*) FROM (SELECT"));
    assert!(count.ends_with(") AS \"subquery\""));
    assert!(!count.contains("LIMIT"));
    assert!(!count.contains("OFFSET"));
}
