//! Shared fixtures: the Sakila demo catalog and request helpers.

#![allow(dead_code)]

use quarry::prelude::*;
use serde_json::Value;

pub const SAKILA: &str = include_str!("../../demos/sakila.toml");

pub fn sakila() -> SchemaCatalog {
    SchemaCatalog::from_toml_str(SAKILA).expect("demo catalog is valid")
}

pub fn request(value: Value) -> QueryRequest {
    QueryRequest::from_value(value).expect("request JSON is well formed")
}

/// Compile a request against the Sakila catalog.
pub fn compile(value: Value) -> QueryResult<QueryPlan> {
    let catalog = sakila();
    PlanAssembler::new(&catalog).assemble(&request(value))
}

pub fn render(plan: &QueryPlan, dialect: Dialect) -> String {
    let catalog = sakila();
    PlanRenderer::new(&catalog, dialect)
        .render(plan)
        .expect("plan renders")
}
