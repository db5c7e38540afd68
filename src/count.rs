//! Pagination-independent row counts.

use crate::catalog::SchemaCatalog;
use crate::engine::ExecutionEngine;
use crate::error::{QueryError, QueryResult};
use crate::plan::QueryPlan;
use crate::sql::count_statement;

/// Counts the rows a plan matches, ignoring its limit and offset.
pub struct CountResolver<'a, E: ExecutionEngine> {
    engine: &'a E,
    catalog: &'a SchemaCatalog,
}

impl<'a, E: ExecutionEngine> CountResolver<'a, E> {
    pub fn new(engine: &'a E, catalog: &'a SchemaCatalog) -> Self {
        Self { engine, catalog }
    }

    /// The count statement for a plan: the unpaginated statement wrapped
    /// in `SELECT COUNT(*) FROM (...) AS subquery`.
    pub fn statement(&self, plan: &QueryPlan) -> QueryResult<String> {
        let inner = self.engine.render(self.catalog, &plan.without_pagination())?;
        Ok(count_statement(&inner, self.engine.dialect()))
    }

    /// Render and execute the count. Any failure fails the whole read.
    pub async fn count(&self, plan: &QueryPlan, tx: Option<&E::Transaction>) -> QueryResult<u64> {
        let sql = self.statement(plan)?;
        tracing::debug!(entity = %plan.entity, sql = %sql, "resolving count");
        self.engine
            .execute_count(&sql, tx)
            .await
            .map_err(QueryError::Execution)
    }
}
