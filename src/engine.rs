//! The execution engine boundary.
//!
//! Quarry never talks to storage. The host implements [`ExecutionEngine`]
//! to run rendered statements; cancellation, timeouts and retries are the
//! engine's business and its errors are propagated unchanged.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::catalog::SchemaCatalog;
use crate::error::{EngineError, QueryResult};
use crate::plan::QueryPlan;
use crate::sql::{Dialect, PlanRenderer};

/// One result row, keyed by output column name.
pub type Row = Map<String, Value>;

/// Runs statements against storage.
///
/// # Example
///
/// ```ignore
/// struct Pg { pool: PgPool }
///
/// #[async_trait]
/// impl ExecutionEngine for Pg {
///     type Transaction = PgTx;
///
///     fn dialect(&self) -> Dialect { Dialect::Postgres }
///
///     async fn fetch_rows(&self, sql: &str, tx: Option<&PgTx>) -> Result<Vec<Row>, EngineError> {
///         // ...
///     }
///
///     async fn execute_count(&self, sql: &str, tx: Option<&PgTx>) -> Result<u64, EngineError> {
///         // ...
///     }
/// }
/// ```
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Transaction scope shared by the rows and count statements of one
    /// read. Passed through untouched.
    type Transaction: Send + Sync;

    /// Dialect the engine speaks.
    fn dialect(&self) -> Dialect;

    /// Render a plan to statement text without executing it.
    fn render(&self, catalog: &SchemaCatalog, plan: &QueryPlan) -> QueryResult<String> {
        PlanRenderer::new(catalog, self.dialect()).render(plan)
    }

    /// Run a row-returning statement.
    async fn fetch_rows(
        &self,
        sql: &str,
        tx: Option<&Self::Transaction>,
    ) -> Result<Vec<Row>, EngineError>;

    /// Run a `SELECT COUNT(*)` statement and return the single count.
    async fn execute_count(
        &self,
        sql: &str,
        tx: Option<&Self::Transaction>,
    ) -> Result<u64, EngineError>;
}
