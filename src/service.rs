//! The record read operation: compile, fetch, count, describe.

use serde::Serialize;
use std::sync::Arc;

use crate::catalog::SchemaCatalog;
use crate::compiler::{CompileOptions, PlanAssembler};
use crate::count::CountResolver;
use crate::engine::{ExecutionEngine, Row};
use crate::error::{QueryError, QueryResult};
use crate::introspect::{EntityTree, SchemaIntrospector};
use crate::request::QueryRequest;

/// Depth of the schema tree attached to every response.
pub const DEFAULT_MODEL_TREE_DEPTH: usize = 1;

/// Successful read: the page of rows, the total match count and the
/// schema tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub count: u64,
    pub rows: Vec<Row>,
    pub modeltree: Vec<EntityTree>,
}

/// Uniform failure shape returned at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFailure {
    pub error: String,
    pub details: String,
}

impl From<&QueryError> for QueryFailure {
    fn from(err: &QueryError) -> Self {
        Self {
            error: "An error occurred".to_string(),
            details: format!("Failed to retrieve records: {}", err),
        }
    }
}

pub struct RecordService<E: ExecutionEngine> {
    catalog: Arc<SchemaCatalog>,
    engine: E,
    options: CompileOptions,
    model_tree_depth: usize,
}

impl<E: ExecutionEngine> RecordService<E> {
    pub fn new(catalog: Arc<SchemaCatalog>, engine: E) -> Self {
        Self {
            catalog,
            engine,
            options: CompileOptions::default(),
            model_tree_depth: DEFAULT_MODEL_TREE_DEPTH,
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_model_tree_depth(mut self, depth: usize) -> Self {
        self.model_tree_depth = depth;
        self
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Compile `request`, then fetch its rows and total count concurrently.
    ///
    /// `tx` is handed unchanged to both statements; pass one when rows and
    /// count must see the same snapshot.
    pub async fn get_records(
        &self,
        request: &QueryRequest,
        tx: Option<&E::Transaction>,
    ) -> QueryResult<QueryResponse> {
        let catalog = self.catalog.as_ref();
        let plan = PlanAssembler::new(catalog)
            .with_options(self.options)
            .assemble(request)?;

        let rows_sql = self.engine.render(catalog, &plan)?;
        let counter = CountResolver::new(&self.engine, catalog);

        let fetch = async {
            self.engine
                .fetch_rows(&rows_sql, tx)
                .await
                .map_err(QueryError::Execution)
        };
        let (rows, count) = tokio::try_join!(fetch, counter.count(&plan, tx))?;

        tracing::debug!(entity = %plan.entity, rows = rows.len(), count, "records retrieved");
        Ok(QueryResponse {
            count,
            rows,
            modeltree: SchemaIntrospector::new(catalog).forest(self.model_tree_depth),
        })
    }

    /// [`get_records`](Self::get_records) with failures collapsed into the
    /// boundary shape.
    pub async fn handle(
        &self,
        request: &QueryRequest,
        tx: Option<&E::Transaction>,
    ) -> Result<QueryResponse, QueryFailure> {
        self.get_records(request, tx).await.map_err(|err| {
            tracing::error!(
                entity = %request.model_name,
                kind = err.kind(),
                error = %err,
                "get_records failed"
            );
            QueryFailure::from(&err)
        })
    }
}
