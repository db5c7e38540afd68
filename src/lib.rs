//! # Quarry
//!
//! A dynamic query compiler: declarative JSON read requests in, resolved
//! query plans and multi-dialect SQL out.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        QueryRequest (filters, select, groupBy, ...)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compiler] against SchemaCatalog
//! ┌─────────────────────────────────────────────────────────┐
//! │   QueryPlan (predicate, joins, projection, aggregates)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql::render]
//! ┌─────────────────────────────────────────────────────────┐
//! │         SQL text → ExecutionEngine (rows + count)        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`service::RecordService`] ties the pieces together: it compiles a
//! request, fetches rows and the pagination-free count concurrently, and
//! attaches the schema tree of the catalog.

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod count;
pub mod engine;
pub mod error;
pub mod introspect;
pub mod operator;
pub mod plan;
pub mod request;
pub mod service;
pub mod sql;

pub use sql::dialect;
pub use sql::expr;
pub use sql::query;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{Association, AssociationKind, EntityDef, FieldDef, SchemaCatalog};
    pub use crate::compiler::{CompileOptions, PlanAssembler, RawFragmentPolicy};
    pub use crate::count::CountResolver;
    pub use crate::engine::ExecutionEngine;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::introspect::{EntityTree, SchemaIntrospector};
    pub use crate::plan::{JoinSpec, Predicate, QueryPlan};
    pub use crate::request::{JoinStrength, QueryRequest};
    pub use crate::service::{QueryFailure, QueryResponse, RecordService};
    pub use crate::sql::{Dialect, PlanRenderer};
}

pub use catalog::SchemaCatalog;
pub use compiler::PlanAssembler;
pub use error::{QueryError, QueryResult};
pub use plan::QueryPlan;
pub use request::QueryRequest;
pub use sql::Dialect;
