//! Error types for request compilation and execution.
//!
//! Every compilation step fails fast with a [`QueryError`]; no partial plan
//! is ever produced. Catalog loading errors live in
//! [`crate::catalog::CatalogError`], configuration errors in
//! [`crate::config::SettingsError`].

use thiserror::Error;

/// Boxed error produced by an execution engine.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while compiling, rendering or executing a request.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Model {0} not found")]
    EntityNotFound(String),

    #[error("Unsupported operator: {0}")]
    UnknownOperator(String),

    #[error("Association {alias} not found for model {entity}")]
    UnknownAssociation { entity: String, alias: String },

    #[error("Field {field} not found in model {entity}")]
    UnknownField { entity: String, field: String },

    #[error("Invalid filter shape at {path}: {reason}")]
    InvalidFilterShape { path: String, reason: String },

    #[error("Unsupported field in HAVING clause: {0}")]
    HavingFieldNotAggregate(String),

    #[error("Raw subquery fragments are rejected (field {0})")]
    RawSubqueryRejected(String),

    #[error("Global search term {0:?} is not bound to a column and cannot be rendered")]
    UnboundPattern(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Execution failed: {0}")]
    Execution(#[source] EngineError),
}

impl QueryError {
    pub fn unknown_field(entity: &str, field: &str) -> Self {
        QueryError::UnknownField {
            entity: entity.to_string(),
            field: field.to_string(),
        }
    }

    pub fn unknown_association(entity: &str, alias: &str) -> Self {
        QueryError::UnknownAssociation {
            entity: entity.to_string(),
            alias: alias.to_string(),
        }
    }

    pub fn invalid_shape(path: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidFilterShape {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap an engine failure without altering it.
    pub fn execution(err: impl Into<EngineError>) -> Self {
        QueryError::Execution(err.into())
    }

    /// Stable kind string for callers that need differentiated handling.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::EntityNotFound(_) => "EntityNotFound",
            QueryError::UnknownOperator(_) => "UnknownOperator",
            QueryError::UnknownAssociation { .. } => "UnknownAssociation",
            QueryError::UnknownField { .. } => "UnknownField",
            QueryError::InvalidFilterShape { .. } => "InvalidFilterShape",
            QueryError::HavingFieldNotAggregate(_) => "HavingFieldNotAggregate",
            QueryError::RawSubqueryRejected(_) => "RawSubqueryRejected",
            QueryError::UnboundPattern(_) => "UnboundPattern",
            QueryError::InvalidRequest(_) => "InvalidRequest",
            QueryError::Execution(_) => "Execution",
        }
    }
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
