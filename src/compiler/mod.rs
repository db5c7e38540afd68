//! Request compilation: [`QueryRequest`] into an immutable [`QueryPlan`].
//!
//! Stages run in a fixed order and each fails fast:
//! 1. Entity lookup (before anything else)
//! 2. Filters, registering joins as association paths are met
//! 3. Projection
//! 4. Aggregates, then GROUP BY
//! 5. HAVING, validated against the aggregate aliases
//! 6. Sort and pagination

pub mod aggregate;
pub mod filter;
pub mod group_by;
pub mod having;
pub mod joins;
pub mod projection;
pub mod subquery;

pub use filter::FilterCompiler;
pub use joins::{JoinResolver, PATH_SEPARATOR};

use serde::{Deserialize, Serialize};

use crate::catalog::SchemaCatalog;
use crate::error::{QueryError, QueryResult};
use crate::plan::{AggregateExpr, QueryPlan, SortSpec, SortTarget};
use crate::request::{FilterRequest, QueryRequest, Sorting};

/// What to do with `{"subquery": "<sql>"}` filter values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawFragmentPolicy {
    /// Embed fragments verbatim. Only for trusted, internally built requests.
    #[default]
    Allow,
    /// Fail compilation with `RawSubqueryRejected`.
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub raw_fragments: RawFragmentPolicy,
}

/// Compiles requests against a shared catalog. Pure: no I/O, no state
/// kept between calls.
pub struct PlanAssembler<'a> {
    catalog: &'a SchemaCatalog,
    options: CompileOptions,
}

impl<'a> PlanAssembler<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self {
            catalog,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn assemble(&self, request: &QueryRequest) -> QueryResult<QueryPlan> {
        let entity = self
            .catalog
            .entity(&request.model_name)
            .ok_or_else(|| QueryError::EntityNotFound(request.model_name.clone()))?;

        let mut resolver = JoinResolver::new(self.catalog, entity, &request.join_options);

        let filter = FilterRequest::parse(&request.filters, "filters")?;
        let predicate = if request.global_search {
            tracing::warn!(entity = %entity.name, "global search drops field binding");
            filter::global_search(&filter)
        } else {
            FilterCompiler::new(&mut resolver, self.options.raw_fragments).compile(&filter)?
        };

        let aggregate_map = request.aggregates.as_ref().filter(|m| !m.is_empty());
        let grouping = !request.group_by.is_empty() || aggregate_map.is_some();

        let select = match (request.select.as_deref(), grouping) {
            (Some(select), _) if !select.is_empty() => Some(select),
            // an empty or missing select: grouped output is the group-by columns,
            // otherwise every root field
            (_, true) => Some(request.group_by.as_slice()),
            (_, false) => None,
        };
        let projection = projection::build(&mut resolver, select)?;

        let aggregates = aggregate::build(&mut resolver, aggregate_map)?;
        let group_by =
            group_by::normalize(&mut resolver, &request.group_by, &projection, grouping)?;
        let having = having::compile(&mut resolver, request.having.as_ref(), &aggregates)?;

        let sort = match &request.sorting {
            Some(sorting) => Some(self.sort(&mut resolver, sorting, &aggregates)?),
            None => None,
        };
        let pagination = (!request.pagination.is_empty()).then_some(request.pagination);

        let plan = QueryPlan {
            entity: entity.name.clone(),
            projection,
            predicate,
            joins: resolver.into_joins(),
            group_by,
            having,
            aggregates,
            sort,
            pagination,
        };

        tracing::debug!(
            entity = %plan.entity,
            joins = plan.all_joins().len(),
            group_by = plan.group_by.len(),
            aggregates = plan.aggregates.len(),
            paginated = plan.pagination.is_some(),
            "assembled query plan"
        );
        Ok(plan)
    }

    fn sort(
        &self,
        resolver: &mut JoinResolver<'_>,
        sorting: &Sorting,
        aggregates: &[AggregateExpr],
    ) -> QueryResult<SortSpec> {
        let root = resolver.root();
        let target = if !root.has_field(&sorting.field)
            && aggregates.iter().any(|a| a.alias == sorting.field)
        {
            SortTarget::Aggregate(sorting.field.clone())
        } else {
            SortTarget::Field(resolver.resolve_field(&sorting.field)?.0)
        };
        Ok(SortSpec {
            target,
            direction: sorting.direction,
        })
    }
}
