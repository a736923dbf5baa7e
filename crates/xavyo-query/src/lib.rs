//! # Query Engine
//!
//! Exposes the resources of a remote identity-provider REST API as tables
//! a host query engine can scan.
//!
//! Every table repeats one pattern: fetch a paginated list, optionally
//! narrowed server-side by the caller's qualifiers; fan out to per-row
//! enrichment calls only for requested or qualified columns; normalize
//! polymorphic payloads into uniform rows; stream the rows back while
//! honouring a row limit and cancellation.
//!
//! ## Architecture
//!
//! - [`ErrorTable`] - declarative per-family "does not exist" classification
//! - [`PaginatedFetcher`] - cursor-following list walker
//! - [`UnionResolver`] - tagged-union payloads to rows, with an explicit
//!   unknown-variant outcome
//! - [`RowBudget`] - shared, monotonic row counter
//! - [`HydrateGraph`] - parent iteration, primary fetch, secondary enrichment
//! - [`RowSink`] - budget-gated delivery to a [`RowEmitter`]
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_query::prelude::*;
//!
//! let engine = QueryEngine::new(client, EngineConfig::default())?;
//! let ctx = QueryContext::new()
//!     .with_columns(["id", "name", "rules"])
//!     .with_limit(10);
//! let rows = engine.collect(&table, &ctx).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`error`] - Error type and result alias
//! - [`classify`] - Error classification tables
//! - [`value`] - Items, rows and cell values
//! - [`qualifier`] - Caller predicates
//! - [`context`] - Per-query context
//! - [`budget`] - Row budget
//! - [`client`] - Remote client abstraction
//! - [`fetcher`] - Pagination
//! - [`union`] - Polymorphic payload resolution
//! - [`sink`] - Row delivery
//! - [`table`] - Declarative table definitions
//! - [`hydrate`] - Enrichment tasks and the hydrate graph
//! - [`engine`] - Query entry point
//! - [`config`] - Engine configuration
//! - [`stats`] - Per-query counters

pub mod budget;
pub mod classify;
pub mod client;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod hydrate;
pub mod qualifier;
pub mod sink;
pub mod stats;
pub mod table;
pub mod union;
pub mod value;

pub use budget::RowBudget;
pub use classify::{ErrorClass, ErrorTable, IgnoreRule};
pub use engine::QueryEngine;
pub use error::{QueryError, QueryResult};
pub use fetcher::PaginatedFetcher;
pub use hydrate::{HydrateGraph, HydrateTask};
pub use sink::{RowEmitter, RowSink};
pub use union::UnionResolver;

/// Prelude module for convenient imports.
///
/// ```
/// use xavyo_query::prelude::*;
/// ```
pub mod prelude {
    // Errors and classification
    pub use crate::classify::{ErrorClass, ErrorTable, IgnoreRule, FATAL_ONLY, NOT_FOUND};
    pub use crate::error::{QueryError, QueryResult};

    // Values
    pub use crate::value::{ColumnType, ColumnValue, FromField, NormalizedRow, RawItem};

    // Query input
    pub use crate::context::QueryContext;
    pub use crate::qualifier::{Qualifier, QualifierMap};

    // Client
    pub use crate::client::{
        Endpoint, EndpointTemplate, ListRequest, Page, PageCursor, ResourceClient, ServerFilter,
    };

    // Execution
    pub use crate::budget::RowBudget;
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Plan, QueryEngine};
    pub use crate::fetcher::PaginatedFetcher;
    pub use crate::hydrate::{CollectListTask, HydrateGraph, HydrateTask, LookupFieldTask};
    pub use crate::sink::{CollectingEmitter, RowEmitter, RowSink};
    pub use crate::stats::{QueryStats, QueryStatsSnapshot};

    // Resolution
    pub use crate::union::{
        FieldMapping, PlainResolver, Resolution, TaggedUnion, UnionResolver, UnknownReason,
        UnknownVariant, Variant, IDENTITY_COLUMN,
    };

    // Tables
    pub use crate::table::{
        ColumnDefinition, EnrichmentSpec, GetSpec, KeyColumn, ListSpec, PageSizeHint, ParentSpec,
        Pushdown, TableDefinition,
    };
}

// Re-export async_trait for client and task implementors
pub use async_trait::async_trait;
