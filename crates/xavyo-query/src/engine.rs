//! Query entry point.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::budget::RowBudget;
use crate::client::ResourceClient;
use crate::config::EngineConfig;
use crate::context::QueryContext;
use crate::error::QueryResult;
use crate::hydrate::HydrateGraph;
use crate::qualifier::QualifierMap;
use crate::sink::{CollectingEmitter, RowEmitter};
use crate::stats::{QueryStats, QueryStatsSnapshot};
use crate::table::{GetSpec, ListSpec, TableDefinition};
use crate::union::IDENTITY_COLUMN;
use crate::value::NormalizedRow;

/// How a query reaches its primary data.
#[derive(Debug)]
pub enum Plan<'a> {
    /// Every Get key has an exact-match qualifier.
    Get {
        spec: &'a GetSpec,
        keys: NormalizedRow,
    },
    List(&'a ListSpec),
    /// A required qualifier is absent; nothing is fetched.
    Unsatisfiable { missing: &'static str },
}

impl<'a> Plan<'a> {
    /// Prefer a keyed Get, fall back to the List path.
    #[must_use]
    pub fn choose(table: &'a TableDefinition, qualifiers: &QualifierMap) -> Self {
        if let Some(get) = &table.get {
            if let Some(keys) = get.keys(qualifiers) {
                return Plan::Get { spec: get, keys };
            }
        }

        match &table.list {
            Some(list) => match list.missing_required(qualifiers) {
                Some(missing) => Plan::Unsatisfiable { missing },
                None => Plan::List(list),
            },
            None => Plan::Unsatisfiable {
                missing: table
                    .get
                    .as_ref()
                    .and_then(|get| {
                        get.key_columns
                            .iter()
                            .copied()
                            .find(|column| qualifiers.equals_key(column).is_none())
                    })
                    .unwrap_or(IDENTITY_COLUMN),
            },
        }
    }
}

/// Runs table queries against one remote API.
#[derive(Clone)]
pub struct QueryEngine {
    client: Arc<dyn ResourceClient>,
    config: EngineConfig,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QueryEngine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the configuration is invalid.
    pub fn new(client: Arc<dyn ResourceClient>, config: EngineConfig) -> QueryResult<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one query, handing rows to `emitter` as they are produced.
    ///
    /// Rows already emitted stay emitted if the query later fails.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; ignorable errors, unknown variants and
    /// unmet preconditions only shrink the result.
    #[instrument(skip(self, table, ctx, emitter), fields(table = table.name))]
    pub async fn execute(
        &self,
        table: &TableDefinition,
        ctx: &QueryContext,
        emitter: &dyn RowEmitter,
    ) -> QueryResult<QueryStatsSnapshot> {
        table.validate()?;

        let budget = RowBudget::from_context(ctx);
        let stats = QueryStats::new();
        let graph = HydrateGraph::new(
            self.client.as_ref(),
            ctx,
            table,
            &budget,
            emitter,
            &stats,
            self.config.enrichment_concurrency,
        );

        let result = match Plan::choose(table, ctx.qualifiers()) {
            Plan::Get { spec, keys } => {
                debug!(plan = "get", "Executing query");
                graph.run_get(spec, keys).await
            }
            Plan::List(list) => {
                debug!(plan = "list", parent = list.parent.is_some(), "Executing query");
                graph.run_list(list).await
            }
            Plan::Unsatisfiable { missing } => {
                debug!(column = missing, "Required qualifier missing, nothing fetched");
                Ok(())
            }
        };

        let snapshot = stats.snapshot();
        match result {
            Ok(()) => {
                info!(
                    rows_emitted = snapshot.rows_emitted,
                    pages_fetched = snapshot.pages_fetched,
                    enrichment_calls = snapshot.enrichment_calls,
                    unknown_variants = snapshot.unknown_variants,
                    "Query complete"
                );
                Ok(snapshot)
            }
            Err(err) => {
                warn!(
                    error_code = err.error_code(),
                    error = %err,
                    rows_emitted = snapshot.rows_emitted,
                    "Query failed"
                );
                Err(err)
            }
        }
    }

    /// Run one query and collect its rows.
    ///
    /// # Errors
    ///
    /// See [`QueryEngine::execute`].
    pub async fn collect(
        &self,
        table: &TableDefinition,
        ctx: &QueryContext,
    ) -> QueryResult<Vec<NormalizedRow>> {
        let emitter = CollectingEmitter::new();
        self.execute(table, ctx, &emitter).await?;
        Ok(emitter.take().await)
    }
}
