//! Parent/child fan-out and column enrichment
//!
//! A query runs through three stages:
//!
//! 1. **Parent iteration** (optional): list the parent resource and, for
//!    every parent whose key does not contradict a qualifier, run one
//!    primary fetch scoped to it.
//! 2. **Primary fetch**: a keyed Get or a paginated List. Every item is
//!    resolved to a candidate row and checked against the qualifiers that
//!    can already be evaluated.
//! 3. **Secondary enrichment**: requested or qualified columns that need
//!    their own remote call are filled in, bounded by the configured
//!    concurrency and by the row budget, then the row goes to the sink.
//!
//! The budget is checked before every page, after every parent, before
//! every enrichment dispatch and after every emitted row.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::budget::RowBudget;
use crate::classify::{ErrorTable, FATAL_ONLY};
use crate::client::{EndpointTemplate, ListRequest, ResourceClient};
use crate::context::QueryContext;
use crate::error::{QueryError, QueryResult};
use crate::fetcher::PaginatedFetcher;
use crate::sink::{RowEmitter, RowSink};
use crate::stats::QueryStats;
use crate::table::{EnrichmentSpec, GetSpec, ListSpec, ParentSpec, TableDefinition};
use crate::union::{Resolution, UnionResolver, UnknownVariant, IDENTITY_COLUMN};
use crate::value::{ColumnType, ColumnValue, NormalizedRow, RawItem};

/// A secondary fetch that produces the value of one column for one row.
///
/// Tasks report failures as-is; the caller classifies them with the
/// column's [`ErrorTable`].
#[async_trait]
pub trait HydrateTask: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Produce the column value for `row`.
    async fn run(&self, client: &dyn ResourceClient, row: &NormalizedRow)
        -> QueryResult<ColumnValue>;
}

/// Collects every page of a sub-list into a JSON array.
#[derive(Debug, Clone, Copy)]
pub struct CollectListTask {
    name: &'static str,
    endpoint: EndpointTemplate,
    missing: ErrorTable,
}

impl CollectListTask {
    /// Placeholders of `endpoint` are filled from the row.
    #[must_use]
    pub const fn new(name: &'static str, endpoint: EndpointTemplate) -> Self {
        Self {
            name,
            endpoint,
            missing: FATAL_ONLY,
        }
    }

    /// Treat errors ignorable under `errors` as an empty sub-list instead of
    /// reporting them.
    #[must_use]
    pub const fn empty_when(mut self, errors: ErrorTable) -> Self {
        self.missing = errors;
        self
    }
}

#[async_trait]
impl HydrateTask for CollectListTask {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(
        &self,
        client: &dyn ResourceClient,
        row: &NormalizedRow,
    ) -> QueryResult<ColumnValue> {
        let Some(endpoint) = self.endpoint.render_row(row) else {
            return Ok(ColumnValue::Null);
        };

        let items = PaginatedFetcher::new(client, ListRequest::new(endpoint), &self.missing)
            .collect_all()
            .await?;

        Ok(ColumnValue::Json(Value::Array(
            items.into_iter().map(RawItem::into_json).collect(),
        )))
    }
}

/// Reads one field of a single related item.
#[derive(Debug, Clone, Copy)]
pub struct LookupFieldTask {
    name: &'static str,
    endpoint: EndpointTemplate,
    path: &'static str,
    kind: ColumnType,
}

impl LookupFieldTask {
    #[must_use]
    pub const fn new(
        name: &'static str,
        endpoint: EndpointTemplate,
        path: &'static str,
        kind: ColumnType,
    ) -> Self {
        Self {
            name,
            endpoint,
            path,
            kind,
        }
    }
}

#[async_trait]
impl HydrateTask for LookupFieldTask {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(
        &self,
        client: &dyn ResourceClient,
        row: &NormalizedRow,
    ) -> QueryResult<ColumnValue> {
        let Some(endpoint) = self.endpoint.render_row(row) else {
            return Ok(ColumnValue::Null);
        };
        let item = client.get(&endpoint).await?;
        Ok(item.column_value(self.path, self.kind))
    }
}

/// Whether the pipeline may keep producing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Executes one table query through the three stages.
pub struct HydrateGraph<'a> {
    client: &'a dyn ResourceClient,
    ctx: &'a QueryContext,
    enrichments: &'a [EnrichmentSpec],
    budget: &'a RowBudget,
    sink: RowSink<'a>,
    stats: &'a QueryStats,
    concurrency: usize,
}

impl<'a> HydrateGraph<'a> {
    pub fn new(
        client: &'a dyn ResourceClient,
        ctx: &'a QueryContext,
        table: &'a TableDefinition,
        budget: &'a RowBudget,
        emitter: &'a dyn RowEmitter,
        stats: &'a QueryStats,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            ctx,
            enrichments: &table.enrichments,
            budget,
            sink: RowSink::new(budget, emitter, stats),
            stats,
            concurrency: concurrency.max(1),
        }
    }

    /// Run the List path, with parent iteration if the list declares one.
    pub async fn run_list(&self, list: &ListSpec) -> QueryResult<()> {
        match &list.parent {
            Some(parent) => self.parent_iteration(list, parent).await,
            None => self.primary_list(list, NormalizedRow::new()).await.map(drop),
        }
    }

    /// Run the keyed Get path. `keys` holds the key column values.
    pub async fn run_get(&self, get: &GetSpec, keys: NormalizedRow) -> QueryResult<()> {
        if self.budget.is_exhausted() {
            return Ok(());
        }
        let Some(endpoint) = get.endpoint.render_row(&keys) else {
            debug!(endpoint = get.endpoint.as_str(), "Get keys incomplete, nothing fetched");
            return Ok(());
        };

        let item = match self.client.get(&endpoint).await {
            Ok(item) => item,
            Err(err) if get.errors.classify(&err).is_ignorable() => {
                self.ignored(get.errors.family(), &err);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let candidates = self
            .candidate(get.resolver.as_ref(), &item, &keys)
            .into_iter()
            .collect();
        self.secondary_enrichment(candidates).await.map(drop)
    }

    async fn parent_iteration(&self, list: &ListSpec, parent: &ParentSpec) -> QueryResult<()> {
        let join_key = self.ctx.qualifiers().equals_key(parent.join_column);

        if let (Some(get), Some(key)) = (parent.get, join_key) {
            let Some(endpoint) = get.render(|name| (name == IDENTITY_COLUMN).then(|| key.clone()))
            else {
                return Err(QueryError::invalid_configuration(format!(
                    "parent get endpoint {} must only use {{{IDENTITY_COLUMN}}}",
                    get.as_str()
                )));
            };
            debug!(%endpoint, "Fetching single parent");
            return match self.client.get(&endpoint).await {
                Ok(item) => self.visit_parent(list, parent, &item).await.map(drop),
                Err(err) if parent.errors.classify(&err).is_ignorable() => {
                    self.ignored(parent.errors.family(), &err);
                    Ok(())
                }
                Err(err) => Err(err),
            };
        }

        let Some(endpoint) = parent.endpoint.fixed() else {
            return Err(QueryError::invalid_configuration(format!(
                "parent list endpoint {} has placeholders",
                parent.endpoint.as_str()
            )));
        };
        let mut parents = PaginatedFetcher::new(self.client, ListRequest::new(endpoint), &parent.errors)
            .with_budget(self.budget)
            .with_stats(self.stats);

        while let Some(items) = parents.next_page().await? {
            for item in &items {
                if self.visit_parent(list, parent, item).await? == Flow::Stop {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    async fn visit_parent(
        &self,
        list: &ListSpec,
        parent: &ParentSpec,
        item: &RawItem,
    ) -> QueryResult<Flow> {
        if self.budget.is_exhausted() {
            return Ok(Flow::Stop);
        }

        let parent_row = match parent.resolver.resolve(item) {
            Resolution::Known { row, .. } => row,
            Resolution::Unknown(unknown) => {
                self.unknown(&unknown);
                return Ok(Flow::Continue);
            }
        };
        self.stats.record_parent();

        let scope = parent.scope(&parent_row);
        if !self.ctx.qualifiers().matches_populated(&scope) {
            self.stats.record_pruned();
            debug!(
                join_column = parent.join_column,
                parent = %parent_row.key(IDENTITY_COLUMN).unwrap_or_default(),
                "Parent pruned by qualifier"
            );
            return Ok(Flow::Continue);
        }

        let flow = self.primary_list(list, scope).await?;
        if flow == Flow::Stop || self.budget.is_exhausted() {
            Ok(Flow::Stop)
        } else {
            Ok(Flow::Continue)
        }
    }

    async fn primary_list(&self, list: &ListSpec, mut scope: NormalizedRow) -> QueryResult<Flow> {
        let qualifiers = self.ctx.qualifiers();
        // keys taken from qualifiers become columns of every row
        for name in list.endpoint.placeholders() {
            if !scope.is_populated(name) {
                if let Some(key) = qualifiers.equals_key(name) {
                    scope.set(name, key);
                }
            }
        }
        let Some(endpoint) = list.endpoint.render_row(&scope) else {
            debug!(
                endpoint = list.endpoint.as_str(),
                "Endpoint key unavailable, nothing fetched"
            );
            return Ok(Flow::Continue);
        };

        let filter = list.server_filter(qualifiers, self.budget.remaining());
        let request = ListRequest::new(endpoint).with_filter(filter);
        let mut pages = PaginatedFetcher::new(self.client, request, &list.errors)
            .with_budget(self.budget)
            .with_stats(self.stats);

        while let Some(items) = pages.next_page().await? {
            let candidates = items
                .iter()
                .filter_map(|item| self.candidate(list.resolver.as_ref(), item, &scope))
                .collect();
            if self.secondary_enrichment(candidates).await? == Flow::Stop {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    /// Resolve an item into a candidate row, or drop it.
    fn candidate(
        &self,
        resolver: &dyn UnionResolver,
        item: &RawItem,
        scope: &NormalizedRow,
    ) -> Option<NormalizedRow> {
        let mut row = match resolver.resolve(item) {
            Resolution::Known { row, .. } => row,
            Resolution::Unknown(unknown) => {
                self.unknown(&unknown);
                return None;
            }
        };
        for (column, value) in scope.iter() {
            row.set(column.clone(), value.clone());
        }

        if self.prefilter(&row) {
            Some(row)
        } else {
            self.stats.record_filtered();
            None
        }
    }

    /// Qualifier check before enrichment. Columns that enrichment may still
    /// fill are left for the final check.
    fn prefilter(&self, row: &NormalizedRow) -> bool {
        self.ctx
            .qualifiers()
            .iter()
            .filter(|(column, _)| row.is_populated(column) || !self.is_enriched(column))
            .all(|(column, qualifier)| qualifier.accepts(row.get(column)))
    }

    fn is_enriched(&self, column: &str) -> bool {
        self.enrichments.iter().any(|e| e.column == column)
    }

    async fn secondary_enrichment(&self, candidates: Vec<NormalizedRow>) -> QueryResult<Flow> {
        let mut pending = candidates.into_iter().peekable();

        while pending.peek().is_some() {
            let width = self.dispatch_width();
            if width == 0 {
                return Ok(Flow::Stop);
            }

            let window: Vec<_> = pending.by_ref().take(width).collect();
            let mut enriched = stream::iter(window)
                .map(|row| self.enrich(row))
                .buffered(width);

            while let Some(result) = enriched.next().await {
                let Some(row) = result? else {
                    continue;
                };
                if !self.ctx.qualifiers().matches(&row) {
                    self.stats.record_filtered();
                    continue;
                }
                if !self.sink.emit(row).await || !self.sink.is_open() {
                    // let in-flight enrichment finish; its rows are discarded
                    while enriched.next().await.is_some() {}
                    trace!("Row budget exhausted, enrichment drained");
                    return Ok(Flow::Stop);
                }
            }
        }

        if self.budget.is_exhausted() {
            Ok(Flow::Stop)
        } else {
            Ok(Flow::Continue)
        }
    }

    /// How many rows may be enriched at once.
    fn dispatch_width(&self) -> usize {
        match self.budget.remaining() {
            None => self.concurrency,
            Some(rows) => usize::try_from(rows)
                .unwrap_or(usize::MAX)
                .min(self.concurrency),
        }
    }

    /// Fill the enrichment columns of one row that are requested or
    /// qualified.
    ///
    /// Returns `None` when the budget ran out before the row's work started.
    async fn enrich(&self, mut row: NormalizedRow) -> QueryResult<Option<NormalizedRow>> {
        if self.budget.is_exhausted() {
            return Ok(None);
        }

        for spec in self.enrichments {
            if !self.ctx.needs(spec.column) || row.is_populated(spec.column) {
                self.stats.record_enrichment_skipped();
                continue;
            }
            if self.budget.is_exhausted() {
                return Ok(None);
            }

            self.stats.record_enrichment();
            trace!(column = spec.column, task = spec.task.name(), "Running enrichment");

            let value = match spec.task.run(self.client, &row).await {
                Ok(value) => value,
                Err(err) if spec.errors.classify(&err).is_ignorable() => {
                    self.ignored(spec.errors.family(), &err);
                    ColumnValue::Null
                }
                Err(err) => {
                    warn!(
                        column = spec.column,
                        task = spec.task.name(),
                        error_code = err.error_code(),
                        error = %err,
                        "Enrichment failed"
                    );
                    return Err(err);
                }
            };
            row.set(spec.column, value);
        }

        Ok(Some(row))
    }

    fn ignored(&self, family: &'static str, err: &QueryError) {
        self.stats.record_ignored_error();
        debug!(
            family,
            error_code = err.api_code().unwrap_or(err.error_code()),
            error = %err,
            "Ignorable error, treated as not found"
        );
    }

    fn unknown(&self, unknown: &UnknownVariant) {
        self.stats.record_unknown_variant();
        warn!(
            family = unknown.family,
            tag = unknown.tag.as_deref().unwrap_or("<none>"),
            reason = %unknown.reason,
            "Skipping item of unknown variant"
        );
    }
}
