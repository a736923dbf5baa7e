//! Cursor-following list fetcher.

use futures::stream::{self, Stream, TryStreamExt};
use tracing::{debug, trace};

use crate::budget::RowBudget;
use crate::classify::ErrorTable;
use crate::client::{ListRequest, PageCursor, ResourceClient};
use crate::error::{QueryError, QueryResult};
use crate::stats::QueryStats;
use crate::value::RawItem;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    Next(PageCursor),
    Done,
}

/// Lazily walks the pages of one list call.
///
/// A page is atomic: if its fetch fails none of its items are returned.
/// A failure on the first page that the family's [`ErrorTable`] calls
/// ignorable ends the sequence quietly; any later failure, and anything
/// else, ends it with the error so a partial list is never passed off as
/// complete. An exhausted budget is a
/// normal end, checked before every page.
pub struct PaginatedFetcher<'a> {
    client: &'a dyn ResourceClient,
    request: ListRequest,
    errors: &'a ErrorTable,
    budget: Option<&'a RowBudget>,
    stats: Option<&'a QueryStats>,
    cursor: Cursor,
    pages: u64,
}

impl<'a> PaginatedFetcher<'a> {
    /// Create a fetcher; nothing is fetched until the first
    /// [`next_page`](Self::next_page).
    pub fn new(client: &'a dyn ResourceClient, request: ListRequest, errors: &'a ErrorTable) -> Self {
        Self {
            client,
            request,
            errors,
            budget: None,
            stats: None,
            cursor: Cursor::Start,
            pages: 0,
        }
    }

    /// Stop fetching once this budget is exhausted.
    #[must_use]
    pub fn with_budget(mut self, budget: &'a RowBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Record pages and ignored errors here.
    #[must_use]
    pub fn with_stats(mut self, stats: &'a QueryStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Pages fetched so far.
    #[must_use]
    pub fn pages_fetched(&self) -> u64 {
        self.pages
    }

    /// Whether the sequence has ended.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cursor == Cursor::Done
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once the sequence has ended. A page may be empty
    /// while more pages follow.
    pub async fn next_page(&mut self) -> QueryResult<Option<Vec<RawItem>>> {
        let cursor = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(cursor) => Some(cursor),
        };

        if self.budget.is_some_and(RowBudget::is_exhausted) {
            debug!(
                endpoint = %self.request.endpoint,
                pages = self.pages,
                "Row budget exhausted, pagination stopped"
            );
            return Ok(None);
        }

        let page = match self.client.list(&self.request, cursor.as_ref()).await {
            Ok(page) => page,
            Err(err) => return self.fail(err),
        };

        if page.next.is_some() && page.next == cursor {
            return Err(QueryError::malformed(format!(
                "pagination cursor did not advance for {}",
                self.request.endpoint
            )));
        }

        self.pages += 1;
        if let Some(stats) = self.stats {
            stats.record_page();
        }

        trace!(
            endpoint = %self.request.endpoint,
            page = self.pages,
            items = page.items.len(),
            has_next = page.next.is_some(),
            "Fetched page"
        );

        if let Some(next) = page.next {
            self.cursor = Cursor::Next(next);
        }
        Ok(Some(page.items))
    }

    fn fail(&self, err: QueryError) -> QueryResult<Option<Vec<RawItem>>> {
        if self.pages == 0 && self.errors.classify(&err).is_ignorable() {
            debug!(
                endpoint = %self.request.endpoint,
                family = self.errors.family(),
                error_code = err.api_code().unwrap_or(err.error_code()),
                "Ignorable list error, treating as end of results"
            );
            if let Some(stats) = self.stats {
                stats.record_ignored_error();
            }
            Ok(None)
        } else {
            Err(err)
        }
    }

    /// Fetch every remaining page and concatenate the items.
    pub async fn collect_all(mut self) -> QueryResult<Vec<RawItem>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }

    /// Item-at-a-time view; pages are fetched as the stream is polled.
    pub fn into_items(self) -> impl Stream<Item = QueryResult<RawItem>> + 'a {
        stream::try_unfold(self, |mut fetcher| async move {
            Ok::<_, QueryError>(fetcher
                .next_page()
                .await?
                .map(|items| (stream::iter(items.into_iter().map(Ok)), fetcher)))
        })
        .try_flatten()
    }
}
