//! The detail crawl: per-item fetches of detail and download pages.
//!
//! Adapters register selector-keyed handlers on a [`DetailCrawler`]. For each
//! fetched page the handlers run against every matching element, with a
//! [`DetailContext`] that knows which record the page belongs to. Handlers may
//! ask for further pages with [`DetailContext::visit`]; those are tracked by the
//! same barrier so a run only finishes once the whole chain is done.

use crate::engine::{
    EngineError,
    html::{HtmlElement, selector},
    table::{CorrelationKey, ResultTable},
    transport::{FetchRequest, Page, Transport},
    types::{Enrichment, Movie},
};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

type Handler = Arc<dyn Fn(&HtmlElement<'_>, &mut DetailContext<'_>) + Send + Sync>;

/// A detail page fetch tagged with the record it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub key: CorrelationKey,
    pub url: Url,
    /// 0 for fetches issued from the primary page
    pub depth: usize,
}

/// What a detail handler can see and do while handling one element
pub struct DetailContext<'a> {
    key: CorrelationKey,
    url: &'a Url,
    depth: usize,
    table: &'a ResultTable,
    follow_ups: Vec<DetailRequest>,
}

impl<'a> DetailContext<'a> {
    pub(crate) const fn new(
        key: CorrelationKey,
        url: &'a Url,
        depth: usize,
        table: &'a ResultTable,
    ) -> Self {
        Self {
            key,
            url,
            depth,
            table,
            follow_ups: Vec::new(),
        }
    }

    pub const fn key(&self) -> CorrelationKey {
        self.key
    }

    /// URL of the page being handled
    pub const fn url(&self) -> &Url {
        self.url
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Snapshot of the record this page belongs to
    pub fn movie(&self) -> Option<Movie> {
        self.table.get(self.key)
    }

    /// Mutate the record under the table lock and mark it enriched
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut Movie),
    {
        let updated = self.table.update(self.key, |movie| {
            f(movie);
            movie.enrichment = Enrichment::Enriched;
        });
        if !updated {
            warn!("No record for key {} while handling {}", self.key, self.url);
        }
        updated
    }

    /// Queue a nested fetch for the same record
    pub fn visit(&mut self, url: Url) {
        self.follow_ups.push(DetailRequest {
            key: self.key,
            url,
            depth: self.depth + 1,
        });
    }

    pub(crate) fn into_follow_ups(self) -> Vec<DetailRequest> {
        self.follow_ups
    }
}

/// Handlers installed by an adapter for the detail crawl
#[derive(Default)]
pub struct DetailCrawler {
    handlers: Vec<(Selector, Handler)>,
}

impl DetailCrawler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `handler` for every element matching `css` on each detail page.
    ///
    /// Handlers run in registration order. An invalid selector is logged and
    /// the handler is not installed.
    pub fn on_html<F>(&mut self, css: &str, handler: F)
    where
        F: Fn(&HtmlElement<'_>, &mut DetailContext<'_>) + Send + Sync + 'static,
    {
        match selector(css) {
            Ok(sel) => self.handlers.push((sel, Arc::new(handler))),
            Err(e) => warn!("Skipping detail handler: {}", e),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Run every handler against `page`, returning the nested fetches they asked for
    pub(crate) fn handle_page(
        &self,
        page: &Page,
        key: CorrelationKey,
        depth: usize,
        table: &ResultTable,
    ) -> Vec<DetailRequest> {
        let document = Html::parse_document(&page.body);
        let mut ctx = DetailContext::new(key, &page.url, depth, table);

        for (sel, handler) in &self.handlers {
            for element in document.select(sel) {
                handler(&HtmlElement::new(element, &page.url), &mut ctx);
            }
        }

        ctx.into_follow_ups()
    }
}

impl std::fmt::Debug for DetailCrawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailCrawler")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Detail fetches of one run.
///
/// Every dispatched fetch is a task in the join set; nested fetches come back
/// as task output and are dispatched before the finished task is retired, so
/// `drain` returns only once nothing is left anywhere in the chain.
pub(crate) struct DetailRun {
    crawler: Arc<DetailCrawler>,
    transport: Arc<dyn Transport>,
    table: Arc<ResultTable>,
    limiter: Arc<Semaphore>,
    max_depth: usize,
    visited: HashSet<String>,
    tasks: JoinSet<Vec<DetailRequest>>,
}

impl DetailRun {
    pub(crate) fn new(
        crawler: DetailCrawler,
        transport: Arc<dyn Transport>,
        table: Arc<ResultTable>,
        max_concurrent: usize,
        max_depth: usize,
    ) -> Self {
        Self {
            crawler: Arc::new(crawler),
            transport,
            table,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            max_depth,
            visited: HashSet::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Number of fetches not yet finished
    pub(crate) fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Start a fetch. Returns false if the URL was already visited this run or
    /// the chain is too deep.
    pub(crate) fn dispatch(&mut self, request: DetailRequest) -> bool {
        if request.depth > self.max_depth {
            debug!(
                "Not following {} for key {}: depth {} exceeds {}",
                request.url, request.key, request.depth, self.max_depth
            );
            return false;
        }
        if !self.visited.insert(request.url.to_string()) {
            debug!("Already visited {}", request.url);
            return false;
        }

        let crawler = Arc::clone(&self.crawler);
        let transport = Arc::clone(&self.transport);
        let table = Arc::clone(&self.table);
        let limiter = Arc::clone(&self.limiter);

        self.tasks.spawn(async move {
            let Ok(_permit) = limiter.acquire_owned().await else {
                return Vec::new();
            };

            if let Some(movie) = table.get(request.key) {
                debug!("Retrieving download page for {} ({})", movie.title, request.url);
            }

            let page = match transport.fetch(&FetchRequest::detail(request.url.clone())).await {
                Ok(page) => page,
                Err(e @ EngineError::NonTextContent { .. }) => {
                    debug!("{}", e);
                    return Vec::new();
                }
                Err(e) => {
                    let error = EngineError::DetailEnrichment {
                        url: request.url.to_string(),
                        reason: e.to_string(),
                    };
                    warn!("Key {}: {}", request.key, error);
                    return Vec::new();
                }
            };

            let follow_ups = crawler.handle_page(&page, request.key, request.depth, &table);
            debug!(
                "Retrieved download page {} ({} nested)",
                request.url,
                follow_ups.len()
            );
            follow_ups
        });
        true
    }

    /// Wait for every dispatched fetch, including nested ones
    pub(crate) async fn drain(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(follow_ups) => {
                    for request in follow_ups {
                        self.dispatch(request);
                    }
                }
                Err(e) => warn!("Detail fetch task failed: {}", e),
            }
        }
    }
}
