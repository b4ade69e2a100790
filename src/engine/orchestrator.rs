use crate::engine::{
    Result,
    adapter::{ScrapeRequest, SelectionRule, SiteAdapter},
    crawler::{DetailCrawler, DetailRequest, DetailRun},
    html::{HtmlElement, selector},
    table::{CorrelationKey, ResultTable},
    transport::{ChallengeTransport, FetchRequest, Page, Transport},
    types::{Enrichment, Mode, Movie, SearchResult},
};
use scraper::Html;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use url::Url;

/// Builds the transport used for a run's primary crawl on challenge-protected sites
pub type TransportFactory = Arc<dyn Fn() -> Result<Arc<dyn Transport>> + Send + Sync>;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Upper bound on detail fetches in flight at once
    pub max_concurrent_requests: usize,
    /// How many nested fetches a detail chain may issue
    pub max_detail_depth: usize,
    /// Engine ids whose primary page needs the challenge-solving transport
    pub challenge_engines: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 8,
            max_detail_depth: 6,
            challenge_engines: Vec::new(),
        }
    }
}

/// Lifecycle of one scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    PrimaryCrawlInFlight,
    DetailCrawlsInFlight,
    Draining,
    Flattened,
    Done,
}

impl RunState {
    fn advance(&mut self, next: Self, engine: &str) {
        trace!("{}: {:?} -> {:?}", engine, self, next);
        *self = next;
    }
}

/// Releases a run's transport even when the run is dropped mid-flight
struct ReleaseGuard {
    transport: Option<Arc<dyn Transport>>,
}

impl ReleaseGuard {
    fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    async fn release(mut self) {
        if let Some(transport) = &self.transport {
            transport.release().await;
        }
        self.transport = None;
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let Some(transport) = self.transport.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Scrape cancelled, releasing challenge transport");
                handle.spawn(async move { transport.release().await });
            }
            Err(_) => warn!("Scrape cancelled outside a runtime, transport not released"),
        }
    }
}

/// Drives two-phase scrapes for any site adapter
pub struct Scraper {
    transport: Arc<dyn Transport>,
    challenge: Option<TransportFactory>,
    config: ScraperConfig,
}

impl Scraper {
    /// Create a scraper fetching everything through `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, ScraperConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(transport: Arc<dyn Transport>, config: ScraperConfig) -> Self {
        Self {
            transport,
            challenge: None,
            config,
        }
    }

    /// Use `factory` for the primary crawl of engines listed in
    /// `challenge_engines`. A fresh transport is built per run and released
    /// when the run ends.
    #[must_use]
    pub fn with_challenge_transport(mut self, factory: TransportFactory) -> Self {
        self.challenge = Some(factory);
        self
    }

    /// Use a FlareSolverr-compatible solver at `solver_url` for challenge-protected engines
    #[must_use]
    pub fn with_challenge_solver(self, solver_url: Url, timeout: Duration) -> Self {
        self.with_challenge_transport(Arc::new(move || {
            let transport: Arc<dyn Transport> =
                Arc::new(ChallengeTransport::new(&solver_url, timeout)?);
            Ok(transport)
        }))
    }

    pub const fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Search `adapter`'s site for `query`
    pub async fn search(
        &self,
        adapter: &dyn SiteAdapter,
        query: &str,
        page: u32,
    ) -> Result<SearchResult> {
        self.run(adapter, &ScrapeRequest::search(query, page)).await
    }

    /// List recent uploads on `adapter`'s site
    pub async fn list(&self, adapter: &dyn SiteAdapter, page: u32) -> Result<SearchResult> {
        self.run(adapter, &ScrapeRequest::list(page)).await
    }

    /// Scrape and wrap the records in a batch described by the adapter
    pub async fn run(
        &self,
        adapter: &dyn SiteAdapter,
        request: &ScrapeRequest,
    ) -> Result<SearchResult> {
        let movies = self.scrape(adapter, request).await?;
        Ok(SearchResult::new(adapter.query_label(request), movies))
    }

    /// Run one full scrape and return its records sorted by `index`.
    ///
    /// Item-level failures are absorbed. Only a primary page that cannot be
    /// fetched or an adapter that rejects the mode fails the run.
    pub async fn scrape(
        &self,
        adapter: &dyn SiteAdapter,
        request: &ScrapeRequest,
    ) -> Result<Vec<Movie>> {
        let Some(challenge) = self.challenge_transport_for(adapter)? else {
            return self.scrape_with(adapter, request, self.transport.as_ref()).await;
        };

        let guard = ReleaseGuard::new(Arc::clone(&challenge));
        let result = self.scrape_with(adapter, request, challenge.as_ref()).await;
        guard.release().await;
        result
    }

    fn challenge_transport_for(
        &self,
        adapter: &dyn SiteAdapter,
    ) -> Result<Option<Arc<dyn Transport>>> {
        let listed = self
            .config
            .challenge_engines
            .iter()
            .any(|id| id.eq_ignore_ascii_case(adapter.id()));

        match (&self.challenge, listed) {
            (Some(factory), true) => {
                debug!("Using challenge transport for {}", adapter.name());
                factory().map(Some)
            }
            (None, true) => {
                warn!(
                    "{} needs a challenge solver but none is configured",
                    adapter.name()
                );
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    async fn scrape_with(
        &self,
        adapter: &dyn SiteAdapter,
        request: &ScrapeRequest,
        primary: &dyn Transport,
    ) -> Result<Vec<Movie>> {
        let engine = adapter.name();
        let mode = request.mode();
        let mut state = RunState::Idle;

        let rule = adapter.selection_rule(mode)?;
        let url = adapter.primary_url(request)?;

        let table = Arc::new(ResultTable::new());
        let mut crawler = DetailCrawler::new();
        adapter.register_detail_handlers(&mut crawler, mode);
        debug!(
            "{}: {} detail handlers for {} mode",
            engine,
            crawler.handler_count(),
            mode
        );
        let mut details = DetailRun::new(
            crawler,
            Arc::clone(&self.transport),
            Arc::clone(&table),
            self.config.max_concurrent_requests,
            self.config.max_detail_depth,
        );

        state.advance(RunState::PrimaryCrawlInFlight, engine);
        info!("Scraping {} in {} mode: {}", engine, mode, url);
        let page = primary.fetch(&FetchRequest::page(url)).await?;

        let found = collect_items(adapter, mode, &rule, &page, &table, &mut details)?;
        state.advance(RunState::DetailCrawlsInFlight, engine);
        debug!(
            "{}: {} items found, {} detail fetches in flight",
            engine,
            found,
            details.in_flight()
        );

        state.advance(RunState::Draining, engine);
        details.drain().await;
        drop(details);

        let mut movies = match Arc::try_unwrap(table) {
            Ok(table) => table.into_sorted(),
            Err(shared) => {
                let mut movies = shared.values();
                movies.sort_by_key(|m| m.index);
                movies
            }
        };
        finalize(&mut movies);
        state.advance(RunState::Flattened, engine);

        info!("{} returned {} results", engine, movies.len());
        state.advance(RunState::Done, engine);
        Ok(movies)
    }
}

/// Parse the primary page, store each item and dispatch its detail fetch.
/// Returns the number of items stored.
fn collect_items(
    adapter: &dyn SiteAdapter,
    mode: Mode,
    rule: &SelectionRule,
    page: &Page,
    table: &ResultTable,
    details: &mut DetailRun,
) -> Result<usize> {
    let container = selector(&rule.container)?;
    let item = selector(&rule.item)?;
    let document = Html::parse_document(&page.body);

    let mut seen_links = HashSet::new();
    let mut index = 0;

    for section in document.select(&container) {
        for element in section.select(&item) {
            let fragment = HtmlElement::new(element, &page.url);
            let movie = match adapter.parse_item(&fragment, index, mode) {
                Ok(movie) => movie,
                Err(e) => {
                    warn!("{}: item skipped: {}", adapter.name(), e);
                    continue;
                }
            };

            if let Some(link) = &movie.download_link
                && !seen_links.insert(link.clone())
            {
                debug!("Duplicated link {} skipped", link);
                continue;
            }

            let key = CorrelationKey(index);
            let link = movie.download_link.clone();
            table.put(key, movie);
            if let Some(url) = link {
                details.dispatch(DetailRequest { key, url, depth: 0 });
            }
            index += 1;
        }
    }

    Ok(index)
}

/// Post-drain fixes: flag series without episodes and drop non-series records
/// whose resolved link duplicates an earlier one
fn finalize(movies: &mut Vec<Movie>) {
    for movie in movies.iter_mut() {
        if movie.is_unresolved_series() {
            movie.enrichment = Enrichment::Partial;
        }
    }

    let mut seen = HashSet::new();
    movies.retain(|movie| {
        if movie.is_series {
            return true;
        }
        match &movie.download_link {
            Some(link) if !seen.insert(link.clone()) => {
                warn!("Dropping {}: duplicated link {}", movie.title, link);
                false
            }
            _ => true,
        }
    });
}
