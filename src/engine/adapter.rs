use crate::engine::{
    EngineError, Result,
    crawler::DetailCrawler,
    html::HtmlElement,
    types::{Mode, Movie},
};
use url::Url;

/// What a scrape run should fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeRequest {
    Search { query: String, page: u32 },
    List { page: u32 },
}

impl ScrapeRequest {
    pub fn search(query: impl Into<String>, page: u32) -> Self {
        Self::Search {
            query: query.into(),
            page: page.max(1),
        }
    }

    pub fn list(page: u32) -> Self {
        Self::List { page: page.max(1) }
    }

    pub const fn mode(&self) -> Mode {
        match self {
            Self::Search { .. } => Mode::Search,
            Self::List { .. } => Mode::List,
        }
    }

    pub const fn page(&self) -> u32 {
        match self {
            Self::Search { page, .. } | Self::List { page } => *page,
        }
    }
}

/// Where items live on a primary page: each `container` match is searched for
/// `item` matches, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRule {
    pub container: String,
    pub item: String,
}

impl SelectionRule {
    pub fn new(container: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            item: item.into(),
        }
    }
}

/// Everything that differs between target sites.
///
/// The mode is passed to every call instead of being kept on the adapter, so
/// one adapter can serve concurrent runs.
pub trait SiteAdapter: Send + Sync {
    /// Registry key, lowercase (e.g. "netnaija")
    fn id(&self) -> &'static str;

    /// Human-readable site name, recorded as each movie's source
    fn name(&self) -> &'static str;

    fn description(&self) -> &str {
        ""
    }

    fn base_url(&self) -> &Url;

    /// Search page for `query`, with the site's query parameters applied
    fn search_url(&self, query: &str, page: u32) -> Result<Url>;

    /// Listing page of recent uploads
    fn list_url(&self, page: u32) -> Result<Url>;

    /// First URL to crawl for a request
    fn primary_url(&self, request: &ScrapeRequest) -> Result<Url> {
        match request {
            ScrapeRequest::Search { query, page } => self.search_url(query, *page),
            ScrapeRequest::List { page } => self.list_url(*page),
        }
    }

    /// Description of a batch, shown to whoever picks from it
    fn query_label(&self, request: &ScrapeRequest) -> String {
        match request {
            ScrapeRequest::Search { query, .. } => query.clone(),
            ScrapeRequest::List { page } => format!("List of Recent Uploads - Page {page}"),
        }
    }

    /// Selectors locating items on the primary page
    fn selection_rule(&self, mode: Mode) -> Result<SelectionRule>;

    /// Build a partial record from one item fragment.
    ///
    /// Must be a pure function of its inputs. An error drops the item only.
    fn parse_item(&self, item: &HtmlElement<'_>, index: usize, mode: Mode) -> Result<Movie>;

    /// Install handlers that enrich records from their detail pages
    fn register_detail_handlers(&self, crawler: &mut DetailCrawler, mode: Mode);

    /// One-line summary, e.g. "NetNaija (https://www.thenetnaija.com/)"
    fn summary(&self) -> String {
        format!("{} ({})", self.name(), self.base_url())
    }
}

/// Error for an adapter asked to run in a mode it has no pages for
pub fn unsupported_mode(adapter: &dyn SiteAdapter, mode: Mode) -> EngineError {
    EngineError::InvalidMode {
        mode: mode.to_string(),
        reason: format!("not supported by {}", adapter.name()),
    }
}
