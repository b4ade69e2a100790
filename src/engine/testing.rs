//! In-memory transport and toy adapters for engine tests.

use crate::engine::{
    EngineError, Result,
    adapter::{SelectionRule, SiteAdapter, unsupported_mode},
    crawler::DetailCrawler,
    html::HtmlElement,
    transport::{FetchRequest, Page, Transport},
    types::{Mode, Movie},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
enum Response {
    Html(String),
    Fail(String),
    Binary,
}

/// Serves canned pages keyed by URL and records what was asked for
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    pages: HashMap<String, Response>,
    delay: Option<Duration>,
    fetched: Mutex<Vec<String>>,
    releases: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), Response::Html(body.into()));
        self
    }

    pub(crate) fn with_error(mut self, url: &str, message: &str) -> Self {
        self.pages
            .insert(url.to_string(), Response::Fail(message.to_string()));
        self
    }

    /// Serve a video file at `url`
    pub(crate) fn with_binary(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Response::Binary);
        self
    }

    /// Hold every fetch for `delay`
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }

    pub(crate) fn fetch_count(&self, url: &str) -> usize {
        self.fetched.lock().iter().filter(|u| *u == url).count()
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Most fetches observed running at the same time
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, request: &FetchRequest) -> Result<Page> {
        let url = request.url.to_string();
        self.fetched.lock().push(url.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(&url) {
            Some(Response::Html(body)) => Ok(Page::html(request.url.clone(), body.clone())),
            Some(Response::Fail(message)) => Err(EngineError::Transport(message.clone())),
            Some(Response::Binary) if request.text_only => Err(EngineError::NonTextContent {
                url,
                content_type: "video/mp4".to_string(),
            }),
            Some(Response::Binary) => Ok(Page {
                url: request.url.clone(),
                status: 200,
                content_type: Some("video/mp4".to_string()),
                body: String::new(),
            }),
            None => Err(EngineError::Transport(format!("HTTP 404 for {url}"))),
        }
    }

    async fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Toy site: `<ul class="results"><li class="item"><a href>Title</a></li></ul>`.
///
/// Detail pages may carry `span.size`, `a.file` (download link), `a.next`
/// (nested fetch) and `li.episode a` (series episodes). An item titled
/// "BROKEN" fails to parse.
pub(crate) struct AlphaEngine {
    base_url: Url,
}

impl AlphaEngine {
    pub(crate) const BASE: &'static str = "https://alpha.test/";

    pub(crate) fn new() -> Self {
        Self {
            base_url: Url::parse(Self::BASE).unwrap(),
        }
    }
}

impl SiteAdapter for AlphaEngine {
    fn id(&self) -> &'static str {
        "alpha"
    }

    fn name(&self) -> &'static str {
        "Alpha"
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn search_url(&self, query: &str, _page: u32) -> Result<Url> {
        let mut url = self.base_url.join("search")?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url)
    }

    fn list_url(&self, page: u32) -> Result<Url> {
        Ok(self.base_url.join(&format!("latest/{page}"))?)
    }

    fn selection_rule(&self, _mode: Mode) -> Result<SelectionRule> {
        Ok(SelectionRule::new("ul.results", "li.item"))
    }

    fn parse_item(&self, item: &HtmlElement<'_>, index: usize, _mode: Mode) -> Result<Movie> {
        let title = item.child_text("a");
        if title == "BROKEN" {
            return Err(EngineError::ItemParse {
                index,
                reason: "broken markup".to_string(),
            });
        }
        let href = item.child_attr("a", "href").unwrap_or_default();
        Ok(Movie::new(index, self.name())
            .with_title(title)
            .with_series(item.attr("data-series").is_some())
            .with_download_link(item.absolute_url(&href)?))
    }

    fn register_detail_handlers(&self, crawler: &mut DetailCrawler, _mode: Mode) {
        crawler.on_html("span.size", |el, ctx| {
            let size = el.text();
            ctx.update(|movie| movie.size = size);
        });
        crawler.on_html("a.file", |el, ctx| {
            if let Some(link) = el.attr("href").and_then(|h| el.absolute_url(h).ok()) {
                ctx.update(|movie| movie.download_link = Some(link));
            }
        });
        crawler.on_html("a.next", |el, ctx| {
            if let Some(link) = el.attr("href").and_then(|h| el.absolute_url(h).ok()) {
                ctx.visit(link);
            }
        });
        crawler.on_html("li.episode a", |el, ctx| {
            let label = el.text();
            if let Some(link) = el.attr("href").and_then(|h| el.absolute_url(h).ok()) {
                ctx.update(|movie| movie.insert_episode(label, link));
            }
        });
    }
}

/// Search-only site that sits behind a bot challenge
pub(crate) struct BetaEngine {
    base_url: Url,
}

impl BetaEngine {
    pub(crate) fn new() -> Self {
        Self {
            base_url: Url::parse("https://beta.test/").unwrap(),
        }
    }
}

impl SiteAdapter for BetaEngine {
    fn id(&self) -> &'static str {
        "beta"
    }

    fn name(&self) -> &'static str {
        "Beta"
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn search_url(&self, query: &str, _page: u32) -> Result<Url> {
        let mut url = self.base_url.join("find")?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url)
    }

    fn list_url(&self, _page: u32) -> Result<Url> {
        Err(unsupported_mode(self, Mode::List))
    }

    fn selection_rule(&self, mode: Mode) -> Result<SelectionRule> {
        match mode {
            Mode::Search => Ok(SelectionRule::new("div.hits", "div.hit")),
            Mode::List => Err(unsupported_mode(self, mode)),
        }
    }

    fn parse_item(&self, item: &HtmlElement<'_>, index: usize, _mode: Mode) -> Result<Movie> {
        let href = item.child_attr("a", "href").unwrap_or_default();
        Ok(Movie::new(index, self.name())
            .with_title(item.child_text("a"))
            .with_download_link(item.absolute_url(&href)?))
    }

    fn register_detail_handlers(&self, crawler: &mut DetailCrawler, _mode: Mode) {
        crawler.on_html("span.size", |el, ctx| {
            let size = el.text();
            ctx.update(|movie| movie.size = size);
        });
    }
}

/// `<ul class="results">` listing with one `<li class="item">` per `(title, href)`
pub(crate) fn listing(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, href)| format!(r#"<li class="item"><a href="{href}">{title}</a></li>"#))
        .collect();
    format!(r#"<html><body><ul class="results">{items}</ul></body></html>"#)
}

/// Detail page wrapping `body`
pub(crate) fn detail(body: &str) -> String {
    format!("<html><body>{body}</body></html>")
}
