use super::{join_path, parse_year};
use crate::engine::{
    EngineError, Result,
    adapter::{SelectionRule, SiteAdapter},
    crawler::{DetailContext, DetailCrawler},
    html::HtmlElement,
    types::{Mode, Movie},
};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

const NETNAIJA_URL: &str = "https://www.thenetnaija.com/";

static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)Release Date:").expect("valid category regex"));
static RELEASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Release Date:(.*)Stars").expect("valid release regex"));
static STARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Stars:(.*)Source:").expect("valid stars regex"));
static IMDB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(https://www\.imdb\.\S*)").expect("valid imdb regex"));

/// Nigerian forum and media download center
pub struct NetNaijaEngine {
    base_url: Url,
}

impl Default for NetNaijaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NetNaijaEngine {
    pub fn new() -> Self {
        Self::with_base_url(Url::parse(NETNAIJA_URL).expect("valid NetNaija URL"))
    }

    /// Point the engine at another host (mirrors, tests)
    pub const fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }
}

impl SiteAdapter for NetNaijaEngine {
    fn id(&self) -> &'static str {
        "netnaija"
    }

    fn name(&self) -> &'static str {
        "NetNaija"
    }

    fn description(&self) -> &str {
        "Nigerian forum and media download center"
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn search_url(&self, query: &str, page: u32) -> Result<Url> {
        let mut url = self.base_url.join("/search")?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("t", query).append_pair("folder", "videos");
            if page > 1 {
                params.append_pair("page", &page.to_string());
            }
        }
        Ok(url)
    }

    fn list_url(&self, page: u32) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("/videos/movies/page/{page}/"))?)
    }

    fn selection_rule(&self, mode: Mode) -> Result<SelectionRule> {
        Ok(match mode {
            Mode::Search => SelectionRule::new("main", "article.sr-one"),
            Mode::List => SelectionRule::new("div.video-files", "article.file-one"),
        })
    }

    fn parse_item(&self, item: &HtmlElement<'_>, index: usize, mode: Mode) -> Result<Movie> {
        let title_selector = match mode {
            Mode::Search => "h3",
            Mode::List => "h2",
        };

        let href = item
            .child_attr("a", "href")
            .ok_or_else(|| EngineError::ItemParse {
                index,
                reason: "no link".to_string(),
            })?;
        let download_link = item.absolute_url(&href)?;

        let title = item.child_text(title_selector);
        let title = title
            .trim_start_matches("Movie:")
            .trim_start_matches("Video:")
            .trim()
            .to_string();

        let mut movie = Movie::new(index, self.name())
            .with_year(parse_year(&title))
            .with_title(title)
            .with_series(download_link.path().starts_with("/videos/series"))
            .with_download_link(download_link);
        movie.cover_photo_link = item
            .child_attr("img", "src")
            .and_then(|src| item.absolute_url(&src).ok())
            .map(String::from)
            .unwrap_or_default();
        movie.upload_date = item.child_text("span.fa-clock-o");
        movie.description = item.child_text("p.result-desc");

        Ok(movie)
    }

    fn register_detail_handlers(&self, crawler: &mut DetailCrawler, _mode: Mode) {
        crawler.on_html("div.file-size", |el, ctx| {
            let size = el.child_text("span.size-number");
            if !size.is_empty() {
                ctx.update(|movie| movie.size = size);
            }
        });

        crawler.on_html("article.post-body", handle_post_body);

        // Series or multi-part uploads
        crawler.on_html("div.video-series-latest-episodes", |el, ctx| {
            let episodes: Vec<(String, Url)> = el
                .select("a")
                .iter()
                .enumerate()
                .filter_map(|(n, a)| {
                    let link = a.absolute_url(a.attr("href")?).ok()?;
                    let label = match a.text() {
                        text if text.is_empty() => format!("Episode {}", n + 1),
                        text => text,
                    };
                    Some((label, join_path(&link, "download")))
                })
                .collect();

            ctx.update(|movie| {
                movie.is_series = true;
                for (label, link) in episodes {
                    movie.insert_episode(label, link);
                }
            });
        });

        crawler.on_html("a#download", |el, ctx| {
            let Some(link) = el.attr("href").and_then(|h| el.absolute_url(h).ok()) else {
                return;
            };
            let size = el.child_text("span#download-size");
            ctx.update(|movie| {
                movie.download_link = Some(link);
                if !size.is_empty() {
                    movie.size = size;
                }
            });
        });

        // File host page linked from the download page
        crawler.on_html("html", |el, ctx| {
            if !ctx.url().path().ends_with("download") {
                return;
            }
            let host_link = el
                .child_attr(r#"meta[property="og:url"]"#, "content")
                .filter(|c| c.contains("sabishare"))
                .or_else(|| {
                    el.child_attr("link[rel=canonical]", "href")
                        .filter(|h| h.contains("sabishare"))
                });
            if let Some(link) = host_link.and_then(|h| Url::parse(&h).ok()) {
                debug!("File host link {} for key {}", link, ctx.key());
                ctx.update(|movie| movie.download_link = Some(link));
            }
        });
    }
}

fn handle_post_body(el: &HtmlElement<'_>, ctx: &mut DetailContext<'_>) {
    let text = el.child_text("p");
    if !text.is_empty() {
        let mut parts = text.splitn(2, "Genre: ");
        let description = parts.next().unwrap_or_default().trim().to_string();
        let others = parts.next().map(|o| o.replace('\n', ""));

        ctx.update(|movie| {
            movie.description = description;
            if let Some(others) = others {
                let capture = |re: &Regex| {
                    re.captures(&others)
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str().trim().to_string())
                };
                movie.category = capture(&CATEGORY_RE);
                if let Some(date) = capture(&RELEASE_RE) {
                    movie.upload_date = date;
                }
                movie.cast = capture(&STARS_RE);
                movie.imdb_link = capture(&IMDB_RE);
            }
        });
    }

    // The download page is the detail page path plus /download
    if !ctx.url().path().ends_with("download") {
        let next = join_path(ctx.url(), "download");
        ctx.update(|movie| movie.download_link = Some(next.clone()));
        ctx.visit(next);
    }
}
