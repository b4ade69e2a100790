use super::parse_size;
use crate::engine::{
    EngineError, Result,
    adapter::{ScrapeRequest, SelectionRule, SiteAdapter},
    crawler::DetailCrawler,
    html::HtmlElement,
    types::{Mode, Movie},
};
use url::Url;

const TVSERIES_URL: &str = "https://tvseries.in/";

/// Selects the low-quality episode file
const FILE_TYPE: &str = "&ftype=2";

/// Download buttons, most preferred last
const DOWNLOAD_BUTTONS: [&str; 3] = ["a#dlink3", "a#dlink4", "a#dlink2"];

/// TV shows from the fzmovies group. Each item is the latest episode of a show.
pub struct TvSeriesEngine {
    base_url: Url,
}

impl Default for TvSeriesEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TvSeriesEngine {
    pub fn new() -> Self {
        Self::with_base_url(Url::parse(TVSERIES_URL).expect("valid TvSeries URL"))
    }

    pub const fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }
}

fn with_file_type(link: &Url) -> Result<Url> {
    Ok(Url::parse(&format!("{link}{FILE_TYPE}"))?)
}

impl SiteAdapter for TvSeriesEngine {
    fn id(&self) -> &'static str {
        "tvseries"
    }

    fn name(&self) -> &'static str {
        "TvSeries"
    }

    fn description(&self) -> &str {
        "TvSeries is a site owned by the fzmovies group where shows are available"
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn search_url(&self, query: &str, page: u32) -> Result<Url> {
        let mut url = self.base_url.join("/search.php")?;
        url.query_pairs_mut()
            .append_pair("search", query)
            .append_pair("beginsearch", "Search")
            .append_pair("vsearch", "")
            .append_pair("by", "episodes")
            .append_pair("pg", &page.to_string());
        Ok(url)
    }

    fn list_url(&self, page: u32) -> Result<Url> {
        let mut url = self.base_url.join("/tv.php")?;
        url.query_pairs_mut()
            .append_pair("alpha", "AtoZ")
            .append_pair("pg", &page.to_string());
        Ok(url)
    }

    fn query_label(&self, request: &ScrapeRequest) -> String {
        match request {
            ScrapeRequest::Search { query, .. } => query.clone(),
            ScrapeRequest::List { page } => {
                format!("Series From A to Z latest episode each - Page {page}")
            }
        }
    }

    fn selection_rule(&self, _mode: Mode) -> Result<SelectionRule> {
        Ok(SelectionRule::new("body", "div.mainbox"))
    }

    fn parse_item(&self, item: &HtmlElement<'_>, index: usize, _mode: Mode) -> Result<Movie> {
        let href = item
            .child_attr("a", "href")
            .ok_or_else(|| EngineError::ItemParse {
                index,
                reason: "no link".to_string(),
            })?;
        let download_link = with_file_type(&item.absolute_url(&href)?)?;

        let mut movie = Movie::new(index, self.name()).with_download_link(download_link);
        movie.cover_photo_link = item
            .child_attr("img", "src")
            .and_then(|src| item.absolute_url(&src).ok())
            .map(String::from)
            .unwrap_or_default();

        // Title first, then a short and sometimes a longer description
        let smalls = item.child_texts("small");
        if smalls.len() > 1 {
            movie.title = smalls[0].clone();
            movie.description = smalls
                .iter()
                .skip(1)
                .max_by_key(|s| s.len())
                .cloned()
                .unwrap_or_default();
        }

        Ok(movie)
    }

    fn register_detail_handlers(&self, crawler: &mut DetailCrawler, _mode: Mode) {
        // Show page: latest episode
        crawler.on_html("div[itemprop=episode]", |el, ctx| {
            let bold = el.child_texts("b");
            let title = (bold.len() > 1).then(|| bold[0].clone());
            let smalls = el.child_texts("small");
            let description = (smalls.len() > 1).then(|| smalls[smalls.len() - 1].clone());

            let next = el
                .child_attr("a", "href")
                .and_then(|href| el.absolute_url(&href).ok())
                .filter(|link| link != ctx.url())
                .and_then(|link| with_file_type(&link).ok());

            ctx.update(|movie| {
                if let Some(title) = title {
                    movie.title = title;
                }
                if let Some(description) = description {
                    movie.description = description;
                }
                if let Some(link) = &next {
                    movie.download_link = Some(link.clone());
                }
            });
            if let Some(link) = next {
                ctx.visit(link);
            }
        });

        // Episode page: download buttons
        for button in DOWNLOAD_BUTTONS {
            crawler.on_html(button, |el, ctx| {
                let Some(link) = el.attr("href").and_then(|h| el.absolute_url(h).ok()) else {
                    return;
                };
                ctx.update(|movie| movie.download_link = Some(link.clone()));
                if !link.as_str().ends_with("mp4") {
                    ctx.visit(link);
                }
            });
        }

        // File page: mirror link or raw file link
        crawler.on_html("div.filedownload", |el, ctx| {
            let size = parse_size(&el.child_text("textcolor2"));
            let link = el
                .child_attr("a#flink1", "href")
                .filter(|h| !h.is_empty())
                .or_else(|| el.child_attr("input[name=filelink]", "value"))
                .and_then(|h| Url::parse(&h).ok());

            ctx.update(|movie| {
                if let Some(link) = link {
                    movie.download_link = Some(link);
                }
                if let Some(size) = size {
                    movie.size = size;
                }
            });
        });
    }
}
