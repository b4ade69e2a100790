use super::{parse_size, parse_year};
use crate::engine::{
    EngineError, Result,
    adapter::{SelectionRule, SiteAdapter},
    crawler::DetailCrawler,
    html::HtmlElement,
    types::{Mode, Movie},
};
use url::Url;

const FZMOVIES_URL: &str = "https://www.fzmovies.net/";

/// Query suffix the download page expects on its links
const DOWNLOAD_TOKEN: &str = "&pt=jRGarGzOo2";

pub struct FzMoviesEngine {
    base_url: Url,
}

impl Default for FzMoviesEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FzMoviesEngine {
    pub fn new() -> Self {
        Self::with_base_url(Url::parse(FZMOVIES_URL).expect("valid FzMovies URL"))
    }

    pub const fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }
}

impl SiteAdapter for FzMoviesEngine {
    fn id(&self) -> &'static str {
        "fzmovies"
    }

    fn name(&self) -> &'static str {
        "FzMovies"
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn search_url(&self, query: &str, page: u32) -> Result<Url> {
        let mut url = self.base_url.join("/csearch.php")?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("searchname", query);
            if page > 1 {
                params.append_pair("pg", &page.to_string());
            }
        }
        Ok(url)
    }

    fn list_url(&self, page: u32) -> Result<Url> {
        let mut url = self.base_url.join("/movieslist.php")?;
        url.query_pairs_mut()
            .append_pair("catID", "2")
            .append_pair("by", "date")
            .append_pair("pg", &page.to_string());
        Ok(url)
    }

    fn selection_rule(&self, _mode: Mode) -> Result<SelectionRule> {
        Ok(SelectionRule::new("body", "div.mainbox"))
    }

    fn parse_item(&self, item: &HtmlElement<'_>, index: usize, _mode: Mode) -> Result<Movie> {
        let title = item.child_text("b");
        let title = title.trim_end_matches("<more>").trim().to_string();
        if title.is_empty() {
            return Err(EngineError::ItemParse {
                index,
                reason: "no title".to_string(),
            });
        }

        let href = item
            .child_attr("a", "href")
            .ok_or_else(|| EngineError::ItemParse {
                index,
                reason: "no link".to_string(),
            })?;
        let download_link = item.absolute_url(&href)?;

        let smalls = item.child_texts("small");
        let mut movie = Movie::new(index, self.name())
            .with_year(parse_year(&title))
            .with_title(title)
            .with_download_link(download_link);
        movie.cover_photo_link = item
            .child_attr("img", "src")
            .and_then(|src| item.absolute_url(&src).ok())
            .map(String::from)
            .unwrap_or_default();
        movie.upload_date = smalls.get(1).cloned().unwrap_or_default();
        movie.description = smalls.get(3).cloned().unwrap_or_default();

        Ok(movie)
    }

    fn register_detail_handlers(&self, crawler: &mut DetailCrawler, _mode: Mode) {
        // Movie page: file list pointing at the download page
        crawler.on_html("ul.moviesfiles", |el, ctx| {
            let Some(href) = el.child_attr("a", "href") else {
                return;
            };
            let href = href.replacen("download1.php", "download.php", 1);
            let Ok(link) = el.absolute_url(&format!("{href}{DOWNLOAD_TOKEN}")) else {
                return;
            };
            let size = parse_size(&el.child_text("dcounter"));

            ctx.update(|movie| {
                movie.download_link = Some(link.clone());
                if let Some(size) = size {
                    movie.size = size;
                }
            });
            ctx.visit(link);
        });

        // Download page: direct file link in an input
        crawler.on_html("p", |el, ctx| {
            let Some(value) = el.child_attr("input", "value") else {
                return;
            };
            if !value.ends_with("mp4") {
                return;
            }
            if let Ok(link) = Url::parse(&value) {
                ctx.update(|movie| movie.download_link = Some(link));
            }
        });
    }
}
