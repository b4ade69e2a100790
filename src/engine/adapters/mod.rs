//! Built-in site adapters.

mod fzmovies;
mod netnaija;
mod tvseries;

pub use fzmovies::FzMoviesEngine;
pub use netnaija::NetNaijaEngine;
pub use tvseries::TvSeriesEngine;

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4})\)").expect("valid year regex"));
static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?\s*[MG]B)").expect("valid size regex"));

/// Year in parentheses, e.g. "Jumanji (2017)"
pub(crate) fn parse_year(title: &str) -> Option<i32> {
    YEAR_RE
        .captures(title)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// First size label such as "700 MB" in free text
pub(crate) fn parse_size(text: &str) -> Option<String> {
    SIZE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// `url` with `segment` appended to its path
pub(crate) fn join_path(url: &Url, segment: &str) -> Url {
    let mut joined = url.clone();
    joined.set_path(&format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        segment.trim_start_matches('/')
    ));
    joined
}
