use crate::engine::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use url::Url;

/// Which page of a site a scrape starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A query is searched for
    #[default]
    Search,
    /// A page of recent uploads is looked up
    List,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Search => write!(f, "search"),
            Self::List => write!(f, "list"),
        }
    }
}

impl FromStr for Mode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "search" => Ok(Self::Search),
            "list" => Ok(Self::List),
            other => Err(EngineError::InvalidMode {
                mode: other.to_string(),
                reason: "expected search or list".to_string(),
            }),
        }
    }
}

/// How far a record got through the detail crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Enrichment {
    /// Only listing-page fields are known
    #[default]
    Provisional,
    /// At least one detail page updated the record
    Enriched,
    /// Marked as a series but no episode links could be resolved
    Partial,
}

/// A discoverable movie or series, normalized across sites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Movie {
    /// Ordinal within the batch, in discovery order
    pub index: usize,
    pub title: String,
    pub cover_photo_link: String,
    pub description: String,
    pub size: String,
    /// Starts as the listing link; detail handlers replace it
    pub download_link: Option<Url>,
    pub year: Option<i32>,
    pub is_series: bool,
    /// Episode label to download link, only for series
    pub series_download_links: BTreeMap<String, Url>,
    pub upload_date: String,
    /// Name of the engine the record was scraped from
    pub source: String,
    pub quality: Option<String>,
    pub category: Option<String>,
    pub cast: Option<String>,
    pub tags: Option<String>,
    pub subtitle_link: Option<Url>,
    pub series_subtitle_links: BTreeMap<String, Url>,
    pub imdb_link: Option<String>,
    pub enrichment: Enrichment,
}

impl Movie {
    /// Create a record with the fields every adapter knows up front
    pub fn new(index: usize, source: impl Into<String>) -> Self {
        Self {
            index,
            source: source.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: set title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder pattern: set download link
    pub fn with_download_link(mut self, link: Url) -> Self {
        self.download_link = Some(link);
        self
    }

    /// Builder pattern: set series flag
    pub fn with_series(mut self, is_series: bool) -> Self {
        self.is_series = is_series;
        self
    }

    /// Builder pattern: set year
    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    /// Add or replace one episode link
    pub fn insert_episode(&mut self, label: impl Into<String>, link: Url) {
        self.series_download_links.insert(label.into(), link);
    }

    /// Whether the record has a series flag but nothing to download
    #[must_use]
    pub fn is_unresolved_series(&self) -> bool {
        self.is_series && self.series_download_links.is_empty()
    }
}

impl std::fmt::Display for Movie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({year})", self.title),
            None => write!(f, "{}", self.title),
        }
    }
}
