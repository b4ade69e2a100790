mod adapter;
pub mod adapters;
mod crawler;
mod html;
mod orchestrator;
mod registry;
mod table;
pub mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use adapter::{ScrapeRequest, SelectionRule, SiteAdapter, unsupported_mode};
pub use adapters::{FzMoviesEngine, NetNaijaEngine, TvSeriesEngine};
pub use crawler::{DetailContext, DetailCrawler, DetailRequest};
pub use html::HtmlElement;
pub use orchestrator::{RunState, Scraper, ScraperConfig, TransportFactory};
pub use registry::EngineRegistry;
pub use table::{CorrelationKey, ResultTable};
pub use transport::{
    ChallengeTransport, FetchRequest, HttpTransport, HttpTransportConfig, Page, Transport,
};
pub use types::{Enrichment, Mode, Movie, SearchResult};

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine {0} does not exist")]
    UnknownEngine(String),

    #[error("Invalid mode {mode}: {reason}")]
    InvalidMode { mode: String, reason: String },

    #[error("Item {index} could not be parsed: {reason}")]
    ItemParse { index: usize, reason: String },

    #[error("Detail enrichment failed for {url}: {reason}")]
    DetailEnrichment { url: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Response from {url} is not text ({content_type})")]
    NonTextContent { url: String, content_type: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid selector {selector}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Challenge solver error: {0}")]
    Challenge(String),
}

impl EngineError {
    /// Whether this error came from the network layer rather than parsing
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Network(_) | Self::NonTextContent { .. } | Self::Challenge(_)
        )
    }
}

/// Create a registry with every built-in site adapter
#[must_use]
pub fn create_default_registry() -> EngineRegistry {
    EngineRegistry::with_defaults()
}
