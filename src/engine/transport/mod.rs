//! Page fetching used by the crawlers.
//!
//! The orchestrator only sees the [`Transport`] trait. [`HttpTransport`] is the
//! plain client; [`ChallengeTransport`] drives a headless browser through a
//! challenge-solving proxy for sites behind bot detection.

mod challenge;
mod http;

pub use challenge::ChallengeTransport;
pub use http::{HttpTransport, HttpTransportConfig};

use crate::engine::Result;
use async_trait::async_trait;
use url::Url;

const ACCEPT_PAGE: &str = "text/html";
const ACCEPT_DETAIL: &str = "text/html,application/xhtml+xml,application/xml";

/// A single GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub accept: &'static str,
    /// Abort once headers show a non-text body
    pub text_only: bool,
}

impl FetchRequest {
    /// Request for a listing or search page
    pub fn page(url: Url) -> Self {
        Self {
            url,
            accept: ACCEPT_PAGE,
            text_only: false,
        }
    }

    /// Request for a detail or download page; binary bodies are refused
    pub fn detail(url: Url) -> Self {
        Self {
            url,
            accept: ACCEPT_DETAIL,
            text_only: true,
        }
    }
}

/// A fetched text page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Final URL after redirects
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Page {
    pub fn html(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.into(),
        }
    }
}

/// Whether a `Content-Type` value describes a text body.
///
/// A missing header is treated as text.
pub(crate) fn is_text_content(content_type: Option<&str>) -> bool {
    content_type.is_none_or(|ct| ct.to_ascii_lowercase().contains("text"))
}

/// Fetches pages for the crawlers
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch one page
    async fn fetch(&self, request: &FetchRequest) -> Result<Page>;

    /// Release resources held for the duration of a run.
    ///
    /// Must be safe to call more than once; only the first call does work.
    async fn release(&self) {}
}
