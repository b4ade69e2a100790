use super::{FetchRequest, Page, Transport, is_text_content};
use crate::engine::{EngineError, Result};
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Client, header};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Plain HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub user_agent: String,
    /// Per-request timeout; a timed out detail fetch is a dropped enrichment
    pub timeout: Duration,
    /// Whether text pages are cached by URL
    pub use_cache: bool,
    pub cache_ttl: Duration,
    pub cache_max_entries: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            use_cache: true,
            cache_ttl: Duration::from_secs(3600), // 1 hour
            cache_max_entries: 1000,
        }
    }
}

/// reqwest-backed transport with a page cache
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    cache: Option<Cache<String, Arc<Page>>>,
}

impl HttpTransport {
    /// Create a transport with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(&HttpTransportConfig::default())
    }

    /// Create a transport with custom configuration
    pub fn with_config(config: &HttpTransportConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .cookie_store(true)
            .build()?;

        let cache = config.use_cache.then(|| {
            Cache::builder()
                .max_capacity(config.cache_max_entries)
                .time_to_live(config.cache_ttl)
                .build()
        });

        Ok(Self { client, cache })
    }

    /// Drop every cached page
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            cache.run_pending_tasks().await;
            debug!("Page cache cleared");
        }
    }

    /// Number of cached pages
    pub async fn cached_pages(&self) -> u64 {
        match &self.cache {
            Some(cache) => {
                cache.run_pending_tasks().await;
                cache.entry_count()
            }
            None => 0,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &FetchRequest) -> Result<Page> {
        let key = request.url.to_string();
        if let Some(cache) = &self.cache
            && let Some(page) = cache.get(&key).await
        {
            debug!("Cache hit for {}", key);
            return Ok((*page).clone());
        }

        debug!("Visiting {}", request.url);
        let response = self
            .client
            .get(request.url.clone())
            .header(header::ACCEPT, request.accept)
            .header(header::REFERER, request.url.as_str())
            .send()
            .await
            .map_err(EngineError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Transport(format!(
                "{} returned {}",
                request.url, status
            )));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Dropping the response here aborts the body transfer
        if request.text_only && !is_text_content(content_type.as_deref()) {
            debug!("Response {} is not text. Aborting request", request.url);
            return Err(EngineError::NonTextContent {
                url: request.url.to_string(),
                content_type: content_type.unwrap_or_default(),
            });
        }

        let url = response.url().clone();
        let body = response.text().await.map_err(EngineError::Network)?;
        let page = Page {
            url,
            status: status.as_u16(),
            content_type,
            body,
        };

        if let Some(cache) = &self.cache {
            cache.insert(key, Arc::new(page.clone())).await;
        }

        debug!("Done {}", request.url);
        Ok(page)
    }
}
