use crate::engine::{EngineError, Result};
use scraper::{ElementRef, Selector};
use tracing::debug;
use url::Url;

/// Compile a CSS selector
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| EngineError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// An element of a fetched page, with the page URL for resolving links
#[derive(Clone, Copy)]
pub struct HtmlElement<'a> {
    element: ElementRef<'a>,
    page_url: &'a Url,
}

impl<'a> HtmlElement<'a> {
    pub const fn new(element: ElementRef<'a>, page_url: &'a Url) -> Self {
        Self { element, page_url }
    }

    /// URL of the page this element was found on
    #[must_use]
    pub const fn page_url(&self) -> &'a Url {
        self.page_url
    }

    #[must_use]
    pub const fn element(&self) -> ElementRef<'a> {
        self.element
    }

    /// Trimmed text content of the element
    #[must_use]
    pub fn text(&self) -> String {
        collect_text(self.element)
    }

    /// Raw attribute value
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// All descendants matching `css`, in document order
    pub fn select(&self, css: &str) -> Vec<HtmlElement<'a>> {
        let Some(sel) = parse_lenient(css) else {
            return Vec::new();
        };
        self.element
            .select(&sel)
            .map(|e| HtmlElement::new(e, self.page_url))
            .collect()
    }

    /// Concatenated, trimmed text of every descendant matching `css`
    pub fn child_text(&self, css: &str) -> String {
        let Some(sel) = parse_lenient(css) else {
            return String::new();
        };
        self.element
            .select(&sel)
            .flat_map(|e| e.text())
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Trimmed text of each descendant matching `css`
    pub fn child_texts(&self, css: &str) -> Vec<String> {
        let Some(sel) = parse_lenient(css) else {
            return Vec::new();
        };
        self.element.select(&sel).map(collect_text).collect()
    }

    /// Attribute of the first descendant matching `css` that carries it
    pub fn child_attr(&self, css: &str, name: &str) -> Option<String> {
        let sel = parse_lenient(css)?;
        self.element
            .select(&sel)
            .find_map(|e| e.value().attr(name))
            .map(|v| v.trim().to_string())
    }

    /// Resolve a possibly relative link against the page URL
    pub fn absolute_url(&self, href: &str) -> Result<Url> {
        Ok(self.page_url.join(href.trim())?)
    }
}

impl std::fmt::Debug for HtmlElement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlElement")
            .field("name", &self.element.value().name())
            .field("page_url", &self.page_url.as_str())
            .finish()
    }
}

fn collect_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_lenient(css: &str) -> Option<Selector> {
    match selector(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}
