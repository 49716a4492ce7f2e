use bytes::Bytes;
use shovel_common::{Result, ShovelError};
use shovel_config::{ClientConfig, DEFAULT_USER_AGENT};
use shovel_dom::{Document, HtmlParser, ScraperParser};
use shovel_http::header::{ACCEPT_LANGUAGE, CONNECTION, HOST, UPGRADE_INSECURE_REQUESTS, USER_AGENT};
use shovel_http::{HeaderMap, HeaderValue, HttpTransport, RawResponse, ReqwestTransport};
use std::fmt;
use std::sync::Arc;

use crate::cache::DocumentCache;

/// Caller hook run on the outgoing headers after the defaults are set.
pub type HeaderCustomizer = Box<dyn FnOnce(&mut HeaderMap) + Send>;

/// Per-request options for the fetch helpers.
///
/// ```
/// use shovel_web::FetchOpts;
/// use shovel_http::HeaderValue;
///
/// let opts = FetchOpts::headers(|h| {
///     h.insert("user-agent", HeaderValue::from_static("my-bot/1.0"));
///     h.remove("upgrade-insecure-requests");
/// });
/// # let _ = opts;
/// ```
#[derive(Default)]
pub struct FetchOpts {
    customize: Option<HeaderCustomizer>,
}

impl FetchOpts {
    /// Options whose header customizer may add, replace or remove any header.
    pub fn headers<F>(customize: F) -> Self
    where
        F: FnOnce(&mut HeaderMap) + Send + 'static,
    {
        Self {
            customize: Some(Box::new(customize)),
        }
    }
}

impl fmt::Debug for FetchOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOpts")
            .field("customize", &self.customize.is_some())
            .finish()
    }
}

/// `Host` value derived from a URL: scheme and path stripped, port kept.
pub(crate) fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split_once('/').map_or(rest, |(host, _)| host)
}

/// Turns URLs into [`Document`]s, caching by exact URL.
///
/// A cached URL is never requested again until [`clear_cache`](Self::clear_cache).
/// Concurrent fetches of the same uncached URL both go to the network and the
/// last one to finish wins the cache slot.
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    cache: DocumentCache,
    parser: Arc<dyn HtmlParser>,
    user_agent: HeaderValue,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("cached", &self.cache.len())
            .field("parser", &self.parser)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// A fetcher over the default `reqwest` transport.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport =
            ReqwestTransport::new(config).map_err(|e| ShovelError::Config(e.to_string()))?;
        Self::with_transport(Arc::new(transport)).with_user_agent(&config.user_agent)
    }

    /// A fetcher over any transport, with the default user agent and parser.
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            cache: DocumentCache::new(),
            parser: Arc::new(ScraperParser),
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Result<Self> {
        self.user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| ShovelError::Config(format!("invalid user agent {user_agent:?}: {e}")))?;
        Ok(self)
    }

    /// Parser handed to every document this fetcher produces.
    pub fn with_parser(mut self, parser: Arc<dyn HtmlParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Share an existing cache, e.g. between fetchers with different transports.
    pub fn with_cache(mut self, cache: DocumentCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// [`fetch_document`](Self::fetch_document) with default options.
    pub async fn fetch(&self, url: &str) -> Result<Document> {
        self.fetch_document(url, FetchOpts::default()).await
    }

    /// Cached document for `url`, or GET it, cache it and return it.
    pub async fn fetch_document(&self, url: &str, opts: FetchOpts) -> Result<Document> {
        if let Some(doc) = self.cache.get(url) {
            tracing::debug!(url, "fetch.cache_hit");
            return Ok(doc);
        }

        let resp = self.perform(url, opts).await?;
        let doc = Document::with_parser(url, resp.text(), Arc::clone(&self.parser));
        self.cache.insert(doc.clone());
        tracing::debug!(
            url,
            html_len = doc.html().len(),
            cached = self.cache.len(),
            "fetch.cached"
        );
        Ok(doc)
    }

    /// `Ok(None)` when the request fails or the status is not 2xx. Any other
    /// error kind is returned as is.
    pub async fn fetch_document_or_none(
        &self,
        url: &str,
        opts: FetchOpts,
    ) -> Result<Option<Document>> {
        absent_on_fetch_failure(url, self.fetch_document(url, opts).await)
    }

    /// Response body as text. Never cached.
    pub async fn fetch_text(&self, url: &str, opts: FetchOpts) -> Result<String> {
        Ok(self.perform(url, opts).await?.text())
    }

    pub async fn fetch_text_or_none(&self, url: &str, opts: FetchOpts) -> Result<Option<String>> {
        absent_on_fetch_failure(url, self.fetch_text(url, opts).await)
    }

    /// Response body as raw bytes. Never cached.
    pub async fn fetch_bytes(&self, url: &str, opts: FetchOpts) -> Result<Bytes> {
        Ok(self.perform(url, opts).await?.body)
    }

    pub async fn fetch_bytes_or_none(&self, url: &str, opts: FetchOpts) -> Result<Option<Bytes>> {
        absent_on_fetch_failure(url, self.fetch_bytes(url, opts).await)
    }

    /// Release the transport. Cached documents are still served afterwards.
    pub fn close(&self) {
        self.transport.close();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::debug!("fetch.cache_cleared");
    }

    fn request_headers(&self, url: &str, opts: FetchOpts) -> Result<HeaderMap> {
        let host = HeaderValue::from_str(host_of(url)).map_err(|e| ShovelError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(HOST, host);
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        if let Some(customize) = opts.customize {
            customize(&mut headers);
        }
        Ok(headers)
    }

    async fn perform(&self, url: &str, opts: FetchOpts) -> Result<RawResponse> {
        let headers = self.request_headers(url, opts)?;
        tracing::debug!(url, header_count = headers.len(), "fetch.request.start");

        let resp = self
            .transport
            .get(url, headers)
            .await
            .map_err(|e| {
                tracing::warn!(url, error = %e, "fetch.transport_failure");
                ShovelError::Transport {
                    url: url.to_string(),
                    source: Box::new(e),
                }
            })?;

        if !resp.is_success() {
            tracing::warn!(url, status = resp.status, "fetch.status_failure");
            return Err(ShovelError::HttpStatus {
                url: url.to_string(),
                status: resp.status,
                body: resp.text(),
            });
        }
        Ok(resp)
    }
}

fn absent_on_fetch_failure<T>(url: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fetch_failure() => {
            tracing::debug!(url, error = %err, "fetch.discarded_failure");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
