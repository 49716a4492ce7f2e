//! Fetch pages into [`Document`]s.
//!
//! A [`Fetcher`] owns one HTTP transport and one URL-keyed [`DocumentCache`].
//! The free functions in this crate go through a process-wide fetcher built
//! lazily from [`ClientConfig::default`]; construct your own [`Fetcher`] when
//! you need different settings, a stub transport, or an isolated cache.
//!
//! ```no_run
//! use shovel_web::{FetchOpts, Query};
//!
//! # async fn run() -> shovel_web::Result<()> {
//! let doc = shovel_web::fetch("https://example.com/").await?;
//! let heading = doc.query_selector("h1").map(|h| h.text_content().to_string());
//!
//! let json = shovel_web::fetch_text(
//!     "https://example.com/api",
//!     FetchOpts::headers(|h| {
//!         h.insert("accept", shovel_web::HeaderValue::from_static("application/json"));
//!     }),
//! )
//! .await?;
//! # let _ = (heading, json);
//! # Ok(())
//! # }
//! ```

mod cache;
mod fetcher;

pub use cache::DocumentCache;
pub use fetcher::{FetchOpts, Fetcher, HeaderCustomizer};
pub use shovel_dom::{Document, Element, Query, Transform, meta};
pub use shovel_common::{Result, ShovelError};
pub use shovel_http::{HeaderMap, HeaderValue};

use bytes::Bytes;
use shovel_config::ClientConfig;
use std::sync::{Arc, OnceLock};

/// Maximum concurrent requests issued by the default fetcher.
pub const PARALLEL_COUNT: usize = shovel_config::DEFAULT_MAX_CONNECTIONS;

static DEFAULT_FETCHER: OnceLock<Arc<Fetcher>> = OnceLock::new();

/// The process-wide fetcher behind the free functions.
///
/// Built on first use. If the default transport cannot be constructed the
/// error is returned and the next call tries again.
pub fn default_fetcher() -> Result<Arc<Fetcher>> {
    if let Some(fetcher) = DEFAULT_FETCHER.get() {
        return Ok(Arc::clone(fetcher));
    }
    let fetcher = Arc::new(Fetcher::from_config(&ClientConfig::default())?);
    tracing::debug!(max_connections = PARALLEL_COUNT, "fetch.default_client_ready");
    Ok(Arc::clone(DEFAULT_FETCHER.get_or_init(|| fetcher)))
}

/// GET `url` with default options, served from the shared cache when possible.
pub async fn fetch(url: &str) -> Result<Document> {
    default_fetcher()?.fetch(url).await
}

pub async fn fetch_document(url: &str, opts: FetchOpts) -> Result<Document> {
    default_fetcher()?.fetch_document(url, opts).await
}

/// `Ok(None)` on a transport or status failure. A default client that cannot
/// be built is still an error.
pub async fn fetch_document_or_none(url: &str, opts: FetchOpts) -> Result<Option<Document>> {
    default_fetcher()?.fetch_document_or_none(url, opts).await
}

pub async fn fetch_text(url: &str, opts: FetchOpts) -> Result<String> {
    default_fetcher()?.fetch_text(url, opts).await
}

pub async fn fetch_text_or_none(url: &str, opts: FetchOpts) -> Result<Option<String>> {
    default_fetcher()?.fetch_text_or_none(url, opts).await
}

pub async fn fetch_bytes(url: &str, opts: FetchOpts) -> Result<Bytes> {
    default_fetcher()?.fetch_bytes(url, opts).await
}

pub async fn fetch_bytes_or_none(url: &str, opts: FetchOpts) -> Result<Option<Bytes>> {
    default_fetcher()?.fetch_bytes_or_none(url, opts).await
}

/// Close the shared transport. Later network fetches through the free
/// functions fail; documents already cached are still returned.
pub fn close_client() {
    if let Some(fetcher) = DEFAULT_FETCHER.get() {
        fetcher.close();
    }
}

/// Empty the shared document cache.
pub fn clear_cache() {
    if let Some(fetcher) = DEFAULT_FETCHER.get() {
        fetcher.clear_cache();
    }
}
