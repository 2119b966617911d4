//! Markup acquisition
//!
//! The crawler only needs page markup by URL. [`HttpSource`] is the blocking
//! HTTP implementation, with an optional on-disk page cache so repeated runs
//! against the same catalog do not hit the site again.

use scraper::{Html, Selector};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{CrawlError, CrawlResult};
use crate::extract::compile;

/// Something that can hand back the markup of a page.
///
/// Takes `&mut self`: a session (browser tab, connection) is used by one
/// fetch at a time.
pub trait MarkupSource {
    fn fetch(&mut self, url: &str) -> CrawlResult<String>;

    /// Fetch, and fail unless `ready_selector` matches something in the page
    fn fetch_with_wait(
        &mut self,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> CrawlResult<String>;
}

pub struct HttpSource {
    client: reqwest::blocking::Client,
    cache_dir: Option<PathBuf>,
}

impl HttpSource {
    pub fn new(user_agent: &str, timeout: Duration) -> CrawlResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| CrawlError::Fetch {
                url: String::new(),
                message: format!("could not build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            cache_dir: None,
        })
    }

    pub fn with_cache(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    fn get(&self, url: &str, timeout: Option<Duration>) -> CrawlResult<String> {
        let cache_path = self.cache_dir.as_ref().map(|dir| url_to_cache_path(dir, url));

        if let Some(path) = cache_path.as_ref().filter(|p| p.exists()) {
            debug!(url, path = %path.display(), "serving page from cache");
            return fs::read_to_string(path).map_err(|e| CrawlError::Cache {
                path: path.clone(),
                message: e.to_string(),
            });
        }

        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().map_err(|e| CrawlError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().map_err(|e| CrawlError::Fetch {
            url: url.to_string(),
            message: format!("failed to read body: {}", e),
        })?;

        if let Some(path) = cache_path {
            let cache_err = |e: std::io::Error| CrawlError::Cache {
                path: path.clone(),
                message: e.to_string(),
            };
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(cache_err)?;
            }
            fs::write(&path, &text).map_err(cache_err)?;
        }

        Ok(text)
    }
}

impl MarkupSource for HttpSource {
    fn fetch(&mut self, url: &str) -> CrawlResult<String> {
        self.get(url, None)
    }

    fn fetch_with_wait(
        &mut self,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> CrawlResult<String> {
        let selector = compile(ready_selector)?;
        let markup = self.get(url, Some(timeout))?;
        if !is_ready(&markup, &selector) {
            return Err(CrawlError::Readiness {
                url: url.to_string(),
                selector: ready_selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        info!(url, "page fetched");
        Ok(markup)
    }
}

fn is_ready(markup: &str, selector: &Selector) -> bool {
    Html::parse_document(markup).select(selector).next().is_some()
}

/// Map a URL to a file under `cache_dir`.
///
/// Protocol is dropped and the host/path kept as directories; query and
/// fragment are folded into the file name since paginated listings differ
/// only there.
fn url_to_cache_path(cache_dir: &std::path::Path, url: &str) -> PathBuf {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let (location, suffix) = match stripped.find(['?', '#']) {
        Some(idx) => (&stripped[..idx], Some(&stripped[idx..])),
        None => (stripped, None),
    };

    let mut path = cache_dir.join(location.trim_end_matches('/'));
    if location.ends_with('/') || location.is_empty() {
        path = path.join("index");
    }
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if let Some(suffix) = suffix {
        name.extend(
            suffix
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }),
        );
    }
    path.set_file_name(format!("{}.html", name));
    path
}
