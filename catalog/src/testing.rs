//! Fixtures shared by the unit tests

use scraper::Html;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{CrawlError, CrawlResult};
use crate::extract::compile;
use crate::fetch::MarkupSource;

pub const BASE_URL: &str = "https://shop.example/";

/// Menu with two groups, four subgroup entries (one unresolvable) and two categories
pub const MENU_PAGE: &str = r#"
<html><body>
  <nav>
    <ul>
      <li data-menu="bebidas"><a href="/bebidas">Bebidas</a></li>
      <li data-menu="mercearia"><a href="/mercearia">Mercearia</a></li>
    </ul>
  </nav>
  <div class="submenu submenu--level-2">
    <ul>
      <li class="submenu__item submenu__item--main"><a href="/bebidas/sucos">Sucos</a></li>
      <li class="submenu__item submenu__item--main"><a href="/bebidas/refrigerantes">Refrigerantes</a></li>
    </ul>
  </div>
  <div class="submenu submenu--level-2">
    <ul>
      <li class="submenu__item submenu__item--main"><a href="/mercearia/graos">Grãos</a></li>
      <li class="submenu__item submenu__item--main"><a href="/promo">Ofertas</a></li>
    </ul>
  </div>
  <div class="submenu submenu--level-3">
    <ul>
      <li class="submenu__item"><a href="/bebidas/sucos/suco-integral">Suco Integral</a></li>
      <li class="submenu__item"><a href="/bebidas/sucos/suco-nectar">Suco Néctar</a></li>
    </ul>
  </div>
</body></html>
"#;

pub fn url(path: &str) -> String {
    format!("{}{}", BASE_URL, path.trim_start_matches('/'))
}

/// Next-page control as rendered by the listing fixtures
pub enum Next<'a> {
    Absent,
    Page(&'a str),
    Disabled,
    NoTarget,
}

/// Listing page with `(name, link, price)` products and a next control
pub fn listing_page(products: &[(&str, &str, &str)], next: Next) -> String {
    let items: String = products
        .iter()
        .map(|(name, link, price)| {
            format!(
                r#"<div class="product-item"><a href="{}"><span class="product-item__name">{}</span></a><span class="product-item__price">{}</span></div>"#,
                link, name, price
            )
        })
        .collect();
    let control = match next {
        Next::Absent => String::new(),
        Next::Page(page) => format!(r#"<a class="pagination__next" data-page="{}">›</a>"#, page),
        Next::Disabled => r#"<a class="pagination__next disabled">›</a>"#.to_string(),
        Next::NoTarget => r#"<a class="pagination__next">›</a>"#.to_string(),
    };
    format!(
        "<html><body><section>{}</section><nav>{}</nav></body></html>",
        items, control
    )
}

/// In-memory markup source answering from a fixed URL → page table
#[derive(Default)]
pub struct ScriptedSource {
    pages: HashMap<String, String>,
    failing: Vec<String>,
    pub requested: Vec<String>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, markup: impl Into<String>) -> Self {
        self.pages.insert(url.into(), markup.into());
        self
    }

    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.push(url.into());
        self
    }
}

impl MarkupSource for ScriptedSource {
    fn fetch(&mut self, url: &str) -> CrawlResult<String> {
        self.requested.push(url.to_string());
        if self.failing.iter().any(|u| u == url) {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        self.pages.get(url).cloned().ok_or_else(|| CrawlError::Fetch {
            url: url.to_string(),
            message: "no such page".to_string(),
        })
    }

    fn fetch_with_wait(
        &mut self,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> CrawlResult<String> {
        let selector = compile(ready_selector)?;
        let markup = self.fetch(url)?;
        if Html::parse_document(&markup).select(&selector).next().is_none() {
            return Err(CrawlError::Readiness {
                url: url.to_string(),
                selector: ready_selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(markup)
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return its warn-and-above output
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = buffer
        .0
        .lock()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    (value, logs)
}
