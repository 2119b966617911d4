//! Paginated product collection over the taxonomy tree
//!
//! Every tree node carrying a link is a product listing. The collector walks
//! the tree depth-first, pages through each listing until the next-page
//! control runs out, and groups the products by the path of names that led
//! to the node. A failing page only ends its own node's loop.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};
use url::Url;

use crate::config::{ListingSelectors, PriceFormat};
use crate::error::{CrawlError, CrawlResult};
use crate::extract::{compile, element_text};
use crate::fetch::MarkupSource;
use crate::hierarchy::Taxonomy;
use crate::ordered::OrderedMap;
use crate::price::parse_price;
use crate::tree::Node;
use crate::types::{PathContext, Product};

/// Builds products out of one listing page
pub trait ProductParser {
    fn parse_products(&self, html: &Html, context: &PathContext) -> Vec<Product>;
}

/// What the next-page control of a listing says
#[derive(Debug, Clone, PartialEq)]
pub enum NextPage {
    Absent,
    Disabled,
    /// Enabled, but exposes no page identifier
    NoTarget,
    Target(String),
}

pub trait NextPageLocator {
    fn locate_next(&self, html: &Html) -> NextPage;
}

/// Selector-driven parser for product listings and their pagination control
pub struct ListingParser {
    product: Selector,
    description: Selector,
    link: Selector,
    price: Selector,
    next: Selector,
    disabled_class: String,
    page_attr: String,
    price_format: PriceFormat,
}

impl ListingParser {
    pub fn new(selectors: &ListingSelectors, price_format: &PriceFormat) -> CrawlResult<Self> {
        Ok(Self {
            product: compile(&selectors.product)?,
            description: compile(&selectors.description)?,
            link: compile(&selectors.link)?,
            price: compile(&selectors.price)?,
            next: compile(&selectors.next)?,
            disabled_class: selectors.disabled_class.clone(),
            page_attr: selectors.page_attr.clone(),
            price_format: price_format.clone(),
        })
    }

    fn first_text(element: &ElementRef, selector: &Selector) -> Option<String> {
        element
            .select(selector)
            .next()
            .map(|e| element_text(&e))
            .filter(|t| !t.is_empty())
    }
}

impl ProductParser for ListingParser {
    fn parse_products(&self, html: &Html, context: &PathContext) -> Vec<Product> {
        let mut products = Vec::new();
        for element in html.select(&self.product) {
            let Some(description) = Self::first_text(&element, &self.description) else {
                warn!(group = %context.group.description, "product without description, skipping");
                continue;
            };
            let link = element
                .select(&self.link)
                .find_map(|a| a.value().attr("href"))
                .unwrap_or_default()
                .to_string();
            let price_text = Self::first_text(&element, &self.price).unwrap_or_default();
            let price = parse_price(&price_text, &self.price_format);
            products.push(context.product(description, link, price));
        }
        products
    }
}

impl NextPageLocator for ListingParser {
    fn locate_next(&self, html: &Html) -> NextPage {
        let Some(control) = html.select(&self.next).next() else {
            return NextPage::Absent;
        };
        let element = control.value();
        let disabled = element.classes().any(|c| c == self.disabled_class)
            || element.attr("disabled").is_some()
            || element.attr("aria-disabled") == Some("true");
        if disabled {
            return NextPage::Disabled;
        }
        match element.attr(&self.page_attr).map(str::trim) {
            Some(target) if !target.is_empty() => NextPage::Target(target.to_string()),
            _ => NextPage::NoTarget,
        }
    }
}

/// Why a node's pagination loop ended
#[derive(Debug)]
enum Stop {
    Exhausted,
    NoTarget,
    Revisit(String),
    PageLimit,
    Cancelled,
    Failed(CrawlError),
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CollectStats {
    /// Nodes whose listing was paginated
    pub nodes: usize,
    pub pages: usize,
    pub products: usize,
    /// Nodes cut short by a fetch failure
    pub failed_nodes: usize,
    /// Linked nodes whose path did not resolve to taxonomy entities
    pub skipped_paths: usize,
    pub cancelled: bool,
}

/// Products grouped by the tree path (group[, subgroup[, category]]) that found them
#[derive(Debug, Default)]
pub struct Collection {
    pub products: BTreeMap<Vec<String>, Vec<Product>>,
    pub stats: CollectStats,
}

pub struct Collector<'a, S, P> {
    source: &'a mut S,
    parser: &'a P,
    taxonomy: &'a Taxonomy,
    base_url: Option<Url>,
    max_pages: u32,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, S, P> Collector<'a, S, P>
where
    S: MarkupSource,
    P: ProductParser + NextPageLocator,
{
    pub fn new(source: &'a mut S, parser: &'a P, taxonomy: &'a Taxonomy) -> Self {
        Self {
            source,
            parser,
            taxonomy,
            base_url: None,
            max_pages: crate::config::DEFAULT_MAX_PAGES,
            cancel: None,
        }
    }

    /// Base for resolving relative menu links
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Flag checked between pages; raising it stops the crawl with what was collected
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    fn resolve(&self, link: &str) -> CrawlResult<Url> {
        let parsed = match &self.base_url {
            Some(base) => base.join(link),
            None => Url::parse(link),
        };
        parsed.map_err(|e| CrawlError::Fetch {
            url: link.to_string(),
            message: format!("invalid link: {}", e),
        })
    }

    pub fn collect(&mut self, tree: &OrderedMap<Node>) -> Collection {
        let mut collection = Collection::default();
        let mut path = Vec::new();
        self.walk(tree, &mut path, &mut collection);
        collection.stats.cancelled = self.cancelled();
        info!(
            nodes = collection.stats.nodes,
            pages = collection.stats.pages,
            products = collection.stats.products,
            failed = collection.stats.failed_nodes,
            "collection finished"
        );
        collection
    }

    fn walk(&mut self, nodes: &OrderedMap<Node>, path: &mut Vec<String>, out: &mut Collection) {
        for (key, node) in nodes.iter() {
            if self.cancelled() {
                return;
            }
            path.push(key.to_string());
            if let Some(link) = node.link() {
                self.collect_node(path, link, out);
            }
            if let Some(children) = node.children() {
                self.walk(children, path, out);
            }
            path.pop();
        }
    }

    fn collect_node(&mut self, path: &[String], link: &str, out: &mut Collection) {
        let _span = info_span!("node", path = %path.join(" > ")).entered();

        let Some(context) = self.taxonomy.context_for(path) else {
            warn!(link, "path does not resolve to a known group, skipping");
            out.stats.skipped_paths += 1;
            return;
        };
        let start = match self.resolve(link) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "cannot paginate node");
                out.stats.failed_nodes += 1;
                out.products.entry(path.to_vec()).or_default();
                return;
            }
        };

        out.stats.nodes += 1;
        let mut products = Vec::new();
        let mut visited = HashSet::new();
        let mut current = start.clone();
        let mut pages = 0u32;

        let stop = loop {
            if self.cancelled() {
                break Stop::Cancelled;
            }
            if pages >= self.max_pages {
                break Stop::PageLimit;
            }
            visited.insert(current.to_string());

            let markup = match self.source.fetch(current.as_str()) {
                Ok(markup) => markup,
                Err(e) => break Stop::Failed(e),
            };
            pages += 1;
            out.stats.pages += 1;

            let html = Html::parse_document(&markup);
            let found = self.parser.parse_products(&html, &context);
            debug!(url = %current, page = pages, products = found.len(), "page parsed");
            products.extend(found);

            match self.parser.locate_next(&html) {
                NextPage::Absent | NextPage::Disabled => break Stop::Exhausted,
                NextPage::NoTarget => break Stop::NoTarget,
                NextPage::Target(target) => {
                    let mut next = start.clone();
                    next.set_fragment(Some(&target));
                    if visited.contains(next.as_str()) {
                        break Stop::Revisit(next.to_string());
                    }
                    current = next;
                }
            }
        };

        match &stop {
            Stop::Exhausted => debug!(pages, "listing exhausted"),
            Stop::NoTarget => warn!(url = %current, "next control exposes no page, stopping"),
            Stop::Revisit(url) => warn!(url = %url, "next page already visited, stopping"),
            Stop::PageLimit => warn!(max_pages = self.max_pages, "page limit reached"),
            Stop::Cancelled => info!(pages, "cancelled"),
            Stop::Failed(e) => {
                warn!(url = %current, error = %e, kept = products.len(), "page fetch failed, keeping earlier pages");
                out.stats.failed_nodes += 1;
            }
        }

        out.stats.products += products.len();
        out.products.entry(path.to_vec()).or_default().extend(products);
    }
}
