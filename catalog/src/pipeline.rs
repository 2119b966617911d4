//! Menu discovery and product crawl over an injected markup source

use scraper::Html;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::collect::{CollectStats, Collector, ListingParser};
use crate::config::SiteConfig;
use crate::error::{CrawlError, CrawlResult};
use crate::fetch::MarkupSource;
use crate::hierarchy::{build_taxonomy, Taxonomy};
use crate::tree::{aggregate, Tree};
use crate::types::Product;

/// Taxonomy found in the menu and the tree rebuilt from it
#[derive(Debug)]
pub struct Discovery {
    pub taxonomy: Taxonomy,
    pub tree: Tree,
}

#[derive(Debug, Serialize)]
pub struct PathProducts {
    pub path: Vec<String>,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct CrawlReport {
    pub tree: Tree,
    pub products: Vec<PathProducts>,
    pub stats: CollectStats,
}

/// Fetch the menu page once it is ready and rebuild the taxonomy tree from it
pub fn discover<S: MarkupSource>(source: &mut S, config: &SiteConfig) -> CrawlResult<Discovery> {
    let timeout = Duration::from_millis(config.timeout_ms);
    let markup = source.fetch_with_wait(&config.url, config.ready_selector(), timeout)?;
    let html = Html::parse_document(&markup);

    let taxonomy = build_taxonomy(&html, &config.taxonomy);
    let aggregation = aggregate(&taxonomy.flatten());
    if aggregation.skipped > 0 {
        warn!(skipped = aggregation.skipped, "records without a group left out of the tree");
    }
    info!(
        groups = taxonomy.groups.len(),
        subgroups = taxonomy.subgroups.len(),
        categories = taxonomy.categories.len(),
        "taxonomy discovered"
    );
    Ok(Discovery {
        taxonomy,
        tree: aggregation.tree,
    })
}

/// Collect every listing reachable from the discovered tree
pub fn crawl<S: MarkupSource>(
    source: &mut S,
    config: &SiteConfig,
    discovery: Discovery,
    cancel: Option<Arc<AtomicBool>>,
) -> CrawlResult<CrawlReport> {
    let base_url = Url::parse(&config.url).map_err(|e| CrawlError::Fetch {
        url: config.url.clone(),
        message: format!("invalid site url: {}", e),
    })?;
    let parser = ListingParser::new(&config.listing, &config.price)?;

    let mut collector = Collector::new(source, &parser, &discovery.taxonomy)
        .with_base_url(base_url)
        .with_max_pages(config.max_pages);
    if let Some(flag) = cancel {
        collector = collector.with_cancel(flag);
    }
    let collection = collector.collect(&discovery.tree);

    let products = collection
        .products
        .into_iter()
        .map(|(path, products)| PathProducts { path, products })
        .collect();
    Ok(CrawlReport {
        tree: discovery.tree,
        products,
        stats: collection.stats,
    })
}
