//! Catalog taxonomy crawler
//!
//! Reads group → subgroup → category menus out of a store's navigation
//! markup, rebuilds them as a nested tree and pages through the product
//! listing behind every linked node.

pub mod collect;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod hierarchy;
pub mod ordered;
pub mod pipeline;
pub mod price;
pub mod resolve;
pub mod tree;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::SiteConfig;
pub use error::{CrawlError, CrawlResult};
pub use fetch::{HttpSource, MarkupSource};
pub use pipeline::{crawl, discover, CrawlReport, Discovery};
pub use types::*;
