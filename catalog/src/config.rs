//! Site configuration: selectors, price format and fetch settings
//!
//! Loaded from a CONL file; every field has a default matching the catalog
//! the crawler was first written for, so a file only needs the overrides.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{CrawlError, CrawlResult};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_PAGES: u32 = 500;
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; CatalogCrawler/1.0)";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Page carrying the navigation menus
    pub url: String,
    /// Selector that must be present before the menu page counts as loaded.
    /// Falls back to the group item selector.
    pub ready_selector: Option<String>,
    pub timeout_ms: u64,
    pub user_agent: String,
    /// Upper bound on pages fetched for a single tree node
    pub max_pages: u32,
    pub taxonomy: TaxonomySelectors,
    pub listing: ListingSelectors,
    pub price: PriceFormat,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: "https://example.com".to_string(),
            ready_selector: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: USER_AGENT.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            taxonomy: TaxonomySelectors::default(),
            listing: ListingSelectors::default(),
            price: PriceFormat::default(),
        }
    }
}

impl SiteConfig {
    pub fn load(path: &Path) -> CrawlResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| CrawlError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_conl(&content).map_err(|message| CrawlError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_conl(content: &str) -> Result<Self, String> {
        serde_conl::from_str(content).map_err(|e| e.to_string())
    }

    pub fn ready_selector(&self) -> &str {
        self.ready_selector
            .as_deref()
            .unwrap_or(&self.taxonomy.groups.item)
    }
}

/// Where to find one taxonomy level in the menu markup
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LevelSelectors {
    /// Containers scoping the level (e.g. the level-2 submenu panels)
    #[serde(default)]
    pub container: Option<String>,
    pub item: String,
    /// Link element inside each item
    #[serde(default = "default_link")]
    pub link: String,
}

fn default_link() -> String {
    "a".to_string()
}

impl LevelSelectors {
    pub fn new(container: Option<&str>, item: &str) -> Self {
        Self {
            container: container.map(str::to_string),
            item: item.to_string(),
            link: default_link(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TaxonomySelectors {
    pub groups: LevelSelectors,
    pub subgroups: LevelSelectors,
    pub categories: LevelSelectors,
}

impl Default for TaxonomySelectors {
    fn default() -> Self {
        Self {
            groups: LevelSelectors::new(None, "li[data-menu]"),
            subgroups: LevelSelectors::new(
                Some("div.submenu.submenu--level-2"),
                "li.submenu__item.submenu__item--main",
            ),
            categories: LevelSelectors::new(Some("div.submenu.submenu--level-3"), "li.submenu__item"),
        }
    }
}

/// Product listing page markers
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ListingSelectors {
    pub product: String,
    pub description: String,
    pub link: String,
    pub price: String,
    /// The "next page" control
    pub next: String,
    /// Class that marks the next control as disabled
    pub disabled_class: String,
    /// Attribute on the next control holding the target page identifier
    pub page_attr: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            product: ".product-item".to_string(),
            description: ".product-item__name".to_string(),
            link: "a".to_string(),
            price: ".product-item__price".to_string(),
            next: ".pagination__next".to_string(),
            disabled_class: "disabled".to_string(),
            page_attr: "data-page".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PriceFormat {
    pub currency: String,
    pub thousands: String,
    pub decimal: String,
}

impl Default for PriceFormat {
    fn default() -> Self {
        Self {
            currency: "R$".to_string(),
            thousands: ".".to_string(),
            decimal: ",".to_string(),
        }
    }
}
