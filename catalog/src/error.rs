//! Crawl failure kinds

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Taxonomy level, used to scope extraction failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Group,
    Subgroup,
    Category,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Group => "group",
            Level::Subgroup => "subgroup",
            Level::Category => "category",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("'{selector}' did not appear on {url} within {timeout_ms}ms")]
    Readiness {
        url: String,
        selector: String,
        timeout_ms: u64,
    },

    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("{level} extraction failed: {message}")]
    Extraction { level: Level, message: String },

    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("page cache error at {path}: {message}")]
    Cache { path: PathBuf, message: String },
}

pub type CrawlResult<T> = Result<T, CrawlError>;
