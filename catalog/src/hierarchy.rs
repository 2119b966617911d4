//! Three-level taxonomy discovery from a single menu snapshot

use scraper::Html;
use tracing::{debug, info, warn};

use crate::config::{LevelSelectors, TaxonomySelectors};
use crate::error::{CrawlError, CrawlResult, Level};
use crate::extract::{extract_raw_items, RawItems};
use crate::ordered::OrderedMap;
use crate::resolve::resolve_parent;
use crate::types::{fold, Category, ClassifiedRecord, Group, PathContext, Subgroup};

/// Entities found at one level, keyed by case-folded description
#[derive(Debug)]
pub struct LevelOutcome<T> {
    pub items: OrderedMap<T>,
    /// Items dropped for lack of a link or a resolvable parent
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelFailure {
    pub level: Level,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Taxonomy {
    pub groups: OrderedMap<Group>,
    pub subgroups: OrderedMap<Subgroup>,
    pub categories: OrderedMap<Category>,
    pub dropped: usize,
    pub failures: Vec<LevelFailure>,
}

fn raw_for_level(html: &Html, selectors: &LevelSelectors, level: Level) -> CrawlResult<RawItems> {
    extract_raw_items(html, selectors).map_err(|e| CrawlError::Extraction {
        level,
        message: e.to_string(),
    })
}

pub fn extract_groups(html: &Html, selectors: &LevelSelectors) -> CrawlResult<LevelOutcome<Group>> {
    let raw = raw_for_level(html, selectors, Level::Group)?;
    let mut items = OrderedMap::new();
    for item in raw.items {
        items.insert(
            fold(&item.description),
            Group {
                description: item.description,
                link: item.link,
            },
        );
    }
    Ok(LevelOutcome {
        items,
        dropped: raw.missing_link,
    })
}

/// Build children of one level, attaching each to the parent its link names
fn extract_children<P, C>(
    html: &Html,
    selectors: &LevelSelectors,
    level: Level,
    parents: &OrderedMap<P>,
    build: impl Fn(String, String, &P) -> C,
) -> CrawlResult<LevelOutcome<C>> {
    let raw = raw_for_level(html, selectors, level)?;
    let mut items = OrderedMap::new();
    let mut dropped = raw.missing_link;
    for item in raw.items {
        match resolve_parent(&item.link, parents) {
            Some(parent) => {
                items.insert(fold(&item.description), build(item.description, item.link, parent));
            }
            None => {
                debug!(%level, description = %item.description, link = %item.link, "no parent matches link, dropping");
                dropped += 1;
            }
        }
    }
    Ok(LevelOutcome { items, dropped })
}

pub fn extract_subgroups(
    html: &Html,
    selectors: &LevelSelectors,
    groups: &OrderedMap<Group>,
) -> CrawlResult<LevelOutcome<Subgroup>> {
    extract_children(html, selectors, Level::Subgroup, groups, |description, link, group| {
        Subgroup {
            description,
            link,
            group: group.clone(),
        }
    })
}

pub fn extract_categories(
    html: &Html,
    selectors: &LevelSelectors,
    subgroups: &OrderedMap<Subgroup>,
) -> CrawlResult<LevelOutcome<Category>> {
    extract_children(html, selectors, Level::Category, subgroups, |description, link, subgroup| {
        Category {
            description,
            link,
            subgroup: subgroup.clone(),
        }
    })
}

impl Taxonomy {
    fn record<T>(&mut self, level: Level, outcome: CrawlResult<LevelOutcome<T>>) -> OrderedMap<T> {
        match outcome {
            Ok(outcome) => {
                info!(%level, found = outcome.items.len(), dropped = outcome.dropped, "level extracted");
                self.dropped += outcome.dropped;
                outcome.items
            }
            Err(e) => {
                warn!(%level, error = %e, "level extraction failed");
                self.failures.push(LevelFailure {
                    level,
                    message: e.to_string(),
                });
                OrderedMap::new()
            }
        }
    }

    /// Merge all levels into one mapping keyed by case-folded description.
    ///
    /// Groups go in first, then subgroups, then categories; an entity whose
    /// folded description repeats one from an earlier level replaces that
    /// record in place.
    pub fn flatten(&self) -> OrderedMap<ClassifiedRecord> {
        let mut flat = OrderedMap::new();
        for (key, group) in self.groups.iter() {
            flat.insert(key, ClassifiedRecord::from(group));
        }
        for (key, subgroup) in self.subgroups.iter() {
            flat.insert(key, ClassifiedRecord::from(subgroup));
        }
        for (key, category) in self.categories.iter() {
            flat.insert(key, ClassifiedRecord::from(category));
        }
        flat
    }

    /// Entities behind a tree path of raw descriptions (group[, subgroup[, category]])
    pub fn context_for(&self, path: &[String]) -> Option<PathContext> {
        match path {
            [group] => {
                let group = self.groups.get(&fold(group))?;
                Some(PathContext {
                    group: group.clone(),
                    subgroup: None,
                    category: None,
                })
            }
            [group, subgroup] => {
                let found = self.subgroups.get(&fold(subgroup))?;
                if found.description != *subgroup || found.group.description != *group {
                    return None;
                }
                Some(PathContext {
                    group: found.group.clone(),
                    subgroup: Some(found.clone()),
                    category: None,
                })
            }
            [group, subgroup, category] => {
                let found = self.categories.get(&fold(category))?;
                if found.description != *category
                    || found.subgroup.description != *subgroup
                    || found.subgroup.group.description != *group
                {
                    return None;
                }
                Some(PathContext {
                    group: found.subgroup.group.clone(),
                    subgroup: Some(found.subgroup.clone()),
                    category: Some(found.clone()),
                })
            }
            _ => None,
        }
    }
}

/// Discover the whole taxonomy from one menu snapshot.
///
/// A level that fails comes back empty and is listed in `failures`; a level
/// is only attempted when the level above it produced something.
pub fn build_taxonomy(html: &Html, selectors: &TaxonomySelectors) -> Taxonomy {
    let mut taxonomy = Taxonomy::default();

    taxonomy.groups = taxonomy.record(Level::Group, extract_groups(html, &selectors.groups));
    if taxonomy.groups.is_empty() {
        return taxonomy;
    }

    let subgroups = extract_subgroups(html, &selectors.subgroups, &taxonomy.groups);
    taxonomy.subgroups = taxonomy.record(Level::Subgroup, subgroups);
    if taxonomy.subgroups.is_empty() {
        return taxonomy;
    }

    let categories = extract_categories(html, &selectors.categories, &taxonomy.subgroups);
    taxonomy.categories = taxonomy.record(Level::Category, categories);
    taxonomy
}
