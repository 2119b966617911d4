//! Taxonomy and product types

use serde::Serialize;

/// Top level of the catalog menu
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub description: String,
    pub link: String,
}

/// Second level; always attached to the group its link resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subgroup {
    pub description: String,
    pub link: String,
    pub group: Group,
}

/// Third level; always attached to the subgroup its link resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub description: String,
    pub link: String,
    pub subgroup: Subgroup,
}

/// Product listing found while paginating a taxonomy node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub description: String,
    pub link: String,
    pub price: f64,
    pub group: Group,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subgroup: Option<Subgroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// A (description, link) pair as it appears in the menu markup
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub description: String,
    pub link: String,
}

/// Flattened view of any taxonomy entity with its ancestors by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    pub group: Option<String>,
    pub subgroup: Option<String>,
    pub category: Option<String>,
    pub link: String,
}

impl From<&Group> for ClassifiedRecord {
    fn from(group: &Group) -> Self {
        Self {
            group: Some(group.description.clone()),
            subgroup: None,
            category: None,
            link: group.link.clone(),
        }
    }
}

impl From<&Subgroup> for ClassifiedRecord {
    fn from(subgroup: &Subgroup) -> Self {
        Self {
            group: Some(subgroup.group.description.clone()),
            subgroup: Some(subgroup.description.clone()),
            category: None,
            link: subgroup.link.clone(),
        }
    }
}

impl From<&Category> for ClassifiedRecord {
    fn from(category: &Category) -> Self {
        Self {
            group: Some(category.subgroup.group.description.clone()),
            subgroup: Some(category.subgroup.description.clone()),
            category: Some(category.description.clone()),
            link: category.link.clone(),
        }
    }
}

/// Taxonomy entities a product inherits from the path that discovered it
#[derive(Debug, Clone, PartialEq)]
pub struct PathContext {
    pub group: Group,
    pub subgroup: Option<Subgroup>,
    pub category: Option<Category>,
}

impl PathContext {
    pub fn product(&self, description: String, link: String, price: f64) -> Product {
        Product {
            description,
            link,
            price,
            group: self.group.clone(),
            subgroup: self.subgroup.clone(),
            category: self.category.clone(),
        }
    }
}

/// Lookup key for a description: case-folded, original casing is kept on the entity
pub fn fold(description: &str) -> String {
    description.to_lowercase()
}
