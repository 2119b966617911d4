//! Nested taxonomy tree rebuilt from flat classified records

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::ordered::OrderedMap;
use crate::types::ClassifiedRecord;

/// Terminal, link-bearing node
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct LeafRecord {
    pub link: String,
    #[serde(rename = "grupo", skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(rename = "subgrupo", skip_serializing_if = "Option::is_none")]
    pub subgroup: Option<String>,
    #[serde(rename = "categoria", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Branch {
    /// The leaf this branch replaced when children were attached under it
    pub record: Option<LeafRecord>,
    pub children: OrderedMap<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Branch(Branch),
    Leaf(LeafRecord),
}

pub type Tree = OrderedMap<Node>;

impl Node {
    fn empty() -> Self {
        Node::Branch(Branch::default())
    }

    pub fn link(&self) -> Option<&str> {
        match self {
            Node::Branch(branch) => branch.record.as_ref().map(|r| r.link.as_str()),
            Node::Leaf(leaf) => Some(&leaf.link),
        }
    }

    pub fn children(&self) -> Option<&OrderedMap<Node>> {
        match self {
            Node::Branch(branch) => Some(&branch.children),
            Node::Leaf(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.children()?.get(key)
    }

    pub fn as_leaf(&self) -> Option<&LeafRecord> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Branch(_) => None,
        }
    }

    /// Turn a leaf into a branch so children can hang under it, keeping its record
    fn promote(&mut self) -> &mut Branch {
        if let Node::Leaf(leaf) = self {
            let record = std::mem::replace(leaf, LeafRecord::default());
            debug!(link = %record.link, "leaf gains children, keeping its record on the branch");
            *self = Node::Branch(Branch {
                record: Some(record),
                children: OrderedMap::new(),
            });
        }
        match self {
            Node::Branch(branch) => branch,
            Node::Leaf(_) => unreachable!("promoted above"),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Leaf(leaf) => leaf.serialize(serializer),
            Node::Branch(branch) => {
                let mut map = serializer.serialize_map(None)?;
                if let Some(record) = &branch.record {
                    map.serialize_entry("link", &record.link)?;
                    if let Some(group) = &record.group {
                        map.serialize_entry("grupo", group)?;
                    }
                    if let Some(subgroup) = &record.subgroup {
                        map.serialize_entry("subgrupo", subgroup)?;
                    }
                }
                for (key, child) in branch.children.iter() {
                    map.serialize_entry(key, child)?;
                }
                map.end()
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Aggregation {
    pub tree: Tree,
    /// Records without a group
    pub skipped: usize,
}

/// Rebuild group → subgroup → category nesting from flat records.
///
/// Records are applied in iteration order and the last write for a key wins:
/// a subgroup record processed after categories of the same subgroup replaces
/// them with a leaf, and a group record does the same to its subgroups.
pub fn aggregate(records: &OrderedMap<ClassifiedRecord>) -> Aggregation {
    let mut tree = Tree::new();
    let mut skipped = 0;

    for (key, record) in records.iter() {
        let Some(group) = record.group.as_deref() else {
            debug!(key, "record has no group, skipping");
            skipped += 1;
            continue;
        };
        let group_node = tree.get_or_insert_with(group, Node::empty);

        let Some(subgroup) = record.subgroup.as_deref() else {
            *group_node = Node::Leaf(LeafRecord {
                link: record.link.clone(),
                group: None,
                subgroup: None,
                category: None,
            });
            continue;
        };

        let subgroups = &mut group_node.promote().children;
        match record.category.as_deref() {
            Some(category) => {
                let subgroup_node = subgroups.get_or_insert_with(subgroup, Node::empty);
                subgroup_node.promote().children.insert(
                    category,
                    Node::Leaf(LeafRecord {
                        link: record.link.clone(),
                        group: Some(group.to_string()),
                        subgroup: Some(subgroup.to_string()),
                        category: Some(category.to_string()),
                    }),
                );
            }
            None => {
                subgroups.insert(
                    subgroup,
                    Node::Leaf(LeafRecord {
                        link: record.link.clone(),
                        group: Some(group.to_string()),
                        subgroup: Some(subgroup.to_string()),
                        category: None,
                    }),
                );
            }
        }
    }

    Aggregation { tree, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(group: Option<&str>, subgroup: Option<&str>, category: Option<&str>, link: &str) -> ClassifiedRecord {
        ClassifiedRecord {
            group: group.map(str::to_string),
            subgroup: subgroup.map(str::to_string),
            category: category.map(str::to_string),
            link: link.to_string(),
        }
    }

    #[test]
    fn test_category_record_builds_three_levels() {
        let records: OrderedMap<ClassifiedRecord> =
            [("x", record(Some("G"), Some("S"), Some("C"), "L"))].into_iter().collect();
        let tree = aggregate(&records).tree;

        let subgroup = tree.get("G").unwrap().get("S").unwrap();
        assert_eq!(subgroup.children().unwrap().keys().collect::<Vec<_>>(), vec!["C"]);
        assert_eq!(
            subgroup.get("C").unwrap().as_leaf(),
            Some(&LeafRecord {
                link: "L".to_string(),
                group: Some("G".to_string()),
                subgroup: Some("S".to_string()),
                category: Some("C".to_string()),
            })
        );

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json["G"]["S"]["C"],
            serde_json::json!({"link": "L", "grupo": "G", "subgrupo": "S", "categoria": "C"})
        );
    }

    #[test]
    fn test_subgroup_record_overwrites_earlier_categories() {
        let records: OrderedMap<ClassifiedRecord> = [
            ("c1", record(Some("G"), Some("S"), Some("C1"), "L1")),
            ("s", record(Some("G"), Some("S"), None, "L2")),
        ]
        .into_iter()
        .collect();
        let tree = aggregate(&records).tree;

        let subgroup = tree.get("G").unwrap().get("S").unwrap();
        assert_eq!(
            subgroup.as_leaf(),
            Some(&LeafRecord {
                link: "L2".to_string(),
                group: Some("G".to_string()),
                subgroup: Some("S".to_string()),
                category: None,
            })
        );
        assert!(subgroup.get("C1").is_none());
    }

    #[test]
    fn test_group_record_overwrites_earlier_subgroups() {
        let records: OrderedMap<ClassifiedRecord> = [
            ("s", record(Some("G"), Some("S"), None, "Ls")),
            ("g", record(Some("G"), None, None, "Lg")),
        ]
        .into_iter()
        .collect();
        let tree = aggregate(&records).tree;
        assert_eq!(tree.get("G").unwrap().link(), Some("Lg"));
        assert!(tree.get("G").unwrap().children().is_none());
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            serde_json::json!({"G": {"link": "Lg"}})
        );
    }

    #[test]
    fn test_children_after_leaf_keep_its_record() {
        let records: OrderedMap<ClassifiedRecord> = [
            ("g", record(Some("G"), None, None, "Lg")),
            ("s", record(Some("G"), Some("S"), None, "Ls")),
            ("c", record(Some("G"), Some("S"), Some("C"), "Lc")),
        ]
        .into_iter()
        .collect();
        let tree = aggregate(&records).tree;

        let group = tree.get("G").unwrap();
        assert_eq!(group.link(), Some("Lg"));
        assert!(group.as_leaf().is_none());
        let subgroup = group.get("S").unwrap();
        assert_eq!(subgroup.link(), Some("Ls"));
        assert_eq!(subgroup.get("C").unwrap().link(), Some("Lc"));
        match subgroup {
            Node::Branch(branch) => {
                let record = branch.record.as_ref().unwrap();
                assert_eq!(record.group.as_deref(), Some("G"));
                assert_eq!(record.subgroup.as_deref(), Some("S"));
            }
            Node::Leaf(_) => panic!("subgroup with a category should be a branch"),
        }

        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(
            json,
            r#"{"G":{"link":"Lg","S":{"link":"Ls","grupo":"G","subgrupo":"S","C":{"link":"Lc","grupo":"G","subgrupo":"S","categoria":"C"}}}}"#
        );
    }

    #[test]
    fn test_records_without_group_are_skipped() {
        let records: OrderedMap<ClassifiedRecord> = [
            ("orphan", record(None, Some("S"), None, "L")),
            ("g", record(Some("G"), None, None, "Lg")),
        ]
        .into_iter()
        .collect();
        let aggregation = aggregate(&records);
        assert_eq!(aggregation.skipped, 1);
        assert_eq!(aggregation.tree.keys().collect::<Vec<_>>(), vec!["G"]);
    }

    #[test]
    fn test_tree_is_rebuilt_from_scratch() {
        let records: OrderedMap<ClassifiedRecord> =
            [("g", record(Some("G"), None, None, "Lg"))].into_iter().collect();
        assert_eq!(aggregate(&records).tree, aggregate(&records).tree);
    }
}
