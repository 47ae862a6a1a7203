use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CollectError;

mod extract;

pub use extract::ExtractOptions;

/// The fields a query requested, keyed by field name. Scalar fields map to an
/// empty tree. Serializes as a nested JSON object: `{"post":{"title":{}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTree {
    fields: BTreeMap<String, FieldTree>,
}

impl FieldTree {
    pub fn new() -> Self {
        FieldTree::default()
    }

    /// Builder form of [`FieldTree::insert`].
    pub fn with(mut self, name: &str, tree: FieldTree) -> Self {
        self.insert(name, tree);
        self
    }

    pub fn leaf(self, name: &str) -> Self {
        self.with(name, FieldTree::new())
    }

    /// Adds `name`, merging `tree` into any selection already recorded for it.
    pub fn insert(&mut self, name: &str, tree: FieldTree) {
        match self.fields.get_mut(name) {
            Some(existing) => existing.merge(tree),
            None => {
                self.fields.insert(name.to_string(), tree);
            }
        }
    }

    pub fn merge(&mut self, other: FieldTree) {
        for (name, tree) in other.fields {
            self.insert(&name, tree);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldTree> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_leaf(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldTree)> {
        self.fields.iter().map(|(name, tree)| (name.as_str(), tree))
    }

    /// Follows `path` down the tree, the way a nested resolver sees only the
    /// selection below its own field.
    pub fn descend<S: AsRef<str>>(&self, path: &[S]) -> Result<&FieldTree, CollectError> {
        let mut current = self;
        for (depth, segment) in path.iter().enumerate() {
            current = current.get(segment.as_ref()).ok_or_else(|| {
                let walked: Vec<&str> = path[..=depth].iter().map(|s| s.as_ref()).collect();
                CollectError::MissingField(walked.join("."))
            })?;
        }
        Ok(current)
    }

    /// Every requested field as a dotted path, parents before children.
    pub fn paths(&self) -> Vec<String> {
        let mut output = Vec::new();
        self.collect_paths(None, &mut output);
        output
    }

    fn collect_paths(&self, parent: Option<&str>, dst: &mut Vec<String>) {
        for (name, tree) in &self.fields {
            let full_name = match parent {
                Some(parent) => format!("{}.{}", parent, name),
                None => name.to_string(),
            };
            dst.push(full_name.clone());
            tree.collect_paths(Some(&full_name), dst);
        }
    }
}

impl FromIterator<(String, FieldTree)> for FieldTree {
    fn from_iter<I: IntoIterator<Item = (String, FieldTree)>>(iter: I) -> Self {
        let mut tree = FieldTree::new();
        for (name, subtree) in iter {
            tree.insert(&name, subtree);
        }
        tree
    }
}
