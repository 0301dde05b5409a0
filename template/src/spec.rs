use serde::{
    Deserialize,
    Serialize,
};
use std::collections::{
    btree_map,
    BTreeMap,
};

/// A template leaf or a nested group of templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateNode {
    Template(String),
    Nested(TemplateSpec),
}

/// User-defined tree of output templates, e.g.
///
/// ```yaml
/// gps: "${position.lat},${position.lon}"
/// fitnessPointData:
///   distanceInKilometers: "${round(distanceMeters / 100) / 10}"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSpec(BTreeMap<String, TemplateNode>);

impl TemplateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.0.insert(key.into(), TemplateNode::Template(template.into()));
        self
    }

    pub fn with_nested(mut self, key: impl Into<String>, nested: TemplateSpec) -> Self {
        self.0.insert(key.into(), TemplateNode::Nested(nested));
        self
    }

    pub fn get(&self, key: &str) -> Option<&TemplateNode> {
        self.0.get(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, TemplateNode> {
        self.0.iter()
    }

    /// Number of template strings in the whole tree.
    pub fn leaf_count(&self) -> usize {
        self.0
            .values()
            .map(|node| match node {
                TemplateNode::Template(_) => 1,
                TemplateNode::Nested(nested) => nested.leaf_count(),
            })
            .sum()
    }

    /// Deep-merge `overrides` into `self`.
    ///
    /// Leaves from `overrides` win, nested groups present on both sides are
    /// merged key by key, and a key that changes between leaf and group takes
    /// the override wholesale. Keys only present in `self` are kept.
    pub fn merge(&mut self, overrides: TemplateSpec) {
        for (key, node) in overrides.0 {
            match node {
                TemplateNode::Nested(nested) => match self.0.get_mut(&key) {
                    Some(TemplateNode::Nested(base)) => base.merge(nested),
                    _ => {
                        self.0.insert(key, TemplateNode::Nested(nested));
                    }
                },
                leaf => {
                    self.0.insert(key, leaf);
                }
            }
        }
    }

    pub fn merged(mut self, overrides: TemplateSpec) -> Self {
        self.merge(overrides);
        self
    }
}

impl<'a> IntoIterator for &'a TemplateSpec {
    type Item = (&'a String, &'a TemplateNode);
    type IntoIter = btree_map::Iter<'a, String, TemplateNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
