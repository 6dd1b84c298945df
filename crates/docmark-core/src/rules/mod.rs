//! Rule system for document to Markdown conversion.

mod commonmark;
mod rule;

pub use commonmark::{commonmark_mark_rules, commonmark_node_rules};
pub use rule::{Delimiter, DelimiterFn, MarkRule, NodeRule, RenderFn};

use indexmap::IndexMap;

use crate::options::SerializerOptions;
use crate::schema::{MarkKind, NodeKind};
use crate::{Error, Result};

/// Collection of rules, keyed by kind. Later additions replace earlier ones.
pub struct Rules {
    nodes: IndexMap<NodeKind, NodeRule>,
    marks: IndexMap<MarkKind, MarkRule>,
}

impl Rules {
    /// An empty collection
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            marks: IndexMap::new(),
        }
    }

    /// The built-in rules for every kind in the schema
    pub fn commonmark(options: &SerializerOptions) -> Self {
        let mut rules = Self::new();
        for (kind, rule) in commonmark_node_rules(options) {
            rules.add_node(kind, rule);
        }
        for (kind, rule) in commonmark_mark_rules(options) {
            rules.add_mark(kind, rule);
        }
        rules
    }

    /// Add or replace the rule for a node kind
    pub fn add_node(&mut self, kind: NodeKind, rule: NodeRule) -> &mut Self {
        self.nodes.insert(kind, rule);
        self
    }

    /// Add or replace the rule for a mark kind
    pub fn add_mark(&mut self, kind: MarkKind, rule: MarkRule) -> &mut Self {
        self.marks.insert(kind, rule);
        self
    }

    /// Freeze into a table with one rule per kind.
    ///
    /// Fails with the first kind that has no rule.
    pub fn build(mut self) -> Result<RuleTable> {
        let nodes = NodeKind::ALL
            .iter()
            .map(|kind| {
                self.nodes
                    .shift_remove(kind)
                    .ok_or(Error::UnsupportedNodeKind(*kind))
            })
            .collect::<Result<Vec<_>>>()?;
        let marks = MarkKind::ALL
            .iter()
            .map(|kind| {
                self.marks
                    .shift_remove(kind)
                    .ok_or(Error::UnsupportedMarkKind(*kind))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RuleTable { nodes, marks })
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::new()
    }
}

/// A total mapping from every node and mark kind to its rule
pub struct RuleTable {
    nodes: Vec<NodeRule>,
    marks: Vec<MarkRule>,
}

impl RuleTable {
    pub fn node(&self, kind: NodeKind) -> &NodeRule {
        &self.nodes[kind.index()]
    }

    pub fn mark(&self, kind: MarkKind) -> &MarkRule {
        &self.marks[kind.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commonmark_rules_are_total() {
        assert!(Rules::commonmark(&SerializerOptions::default())
            .build()
            .is_ok());
    }

    #[test]
    fn test_missing_node_rule() {
        let err = Rules::new().build().err().unwrap();
        assert!(matches!(err, Error::UnsupportedNodeKind(NodeKind::Doc)));
    }

    #[test]
    fn test_missing_mark_rule() {
        let mut rules = Rules::new();
        for kind in NodeKind::ALL {
            rules.add_node(kind, NodeRule::block());
        }
        let err = rules.build().err().unwrap();
        assert!(matches!(
            err,
            Error::UnsupportedMarkKind(MarkKind::Emphasis)
        ));
    }

    #[test]
    fn test_override_replaces_rule() {
        let mut rules = Rules::commonmark(&SerializerOptions::default());
        rules.add_mark(MarkKind::Strong, MarkRule::new("__", "__"));
        let table = rules.build().unwrap();
        assert!(!table.mark(MarkKind::Strong).mixable);
    }
}
