//! Document tree
//!
//! Nodes and marks validated against the schema, plus the JSON snapshot
//! shape exchanged with the editor (`type`, `attrs`, `content`, `text`,
//! `marks`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{AttrSpec, ContentRule, Group, MarkKind, NodeKind};
use crate::{Error, Result};

/// Attribute map of a node or mark
pub type Attrs = Map<String, Value>;

/// Shared handle to a mark.
///
/// Two text nodes belong to the same marked span only when they hold the
/// same instance (`Arc::ptr_eq`), not merely equal values.
pub type MarkRef = Arc<Mark>;

/// An inline annotation on a run of text
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    kind: MarkKind,
    attrs: Attrs,
}

impl Mark {
    /// Create a mark, filling attribute defaults
    pub fn new(kind: MarkKind, attrs: Attrs) -> Result<Self> {
        let attrs = compute_attrs(kind.name(), kind.spec().attrs, attrs)?;
        Ok(Self { kind, attrs })
    }

    fn plain(kind: MarkKind) -> Self {
        Self {
            kind,
            attrs: Attrs::new(),
        }
    }

    pub fn strong() -> Self {
        Self::plain(MarkKind::Strong)
    }

    pub fn emphasis() -> Self {
        Self::plain(MarkKind::Emphasis)
    }

    pub fn strike() -> Self {
        Self::plain(MarkKind::Strike)
    }

    pub fn code() -> Self {
        Self::plain(MarkKind::Code)
    }

    pub fn link(href: &str, title: Option<&str>) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert("href".to_string(), Value::from(href));
        attrs.insert(
            "title".to_string(),
            title.map(Value::from).unwrap_or(Value::Null),
        );
        Self {
            kind: MarkKind::Link,
            attrs,
        }
    }

    pub fn kind(&self) -> MarkKind {
        self.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// String attribute, `None` when absent, null or empty
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Wrap in a fresh shared instance
    pub fn into_ref(self) -> MarkRef {
        Arc::new(self)
    }
}

/// Whether `set` holds this exact mark instance
pub fn contains_mark(set: &[MarkRef], mark: &MarkRef) -> bool {
    set.iter().any(|m| Arc::ptr_eq(m, mark))
}

/// Add a mark to a set, keeping rank order. A mark of a kind already in the
/// set is not added twice.
pub fn add_mark(set: &[MarkRef], mark: MarkRef) -> Vec<MarkRef> {
    if set.iter().any(|m| m.kind() == mark.kind()) {
        return set.to_vec();
    }
    let mut marks = set.to_vec();
    let at = marks
        .iter()
        .position(|m| m.kind() > mark.kind())
        .unwrap_or(marks.len());
    marks.insert(at, mark);
    marks
}

/// A node of the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    attrs: Attrs,
    content: Vec<Node>,
    text: Option<String>,
    marks: Vec<MarkRef>,
}

impl Node {
    /// Create a non-text node, validating attributes and children.
    pub fn new(kind: NodeKind, attrs: Attrs, content: Vec<Node>) -> Result<Self> {
        if kind == NodeKind::Text {
            return Err(Error::InvalidSnapshot(
                "text nodes are created with Node::text".to_string(),
            ));
        }
        let attrs = compute_attrs(kind.name(), kind.spec().attrs, attrs)?;
        check_content(kind, &content)?;
        Ok(Self {
            kind,
            attrs,
            content,
            text: None,
            marks: Vec::new(),
        })
    }

    /// Create a text node. Marks are put into rank order.
    pub fn text(text: &str, marks: Vec<MarkRef>) -> Self {
        let mut marks = marks;
        marks.sort_by_key(|m| m.kind());
        Self {
            kind: NodeKind::Text,
            attrs: Attrs::new(),
            content: Vec::new(),
            text: Some(text.to_string()),
            marks,
        }
    }

    pub fn doc(content: Vec<Node>) -> Result<Self> {
        Self::new(NodeKind::Doc, Attrs::new(), content)
    }

    pub fn paragraph(content: Vec<Node>) -> Result<Self> {
        Self::new(NodeKind::Paragraph, Attrs::new(), content)
    }

    pub fn heading(level: u8, content: Vec<Node>) -> Result<Self> {
        let mut attrs = Attrs::new();
        attrs.insert("level".to_string(), Value::from(level));
        Self::new(NodeKind::Heading, attrs, content)
    }

    pub fn hard_break() -> Self {
        Self {
            kind: NodeKind::HardBreak,
            attrs: Attrs::new(),
            content: Vec::new(),
            text: None,
            marks: Vec::new(),
        }
    }

    /// Same inline node carrying the given marks
    pub fn with_marks(mut self, marks: Vec<MarkRef>) -> Self {
        if self.kind.is_inline() {
            self.marks = marks;
            self.marks.sort_by_key(|m| m.kind());
        }
        self
    }

    /// Copy of a text node with different text, same mark instances
    pub fn with_text(&self, text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..self.clone()
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name).filter(|v| !v.is_null())
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        self.attr(name).and_then(Value::as_u64)
    }

    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attr(name).and_then(Value::as_bool)
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    /// Text of a text node
    pub fn text_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn marks(&self) -> &[MarkRef] {
        &self.marks
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.content.iter().map(Node::text_content).collect(),
        }
    }

    /// Build a node from a JSON snapshot.
    ///
    /// Equal marks on adjacent inline siblings are interned into one shared
    /// instance, so a span split across several text nodes stays one span.
    pub fn from_json(value: &Value) -> Result<Self> {
        let snapshot = NodeJson::deserialize(value)
            .map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    /// JSON snapshot of this node
    pub fn to_json(&self) -> Value {
        // NodeJson holds only strings, maps and vectors
        serde_json::to_value(self.to_snapshot()).unwrap_or(Value::Null)
    }

    fn from_snapshot(snapshot: NodeJson) -> Result<Self> {
        let kind = NodeKind::from_name(&snapshot.kind).ok_or_else(|| {
            Error::InvalidSnapshot(format!("unknown node type `{}`", snapshot.kind))
        })?;

        let marks = snapshot
            .marks
            .into_iter()
            .map(|m| {
                let mark_kind = MarkKind::from_name(&m.kind).ok_or_else(|| {
                    Error::InvalidSnapshot(format!("unknown mark type `{}`", m.kind))
                })?;
                Ok(Mark::new(mark_kind, m.attrs.unwrap_or_default())?.into_ref())
            })
            .collect::<Result<Vec<_>>>()?;

        if kind == NodeKind::Text {
            let text = snapshot.text.unwrap_or_default();
            return Ok(Node::text(&text, marks));
        }

        let mut content = snapshot
            .content
            .into_iter()
            .map(Node::from_snapshot)
            .collect::<Result<Vec<_>>>()?;
        intern_sibling_marks(&mut content);

        Ok(Node::new(kind, snapshot.attrs.unwrap_or_default(), content)?.with_marks(marks))
    }

    fn to_snapshot(&self) -> NodeJson {
        NodeJson {
            kind: self.kind.name().to_string(),
            attrs: (!self.attrs.is_empty()).then(|| self.attrs.clone()),
            content: self.content.iter().map(Node::to_snapshot).collect(),
            text: self.text.clone(),
            marks: self
                .marks
                .iter()
                .map(|m| MarkJson {
                    kind: m.kind().name().to_string(),
                    attrs: (!m.attrs().is_empty()).then(|| m.attrs().clone()),
                })
                .collect(),
        }
    }
}

/// Fill defaults for declared attributes, resolve aliases and drop unknown keys
fn compute_attrs(owner: &str, specs: &[AttrSpec], mut given: Attrs) -> Result<Attrs> {
    let mut attrs = Attrs::new();
    for spec in specs {
        let value = given
            .remove(spec.name)
            .or_else(|| spec.alias.and_then(|alias| given.remove(alias)))
            .filter(|v| !v.is_null() || spec.default.to_value().is_some());
        let value = match value {
            Some(v) => v,
            None => spec.default.to_value().ok_or_else(|| Error::InvalidAttribute {
                owner: owner.to_string(),
                name: spec.name.to_string(),
            })?,
        };
        attrs.insert(spec.name.to_string(), value);
    }

    if owner == NodeKind::Heading.name() {
        let level = attrs.get("level").and_then(Value::as_u64);
        if !matches!(level, Some(1..=6)) {
            return Err(Error::InvalidAttribute {
                owner: owner.to_string(),
                name: "level".to_string(),
            });
        }
    }

    Ok(attrs)
}

fn check_content(kind: NodeKind, content: &[Node]) -> Result<()> {
    let spec = kind.spec();
    let violation = |child: &Node| Error::SchemaViolation {
        parent: kind,
        child: child.kind,
    };

    for (i, child) in content.iter().enumerate() {
        let allowed = match spec.content {
            ContentRule::Empty => false,
            ContentRule::Blocks => child.kind.spec().group == Group::Block,
            ContentRule::ParagraphFirst => {
                if i == 0 {
                    child.kind == NodeKind::Paragraph
                } else {
                    child.kind.spec().group == Group::Block
                }
            }
            ContentRule::Inline => child.kind.is_inline(),
            ContentRule::PlainText => child.kind == NodeKind::Text && child.marks.is_empty(),
            ContentRule::Items(kinds) => kinds.contains(&child.kind),
        };
        let empty_text = child.text.as_deref().is_some_and(str::is_empty);
        let stray_marks = !spec.marks && !child.marks.is_empty();
        if !allowed || empty_text || stray_marks {
            return Err(violation(child));
        }
    }

    Ok(())
}

/// Replace each mark with the equal instance held by the previous sibling
pub fn intern_sibling_marks(content: &mut [Node]) {
    for i in 1..content.len() {
        let (before, after) = content.split_at_mut(i);
        let prev = &before[i - 1].marks;
        for mark in after[0].marks.iter_mut() {
            if let Some(shared) = prev.iter().find(|p| ***p == **mark) {
                *mark = Arc::clone(shared);
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeJson {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<Attrs>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<MarkJson>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MarkJson {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<Attrs>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> Node {
        Node::text(s, Vec::new())
    }

    #[test]
    fn test_paragraph_accepts_inline() {
        let p = Node::paragraph(vec![text("a"), Node::hard_break(), text("b")]).unwrap();
        assert_eq!(p.child_count(), 3);
        assert_eq!(p.text_content(), "ab");
    }

    #[test]
    fn test_doc_rejects_inline_child() {
        let err = Node::doc(vec![text("loose")]).unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaViolation {
                parent: NodeKind::Doc,
                child: NodeKind::Text
            }
        ));
    }

    #[test]
    fn test_list_item_requires_leading_paragraph() {
        let list = Node::new(NodeKind::BulletList, Attrs::new(), vec![]).unwrap();
        let err = Node::new(NodeKind::ListItem, Attrs::new(), vec![list]).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { .. }));
    }

    #[test]
    fn test_code_block_rejects_marks() {
        let marked = Node::text("x", vec![Mark::strong().into_ref()]);
        let err = Node::new(NodeKind::CodeBlock, Attrs::new(), vec![marked]).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { .. }));
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(Node::paragraph(vec![text("")]).is_err());
    }

    #[test]
    fn test_attr_defaults() {
        let ol = Node::new(NodeKind::OrderedList, Attrs::new(), vec![]).unwrap();
        assert_eq!(ol.attr_u64("start"), Some(1));
        assert_eq!(ol.attr_bool("parens"), Some(false));
        assert_eq!(ol.attr_bool("tight"), None);
    }

    #[test]
    fn test_heading_level_range() {
        assert!(Node::heading(6, vec![]).is_ok());
        assert!(matches!(
            Node::heading(7, vec![]),
            Err(Error::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_link_requires_href() {
        let err = Mark::new(MarkKind::Link, Attrs::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { .. }));
    }

    #[test]
    fn test_marks_sorted_by_rank() {
        let node = Node::text(
            "x",
            vec![Mark::code().into_ref(), Mark::emphasis().into_ref()],
        );
        assert_eq!(node.marks()[0].kind(), MarkKind::Emphasis);
        assert_eq!(node.marks()[1].kind(), MarkKind::Code);
    }

    #[test]
    fn test_from_json_tiptap_names() {
        let doc = Node::from_json(&json!({
            "type": "doc",
            "content": [{
                "type": "orderedList",
                "attrs": { "order": 3 },
                "content": [{
                    "type": "listItem",
                    "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "x" }] }]
                }]
            }]
        }))
        .unwrap();
        let list = doc.child(0).unwrap();
        assert_eq!(list.kind(), NodeKind::OrderedList);
        assert_eq!(list.attr_u64("start"), Some(3));
    }

    #[test]
    fn test_from_json_interns_adjacent_marks() {
        let doc = Node::from_json(&json!({
            "type": "paragraph",
            "content": [
                { "type": "text", "text": "a", "marks": [{ "type": "bold" }] },
                { "type": "text", "text": "b", "marks": [{ "type": "bold" }, { "type": "italic" }] }
            ]
        }))
        .unwrap();
        let a = &doc.content()[0].marks()[0];
        let b = &doc.content()[1].marks()[1];
        assert_eq!(b.kind(), MarkKind::Strong);
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_from_json_unknown_type() {
        let err = Node::from_json(&json!({ "type": "mention" })).unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let value = json!({
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": [{
                    "type": "text",
                    "text": "site",
                    "marks": [{ "type": "link", "attrs": { "href": "https://example.com", "title": null } }]
                }]
            }]
        });
        let doc = Node::from_json(&value).unwrap();
        assert_eq!(doc.to_json(), value);
    }

    #[test]
    fn test_add_mark_keeps_rank_and_dedups() {
        let set = add_mark(&[], Mark::code().into_ref());
        let set = add_mark(&set, Mark::strong().into_ref());
        let set = add_mark(&set, Mark::strong().into_ref());
        let kinds: Vec<_> = set.iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, vec![MarkKind::Strong, MarkKind::Code]);
    }
}
