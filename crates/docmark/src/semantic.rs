//! Semantic tree produced by the grammar engine.
//!
//! An HTML-equivalent tree: elements with attributes, text, comments and a
//! fragment container. The structural mapper walks this tree to build a
//! document.

/// Kind of a semantic node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticKind {
    Element,
    Text,
    /// Non-rendering annotation
    Comment,
    /// Container without a tag of its own
    Fragment,
}

/// A node of the semantic tree
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticNode {
    pub kind: SemanticKind,

    /// Lowercase tag name for elements, `#text`, `#comment` or `#fragment`
    pub name: String,

    /// Text of text and comment nodes
    pub value: Option<String>,

    /// Attributes in source order
    pub attributes: Vec<(String, String)>,

    pub children: Vec<SemanticNode>,
}

impl SemanticNode {
    /// Create a new element node
    pub fn element(tag_name: &str) -> Self {
        Self {
            kind: SemanticKind::Element,
            name: tag_name.to_lowercase(),
            value: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a new element node with attributes
    pub fn element_with_attrs(tag_name: &str, attrs: Vec<(&str, &str)>) -> Self {
        let mut node = Self::element(tag_name);
        node.attributes = attrs
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.to_string()))
            .collect();
        node
    }

    pub fn text(content: &str) -> Self {
        Self {
            kind: SemanticKind::Text,
            name: "#text".to_string(),
            value: Some(content.to_string()),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn comment(content: &str) -> Self {
        Self {
            kind: SemanticKind::Comment,
            name: "#comment".to_string(),
            value: Some(content.to_string()),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn fragment() -> Self {
        Self {
            kind: SemanticKind::Fragment,
            name: "#fragment".to_string(),
            value: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_element(&self) -> bool {
        self.kind == SemanticKind::Element
    }

    pub fn is_comment(&self) -> bool {
        self.kind == SemanticKind::Comment
    }

    /// Whether this node can hold children
    pub fn is_container(&self) -> bool {
        matches!(self.kind, SemanticKind::Element | SemanticKind::Fragment)
    }

    /// Tag name of an element, empty for other kinds
    pub fn tag_name(&self) -> &str {
        if self.is_element() {
            &self.name
        } else {
            ""
        }
    }

    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.attributes
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> impl Iterator<Item = &SemanticNode> {
        self.children.iter()
    }

    /// Get only element children
    pub fn element_children(&self) -> impl Iterator<Item = &SemanticNode> {
        self.children().filter(|n| n.is_element())
    }

    pub fn add_child(&mut self, child: SemanticNode) {
        self.children.push(child);
    }

    /// Get all text content from this node and descendants. Comments are skipped.
    pub fn text_content(&self) -> String {
        match self.kind {
            SemanticKind::Text => self.value.clone().unwrap_or_default(),
            SemanticKind::Comment => String::new(),
            _ => self.children().map(SemanticNode::text_content).collect(),
        }
    }

    /// Whether any child is an element or non-blank text
    pub fn has_content(&self) -> bool {
        self.children().any(|child| match child.kind {
            SemanticKind::Element => true,
            SemanticKind::Text => child
                .value
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty()),
            SemanticKind::Comment => false,
            SemanticKind::Fragment => child.has_content(),
        })
    }
}
