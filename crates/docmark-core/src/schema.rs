//! Document schema
//!
//! The closed set of node and mark kinds the converter understands, with the
//! content model and attribute set of each. Both directions consult this
//! table read-only.

use std::fmt;

use serde_json::Value;

/// Bumped whenever a kind, content rule or attribute default changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Every node kind in the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    BulletList,
    OrderedList,
    ListItem,
    Table,
    TableRow,
    TableHeader,
    TableCell,
    Image,
    HardBreak,
    Text,
}

/// Every mark kind in the schema, in rank order.
///
/// The declaration order is the order marks are kept in on a text node, so
/// `Code` is always the innermost mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkKind {
    Emphasis,
    Strong,
    Strike,
    Link,
    Code,
}

/// Where a node may appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// Only the document root
    Root,
    /// Top-level and container content
    Block,
    /// Content of textblocks
    Inline,
    /// Only valid under one specific parent (list items, rows, cells)
    Structural,
}

/// Which children a node accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    /// Leaf node, no children
    Empty,
    /// Zero or more block nodes
    Blocks,
    /// A paragraph followed by any blocks
    ParagraphFirst,
    /// Inline nodes, marks allowed
    Inline,
    /// Unmarked text only
    PlainText,
    /// One of the listed structural kinds
    Items(&'static [NodeKind]),
}

/// Default value of a declared attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrDefault {
    Required,
    Null,
    Bool(bool),
    Int(i64),
}

impl AttrDefault {
    pub fn to_value(self) -> Option<Value> {
        match self {
            AttrDefault::Required => None,
            AttrDefault::Null => Some(Value::Null),
            AttrDefault::Bool(b) => Some(Value::Bool(b)),
            AttrDefault::Int(i) => Some(Value::from(i)),
        }
    }
}

/// A declared attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttrSpec {
    pub name: &'static str,
    /// Alternative key accepted in JSON snapshots
    pub alias: Option<&'static str>,
    pub default: AttrDefault,
}

const fn attr(name: &'static str, default: AttrDefault) -> AttrSpec {
    AttrSpec {
        name,
        alias: None,
        default,
    }
}

const fn aliased(name: &'static str, alias: &'static str, default: AttrDefault) -> AttrSpec {
    AttrSpec {
        name,
        alias: Some(alias),
        default,
    }
}

/// Schema entry for a node kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSpec {
    pub group: Group,
    pub content: ContentRule,
    pub attrs: &'static [AttrSpec],
    /// Whether inline children may carry marks
    pub marks: bool,
}

/// Schema entry for a mark kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkSpec {
    pub attrs: &'static [AttrSpec],
}

const HEADING_ATTRS: &[AttrSpec] = &[attr("level", AttrDefault::Int(1))];
const CODE_BLOCK_ATTRS: &[AttrSpec] = &[aliased("language", "params", AttrDefault::Null)];
const BLOCKQUOTE_ATTRS: &[AttrSpec] = &[attr("multiline", AttrDefault::Bool(false))];
const BULLET_LIST_ATTRS: &[AttrSpec] = &[attr("tight", AttrDefault::Null)];
const ORDERED_LIST_ATTRS: &[AttrSpec] = &[
    aliased("start", "order", AttrDefault::Int(1)),
    attr("parens", AttrDefault::Bool(false)),
    attr("tight", AttrDefault::Null),
];
const IMAGE_ATTRS: &[AttrSpec] = &[
    attr("src", AttrDefault::Required),
    attr("alt", AttrDefault::Null),
    attr("title", AttrDefault::Null),
];
const LINK_ATTRS: &[AttrSpec] = &[
    attr("href", AttrDefault::Required),
    attr("title", AttrDefault::Null),
];

impl NodeKind {
    pub const ALL: [NodeKind; 16] = [
        NodeKind::Doc,
        NodeKind::Paragraph,
        NodeKind::Heading,
        NodeKind::Blockquote,
        NodeKind::CodeBlock,
        NodeKind::HorizontalRule,
        NodeKind::BulletList,
        NodeKind::OrderedList,
        NodeKind::ListItem,
        NodeKind::Table,
        NodeKind::TableRow,
        NodeKind::TableHeader,
        NodeKind::TableCell,
        NodeKind::Image,
        NodeKind::HardBreak,
        NodeKind::Text,
    ];

    /// Position in [`NodeKind::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Snapshot name of this kind
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::Blockquote => "blockquote",
            NodeKind::CodeBlock => "code_block",
            NodeKind::HorizontalRule => "horizontal_rule",
            NodeKind::BulletList => "bullet_list",
            NodeKind::OrderedList => "ordered_list",
            NodeKind::ListItem => "list_item",
            NodeKind::Table => "table",
            NodeKind::TableRow => "table_row",
            NodeKind::TableHeader => "table_header",
            NodeKind::TableCell => "table_cell",
            NodeKind::Image => "image",
            NodeKind::HardBreak => "hard_break",
            NodeKind::Text => "text",
        }
    }

    /// Look up a kind by snapshot name. Tiptap's camelCase names are accepted too.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "doc" => NodeKind::Doc,
            "paragraph" => NodeKind::Paragraph,
            "heading" => NodeKind::Heading,
            "blockquote" => NodeKind::Blockquote,
            "code_block" | "codeBlock" => NodeKind::CodeBlock,
            "horizontal_rule" | "horizontalRule" => NodeKind::HorizontalRule,
            "bullet_list" | "bulletList" => NodeKind::BulletList,
            "ordered_list" | "orderedList" => NodeKind::OrderedList,
            "list_item" | "listItem" => NodeKind::ListItem,
            "table" => NodeKind::Table,
            "table_row" | "tableRow" => NodeKind::TableRow,
            "table_header" | "tableHeader" => NodeKind::TableHeader,
            "table_cell" | "tableCell" => NodeKind::TableCell,
            "image" => NodeKind::Image,
            "hard_break" | "hardBreak" => NodeKind::HardBreak,
            "text" => NodeKind::Text,
            _ => return None,
        };
        Some(kind)
    }

    pub fn spec(self) -> NodeSpec {
        use ContentRule::*;
        let (group, content, attrs) = match self {
            NodeKind::Doc => (Group::Root, Blocks, &[][..]),
            NodeKind::Paragraph => (Group::Block, Inline, &[][..]),
            NodeKind::Heading => (Group::Block, Inline, HEADING_ATTRS),
            NodeKind::Blockquote => (Group::Block, Blocks, BLOCKQUOTE_ATTRS),
            NodeKind::CodeBlock => (Group::Block, PlainText, CODE_BLOCK_ATTRS),
            NodeKind::HorizontalRule => (Group::Block, Empty, &[][..]),
            NodeKind::BulletList => (
                Group::Block,
                Items(&[NodeKind::ListItem]),
                BULLET_LIST_ATTRS,
            ),
            NodeKind::OrderedList => (
                Group::Block,
                Items(&[NodeKind::ListItem]),
                ORDERED_LIST_ATTRS,
            ),
            NodeKind::ListItem => (Group::Structural, ParagraphFirst, &[][..]),
            NodeKind::Table => (Group::Block, Items(&[NodeKind::TableRow]), &[][..]),
            NodeKind::TableRow => (
                Group::Structural,
                Items(&[NodeKind::TableHeader, NodeKind::TableCell]),
                &[][..],
            ),
            NodeKind::TableHeader | NodeKind::TableCell => (Group::Structural, Blocks, &[][..]),
            NodeKind::Image => (Group::Inline, Empty, IMAGE_ATTRS),
            NodeKind::HardBreak => (Group::Inline, Empty, &[][..]),
            NodeKind::Text => (Group::Inline, Empty, &[][..]),
        };
        NodeSpec {
            group,
            content,
            attrs,
            marks: self != NodeKind::CodeBlock,
        }
    }

    pub fn is_block(self) -> bool {
        self.spec().group == Group::Block
    }

    pub fn is_inline(self) -> bool {
        self.spec().group == Group::Inline
    }

    /// Block whose content is inline (or plain text)
    pub fn is_textblock(self) -> bool {
        matches!(
            self.spec().content,
            ContentRule::Inline | ContentRule::PlainText
        )
    }

    pub fn is_leaf(self) -> bool {
        self.spec().content == ContentRule::Empty
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl MarkKind {
    pub const ALL: [MarkKind; 5] = [
        MarkKind::Emphasis,
        MarkKind::Strong,
        MarkKind::Strike,
        MarkKind::Link,
        MarkKind::Code,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            MarkKind::Emphasis => "emphasis",
            MarkKind::Strong => "strong",
            MarkKind::Strike => "strike",
            MarkKind::Link => "link",
            MarkKind::Code => "code",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "emphasis" | "em" | "italic" => MarkKind::Emphasis,
            "strong" | "bold" => MarkKind::Strong,
            "strike" | "strikethrough" => MarkKind::Strike,
            "link" => MarkKind::Link,
            "code" => MarkKind::Code,
            _ => return None,
        };
        Some(kind)
    }

    pub fn spec(self) -> MarkSpec {
        let attrs = match self {
            MarkKind::Link => LINK_ATTRS,
            _ => &[][..],
        };
        MarkSpec { attrs }
    }
}

impl fmt::Display for MarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::from_name(kind.name()), Some(kind));
        }
        for kind in MarkKind::ALL {
            assert_eq!(MarkKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_tiptap_aliases() {
        assert_eq!(NodeKind::from_name("bulletList"), Some(NodeKind::BulletList));
        assert_eq!(NodeKind::from_name("hardBreak"), Some(NodeKind::HardBreak));
        assert_eq!(MarkKind::from_name("bold"), Some(MarkKind::Strong));
        assert_eq!(MarkKind::from_name("italic"), Some(MarkKind::Emphasis));
        assert_eq!(NodeKind::from_name("mention"), None);
    }

    #[test]
    fn test_index_matches_all() {
        for (i, kind) in NodeKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        for (i, kind) in MarkKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_groups() {
        assert!(NodeKind::Paragraph.is_textblock());
        assert!(NodeKind::CodeBlock.is_textblock());
        assert!(!NodeKind::CodeBlock.spec().marks);
        assert!(NodeKind::HardBreak.is_inline());
        assert!(NodeKind::HardBreak.is_leaf());
        assert!(!NodeKind::ListItem.is_block());
        assert!(NodeKind::Blockquote.is_block());
    }

    #[test]
    fn test_code_is_innermost_rank() {
        assert!(MarkKind::Link < MarkKind::Code);
        assert!(MarkKind::Emphasis < MarkKind::Strong);
    }
}
