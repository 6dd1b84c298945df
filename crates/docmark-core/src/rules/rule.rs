//! Rule types for rendering nodes and marks.

use std::borrow::Cow;

use crate::model::{Mark, Node};
use crate::serialize::SerializerState;

/// Renders a node: `(state, node, parent, index in parent)`
pub type RenderFn = Box<dyn Fn(&mut SerializerState<'_>, &Node, &Node, usize) + Send + Sync>;

/// Computes a mark delimiter: `(state, mark, parent, index in parent)`
pub type DelimiterFn =
    Box<dyn Fn(&mut SerializerState<'_>, &Mark, &Node, usize) -> String + Send + Sync>;

/// How a node kind is written
pub enum NodeRule {
    /// Declarative wrapper: write `open`, the content, then `close`.
    ///
    /// Textblock content is rendered inline (escaped unless `escape` is
    /// false); other content is rendered block by block. A `block` rule
    /// closes the block afterwards so the next sibling starts after a
    /// blank line.
    Wrap {
        open: Cow<'static, str>,
        close: Cow<'static, str>,
        block: bool,
        escape: bool,
    },
    /// Full custom renderer
    Render(RenderFn),
}

impl NodeRule {
    /// A block that only renders its content
    pub fn block() -> Self {
        NodeRule::wrap("", "", true, true)
    }

    /// A container that renders its content without closing a block
    pub fn transparent() -> Self {
        NodeRule::wrap("", "", false, true)
    }

    /// A wrapper with fixed open/close strings
    pub fn wrap(
        open: impl Into<Cow<'static, str>>,
        close: impl Into<Cow<'static, str>>,
        block: bool,
        escape: bool,
    ) -> Self {
        NodeRule::Wrap {
            open: open.into(),
            close: close.into(),
            block,
            escape,
        }
    }

    /// A custom renderer
    pub fn render<F>(f: F) -> Self
    where
        F: Fn(&mut SerializerState<'_>, &Node, &Node, usize) + Send + Sync + 'static,
    {
        NodeRule::Render(Box::new(f))
    }
}

/// An opening or closing mark delimiter
pub enum Delimiter {
    Fixed(Cow<'static, str>),
    Computed(DelimiterFn),
}

impl Delimiter {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&mut SerializerState<'_>, &Mark, &Node, usize) -> String + Send + Sync + 'static,
    {
        Delimiter::Computed(Box::new(f))
    }
}

impl From<&'static str> for Delimiter {
    fn from(s: &'static str) -> Self {
        Delimiter::Fixed(Cow::Borrowed(s))
    }
}

impl From<String> for Delimiter {
    fn from(s: String) -> Self {
        Delimiter::Fixed(Cow::Owned(s))
    }
}

/// How a mark kind is written
pub struct MarkRule {
    pub open: Delimiter,
    pub close: Delimiter,
    /// May be reordered against other mixable marks so spans that share a
    /// mark instance stay open across text node boundaries
    pub mixable: bool,
    /// Whitespace at the edges of a marked run is written outside the
    /// delimiters
    pub expel_enclosing_whitespace: bool,
    /// Whether text inside the mark is escaped
    pub escape: bool,
}

impl MarkRule {
    pub fn new(open: impl Into<Delimiter>, close: impl Into<Delimiter>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
            mixable: false,
            expel_enclosing_whitespace: false,
            escape: true,
        }
    }

    pub fn mixable(mut self) -> Self {
        self.mixable = true;
        self
    }

    pub fn expel_enclosing_whitespace(mut self) -> Self {
        self.expel_enclosing_whitespace = true;
        self
    }

    pub fn unescaped(mut self) -> Self {
        self.escape = false;
        self
    }
}
