//! # docmark
//!
//! Convert rich-text document trees to Markdown and back.
//!
//! A document is a tree of typed nodes with marks on its text (the shape a
//! ProseMirror or Tiptap editor exchanges as JSON). Serialization walks the
//! tree with a rule per node and mark kind. Parsing renders the Markdown to
//! HTML, parses that into a semantic tree and maps the tree back onto the
//! document schema.
//!
//! ## Example
//!
//! ```rust
//! use docmark::{from_markdown, to_markdown};
//!
//! let doc = from_markdown("# Hello\n\nSome _emphasis_ here.").unwrap().unwrap();
//! assert_eq!(to_markdown(&doc), "# Hello\n\nSome _emphasis_ here.");
//!
//! // Empty input means "no content", not an empty document
//! assert!(from_markdown("   ").unwrap().is_none());
//! ```
//!
//! ## Example (JSON snapshot)
//!
//! ```rust
//! use docmark::MarkdownService;
//! use serde_json::json;
//!
//! let service = MarkdownService::new();
//! let markdown = service
//!     .to_markdown_json(&json!({
//!         "type": "doc",
//!         "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "Hi" }] }]
//!     }))
//!     .unwrap();
//! assert_eq!(markdown, "Hi");
//! ```

mod convert;
pub mod deserialize;
mod html;
pub mod semantic;
mod service;

use once_cell::sync::Lazy;

pub use convert::semantic_tree_to_document;
pub use deserialize::{
    attach_source, CommonMarkEngine, Deserializer, GrammarEngine, SchemaMapper, StructuralMapper,
};
pub use docmark_core::{
    Attrs, Mark, MarkKind, MarkRef, MarkRule, Node, NodeKind, NodeRule, Rules, Serializer,
    SerializerOptions, SerializerState,
};
pub use html::{markdown_to_html, parse_html};
pub use semantic::{SemanticKind, SemanticNode};
pub use service::{MarkdownService, ParserOptions};

/// Error type for docmark operations
#[derive(Debug, thiserror::Error)]
pub enum DocmarkError {
    #[error(transparent)]
    Model(#[from] docmark_core::Error),

    #[error("Conversion error: {0}")]
    ConversionFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, DocmarkError>;

static DEFAULT_SERVICE: Lazy<MarkdownService> = Lazy::new(MarkdownService::new);

/// Convert a document to Markdown with the default options
pub fn to_markdown(doc: &Node) -> String {
    DEFAULT_SERVICE.to_markdown(doc)
}

/// Convert Markdown to a document with the default options.
///
/// Returns `None` for input without renderable content.
pub fn from_markdown(markdown: &str) -> Result<Option<Node>> {
    DEFAULT_SERVICE.from_markdown(markdown)
}
