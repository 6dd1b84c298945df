//! docmark-core - Document schema and Markdown serialization
//!
//! This crate holds the document tree (nodes, marks and the schema they are
//! validated against) and the serializer that writes a tree as Markdown. It
//! is used by `docmark`, which adds the Markdown to document direction.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────┐     ┌───────────┐
//! JSON snapshot ─▶│ Document │ ──▶ │ RuleTable │ ──▶ Markdown String
//!                 └──────────┘     └───────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use docmark_core::{serialize, Mark, Node, SerializerOptions};
//!
//! let doc = Node::doc(vec![
//!     Node::heading(1, vec![Node::text("Hello World", vec![])]).unwrap(),
//!     Node::paragraph(vec![
//!         Node::text("This is ", vec![]),
//!         Node::text("bold", vec![Mark::strong().into_ref()]),
//!         Node::text(" text.", vec![]),
//!     ])
//!     .unwrap(),
//! ])
//! .unwrap();
//!
//! let markdown = serialize(&doc, &SerializerOptions::default());
//! assert_eq!(markdown, "# Hello World\n\nThis is **bold** text.");
//! ```

mod model;
mod options;
pub mod rules;
pub mod schema;
mod serialize;
pub mod utilities;

pub use model::{add_mark, contains_mark, intern_sibling_marks, Attrs, Mark, MarkRef, Node};
pub use options::SerializerOptions;
pub use rules::{Delimiter, MarkRule, NodeRule, RuleTable, Rules};
pub use schema::{MarkKind, NodeKind, SCHEMA_VERSION};
pub use serialize::{Serializer, SerializerState};

/// Error type for document model and rule table operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Schema violation: `{child}` is not allowed in `{parent}`")]
    SchemaViolation { parent: NodeKind, child: NodeKind },

    #[error("Invalid attribute `{name}` on `{owner}`")]
    InvalidAttribute { owner: String, name: String },

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("No rule for node kind `{0}`")]
    UnsupportedNodeKind(NodeKind),

    #[error("No rule for mark kind `{0}`")]
    UnsupportedMarkKind(MarkKind),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Serialize a document with the built-in rules
pub fn serialize(doc: &Node, options: &SerializerOptions) -> String {
    Serializer::new(options.clone()).serialize(doc)
}
