//! Markdown to document conversion.
//!
//! Two replaceable stages: a [`GrammarEngine`] turns Markdown into a
//! semantic tree, and a [`StructuralMapper`] turns that tree into a schema
//! valid document. Between the two the original source is attached to the
//! tree as a comment node, so the mapper can recover details the HTML
//! dropped.

use docmark_core::Node;

use crate::convert::semantic_tree_to_document;
use crate::html::{markdown_to_html, parse_html};
use crate::semantic::SemanticNode;
use crate::service::ParserOptions;
use crate::{DocmarkError, Result};

/// Markdown grammar stage. `Ok(None)` means the input has no renderable
/// content, which is not an error.
pub trait GrammarEngine: Send + Sync {
    fn to_semantic_tree(&self, markdown: &str) -> Result<Option<SemanticNode>>;
}

/// Schema-aware mapping stage
pub trait StructuralMapper: Send + Sync {
    fn to_document(&self, tree: &SemanticNode) -> Result<Node>;
}

/// CommonMark grammar (plus the enabled extensions) via pulldown-cmark
#[derive(Debug, Clone, Default)]
pub struct CommonMarkEngine {
    options: ParserOptions,
}

impl CommonMarkEngine {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }
}

impl GrammarEngine for CommonMarkEngine {
    fn to_semantic_tree(&self, markdown: &str) -> Result<Option<SemanticNode>> {
        let html = markdown_to_html(markdown, &self.options);
        if html.trim().is_empty() {
            return Ok(None);
        }
        let tree = parse_html(&html);
        Ok(tree.has_content().then_some(tree))
    }
}

/// Maps HTML semantics onto the document schema
#[derive(Debug, Clone, Default)]
pub struct SchemaMapper {
    options: ParserOptions,
}

impl SchemaMapper {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }
}

impl StructuralMapper for SchemaMapper {
    fn to_document(&self, tree: &SemanticNode) -> Result<Node> {
        semantic_tree_to_document(tree, &self.options)
    }
}

/// Wrap `tree` in a fragment together with a comment holding `source`
pub fn attach_source(tree: SemanticNode, source: &str) -> SemanticNode {
    let mut container = SemanticNode::fragment();
    container.add_child(tree);
    container.add_child(SemanticNode::comment(source));
    container
}

/// Runs the grammar engine and the structural mapper
pub struct Deserializer {
    engine: Box<dyn GrammarEngine>,
    mapper: Box<dyn StructuralMapper>,
    options: ParserOptions,
}

impl Deserializer {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            engine: Box::new(CommonMarkEngine::new(options.clone())),
            mapper: Box::new(SchemaMapper::new(options.clone())),
            options,
        }
    }

    /// Replace the grammar engine
    pub fn with_engine(mut self, engine: impl GrammarEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    /// Replace the structural mapper
    pub fn with_mapper(mut self, mapper: impl StructuralMapper + 'static) -> Self {
        self.mapper = Box::new(mapper);
        self
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse Markdown into a `doc` node, or `None` when there is no content
    pub fn deserialize(&self, markdown: &str) -> Result<Option<Node>> {
        let Some(tree) = self.engine.to_semantic_tree(markdown)? else {
            return Ok(None);
        };
        let tree = if self.options.source_hints {
            attach_source(tree, markdown)
        } else {
            tree
        };

        let doc = self.mapper.to_document(&tree)?;
        if doc.kind() != docmark_core::NodeKind::Doc {
            return Err(DocmarkError::ConversionFailure(format!(
                "mapper produced `{}` instead of a document",
                doc.kind()
            )));
        }
        Ok(Some(doc))
    }
}

impl Default for Deserializer {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmark_core::NodeKind;

    struct Rejecting;

    impl GrammarEngine for Rejecting {
        fn to_semantic_tree(&self, _markdown: &str) -> Result<Option<SemanticNode>> {
            Err(DocmarkError::ConversionFailure("unparseable".to_string()))
        }
    }

    struct ParagraphMapper;

    impl StructuralMapper for ParagraphMapper {
        fn to_document(&self, _tree: &SemanticNode) -> Result<Node> {
            Ok(Node::paragraph(vec![])?)
        }
    }

    #[test]
    fn test_empty_input_is_none() {
        let deserializer = Deserializer::default();
        assert!(deserializer.deserialize("").unwrap().is_none());
        assert!(deserializer.deserialize("  \n\t\n").unwrap().is_none());
        assert!(deserializer.deserialize("<!-- only a comment -->").unwrap().is_none());
    }

    #[test]
    fn test_deserialize_document() {
        let doc = Deserializer::default()
            .deserialize("# Title\n\nbody")
            .unwrap()
            .unwrap();
        assert_eq!(doc.kind(), NodeKind::Doc);
        assert_eq!(doc.child(0).unwrap().kind(), NodeKind::Heading);
        assert_eq!(doc.child(1).unwrap().kind(), NodeKind::Paragraph);
    }

    #[test]
    fn test_engine_failure_propagates() {
        let err = Deserializer::default()
            .with_engine(Rejecting)
            .deserialize("x")
            .unwrap_err();
        assert!(matches!(err, DocmarkError::ConversionFailure(_)));
    }

    #[test]
    fn test_mapper_must_produce_doc() {
        let err = Deserializer::default()
            .with_mapper(ParagraphMapper)
            .deserialize("x")
            .unwrap_err();
        assert!(matches!(err, DocmarkError::ConversionFailure(_)));
    }

    #[test]
    fn test_attach_source() {
        let tree = attach_source(SemanticNode::fragment(), "1) a");
        assert_eq!(tree.children.len(), 2);
        assert!(tree.children[1].is_comment());
        assert_eq!(tree.children[1].value.as_deref(), Some("1) a"));
    }
}
