//! MarkdownService - the entry point for both conversion directions.

use docmark_core::{Node, NodeKind, Rules, Serializer, SerializerOptions};
use serde::Deserialize;
use serde_json::Value;

use crate::deserialize::{Deserializer, GrammarEngine, StructuralMapper};
use crate::{DocmarkError, Result};

/// Options for Markdown parsing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Parse GFM pipe tables
    pub tables: bool,

    /// Parse `~~strike~~`
    pub strikethrough: bool,

    /// Attach the Markdown source to the semantic tree so the mapper can
    /// recover details such as the ordered list delimiter
    pub source_hints: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            source_hints: true,
        }
    }
}

/// Converts documents to Markdown and Markdown to documents.
///
/// Holds no state between calls: the same input always yields the same
/// output. Content replaced programmatically is not re-serialized on its
/// own; call [`MarkdownService::to_markdown`] again afterwards.
pub struct MarkdownService {
    serializer: Serializer,
    deserializer: Deserializer,
}

impl MarkdownService {
    /// Create a new MarkdownService with default options
    pub fn new() -> Self {
        Self::with_options(SerializerOptions::default(), ParserOptions::default())
    }

    /// Create a MarkdownService with custom options
    pub fn with_options(serializer_options: SerializerOptions, parser_options: ParserOptions) -> Self {
        Self {
            serializer: Serializer::new(serializer_options),
            deserializer: Deserializer::new(parser_options),
        }
    }

    /// Create a MarkdownService with a custom rule collection.
    ///
    /// Fails when the rules do not cover every node and mark kind.
    pub fn with_rules(rules: Rules, options: SerializerOptions) -> Result<Self> {
        Ok(Self {
            serializer: Serializer::with_rules(rules, options)?,
            deserializer: Deserializer::default(),
        })
    }

    /// Replace the Markdown grammar engine
    pub fn with_engine(mut self, engine: impl GrammarEngine + 'static) -> Self {
        self.deserializer = self.deserializer.with_engine(engine);
        self
    }

    /// Replace the semantic tree to document mapper
    pub fn with_mapper(mut self, mapper: impl StructuralMapper + 'static) -> Self {
        self.deserializer = self.deserializer.with_mapper(mapper);
        self
    }

    /// Convert a document to Markdown
    pub fn to_markdown(&self, doc: &Node) -> String {
        log::debug!("serializing document with {} blocks", doc.child_count());
        self.serializer.serialize(doc)
    }

    /// Convert a JSON document snapshot to Markdown
    pub fn to_markdown_json(&self, snapshot: &Value) -> Result<String> {
        let doc = Node::from_json(snapshot)?;
        if doc.kind() != NodeKind::Doc {
            return Err(DocmarkError::InvalidInput(format!(
                "expected a `doc` node, found `{}`",
                doc.kind()
            )));
        }
        Ok(self.to_markdown(&doc))
    }

    /// Convert Markdown to a document.
    ///
    /// Returns `None` when the input has no renderable content. Callers
    /// should then leave their current document untouched.
    pub fn from_markdown(&self, markdown: &str) -> Result<Option<Node>> {
        log::debug!("deserializing {} bytes of markdown", markdown.len());
        let doc = self.deserializer.deserialize(markdown)?;
        if doc.is_none() {
            log::debug!("markdown has no content");
        }
        Ok(doc)
    }

    /// Convert Markdown to a JSON document snapshot
    pub fn from_markdown_json(&self, markdown: &str) -> Result<Option<Value>> {
        Ok(self.from_markdown(markdown)?.map(|doc| doc.to_json()))
    }

    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    pub fn parser_options(&self) -> &ParserOptions {
        self.deserializer.options()
    }
}

impl Default for MarkdownService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmark_core::{MarkKind, MarkRule};
    use serde_json::json;

    #[test]
    fn test_to_markdown_json() {
        let service = MarkdownService::new();
        let snapshot = json!({
            "type": "doc",
            "content": [
                { "type": "heading", "attrs": { "level": 2 }, "content": [{ "type": "text", "text": "Hi" }] },
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "a ", "marks": [{ "type": "bold" }] },
                    { "type": "text", "text": "b", "marks": [{ "type": "bold" }, { "type": "italic" }] }
                ] }
            ]
        });
        assert_eq!(
            service.to_markdown_json(&snapshot).unwrap(),
            "## Hi\n\n**a _b_**"
        );
    }

    #[test]
    fn test_to_markdown_json_requires_doc() {
        let service = MarkdownService::new();
        let err = service
            .to_markdown_json(&json!({ "type": "paragraph" }))
            .unwrap_err();
        assert!(matches!(err, DocmarkError::InvalidInput(_)));
    }

    #[test]
    fn test_to_markdown_json_rejects_bad_snapshot() {
        let service = MarkdownService::new();
        let err = service
            .to_markdown_json(&json!({ "type": "doc", "content": [{ "type": "text", "text": "x" }] }))
            .unwrap_err();
        assert!(matches!(err, DocmarkError::Model(_)));
    }

    #[test]
    fn test_from_markdown_json() {
        let service = MarkdownService::new();
        let value = service.from_markdown_json("Hello").unwrap().unwrap();
        assert_eq!(
            value,
            json!({
                "type": "doc",
                "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "Hello" }] }]
            })
        );
        assert_eq!(service.from_markdown_json("").unwrap(), None);
    }

    #[test]
    fn test_with_rules() {
        let mut rules = Rules::commonmark(&SerializerOptions::default());
        rules.add_mark(MarkKind::Emphasis, MarkRule::new("*", "*"));
        let service = MarkdownService::with_rules(rules, SerializerOptions::default()).unwrap();
        let doc = service.from_markdown("_x_").unwrap().unwrap();
        assert_eq!(service.to_markdown(&doc), "*x*");
    }

    #[test]
    fn test_parser_options_from_json() {
        let options: ParserOptions = serde_json::from_str(r#"{ "tables": false }"#).unwrap();
        assert!(!options.tables);
        assert!(options.strikethrough);
        assert!(options.source_hints);
    }
}
