//! Markdown grammar and HTML parsing.
//!
//! Markdown is rendered to HTML with pulldown-cmark, and the HTML is parsed
//! back into a [`SemanticNode`] tree with scraper.

use pulldown_cmark::{html, Options, Parser};
use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::semantic::SemanticNode;
use crate::service::ParserOptions;

/// Grammar extensions enabled by the parser options
pub(crate) fn cmark_options(options: &ParserOptions) -> Options {
    let mut cmark = Options::empty();
    if options.tables {
        cmark.insert(Options::ENABLE_TABLES);
    }
    if options.strikethrough {
        cmark.insert(Options::ENABLE_STRIKETHROUGH);
    }
    cmark
}

/// Render Markdown to HTML
pub fn markdown_to_html(markdown: &str, options: &ParserOptions) -> String {
    let parser = Parser::new_ext(markdown, cmark_options(options));
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Parse an HTML string into a fragment holding the top-level nodes.
///
/// # Example
///
/// ```rust
/// use docmark::parse_html;
///
/// let tree = parse_html("<h1>Hello <em>World</em></h1>");
/// assert_eq!(tree.element_children().next().unwrap().tag_name(), "h1");
/// ```
pub fn parse_html(html: &str) -> SemanticNode {
    let document = Html::parse_fragment(html);
    if !document.errors.is_empty() {
        log::debug!("html parser reported {} errors", document.errors.len());
    }

    let mut fragment = SemanticNode::fragment();
    push_children(&mut fragment, document.root_element());
    fragment
}

/// Convert a scraper ElementRef to our SemanticNode structure
fn scraper_to_node(element: ElementRef) -> SemanticNode {
    let attrs: Vec<(&str, &str)> = element.value().attrs().collect();
    let mut node = SemanticNode::element_with_attrs(element.value().name(), attrs);
    push_children(&mut node, element);
    node
}

fn push_children(node: &mut SemanticNode, element: ElementRef) {
    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => {
                node.add_child(SemanticNode::text(&text.text));
            }
            ScraperNode::Comment(comment) => {
                node.add_child(SemanticNode::comment(&comment.comment));
            }
            ScraperNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    node.add_child(scraper_to_node(child_element));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_to_html() {
        let html = markdown_to_html("# Title\n\nSome *text*", &ParserOptions::default());
        assert_eq!(html, "<h1>Title</h1>\n<p>Some <em>text</em></p>\n");
    }

    #[test]
    fn test_extensions_follow_options() {
        let with = markdown_to_html("~~gone~~", &ParserOptions::default());
        assert!(with.contains("<del>gone</del>"));

        let options = ParserOptions {
            strikethrough: false,
            ..Default::default()
        };
        let without = markdown_to_html("~~gone~~", &options);
        assert!(!without.contains("<del>"));
    }

    #[test]
    fn test_parse_simple_html() {
        let tree = parse_html("<p>Hello World</p>");
        assert!(tree.is_container());
        let p = tree.element_children().next().unwrap();
        assert_eq!(p.tag_name(), "p");
        assert_eq!(p.text_content(), "Hello World");
    }

    #[test]
    fn test_parse_keeps_attributes_and_comments() {
        let tree = parse_html("<!-- note --><a href=\"/x\" title=\"T\">x</a>");
        assert!(tree.children().any(SemanticNode::is_comment));
        let a = tree.element_children().next().unwrap();
        assert_eq!(a.attr("href"), Some("/x"));
        assert_eq!(a.attr("title"), Some("T"));
    }
}
