//! Convert a semantic tree to a document
//!
//! Block elements become block nodes and inline elements become runs of
//! marked text. Whitespace is collapsed the way a browser would render it.
//! When the Markdown source is attached to the tree, it is consulted for
//! details the HTML does not carry.

use std::collections::VecDeque;

use docmark_core::utilities::collapse_whitespace;
use docmark_core::{add_mark, intern_sibling_marks, Attrs, Mark, MarkRef, Node, NodeKind};
use pulldown_cmark::{Event, Parser, Tag};
use serde_json::Value;

use crate::html::cmark_options;
use crate::semantic::{SemanticKind, SemanticNode};
use crate::service::ParserOptions;
use crate::{DocmarkError, Result};

/// Map a semantic tree onto a `doc` node
pub fn semantic_tree_to_document(tree: &SemanticNode, options: &ParserOptions) -> Result<Node> {
    if !tree.is_container() {
        return Err(DocmarkError::ConversionFailure(format!(
            "expected a container at the root, found `{}`",
            tree.name
        )));
    }

    let hints = match source_of(tree) {
        Some(source) if options.source_hints => SourceHints::scan(source, options),
        _ => SourceHints::default(),
    };

    let mut mapper = Mapper { hints };
    let content = mapper.blocks(tree)?;
    log::trace!("mapped {} top-level blocks", content.len());
    Ok(Node::doc(content)?)
}

/// The source annotation attached to the root, if any
fn source_of(tree: &SemanticNode) -> Option<&str> {
    tree.children
        .iter()
        .rev()
        .find(|c| c.is_comment())
        .and_then(|c| c.value.as_deref())
}

/// Details recovered from the Markdown source, in document order
#[derive(Debug, Default)]
struct SourceHints {
    /// Whether each ordered list uses `)` rather than `.`
    parens: VecDeque<bool>,
}

impl SourceHints {
    fn scan(source: &str, options: &ParserOptions) -> Self {
        let parens = Parser::new_ext(source, cmark_options(options))
            .into_offset_iter()
            .filter_map(|(event, range)| match event {
                Event::Start(Tag::List(Some(_))) => {
                    Some(source.get(range.start..).is_some_and(uses_parens))
                }
                _ => None,
            })
            .collect();
        Self { parens }
    }

    fn next_parens(&mut self) -> bool {
        self.parens.pop_front().unwrap_or(false)
    }
}

fn uses_parens(list_source: &str) -> bool {
    let marker = list_source.trim_start_matches(|c: char| c.is_whitespace() || c == '>');
    marker
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .starts_with(')')
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "blockquote"
            | "pre"
            | "hr"
            | "ul"
            | "ol"
            | "li"
            | "table"
            | "thead"
            | "tbody"
            | "tfoot"
            | "tr"
            | "th"
            | "td"
            | "div"
            | "section"
            | "article"
            | "main"
            | "aside"
            | "header"
            | "footer"
            | "nav"
            | "figure"
            | "figcaption"
            | "address"
            | "dl"
            | "dt"
            | "dd"
            | "html"
            | "body"
    ) || is_skipped(tag)
}

fn is_skipped(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "noscript" | "template")
}

struct Mapper {
    hints: SourceHints,
}

impl Mapper {
    /// Map the children of `parent` to blocks. Loose inline content is
    /// wrapped in paragraphs.
    fn blocks(&mut self, parent: &SemanticNode) -> Result<Vec<Node>> {
        let mut blocks = Vec::new();
        let mut run = InlineRun::default();

        for child in parent.children() {
            match child.kind {
                SemanticKind::Text => {
                    run.push_text(child.value.as_deref().unwrap_or_default(), &[]);
                }
                SemanticKind::Comment => {}
                SemanticKind::Fragment => {
                    flush(&mut run, &mut blocks)?;
                    blocks.extend(self.blocks(child)?);
                }
                SemanticKind::Element if is_block(child.tag_name()) => {
                    flush(&mut run, &mut blocks)?;
                    self.block(child, &mut blocks)?;
                }
                SemanticKind::Element => inline(child, &[], &mut run)?,
            }
        }

        flush(&mut run, &mut blocks)?;
        Ok(blocks)
    }

    fn block(&mut self, el: &SemanticNode, out: &mut Vec<Node>) -> Result<()> {
        match el.tag_name() {
            "p" => {
                let content = inline_content(el)?;
                if !content.is_empty() {
                    out.push(Node::paragraph(content)?);
                }
            }
            tag @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
                let level = tag[1..].parse::<u8>().unwrap_or(1);
                let content = inline_content(el)?;
                if !content.is_empty() {
                    out.push(Node::heading(level, content)?);
                }
            }
            "blockquote" => {
                let content = self.blocks(el)?;
                out.push(Node::new(NodeKind::Blockquote, Attrs::new(), content)?);
            }
            "pre" => out.push(code_block(el)?),
            "hr" => out.push(Node::new(NodeKind::HorizontalRule, Attrs::new(), vec![])?),
            "ul" => out.push(self.list(el, NodeKind::BulletList)?),
            "ol" => out.push(self.list(el, NodeKind::OrderedList)?),
            "table" => {
                let mut rows = Vec::new();
                self.table_rows(el, &mut rows)?;
                if !rows.is_empty() {
                    out.push(Node::new(NodeKind::Table, Attrs::new(), rows)?);
                }
            }
            tag if is_skipped(tag) => log::trace!("skipping <{tag}>"),
            // Containers, and table or list parts outside their parent
            _ => out.extend(self.blocks(el)?),
        }
        Ok(())
    }

    fn list(&mut self, el: &SemanticNode, kind: NodeKind) -> Result<Node> {
        let mut attrs = Attrs::new();
        if kind == NodeKind::OrderedList {
            // Taken before the items so nested lists get the hints after it
            let parens = self.hints.next_parens();
            let start = el
                .attr("start")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(1);
            attrs.insert("start".to_string(), Value::from(start));
            attrs.insert("parens".to_string(), Value::Bool(parens));
        }

        let items: Vec<&SemanticNode> = el
            .element_children()
            .filter(|c| c.tag_name() == "li")
            .collect();
        // Loose items wrap their text in <p>
        let tight = !items
            .iter()
            .any(|li| li.element_children().any(|c| c.tag_name() == "p"));
        attrs.insert("tight".to_string(), Value::Bool(tight));

        let mut content = Vec::with_capacity(items.len());
        for li in items {
            let mut blocks = self.blocks(li)?;
            if blocks.first().map_or(true, |b| b.kind() != NodeKind::Paragraph) {
                blocks.insert(0, Node::paragraph(vec![])?);
            }
            content.push(Node::new(NodeKind::ListItem, Attrs::new(), blocks)?);
        }

        Ok(Node::new(kind, attrs, content)?)
    }

    fn table_rows(&mut self, el: &SemanticNode, rows: &mut Vec<Node>) -> Result<()> {
        for child in el.element_children() {
            match child.tag_name() {
                "thead" | "tbody" | "tfoot" => self.table_rows(child, rows)?,
                "tr" => {
                    let mut cells = Vec::new();
                    for cell in child.element_children() {
                        let kind = match cell.tag_name() {
                            "th" => NodeKind::TableHeader,
                            "td" => NodeKind::TableCell,
                            _ => continue,
                        };
                        let mut blocks = self.blocks(cell)?;
                        if blocks.is_empty() {
                            blocks.push(Node::paragraph(vec![])?);
                        }
                        cells.push(Node::new(kind, Attrs::new(), blocks)?);
                    }
                    if !cells.is_empty() {
                        rows.push(Node::new(NodeKind::TableRow, Attrs::new(), cells)?);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Wrap pending inline content in a paragraph
fn flush(run: &mut InlineRun, blocks: &mut Vec<Node>) -> Result<()> {
    let content = std::mem::take(run).finish();
    if !content.is_empty() {
        blocks.push(Node::paragraph(content)?);
    }
    Ok(())
}

fn code_block(pre: &SemanticNode) -> Result<Node> {
    let code = pre.element_children().find(|c| c.tag_name() == "code");
    let language = code
        .and_then(|c| c.attr("class"))
        .and_then(|class| {
            class
                .split_whitespace()
                .find_map(|s| s.strip_prefix("language-"))
        })
        .map(str::to_string);

    let mut text = code.unwrap_or(pre).text_content();
    if text.ends_with('\n') {
        text.pop();
    }

    let mut attrs = Attrs::new();
    attrs.insert(
        "language".to_string(),
        language.map(Value::from).unwrap_or(Value::Null),
    );
    let content = if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(&text, Vec::new())]
    };
    Ok(Node::new(NodeKind::CodeBlock, attrs, content)?)
}

fn inline_content(el: &SemanticNode) -> Result<Vec<Node>> {
    let mut run = InlineRun::default();
    for child in el.children() {
        inline_child(child, &[], &mut run)?;
    }
    Ok(run.finish())
}

fn inline_child(node: &SemanticNode, marks: &[MarkRef], run: &mut InlineRun) -> Result<()> {
    match node.kind {
        SemanticKind::Text => run.push_text(node.value.as_deref().unwrap_or_default(), marks),
        SemanticKind::Comment => {}
        SemanticKind::Fragment => {
            for child in node.children() {
                inline_child(child, marks, run)?;
            }
        }
        SemanticKind::Element => inline(node, marks, run)?,
    }
    Ok(())
}

fn inline(el: &SemanticNode, marks: &[MarkRef], run: &mut InlineRun) -> Result<()> {
    let mark = match el.tag_name() {
        "strong" | "b" => Some(Mark::strong()),
        "em" | "i" => Some(Mark::emphasis()),
        "del" | "s" | "strike" => Some(Mark::strike()),
        "code" => Some(Mark::code()),
        "a" => el.attr("href").map(|href| Mark::link(href, el.attr("title"))),
        "br" => {
            run.push_node(Node::hard_break().with_marks(marks.to_vec()));
            return Ok(());
        }
        "img" => {
            if let Some(image) = image(el, marks)? {
                run.push_node(image);
            }
            return Ok(());
        }
        tag if is_skipped(tag) => {
            log::trace!("skipping <{tag}>");
            return Ok(());
        }
        _ => None,
    };

    let marks = match mark {
        Some(mark) => add_mark(marks, mark.into_ref()),
        None => marks.to_vec(),
    };
    for child in el.children() {
        inline_child(child, &marks, run)?;
    }
    Ok(())
}

fn image(el: &SemanticNode, marks: &[MarkRef]) -> Result<Option<Node>> {
    let Some(src) = el.attr("src").filter(|s| !s.is_empty()) else {
        log::warn!("dropping image without src");
        return Ok(None);
    };
    let mut attrs = Attrs::new();
    attrs.insert("src".to_string(), Value::from(src));
    for name in ["alt", "title"] {
        if let Some(value) = el.attr(name).filter(|v| !v.is_empty()) {
            attrs.insert(name.to_string(), Value::from(value));
        }
    }
    let image = Node::new(NodeKind::Image, attrs, Vec::new())?;
    Ok(Some(image.with_marks(marks.to_vec())))
}

/// Inline nodes of one textblock under construction
#[derive(Default)]
struct InlineRun {
    nodes: Vec<Node>,
}

impl InlineRun {
    fn push_text(&mut self, text: &str, marks: &[MarkRef]) {
        let mut text = collapse_whitespace(text);
        if self.at_line_start() {
            text = text.trim_start().to_string();
        }
        if text.is_empty() {
            return;
        }

        if let Some(last) = self.nodes.last_mut() {
            if last.is_text() && same_marks(last.marks(), marks) {
                let joined = format!("{}{}", last.text_str().unwrap_or_default(), text);
                *last = last.with_text(&joined);
                return;
            }
        }
        self.nodes.push(Node::text(&text, marks.to_vec()));
    }

    fn push_node(&mut self, node: Node) {
        if node.kind() == NodeKind::HardBreak {
            self.trim_end();
        }
        self.nodes.push(node);
    }

    /// Start of the run, after a break, or after a space
    fn at_line_start(&self) -> bool {
        match self.nodes.last() {
            None => true,
            Some(node) if node.kind() == NodeKind::HardBreak => true,
            Some(node) => node.text_str().is_some_and(|t| t.ends_with(' ')),
        }
    }

    fn trim_end(&mut self) {
        let Some(last) = self.nodes.pop() else {
            return;
        };
        match last.text_str().map(str::trim_end) {
            Some("") => {}
            Some(trimmed) => {
                let trimmed = last.with_text(trimmed);
                self.nodes.push(trimmed);
            }
            None => self.nodes.push(last),
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.trim_end();
        intern_sibling_marks(&mut self.nodes);
        self.nodes
    }
}

/// Equal marks in the same order
fn same_marks(a: &[MarkRef], b: &[MarkRef]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}
