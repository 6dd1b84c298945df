//! Built-in rules for every node and mark kind.

use super::{Delimiter, MarkRule, NodeRule};
use crate::model::{Mark, Node};
use crate::options::SerializerOptions;
use crate::schema::{MarkKind, NodeKind};
use crate::serialize::SerializerState;
use crate::utilities::{
    code_fence_for, escape_href, has_uri_scheme, longest_backtick_run, ordered_label_width,
    ordered_marker, quote, repeat,
};

/// Rules for all node kinds
pub fn commonmark_node_rules(options: &SerializerOptions) -> Vec<(NodeKind, NodeRule)> {
    vec![
        (NodeKind::Doc, NodeRule::transparent()),
        (NodeKind::Paragraph, NodeRule::block()),
        (NodeKind::Heading, NodeRule::render(heading)),
        (NodeKind::Blockquote, NodeRule::render(blockquote)),
        (NodeKind::CodeBlock, NodeRule::render(code_block)),
        (NodeKind::HorizontalRule, horizontal_rule(options.hr.clone())),
        (NodeKind::BulletList, bullet_list(options.bullet_list_marker)),
        (NodeKind::OrderedList, NodeRule::render(ordered_list)),
        (NodeKind::ListItem, NodeRule::transparent()),
        (NodeKind::Table, NodeRule::render(table)),
        (NodeKind::TableRow, NodeRule::block()),
        (NodeKind::TableHeader, NodeRule::transparent()),
        (NodeKind::TableCell, NodeRule::transparent()),
        (NodeKind::Image, NodeRule::render(image)),
        (NodeKind::HardBreak, NodeRule::render(hard_break)),
        (NodeKind::Text, NodeRule::render(text)),
    ]
}

/// Rules for all mark kinds
pub fn commonmark_mark_rules(options: &SerializerOptions) -> Vec<(MarkKind, MarkRule)> {
    let delimited = |d: &String| {
        let open = d.clone();
        let close = d.clone();
        MarkRule::new(
            Delimiter::computed(move |_, mark, parent, index| {
                flanking_delimiter(&open, mark, parent, index)
            }),
            Delimiter::computed(move |_, mark, parent, index| {
                flanking_delimiter(&close, mark, parent, index.saturating_sub(1))
            }),
        )
        .mixable()
        .expel_enclosing_whitespace()
    };
    vec![
        (MarkKind::Emphasis, delimited(&options.em_delimiter)),
        (MarkKind::Strong, delimited(&options.strong_delimiter)),
        (MarkKind::Strike, delimited(&options.strike_delimiter)),
        (
            MarkKind::Link,
            MarkRule::new(Delimiter::computed(link_open), Delimiter::computed(link_close))
                .mixable(),
        ),
        (
            MarkKind::Code,
            MarkRule::new(Delimiter::computed(code_open), Delimiter::computed(code_close))
                .unescaped(),
        ),
    ]
}

fn heading(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) {
    let level = node.attr_u64("level").unwrap_or(1) as usize;
    state.write(&format!("{} ", repeat("#", level)));
    state.render_inline(node, false);
    state.close_block(node);
}

fn blockquote(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) {
    if node.attr_bool("multiline") == Some(true) {
        state.write(">>>");
        state.ensure_new_line();
        state.render_content(node);
        state.flush_close(1);
        state.ensure_new_line();
        state.write(">>>");
        state.close_block(node);
    } else {
        state.wrap_block("> ", None, node, |state| state.render_content(node));
    }
}

fn code_block(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) {
    let code = node.text_content();
    let fence = code_fence_for(&code);
    let language = node.attr_str("language").unwrap_or_default();
    state.write(&format!("{fence}{language}\n"));
    state.text(&code, false);
    state.write("\n");
    state.write(&fence);
    state.close_block(node);
}

fn horizontal_rule(hr: String) -> NodeRule {
    NodeRule::render(move |state, node, _, _| {
        state.write(&hr);
        state.close_block(node);
    })
}

/// Adjacent bullet lists alternate markers so they are not read back as
/// one list
fn bullet_list(marker: char) -> NodeRule {
    NodeRule::render(move |state, node, parent, index| {
        let marker = if same_kind_run(node, parent, index) % 2 == 1 {
            alternate_bullet(marker)
        } else {
            marker
        };
        let first = format!("{marker} ");
        state.render_list(node, "  ", |_| first.clone());
    })
}

fn alternate_bullet(marker: char) -> char {
    if marker == '-' {
        '*'
    } else {
        '-'
    }
}

fn ordered_list(state: &mut SerializerState<'_>, node: &Node, parent: &Node, index: usize) {
    // The delimiter is part of the document, so adjacent ordered lists are
    // split with an empty comment instead
    if same_kind_run(node, parent, index) > 0 {
        if state.in_tight_list() {
            state.flush_close(1);
        }
        state.write("<!-- -->");
        state.close_block(node);
    }
    let start = node.attr_u64("start").unwrap_or(1);
    let parens = node.attr_bool("parens").unwrap_or(false);
    let width = ordered_label_width(start, node.child_count());
    let delim = repeat(" ", width + 2);
    state.render_list(node, &delim, |i| {
        ordered_marker(start.saturating_add(i as u64), width, parens)
    });
}

/// Number of siblings of the same kind directly before `index`
fn same_kind_run(node: &Node, parent: &Node, index: usize) -> usize {
    parent.content()[..index.min(parent.child_count())]
        .iter()
        .rev()
        .take_while(|sibling| sibling.kind() == node.kind())
        .count()
}

fn table(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) {
    state.enter_table(node);

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(node.child_count());
    for row in node.content() {
        let mut cells = Vec::with_capacity(row.child_count());
        for cell in row.content() {
            cells.push(table_cell(state, cell));
        }
        rows.push(cells);
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return;
    }

    for (i, cells) in rows.iter().enumerate() {
        if i > 0 {
            state.ensure_new_line();
        }
        state.write(&table_line(cells, columns));
        if i == 0 {
            state.ensure_new_line();
            state.write(&table_line(&vec!["---".to_string(); columns], columns));
        }
    }
    state.close_block(node);
}

/// Single-line rendering of a cell; multiple blocks are joined with `<br>`
fn table_cell(state: &mut SerializerState<'_>, cell: &Node) -> String {
    let content = state.capture(|state| {
        for (i, child) in cell.content().iter().enumerate() {
            if i > 0 {
                state.write("<br>");
            }
            if child.is_textblock() {
                state.render_inline(child, true);
            } else {
                state.text(&child.text_content(), true);
            }
        }
    });
    content.replace('\n', " ").replace('|', "\\|")
}

fn table_line(cells: &[String], columns: usize) -> String {
    let mut line = String::from("|");
    for i in 0..columns {
        line.push(' ');
        line.push_str(cells.get(i).map(String::as_str).unwrap_or_default());
        line.push_str(" |");
    }
    line
}

fn image(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) {
    let alt = state.esc(node.attr_str("alt").unwrap_or_default(), false);
    let src = escape_href(node.attr_str("src").unwrap_or_default());
    let title = node
        .attr_str("title")
        .map(|t| format!(" {}", quote(t)))
        .unwrap_or_default();
    state.write(&format!("![{alt}]({src}{title})"));
}

fn hard_break(state: &mut SerializerState<'_>, node: &Node, parent: &Node, index: usize) {
    if state.is_in_table(parent) {
        state.write("<br>");
        return;
    }
    // Trailing breaks at the end of a textblock write nothing
    let followed_by_content = parent
        .content()
        .iter()
        .skip(index + 1)
        .any(|next| next.kind() != node.kind());
    if followed_by_content {
        state.write("\\\n");
    }
}

fn text(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) {
    let escape = !state.in_autolink();
    state.text(node.text_str().unwrap_or_default(), escape);
}

fn link_open(state: &mut SerializerState<'_>, mark: &Mark, parent: &Node, index: usize) -> String {
    let plain = is_plain_url(mark, parent, index);
    state.set_in_autolink(Some(plain));
    if plain { "<" } else { "[" }.to_string()
}

fn link_close(state: &mut SerializerState<'_>, mark: &Mark, _parent: &Node, _index: usize) -> String {
    let autolink = state.in_autolink();
    state.set_in_autolink(None);
    if autolink {
        return ">".to_string();
    }
    let href = escape_href(mark.attr_str("href").unwrap_or_default());
    let title = mark
        .attr_str("title")
        .map(|t| format!(" {}", quote(t)))
        .unwrap_or_default();
    format!("]({href}{title})")
}

/// A link whose text is exactly its href, with no title, where the link is
/// the innermost mark and does not continue into the next node
fn is_plain_url(link: &Mark, parent: &Node, index: usize) -> bool {
    let Some(href) = link.attr_str("href") else {
        return false;
    };
    if link.attr_str("title").is_some() || !has_uri_scheme(href) {
        return false;
    }
    let Some(content) = parent.child(index) else {
        return false;
    };
    let innermost = content
        .marks()
        .last()
        .is_some_and(|m| std::ptr::eq(m.as_ref(), link));
    if !content.is_text() || content.text_str() != Some(href) || !innermost {
        return false;
    }
    parent
        .child(index + 1)
        .map_or(true, |next| !next.marks().iter().any(|m| std::ptr::eq(m.as_ref(), link)))
}

/// `delimiter`, or `*` in place of `_` when the mark's run touches a word
/// character outside it, since `_` does not open or close inside words
fn flanking_delimiter(delimiter: &str, mark: &Mark, parent: &Node, anchor: usize) -> String {
    if !delimiter.contains('_') || !run_touches_word(mark, parent, anchor) {
        return delimiter.to_string();
    }
    delimiter.replace('_', "*")
}

/// Whether the run of siblings carrying `mark` around `anchor` is directly
/// preceded or followed by a word character
fn run_touches_word(mark: &Mark, parent: &Node, anchor: usize) -> bool {
    let has_mark = |i: usize| {
        parent
            .child(i)
            .is_some_and(|n| n.marks().iter().any(|m| std::ptr::eq(m.as_ref(), mark)))
    };
    // The anchor itself may be expelled whitespace the mark stayed open over
    let Some(mut first) = (0..=anchor).rev().find(|&i| has_mark(i)) else {
        return false;
    };
    let mut last = first;
    while first > 0 && has_mark(first - 1) {
        first -= 1;
    }
    while has_mark(last + 1) {
        last += 1;
    }

    let is_word = |c: char| c.is_alphanumeric();
    let before = first
        .checked_sub(1)
        .and_then(|i| parent.child(i))
        .and_then(Node::text_str)
        .and_then(|t| t.chars().last())
        .is_some_and(is_word);
    let after = parent
        .child(last + 1)
        .and_then(Node::text_str)
        .and_then(|t| t.chars().next())
        .is_some_and(is_word);
    before || after
}

fn code_open(_state: &mut SerializerState<'_>, _mark: &Mark, parent: &Node, index: usize) -> String {
    backticks_for(parent.child(index), true)
}

fn code_close(_state: &mut SerializerState<'_>, _mark: &Mark, parent: &Node, index: usize) -> String {
    backticks_for(index.checked_sub(1).and_then(|i| parent.child(i)), false)
}

/// Backtick delimiter one longer than any run inside the code, padded with
/// a space when the code itself contains backticks
fn backticks_for(node: Option<&Node>, open: bool) -> String {
    let len = node
        .filter(|n| n.is_text())
        .and_then(Node::text_str)
        .map_or(0, longest_backtick_run);
    let mut result = if len > 0 && !open {
        " `".to_string()
    } else {
        "`".to_string()
    };
    result.push_str(&repeat("`", len));
    if len > 0 && open {
        result.push(' ');
    }
    result
}
