//! Document to Markdown serialization
//!
//! A depth-first walk over the document tree. Each node kind is written by
//! its rule from the [`RuleTable`]; marks on inline content are opened and
//! closed as the runs of each mark instance begin and end.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use crate::model::{contains_mark, MarkRef, Node};
use crate::options::SerializerOptions;
use crate::rules::{Delimiter, NodeRule, RuleTable, Rules};
use crate::schema::NodeKind;
use crate::utilities::{escape_extra, escape_markdown};
use crate::Result;

/// Serializes documents to Markdown with a fixed rule table
pub struct Serializer {
    rules: RuleTable,
    options: SerializerOptions,
}

impl Serializer {
    /// Serializer with the built-in rules
    ///
    /// # Panics
    ///
    /// Panics if the built-in rules miss a node or mark kind, which means a
    /// kind was added to the schema without a rule in `rules::commonmark`.
    pub fn new(options: SerializerOptions) -> Self {
        match Rules::commonmark(&options).build() {
            Ok(rules) => Self { rules, options },
            Err(e) => unreachable!("built-in rule table is incomplete: {e}"),
        }
    }

    /// Serializer with a custom rule collection, which must cover every kind
    pub fn with_rules(rules: Rules, options: SerializerOptions) -> Result<Self> {
        Ok(Self {
            rules: rules.build()?,
            options,
        })
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    /// Serialize the content of `doc` to Markdown
    pub fn serialize(&self, doc: &Node) -> String {
        let mut state = SerializerState::new(&self.rules, &self.options);
        state.render_content(doc);
        log::trace!(
            "serialized {} top-level nodes into {} bytes",
            doc.child_count(),
            state.out.len()
        );
        state.out
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(SerializerOptions::default())
    }
}

/// Identity of a node within one serialization pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeKey(usize);

impl NodeKey {
    fn of(node: &Node) -> Self {
        NodeKey(node as *const Node as usize)
    }
}

/// Per-call serialization state, handed to every rule
pub struct SerializerState<'r> {
    rules: &'r RuleTable,
    options: &'r SerializerOptions,
    out: String,
    delim: String,
    closed: Option<NodeKind>,
    in_autolink: Option<bool>,
    at_block_start: bool,
    in_tight_list: bool,
    in_table: HashSet<NodeKey>,
}

impl<'r> SerializerState<'r> {
    fn new(rules: &'r RuleTable, options: &'r SerializerOptions) -> Self {
        Self {
            rules,
            options,
            out: String::with_capacity(4096),
            delim: String::new(),
            closed: None,
            in_autolink: None,
            at_block_start: false,
            in_tight_list: false,
            in_table: HashSet::new(),
        }
    }

    pub fn options(&self) -> &SerializerOptions {
        self.options
    }

    /// Output written so far
    pub fn out(&self) -> &str {
        &self.out
    }

    /// Write any pending block separator: one newline, then `size - 1`
    /// blank (delimiter-only) lines.
    pub fn flush_close(&mut self, size: usize) {
        if self.closed.is_some() {
            if !self.at_blank() {
                self.out.push('\n');
            }
            if size > 1 {
                let delim_min = self.delim.trim_end().to_string();
                for _ in 1..size {
                    self.out.push_str(&delim_min);
                    self.out.push('\n');
                }
            }
            self.closed = None;
        }
    }

    /// Render `f` with `delim` prefixed to every line it writes
    pub fn wrap_block<F>(&mut self, delim: &str, first_delim: Option<&str>, node: &Node, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let old = self.delim.clone();
        self.write(first_delim.unwrap_or(delim));
        self.delim.push_str(delim);
        f(self);
        self.delim = old;
        self.close_block(node);
    }

    /// Whether the output is empty or ends at a line start
    pub fn at_blank(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    pub fn ensure_new_line(&mut self) {
        if !self.at_blank() {
            self.out.push('\n');
        }
    }

    /// Write raw content, preceded by any pending separator and the
    /// current line prefix
    pub fn write(&mut self, content: &str) {
        self.flush_close(2);
        if !self.delim.is_empty() && self.at_blank() {
            self.out.push_str(&self.delim);
        }
        self.out.push_str(content);
    }

    /// Mark `node` as closed; the next write starts a new block
    pub fn close_block(&mut self, node: &Node) {
        self.closed = Some(node.kind());
    }

    /// Write text line by line, escaping it unless `escape` is false
    pub fn text(&mut self, text: &str, escape: bool) {
        let lines: Vec<&str> = text.split('\n').collect();
        let last = lines.len() - 1;
        for (i, line) in lines.iter().enumerate() {
            let start_of_line = self.at_block_start || self.at_blank();
            self.write("");
            // An unescaped `[` after `!` would turn into an image
            if !escape && line.starts_with('[') && ends_with_unescaped_bang(&self.out) {
                self.out.pop();
                self.out.push_str("\\!");
            }
            if escape {
                let escaped = self.esc(line, start_of_line);
                self.out.push_str(&escaped);
            } else {
                self.out.push_str(line);
            }
            if i != last {
                self.out.push('\n');
            }
        }
    }

    /// Escape text the way this serializer is configured to
    pub fn esc(&self, text: &str, start_of_line: bool) -> String {
        let escaped = escape_markdown(text, start_of_line);
        escape_extra(&escaped, &self.options.escape_extra_characters)
    }

    /// Render a single node with its rule
    pub fn render(&mut self, node: &Node, parent: &Node, index: usize) {
        let rules = self.rules;
        match rules.node(node.kind()) {
            NodeRule::Render(f) => f(self, node, parent, index),
            NodeRule::Wrap {
                open,
                close,
                block,
                escape,
            } => {
                if !open.is_empty() {
                    self.write(open);
                }
                if node.is_textblock() {
                    if *escape {
                        self.render_inline(node, true);
                    } else {
                        self.text(&node.text_content(), false);
                    }
                } else {
                    self.render_content(node);
                }
                if !close.is_empty() {
                    self.write(close);
                }
                if *block {
                    self.close_block(node);
                }
            }
        }
    }

    /// Render every child of `parent` as a block
    pub fn render_content(&mut self, parent: &Node) {
        for (index, child) in parent.content().iter().enumerate() {
            self.render(child, parent, index);
        }
    }

    /// Render the inline content of `parent`, opening and closing marks
    pub fn render_inline(&mut self, parent: &Node, from_block_start: bool) {
        self.at_block_start = from_block_start;
        let mut run = InlineRun::default();
        for index in 0..parent.child_count() {
            self.progress(&mut run, parent, parent.child(index), index);
        }
        self.progress(&mut run, parent, None, parent.child_count());
        self.at_block_start = false;
    }

    fn progress(&mut self, run: &mut InlineRun, parent: &Node, node: Option<&Node>, index: usize) {
        let rules = self.rules;
        let mut marks: Vec<MarkRef> = node.map(|n| n.marks().to_vec()).unwrap_or_default();
        let mut node: Option<Cow<'_, Node>> = node.map(Cow::Borrowed);

        // A hard break keeps only the marks that continue past it
        if node.as_deref().is_some_and(|n| n.kind() == NodeKind::HardBreak) {
            let next = parent.child(index + 1);
            marks.retain(|m| {
                next.is_some_and(|next| {
                    contains_mark(next.marks(), m)
                        && (!next.is_text()
                            || next.text_str().is_some_and(|t| t.chars().any(|c| !c.is_whitespace())))
                })
            });
        }

        let mut leading = std::mem::take(&mut run.trailing);

        let expel_leading = node.as_deref().is_some_and(|n| {
            n.is_text()
                && marks.iter().any(|m| {
                    rules.mark(m.kind()).expel_enclosing_whitespace && !contains_mark(&run.active, m)
                })
        });
        if expel_leading {
            if let Some(n) = node.take() {
                let text = n.text_str().unwrap_or_default();
                let rest = text.trim_start();
                if rest.len() < text.len() {
                    leading.push_str(&text[..text.len() - rest.len()]);
                    if rest.is_empty() {
                        marks = run.active.clone();
                    } else {
                        node = Some(Cow::Owned(n.with_text(rest)));
                    }
                } else {
                    node = Some(n);
                }
            }
        }

        let expel_trailing = node.as_deref().is_some_and(|n| {
            n.is_text()
                && marks.iter().any(|m| {
                    rules.mark(m.kind()).expel_enclosing_whitespace
                        && parent
                            .child(index + 1)
                            .map_or(true, |next| !contains_mark(next.marks(), m))
                })
        });
        if expel_trailing {
            if let Some(n) = node.take() {
                let text = n.text_str().unwrap_or_default();
                let rest = text.trim_end();
                if rest.len() < text.len() {
                    run.trailing = text[rest.len()..].to_string();
                    if rest.is_empty() {
                        marks = run.active.clone();
                    } else {
                        node = Some(Cow::Owned(n.with_text(rest)));
                    }
                } else {
                    node = Some(n);
                }
            }
        }

        let inner = marks.last().cloned();
        let no_esc = inner
            .as_ref()
            .is_some_and(|m| !rules.mark(m.kind()).escape);
        let len = marks.len() - usize::from(no_esc);

        // Reorder mixable marks so shared instances line up with the open ones
        'outer: for i in 0..len {
            let Some(mark) = marks.get(i).cloned() else {
                break;
            };
            if !rules.mark(mark.kind()).mixable {
                break;
            }
            for j in 0..run.active.len() {
                let other = &run.active[j];
                if !rules.mark(other.kind()).mixable {
                    break;
                }
                if Arc::ptr_eq(&mark, other) {
                    if i > j {
                        let mut next = clamp(&marks, 0, j).to_vec();
                        next.push(mark.clone());
                        next.extend_from_slice(clamp(&marks, j, i));
                        next.extend_from_slice(clamp(&marks, i + 1, len));
                        marks = next;
                    } else if j > i {
                        let mut next = clamp(&marks, 0, i).to_vec();
                        next.extend_from_slice(clamp(&marks, i + 1, j));
                        next.push(mark.clone());
                        next.extend_from_slice(clamp(&marks, j, len));
                        marks = next;
                    }
                    continue 'outer;
                }
            }
        }

        // Keep the prefix of open marks that did not change
        let mut keep = 0;
        while keep < run.active.len().min(len)
            && marks
                .get(keep)
                .is_some_and(|m| Arc::ptr_eq(m, &run.active[keep]))
        {
            keep += 1;
        }

        while keep < run.active.len() {
            if let Some(mark) = run.active.pop() {
                let close = self.mark_string(&mark, false, parent, index);
                self.text(&close, false);
            }
        }

        if !leading.is_empty() {
            self.text(&leading, true);
        }

        if let Some(node) = node {
            while run.active.len() < len {
                let Some(add) = marks.get(run.active.len()).cloned() else {
                    break;
                };
                run.active.push(add.clone());
                let open = self.mark_string(&add, true, parent, index);
                self.text(&open, false);
                self.at_block_start = false;
            }

            match inner.filter(|_| no_esc && node.is_text()) {
                Some(inner) => {
                    let open = self.mark_string(&inner, true, parent, index);
                    let close = self.mark_string(&inner, false, parent, index + 1);
                    let body = format!("{open}{}{close}", node.text_str().unwrap_or_default());
                    self.text(&body, false);
                }
                None => self.render(&node, parent, index),
            }
            self.at_block_start = false;
        }
    }

    /// Render a list, `delim` indenting continuation lines and
    /// `first_delim(i)` marking item `i`
    pub fn render_list<F>(&mut self, node: &Node, delim: &str, first_delim: F)
    where
        F: Fn(usize) -> String,
    {
        if self.in_tight_list {
            self.flush_close(1);
        }

        let is_tight = node
            .attr_bool("tight")
            .unwrap_or(self.options.tight_lists);
        let prev_tight = self.in_tight_list;
        self.in_tight_list = is_tight;

        for (i, child) in node.content().iter().enumerate() {
            if i > 0 && is_tight {
                self.flush_close(1);
            }
            let first = first_delim(i);
            self.wrap_block(delim, Some(&first), node, |state| state.render(child, node, i));
        }

        self.in_tight_list = prev_tight;
    }

    /// Whether the list being rendered sits inside a tight list
    pub fn in_tight_list(&self) -> bool {
        self.in_tight_list
    }

    /// Opening or closing string of a mark at `index` in `parent`
    pub fn mark_string(&mut self, mark: &MarkRef, open: bool, parent: &Node, index: usize) -> String {
        let rules = self.rules;
        let rule = rules.mark(mark.kind());
        let delimiter = if open { &rule.open } else { &rule.close };
        match delimiter {
            Delimiter::Fixed(s) => s.to_string(),
            Delimiter::Computed(f) => f(self, mark.as_ref(), parent, index),
        }
    }

    /// Whether the current link mark renders as an autolink
    pub fn in_autolink(&self) -> bool {
        self.in_autolink.unwrap_or(false)
    }

    pub fn set_in_autolink(&mut self, value: Option<bool>) {
        self.in_autolink = value;
    }

    /// Remember `node` and all its descendants as table content
    pub fn enter_table(&mut self, node: &Node) {
        self.in_table.insert(NodeKey::of(node));
        for child in node.content() {
            self.enter_table(child);
        }
    }

    /// Whether this node instance was registered as table content
    pub fn is_in_table(&self, node: &Node) -> bool {
        self.in_table.contains(&NodeKey::of(node))
    }

    /// Run `f` against an empty buffer and return what it wrote
    pub fn capture<F>(&mut self, f: F) -> String
    where
        F: FnOnce(&mut Self),
    {
        let out = std::mem::take(&mut self.out);
        let delim = std::mem::take(&mut self.delim);
        let closed = self.closed.take();
        f(self);
        let captured = std::mem::replace(&mut self.out, out);
        self.delim = delim;
        self.closed = closed;
        captured
    }
}

/// Marks open in the current inline run plus whitespace held back from the
/// previous text node
#[derive(Default)]
struct InlineRun {
    active: Vec<MarkRef>,
    trailing: String,
}

/// Slice with bounds clamped to the vector length
fn clamp(marks: &[MarkRef], start: usize, end: usize) -> &[MarkRef] {
    let end = end.min(marks.len());
    let start = start.min(end);
    &marks[start..end]
}

fn ends_with_unescaped_bang(out: &str) -> bool {
    let mut chars = out.chars().rev();
    chars.next() == Some('!') && chars.next() != Some('\\')
}
