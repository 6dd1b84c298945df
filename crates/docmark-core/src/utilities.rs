//! Escaping and text helpers used by the serializer.

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_START_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+ |[-*>])").expect("valid regex"));
static LINE_START_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(#{1,6})(\s|$)").expect("valid regex"));
static LINE_START_ORDERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*\d+)([.)])(\s|$)").expect("valid regex"));
static URI_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+:").expect("valid regex"));
static BACKTICK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+").expect("valid regex"));

/// Characters escaped wherever they appear in text
const ALWAYS_ESCAPED: &[char] = &['`', '*', '\\', '~', '[', ']'];

/// Repeat a string n times
pub fn repeat(s: &str, n: usize) -> String {
    s.repeat(n)
}

/// Escape markdown special characters.
///
/// An underscore between two word characters stays as is. `<` is escaped
/// where it could open a tag or autolink, `&` where it could start an
/// entity. With `start_of_line`, text that would open a list item, quote,
/// heading or ordered item is escaped too.
pub fn escape_markdown(text: &str, start_of_line: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();
        let escape = match c {
            '_' => {
                let intra_word = i > 0
                    && next.is_some_and(is_word_char)
                    && is_word_char(chars[i - 1]);
                !intra_word
            }
            '<' => next.is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?')),
            '&' => next.is_some_and(|n| n.is_ascii_alphanumeric() || n == '#'),
            c => ALWAYS_ESCAPED.contains(&c),
        };
        if escape {
            result.push('\\');
        }
        result.push(c);
    }

    if start_of_line {
        result = LINE_START_MARKER.replace(&result, r"\$1").into_owned();
        result = LINE_START_HEADING
            .replace(&result, r"$1\$2$3")
            .into_owned();
        result = LINE_START_ORDERED.replace(&result, r"$1\$2$3").into_owned();
    }

    result
}

/// Backslash-escape each character of `extra` found in `text`
pub fn escape_extra(text: &str, extra: &str) -> String {
    if extra.is_empty() {
        return text.to_string();
    }
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        if extra.contains(c) {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Wrap a link or image title in quotes that do not occur inside it
pub fn quote(text: &str) -> String {
    let (open, close) = if !text.contains('"') {
        ('"', '"')
    } else if !text.contains('\'') {
        ('\'', '\'')
    } else {
        ('(', ')')
    };
    format!("{open}{text}{close}")
}

/// Escape the characters that would end a link destination early
pub fn escape_href(href: &str) -> String {
    let mut result = String::with_capacity(href.len());
    for c in href.chars() {
        if matches!(c, '(' | ')' | '"') {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

/// Whether an href starts with a URI scheme such as `https:` or `mailto:`
pub fn has_uri_scheme(href: &str) -> bool {
    URI_SCHEME.is_match(href)
}

/// Length of the longest run of backticks in `text`
pub fn longest_backtick_run(text: &str) -> usize {
    BACKTICK_RUN
        .find_iter(text)
        .map(|m| m.as_str().len())
        .max()
        .unwrap_or(0)
}

/// Code fence long enough not to be closed by backtick runs in `code`
pub fn code_fence_for(code: &str) -> String {
    let longest = longest_backtick_run(code);
    if longest >= 3 {
        repeat("`", longest + 1)
    } else {
        "```".to_string()
    }
}

/// Width of the widest ordered-list label for `count` items from `start`.
/// Labels past `u64::MAX` stay at `u64::MAX`.
pub fn ordered_label_width(start: u64, count: usize) -> usize {
    let last = start.saturating_add(count.saturating_sub(1) as u64);
    last.to_string().len()
}

/// Marker of one ordered-list item, right-aligned to `width` digits
pub fn ordered_marker(number: u64, width: usize, parens: bool) -> String {
    let label = number.to_string();
    let delimiter = if parens { ')' } else { '.' };
    format!(
        "{}{}{} ",
        repeat(" ", width.saturating_sub(label.len())),
        label,
        delimiter
    )
}

/// Collapse runs of whitespace into single spaces
pub fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_whitespace = false;

    for c in s.chars() {
        if c.is_whitespace() {
            if !prev_was_whitespace {
                result.push(' ');
                prev_was_whitespace = true;
            }
        } else {
            result.push(c);
            prev_was_whitespace = false;
        }
    }

    result
}
