use docmark::{from_markdown, to_markdown, MarkdownService, Node, NodeKind};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{json, Value};

fn round_trip(markdown: &str) -> String {
    let doc = from_markdown(markdown).unwrap().unwrap();
    to_markdown(&doc)
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("\n\n\t\n")]
fn test_empty_input_has_no_content(#[case] markdown: &str) {
    assert!(from_markdown(markdown).unwrap().is_none());
}

#[rstest]
#[case("# Title\n\nSome **bold** and _em_ text.")]
#[case("- one\n- two\n  - nested\n- three")]
#[case("- a\n\n- b")]
#[case(" 8. a\n 9. b\n10. c")]
#[case("1) a\n2) b")]
#[case("> quoted\n>\n> more")]
#[case("```rust\nfn main() {}\n```")]
#[case("a\\\nb")]
#[case("<https://example.com>")]
#[case("[text](https://example.com \"Title\")")]
#[case("~~gone~~ and `code`")]
#[case("before\n\n---\n\nafter")]
#[case("![alt](img.png \"T\")")]
#[case("| a | b |\n| --- | --- |\n| 1 | 2 |")]
#[case("| a<br>b |\n| --- |")]
#[case("1\\. not a list")]
#[case("1\\) not a list")]
#[case("\\+ not a list")]
#[case("\\# not a heading")]
#[case("\\> not a quote")]
#[case("- a\n\n* b")]
#[case("1. a\n\n<!-- -->\n\n1. b")]
#[case("use \\<b>x\\</b> \\&amp; y")]
#[case("foo*bar*baz")]
#[case("snake_case_name")]
fn test_markdown_round_trip(#[case] markdown: &str) {
    assert_eq!(round_trip(markdown), markdown);
}

#[rstest]
#[case("*star*", "_star_")]
#[case("__strong__", "**strong**")]
#[case("* a\n* b", "- a\n- b")]
#[case("Title\n=====", "# Title")]
#[case("~~~\ncode\n~~~", "```\ncode\n```")]
#[case("a  \nb", "a\\\nb")]
fn test_markdown_is_normalized(#[case] markdown: &str, #[case] expected: &str) {
    assert_eq!(round_trip(markdown), expected);
}

#[test]
fn test_document_round_trip() {
    let doc = Node::from_json(&json!({
        "type": "doc",
        "content": [
            { "type": "heading", "attrs": { "level": 1 }, "content": [{ "type": "text", "text": "Title" }] },
            { "type": "paragraph", "content": [
                { "type": "text", "text": "Plain " },
                { "type": "text", "text": "strong", "marks": [{ "type": "bold" }] },
                { "type": "text", "text": " and " },
                { "type": "text", "text": "em", "marks": [{ "type": "italic" }] },
                { "type": "text", "text": " and " },
                { "type": "text", "text": "link", "marks": [{ "type": "link", "attrs": { "href": "https://example.com/docs" } }] }
            ] },
            { "type": "bulletList", "attrs": { "tight": true }, "content": [
                { "type": "listItem", "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "one" }] }] },
                { "type": "listItem", "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "two" }] }] }
            ] },
            { "type": "orderedList", "attrs": { "start": 3, "tight": true }, "content": [
                { "type": "listItem", "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "x" }] }] },
                { "type": "listItem", "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "y" }] }] }
            ] },
            { "type": "blockquote", "content": [
                { "type": "paragraph", "content": [{ "type": "text", "text": "quoted" }] }
            ] },
            { "type": "codeBlock", "attrs": { "language": "rust" }, "content": [{ "type": "text", "text": "let x = 1;" }] }
        ]
    }))
    .unwrap();

    let markdown = to_markdown(&doc);
    assert_eq!(
        markdown,
        "# Title\n\nPlain **strong** and _em_ and [link](https://example.com/docs)\n\n- one\n- two\n\n3. x\n4. y\n\n> quoted\n\n```rust\nlet x = 1;\n```"
    );

    let parsed = from_markdown(&markdown).unwrap().unwrap();
    assert_eq!(parsed, doc);
}

#[rstest]
#[case(json!([{ "type": "text", "text": "1) not a list" }]))]
#[case(json!([{ "type": "text", "text": "use <b>x</b> &amp; y" }]))]
#[case(json!([
    { "type": "text", "text": "foo" },
    { "type": "text", "text": "bar", "marks": [{ "type": "italic" }] },
    { "type": "text", "text": "baz" }
]))]
fn test_paragraph_survives_round_trip(#[case] content: Value) {
    let doc = Node::from_json(&json!({
        "type": "doc",
        "content": [{ "type": "paragraph", "content": content }]
    }))
    .unwrap();
    let parsed = from_markdown(&to_markdown(&doc)).unwrap().unwrap();
    assert_eq!(parsed, doc);
}

#[test]
fn test_adjacent_lists_survive_round_trip() {
    let list = |kind: &str, text: &str| {
        json!({ "type": kind, "attrs": { "tight": true }, "content": [
            { "type": "listItem", "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": text }] }] }
        ] })
    };
    let doc = Node::from_json(&json!({
        "type": "doc",
        "content": [
            list("bulletList", "a"),
            list("bulletList", "b"),
            list("bulletList", "c"),
            list("orderedList", "d"),
            list("orderedList", "e")
        ]
    }))
    .unwrap();

    let markdown = to_markdown(&doc);
    assert_eq!(
        markdown,
        "- a\n\n* b\n\n- c\n\n1. d\n\n<!-- -->\n\n1. e"
    );
    let parsed = from_markdown(&markdown).unwrap().unwrap();
    assert_eq!(parsed.child_count(), 5);
    assert_eq!(parsed, doc);
}

#[test]
fn test_ordered_list_delimiter_survives() {
    let doc = from_markdown("3) a\n4) b").unwrap().unwrap();
    let list = doc.child(0).unwrap();
    assert_eq!(list.kind(), NodeKind::OrderedList);
    assert_eq!(list.attr_u64("start"), Some(3));
    assert_eq!(list.attr_bool("parens"), Some(true));
}

#[test]
fn test_serialization_is_deterministic() {
    let doc = from_markdown("# A\n\n- **b** _c_\n- <https://d.org>")
        .unwrap()
        .unwrap();
    let first = to_markdown(&doc);
    assert_eq!(to_markdown(&doc), first);
    assert_eq!(round_trip(&first), first);
}

#[test]
fn test_multiline_blockquote_from_json() {
    let service = MarkdownService::new();
    let markdown = service
        .to_markdown_json(&json!({
            "type": "doc",
            "content": [{
                "type": "blockquote",
                "attrs": { "multiline": true },
                "content": [
                    { "type": "paragraph", "content": [{ "type": "text", "text": "one" }] },
                    { "type": "paragraph", "content": [{ "type": "text", "text": "two" }] }
                ]
            }]
        }))
        .unwrap();
    assert_eq!(markdown, ">>>\none\n\ntwo\n>>>");
}

#[test]
fn test_json_round_trip_through_markdown() {
    let service = MarkdownService::new();
    let value = service
        .from_markdown_json("Hello **world**")
        .unwrap()
        .unwrap();
    assert_eq!(service.to_markdown_json(&value).unwrap(), "Hello **world**");
}
