//! External tests for the message renderer: documented examples plus
//! property tests for panic-freedom and plain-text idempotence.

use proptest::prelude::*;
use textbook_assistant::render::{parse_inline, render_message, Block, Inline};

#[test]
fn test_hello_world_plain() {
    let r = render_message("hello world");
    assert_eq!(r.visible_text(), "hello world");
    assert!(r.inlines().all(Inline::is_plain));
}

#[test]
fn test_three_styled_segments_in_order() {
    let r = render_message("**a** *b* `c`");
    let styled: Vec<&Inline> = r.inlines().filter(|i| !i.is_plain()).collect();
    assert_eq!(
        styled,
        vec![
            &Inline::Bold("a".into()),
            &Inline::Italic("b".into()),
            &Inline::Code("c".into())
        ]
    );
}

#[test]
fn test_unclosed_bold_literal() {
    let r = render_message("**unclosed");
    assert_eq!(r.visible_text(), "**unclosed");
}

#[test]
fn test_mixed_reply_structure() {
    let text = "Here is *how*:\n\n```rust\nlet w = w - lr * grad;\n```\nThat's **gradient descent**.";
    let r = render_message(text);
    assert_eq!(r.blocks.len(), 3);
    assert!(matches!(&r.blocks[0], Block::Text(lines) if lines.len() == 3));
    assert_eq!(
        r.blocks[1],
        Block::Code {
            language: Some("rust".into()),
            code: "let w = w - lr * grad;".into()
        }
    );
    assert!(r
        .inlines()
        .any(|i| *i == Inline::Bold("gradient descent".into())));
}

#[test]
fn test_crlf_line_endings_stripped_from_prose() {
    let r = render_message("first line\r\n**second**\r\nthird");
    assert_eq!(r.visible_text(), "first line\nsecond\nthird");
    assert!(!r.to_ansi().contains('\r'));
    assert!(r.inlines().any(|i| *i == Inline::Bold("second".into())));
}

#[test]
fn test_two_code_blocks() {
    let r = render_message("```a\n1\n```between```b\n2\n```");
    let codes: Vec<&Block> = r
        .blocks
        .iter()
        .filter(|b| matches!(b, Block::Code { .. }))
        .collect();
    assert_eq!(codes.len(), 2);
    assert_eq!(r.visible_text(), "1\nbetween\n2");
}

#[test]
fn test_parse_inline_adjacent_spans() {
    assert_eq!(
        parse_inline("`x`**y**"),
        vec![Inline::Code("x".into()), Inline::Bold("y".into())]
    );
}

proptest! {
    #[test]
    fn prop_never_panics(s in "\\PC{0,200}") {
        let _ = render_message(&s);
    }

    #[test]
    fn prop_never_panics_on_delimiter_soup(s in "[*`\na-z ]{0,120}") {
        let r = render_message(&s);
        let _ = r.visible_text();
        let _ = r.to_ansi();
    }

    #[test]
    fn prop_plain_text_renders_to_itself(s in "[a-zA-Z0-9 .,!?\n]{1,200}") {
        let r = render_message(&s);
        prop_assert_eq!(r.visible_text(), s);
        prop_assert!(r.inlines().all(Inline::is_plain));
    }

    #[test]
    fn prop_rendering_is_deterministic(s in "[*`\na-z ]{0,80}") {
        prop_assert_eq!(render_message(&s), render_message(&s));
    }
}
