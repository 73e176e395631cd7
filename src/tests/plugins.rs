use super::{assert_doc_sane, para};
use crate::nodes::{Document, ItemType, Sourcepos, ITALIC_TEXT, STRIKETHROUGH_TEXT};
use crate::plugins::{emphasis_template_plugin, USER_DEFINED_PLUGIN};
use pretty_assertions::assert_eq;

fn parse_with_caret(text: &str) -> Document {
    let mut parser = crate::Parser::new();
    parser.add_text_plugin(
        USER_DEFINED_PLUGIN,
        emphasis_template_plugin,
        true,
        vec!["^".into(), "8".into()],
    );
    let doc = parser.parse_text(text, super::TEST_PATH);
    assert_doc_sane(&doc);
    doc
}

#[test]
fn marker_pair_sets_the_registered_bit() {
    let doc = parse_with_caret("^text^");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 1);
    let t = p.children[0].as_text().unwrap();
    assert_eq!(t.text, "text");
    assert_eq!(t.opts, 8);
    assert_eq!(p.children[0].pos, Sourcepos::new(0, 1, 0, 4));

    assert_eq!(t.open_styles.len(), 1);
    assert_eq!(t.open_styles[0].style(), 8);
    assert_eq!(t.open_styles[0].pos, Sourcepos::new(0, 0, 0, 0));
    assert_eq!(t.close_styles.len(), 1);
    assert_eq!(t.close_styles[0].pos, Sourcepos::new(0, 5, 0, 5));
}

#[test]
fn marker_inside_emphasis() {
    let doc = parse_with_caret("*^text^*");
    let t = para(&doc, 1).children[0].as_text().unwrap();
    assert_eq!(t.text, "text");
    assert_eq!(t.opts, ITALIC_TEXT | 8);
    assert_eq!(t.open_styles.len(), 2);
    assert_eq!(t.open_styles[0].style(), ITALIC_TEXT);
    assert_eq!(t.open_styles[0].pos.start.column, 0);
    assert_eq!(t.open_styles[1].style(), 8);
    assert_eq!(t.open_styles[1].pos.start.column, 1);
    assert_eq!(t.close_styles[0].style(), 8);
    assert_eq!(t.close_styles[0].pos.start.column, 6);
    assert_eq!(t.close_styles[1].style(), ITALIC_TEXT);
    assert_eq!(t.close_styles[1].pos.start.column, 7);
}

#[test]
fn emphasis_inside_marker() {
    let doc = parse_with_caret("^*text*^");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 1);
    let t = p.children[0].as_text().unwrap();
    assert_eq!(t.text, "text");
    assert_eq!(t.opts, ITALIC_TEXT | 8);
    assert_eq!(p.children[0].pos, Sourcepos::new(0, 2, 0, 5));

    assert_eq!(t.open_styles[0].style(), 8);
    assert_eq!(t.open_styles[0].pos.start.column, 0);
    assert_eq!(t.open_styles[1].style(), ITALIC_TEXT);
    assert_eq!(t.open_styles[1].pos.start.column, 1);
    assert_eq!(t.close_styles[0].style(), ITALIC_TEXT);
    assert_eq!(t.close_styles[0].pos.start.column, 6);
    assert_eq!(t.close_styles[1].style(), 8);
    assert_eq!(t.close_styles[1].pos.start.column, 7);
}

#[test]
fn double_marker_consumes_char_by_char() {
    let doc = parse_with_caret("^^text^");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 2);
    assert_eq!(p.children[0].text().unwrap(), "^");
    let t = p.children[1].as_text().unwrap();
    assert_eq!(t.text, "text");
    assert_eq!(t.opts, 8);
    assert_eq!(t.open_styles.len(), 1);
    assert_eq!(t.open_styles[0].pos.start.column, 1);
}

#[test]
fn double_marker_pairs_nest() {
    let doc = parse_with_caret("^^text^^");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 1);
    let t = p.children[0].as_text().unwrap();
    assert_eq!(t.text, "text");
    assert_eq!(t.opts, 8);
    assert_eq!(t.open_styles.len(), 2);
    assert_eq!(t.open_styles[0].pos.start.column, 0);
    assert_eq!(t.open_styles[1].pos.start.column, 1);
    assert_eq!(t.close_styles[0].pos.start.column, 6);
    assert_eq!(t.close_styles[1].pos.start.column, 7);
}

#[test]
fn leftover_closer_char_stays_literal() {
    let doc = parse_with_caret("^text^^");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 2);
    let t = p.children[0].as_text().unwrap();
    assert_eq!(t.text, "text");
    assert_eq!(t.opts, 8);
    assert_eq!(p.children[0].pos, Sourcepos::new(0, 1, 0, 4));
    let tail = p.children[1].as_text().unwrap();
    assert_eq!(tail.text, "^");
    assert_eq!(tail.opts, 0);
    assert_eq!(p.children[1].pos.start.column, 6);
}

#[test]
fn unmatched_marker_is_plain_text() {
    let doc = parse_with_caret("^text");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 1);
    let t = p.children[0].as_text().unwrap();
    assert_eq!(t.text, "^text");
    assert_eq!(t.opts, 0);
}

#[test]
fn marker_spanning_styled_and_plain_runs() {
    let doc = parse_with_caret("~*text ^text^* text~");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 3);

    let first = p.children[0].as_text().unwrap();
    assert_eq!(first.text, "text ");
    assert_eq!(first.opts, ITALIC_TEXT | STRIKETHROUGH_TEXT);

    let second = p.children[1].as_text().unwrap();
    assert_eq!(second.text, "text");
    assert_eq!(second.opts, ITALIC_TEXT | STRIKETHROUGH_TEXT | 8);

    let third = p.children[2].as_text().unwrap();
    assert_eq!(third.text, " text");
    assert_eq!(third.opts, STRIKETHROUGH_TEXT);
}

#[test]
fn two_templates_compose() {
    let mut parser = crate::Parser::new();
    parser.add_text_plugin(
        USER_DEFINED_PLUGIN,
        emphasis_template_plugin,
        true,
        vec!["^".into(), "8".into()],
    );
    parser.add_text_plugin(
        USER_DEFINED_PLUGIN + 1,
        emphasis_template_plugin,
        true,
        vec!["%".into(), "16".into()],
    );
    let doc = parser.parse_text("^%x%^", super::TEST_PATH);
    let t = para(&doc, 1).children[0].as_text().unwrap();
    assert_eq!(t.text, "x");
    assert_eq!(t.opts, 8 | 16);
}

#[test]
fn removing_the_plugin_restores_literal_text() {
    let mut parser = crate::Parser::new();
    parser.add_text_plugin(
        USER_DEFINED_PLUGIN,
        emphasis_template_plugin,
        true,
        vec!["^".into(), "8".into()],
    );
    parser.remove_text_plugin(USER_DEFINED_PLUGIN);
    let doc = parser.parse_text("^text^", super::TEST_PATH);
    let p = &doc.items[1];
    assert_eq!(p.children.len(), 1);
    assert_eq!(p.children[0].text().unwrap(), "^text^");
    assert_eq!(p.item_type(), ItemType::Paragraph);
}
