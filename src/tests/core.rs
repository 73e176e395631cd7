use super::{para, parse, text_of};
use crate::nodes::{ItemType, ItemValue, ListType, Sourcepos};
use pretty_assertions::assert_eq;

#[test]
fn empty_document() {
    let doc = parse("");
    assert_eq!(doc.items.len(), 1);
    assert_eq!(doc.items[0].item_type(), ItemType::Anchor);
    assert!(doc.is_empty());
}

#[test]
fn single_paragraph() {
    let doc = parse("This is just a text!");
    assert_eq!(doc.items.len(), 2);
    let p = para(&doc, 1);
    assert_eq!(p.pos, Sourcepos::new(0, 0, 0, 19));
    assert_eq!(p.children.len(), 1);
    assert_eq!(text_of(&p.children[0]), "This is just a text!");
}

#[test]
fn blank_lines_split_paragraphs() {
    let doc = parse("Paragraph 1.\n\nParagraph 2.");
    assert_eq!(doc.items.len(), 3);
    assert_eq!(para(&doc, 1).pos.start.line, 0);
    assert_eq!(para(&doc, 2).pos.start.line, 2);
    assert_eq!(text_of(&para(&doc, 2).children[0]), "Paragraph 2.");
}

#[test]
fn continuation_lines_share_a_paragraph() {
    let doc = parse("foo\n   bar");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 2);
    assert_eq!(p.children[0].pos, Sourcepos::new(0, 0, 0, 2));
    // Continuation-line indentation is layout, not content.
    assert_eq!(p.children[1].pos, Sourcepos::new(1, 3, 1, 5));
    assert_eq!(text_of(&p.children[1]), "bar");
}

#[test]
fn hard_break_from_trailing_spaces() {
    let doc = parse("foo  \nbar");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 3);
    assert_eq!(text_of(&p.children[0]), "foo");
    assert_eq!(p.children[0].pos, Sourcepos::new(0, 0, 0, 2));
    assert_eq!(p.children[1].item_type(), ItemType::LineBreak);
    assert_eq!(p.children[1].pos, Sourcepos::new(0, 3, 0, 4));
    assert_eq!(text_of(&p.children[2]), "bar");
}

#[test]
fn hard_break_from_backslash() {
    let doc = parse("foo\\\nbar");
    let p = para(&doc, 1);
    assert_eq!(p.children[1].item_type(), ItemType::LineBreak);
    assert_eq!(p.children[1].pos, Sourcepos::new(0, 3, 0, 3));
}

#[test]
fn atx_heading() {
    let doc = parse("## Heading");
    let h = &doc.items[1];
    assert_eq!(h.item_type(), ItemType::Heading);
    let node = h.as_heading().unwrap();
    assert_eq!(node.level, 2);
    assert_eq!(node.label, format!("#heading/{}", super::TEST_PATH));
    assert_eq!(h.pos, Sourcepos::new(0, 0, 0, 9));

    let p = &h.children[0];
    assert_eq!(p.item_type(), ItemType::Paragraph);
    assert_eq!(text_of(&p.children[0]), "Heading");
}

#[test]
fn atx_heading_closing_hashes_are_stripped() {
    let doc = parse("# foo ##");
    let h = &doc.items[1];
    assert_eq!(text_of(&h.children[0].children[0]), "foo");
    assert_eq!(h.pos, Sourcepos::new(0, 0, 0, 7));
}

#[test]
fn setext_headings_retrofit_the_paragraph() {
    let doc = parse("foo\n===\n\nbar\n---");
    let h1 = &doc.items[1];
    assert_eq!(h1.as_heading().unwrap().level, 1);
    assert_eq!(h1.pos, Sourcepos::new(0, 0, 1, 2));

    let h2 = &doc.items[2];
    assert_eq!(h2.as_heading().unwrap().level, 2);
    assert_eq!(text_of(&h2.children[0].children[0]), "bar");
}

#[test]
fn thematic_breaks() {
    let doc = parse("***\n---\n___");
    assert_eq!(doc.items.len(), 4);
    for item in &doc.items[1..] {
        assert_eq!(item.item_type(), ItemType::HorizontalLine);
    }
    assert_eq!(doc.items[2].pos, Sourcepos::new(1, 0, 1, 2));
}

#[test]
fn spaced_thematic_break_beats_list() {
    let doc = parse("- - -");
    assert_eq!(doc.items[1].item_type(), ItemType::HorizontalLine);
}

#[test]
fn blockquote_with_lazy_continuation() {
    let doc = parse("> quote\ncontinued");
    let bq = &doc.items[1];
    assert_eq!(bq.item_type(), ItemType::Blockquote);
    assert_eq!(bq.pos, Sourcepos::new(0, 0, 1, 8));
    let p = &bq.children[0];
    assert_eq!(p.children.len(), 2);
    assert_eq!(text_of(&p.children[1]), "continued");
}

#[test]
fn nested_blockquotes() {
    let doc = parse("> Quote paragraph 1.\n>\n> Quote paragraph 2.\n>\n>> Nested quote");
    let bq = &doc.items[1];
    assert_eq!(bq.item_type(), ItemType::Blockquote);
    assert_eq!(bq.children.len(), 3);
    assert_eq!(bq.children[0].item_type(), ItemType::Paragraph);
    assert_eq!(bq.children[1].item_type(), ItemType::Paragraph);
    assert_eq!(bq.children[1].pos, Sourcepos::new(2, 2, 2, 19));

    let inner = &bq.children[2];
    assert_eq!(inner.item_type(), ItemType::Blockquote);
    assert_eq!(inner.pos, Sourcepos::new(4, 1, 4, 14));
    assert_eq!(text_of(&inner.children[0].children[0]), "Nested quote");
}

#[test]
fn indented_code_block() {
    let doc = parse("    code");
    let code = doc.items[1].as_code().unwrap();
    assert_eq!(code.literal, "code\n");
    assert!(!code.inline);
    assert_eq!(code.syntax, None);
    assert!(code.start_delim.is_synthetic());
    assert_eq!(doc.items[1].pos, Sourcepos::new(0, 4, 0, 7));
}

#[test]
fn unordered_list_with_two_items() {
    let doc = parse("- a\n- b");
    let list = &doc.items[1];
    assert_eq!(list.item_type(), ItemType::List);
    assert_eq!(list.children.len(), 2);

    let li = list.children[0].as_list_item().unwrap();
    assert_eq!(li.list_type, ListType::Unordered);
    assert_eq!(li.delim, Sourcepos::new(0, 0, 0, 0));
    assert_eq!(li.task, None);
}

#[test]
fn ordered_list_records_start_numbers() {
    let doc = parse("1. a\n2. b");
    let list = &doc.items[1];
    let first = list.children[0].as_list_item().unwrap();
    let second = list.children[1].as_list_item().unwrap();
    assert_eq!(first.list_type, ListType::Ordered);
    assert_eq!(first.start_number, 1);
    assert_eq!(second.start_number, 2);
    assert_eq!(second.delim, Sourcepos::new(1, 0, 1, 1));
}

#[test]
fn marker_change_starts_a_sibling_list() {
    let doc = parse("- a\n+ b");
    assert_eq!(doc.items.len(), 3);
    assert_eq!(doc.items[1].item_type(), ItemType::List);
    assert_eq!(doc.items[2].item_type(), ItemType::List);
}

#[test]
fn blank_line_defers_but_does_not_close_the_item() {
    let doc = parse("- a\n\n  b");
    let list = &doc.items[1];
    assert_eq!(list.children.len(), 1);
    let item = &list.children[0];
    assert_eq!(item.children.len(), 2);
    assert_eq!(item.children[0].item_type(), ItemType::Paragraph);
    assert_eq!(item.children[1].item_type(), ItemType::Paragraph);
}

#[test]
fn indented_code_in_list_item_counts_from_content_column() {
    let doc = parse("- item\n\n      code");
    let item = &doc.items[1].children[0];
    assert_eq!(item.children.len(), 2);
    let code = &item.children[1];
    assert_eq!(code.item_type(), ItemType::Code);
    assert_eq!(code.as_code().unwrap().literal, "code\n");
    // Four spaces beyond the item's content column, which is at 2.
    assert_eq!(code.pos.start.column, 6);
}

#[test]
fn ordered_list_interrupting_needs_start_one() {
    let doc = parse("text\n5. b");
    assert_eq!(doc.items.len(), 2);
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 2);

    let doc = parse("text\n1. b");
    assert_eq!(doc.items.len(), 3);
    assert_eq!(doc.items[2].item_type(), ItemType::List);
}

#[test]
fn lazy_paragraph_inside_list_item() {
    let doc = parse("- first\nlazy");
    let item = &doc.items[1].children[0];
    let p = &item.children[0];
    assert_eq!(p.children.len(), 2);
    assert_eq!(text_of(&p.children[1]), "lazy");
}

#[test]
fn text_runs_record_surrounding_space() {
    let doc = parse("a b");
    let t = para(&doc, 1).children[0].as_text().unwrap();
    assert!(t.space_before);
    assert!(t.space_after);

    let doc = parse("x*y*");
    let t = para(&doc, 1).children[0].as_text().unwrap();
    assert!(t.space_before);
    assert!(!t.space_after);
}

#[test]
fn clone_matches_structure() {
    let doc = parse("# h\n\n> q\n\n- l");
    let copy = doc.clone();
    assert_eq!(doc, copy);
}

#[test]
fn anchor_always_leads() {
    for input in ["", "text", "# h"] {
        let doc = parse(input);
        assert!(matches!(doc.items[0].value, ItemValue::Anchor(ref p) if p == super::TEST_PATH));
    }
}
