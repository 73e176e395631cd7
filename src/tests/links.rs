use super::{para, parse, text_of};
use crate::nodes::{ItemType, Sourcepos, ITALIC_TEXT};
use pretty_assertions::assert_eq;

#[test]
fn inline_link() {
    let doc = parse("see [docs](https://example.com \"the title\") now");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 3);

    let link = &p.children[1];
    assert_eq!(link.item_type(), ItemType::Link);
    let node = link.as_link().unwrap();
    assert_eq!(node.url, "https://example.com");
    assert_eq!(node.title, "the title");
    assert_eq!(node.text, "docs");
    assert_eq!(link.pos.start, (0, 4).into());
    assert_eq!(text_of(&link.children[0]), "docs");
}

#[test]
fn link_titles_in_three_quote_styles() {
    for (input, title) in [
        ("[a](u \"double\")", "double"),
        ("[a](u 'single')", "single"),
        ("[a](u (paren))", "paren"),
    ] {
        let doc = parse(input);
        let node = para(&doc, 1).children[0].as_link().unwrap();
        assert_eq!(node.title, title, "input {}", input);
    }
}

#[test]
fn pointy_url_keeps_spaces() {
    let doc = parse("[a](<u v>)");
    let node = para(&doc, 1).children[0].as_link().unwrap();
    assert_eq!(node.url, "u v");
}

#[test]
fn image() {
    let doc = parse("![alt text](./img.png)");
    let image = &para(&doc, 1).children[0];
    assert_eq!(image.item_type(), ItemType::Image);
    let node = image.as_link().unwrap();
    assert_eq!(node.url, "./img.png");
    assert_eq!(node.text, "alt text");
    assert_eq!(image.pos, Sourcepos::new(0, 0, 0, 21));
}

#[test]
fn styled_link_text() {
    let doc = parse("[*em* rest](u)");
    let link = &para(&doc, 1).children[0];
    let node = link.as_link().unwrap();
    assert_eq!(node.text, "em rest");
    assert_eq!(link.children.len(), 2);
    assert_eq!(link.children[0].as_text().unwrap().opts, ITALIC_TEXT);
    assert_eq!(text_of(&link.children[1]), " rest");
}

#[test]
fn definition_lines_produce_no_paragraph() {
    let doc = parse("[label]: /url \"title\"\n\ntext");
    assert_eq!(doc.items.len(), 2);
    assert_eq!(doc.items[1].item_type(), ItemType::Paragraph);

    let key = super::label_key("label");
    let def = &doc.labeled_links[&key];
    assert_eq!(def.url, "/url");
    assert_eq!(def.title, "title");
}

#[test]
fn full_collapsed_and_shortcut_references() {
    let doc = parse("[full][label] and [label][] and [label]\n\n[label]: /url");
    let p = para(&doc, 1);
    let links: Vec<_> = p
        .children
        .iter()
        .filter(|c| c.item_type() == ItemType::Link)
        .collect();
    assert_eq!(links.len(), 3);
    for link in links {
        assert_eq!(link.as_link().unwrap().url, "/url");
    }
    assert_eq!(text_of(&p.children[0].children[0]), "full");
}

#[test]
fn reference_labels_fold_case_and_whitespace() {
    let doc = parse("[Foo   Bar]\n\n[foo bar]: /url");
    let link = &para(&doc, 1).children[0];
    assert_eq!(link.as_link().unwrap().url, "/url");
}

#[test]
fn unresolved_reference_stays_literal() {
    let doc = parse("[nope] and ![nope]");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 1);
    assert_eq!(text_of(&p.children[0]), "[nope] and ![nope]");
}

#[test]
fn title_may_continue_on_the_next_line() {
    let doc = parse("[label]: /url\n\"wrapped title\"\n\ntext");
    let key = super::label_key("label");
    assert_eq!(doc.labeled_links[&key].title, "wrapped title");
    assert_eq!(doc.items.len(), 2);
}

#[test]
fn image_inside_link_text() {
    let doc = parse("[![alt](i.png)](u)");
    let link = &para(&doc, 1).children[0];
    assert_eq!(link.item_type(), ItemType::Link);
    assert_eq!(link.children.len(), 1);
    assert_eq!(link.children[0].item_type(), ItemType::Image);
}

#[test]
fn links_do_not_nest() {
    let doc = parse("[a [b](u1)](u2)");
    let p = para(&doc, 1);
    // The inner bracket wins; the outer stays literal.
    let types: Vec<_> = p.children.iter().map(|c| c.item_type()).collect();
    assert!(types.contains(&ItemType::Link));
    assert_eq!(
        p.children
            .iter()
            .filter(|c| c.item_type() == ItemType::Link)
            .count(),
        1
    );
}

#[test]
fn resolved_url_survives_clone() {
    let doc = parse("[x]\n\n[x]: /target");
    let copy = doc.clone();
    let link = copy.items[1].children[0].as_link().unwrap();
    assert_eq!(link.url, "/target");
    let key = super::label_key("x");
    assert_eq!(copy.labeled_links[&key].url, "/target");
}
