mod autolink;
mod core;
mod headings;
mod links;
mod plugins;
mod poscache;
mod tasklist;

use crate::nodes::{Document, Item, ItemType, ItemValue, StyleOpts};

/// The synthetic path every unit test parses under.
pub const TEST_PATH: &str = "/test.md";

pub fn parse(text: &str) -> Document {
    let doc = crate::Parser::new().parse_text(text, TEST_PATH);
    assert_doc_sane(&doc);
    doc
}

/// `doc.items[index]`, asserting it is a paragraph.
pub fn para(doc: &Document, index: usize) -> &Item {
    let item = &doc.items[index];
    assert_eq!(item.item_type(), ItemType::Paragraph);
    item
}

pub fn text_of(item: &Item) -> &str {
    item.text().expect("expected a text item")
}

/// The map key a label gets under [`TEST_PATH`].
pub fn label_key(label: &str) -> String {
    crate::refmap::label_key(label, TEST_PATH)
}

/// Cross-cutting invariants asserted after every parse: span containment,
/// per-paragraph style balance and heading-label uniqueness.
pub fn assert_doc_sane(doc: &Document) {
    for item in doc.items.iter().chain(doc.footnotes.values()) {
        assert_span_containment(item);
        assert_style_balance(item);
    }

    let mut labels = std::collections::HashSet::new();
    for item in &doc.items {
        item.walk(&mut |it| {
            if let ItemValue::Heading(ref h) = it.value {
                assert!(labels.insert(h.label.clone()), "duplicate label {}", h.label);
                assert!(doc.labeled_headings.contains_key(&h.label));
            }
        });
    }
}

fn assert_span_containment(item: &Item) {
    for child in &item.children {
        if !item.pos.is_synthetic() && !child.pos.is_synthetic() {
            assert!(
                item.pos.contains(&child.pos),
                "{:?} span {} escapes parent {}",
                child.item_type(),
                child.pos,
                item.pos
            );
        }
        assert_span_containment(child);
    }
}

fn assert_style_balance(item: &Item) {
    if item.item_type() == ItemType::Paragraph {
        let mut opened: std::collections::HashMap<StyleOpts, i64> =
            std::collections::HashMap::new();
        for child in &item.children {
            let (opens, closes) = match child.value {
                ItemValue::Text(ref t) => (&t.open_styles, &t.close_styles),
                ItemValue::Link(ref l) | ItemValue::Image(ref l) => {
                    (&l.open_styles, &l.close_styles)
                }
                _ => continue,
            };
            for d in opens {
                *opened.entry(d.style).or_default() += 1;
            }
            for d in closes {
                *opened.entry(d.style).or_default() -= 1;
            }
        }
        for (style, count) in opened {
            assert_eq!(count, 0, "unbalanced style bit {}", style);
        }
    }
    for child in &item.children {
        assert_style_balance(child);
    }
}
