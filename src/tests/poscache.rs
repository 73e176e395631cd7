use super::parse;
use crate::nodes::{ItemType, Sourcepos};
use crate::PosCache;
use pretty_assertions::assert_eq;

fn types(chain: &[&crate::nodes::Item]) -> Vec<ItemType> {
    chain.iter().map(|i| i.item_type()).collect()
}

#[test]
fn empty_document_answers_nothing() {
    let doc = parse("");
    let cache = PosCache::new(&doc);
    assert!(cache.find_first_in_cache((0, 0, 0, 0).into()).is_empty());
    assert!(cache.find_first_in_cache((1, 1, 1, 1).into()).is_empty());
}

#[test]
fn paragraph_point_query() {
    let doc = parse("This is just a text!");
    let cache = PosCache::new(&doc);

    let chain = cache.find_first_in_cache((0, 0, 0, 0).into());
    assert_eq!(types(&chain), vec![ItemType::Paragraph, ItemType::Text]);

    assert!(cache.find_first_in_cache((1, 0, 1, 0).into()).is_empty());
}

#[test]
fn every_paragraph_is_reachable() {
    let doc = parse("\nParagraph 1.\n\nParagraph 2.\n");
    let cache = PosCache::new(&doc);
    assert!(cache.find_first_in_cache((0, 0, 0, 0).into()).is_empty());

    for (line, text) in [(1, "Paragraph 1."), (3, "Paragraph 2.")] {
        let chain = cache.find_first_in_cache((line, 0, line, 0).into());
        assert_eq!(types(&chain), vec![ItemType::Paragraph, ItemType::Text]);
        assert_eq!(chain[1].text().unwrap(), text);
    }
}

#[test]
fn inline_code_is_addressable() {
    let doc = parse("Code in the `text`.");
    let cache = PosCache::new(&doc);

    for col in [12, 13, 17] {
        let chain = cache.find_first_in_cache((0, col, 0, col).into());
        assert_eq!(types(&chain), vec![ItemType::Paragraph, ItemType::Code]);
    }

    // A wide rectangle reports the first intersecting leaf.
    let chain = cache.find_first_in_cache((0, 0, 0, 17).into());
    assert_eq!(types(&chain), vec![ItemType::Paragraph, ItemType::Text]);

    let chain = cache.find_first_in_cache((0, 18, 0, 18).into());
    assert_eq!(types(&chain), vec![ItemType::Paragraph, ItemType::Text]);
    assert_eq!(chain[1].text().unwrap(), ".");
}

#[test]
fn blockquote_chains() {
    let doc = parse("> Quote paragraph 1.\n>\n> Quote paragraph 2.\n>\n>> Nested quote");
    let cache = PosCache::new(&doc);

    // The quote marker itself belongs to the quote alone.
    let chain = cache.find_first_in_cache((0, 0, 0, 0).into());
    assert_eq!(types(&chain), vec![ItemType::Blockquote]);

    // A rectangle wrapping over the line end reaches the first leaf.
    let chain = cache.find_first_in_cache((0, 0, 1, 0).into());
    assert_eq!(
        types(&chain),
        vec![ItemType::Blockquote, ItemType::Paragraph, ItemType::Text]
    );

    let chain = cache.find_first_in_cache((4, 1, 4, 1).into());
    assert_eq!(types(&chain), vec![ItemType::Blockquote, ItemType::Blockquote]);

    let chain = cache.find_first_in_cache((2, 0, 2, 0).into());
    assert_eq!(types(&chain), vec![ItemType::Blockquote]);

    let chain = cache.find_first_in_cache((4, 3, 4, 3).into());
    assert_eq!(
        types(&chain),
        vec![
            ItemType::Blockquote,
            ItemType::Blockquote,
            ItemType::Paragraph,
            ItemType::Text
        ]
    );

    // The seed scenario: (line 4, col 4) inside the nested quote's text.
    let chain = cache.find_first_in_cache((4, 4, 4, 4).into());
    assert_eq!(
        types(&chain),
        vec![
            ItemType::Blockquote,
            ItemType::Blockquote,
            ItemType::Paragraph,
            ItemType::Text
        ]
    );
}

#[test]
fn code_block_is_a_leaf() {
    let doc = parse("```cpp\nif (a > b)\n  f();\n```");
    let cache = PosCache::new(&doc);
    for rect in [(0, 0, 0, 0), (0, 1, 0, 1), (1, 2, 1, 2)] {
        let chain = cache.find_first_in_cache(rect.into());
        assert_eq!(types(&chain), vec![ItemType::Code]);
    }
}

#[test]
fn footnote_bodies_are_indexed() {
    let doc = parse("x[^n]\n\n[^n]: note body");
    let cache = PosCache::new(&doc);
    let chain = cache.find_first_in_cache((2, 7, 2, 7).into());
    assert_eq!(
        types(&chain),
        vec![ItemType::Footnote, ItemType::Paragraph, ItemType::Text]
    );
}

#[test]
fn chains_are_nested_and_touch_the_rect() {
    let doc = parse("> - item *styled*\n> - two");
    let cache = PosCache::new(&doc);
    for line in 0..2 {
        for col in 0..20 {
            let rect = Sourcepos::new(line, col, line, col);
            let chain = cache.find_first_in_cache(rect);
            for pair in chain.windows(2) {
                assert!(pair[0].pos.contains(&pair[1].pos));
            }
            for item in &chain {
                assert!(item.pos.contains(&rect));
            }
        }
    }
}
