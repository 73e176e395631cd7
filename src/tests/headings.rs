use super::{parse, TEST_PATH};
use pretty_assertions::assert_eq;

#[test]
fn duplicate_headings_get_numbered_labels() {
    let doc = parse("# tool\n# tool\n# tool");
    let labels: Vec<String> = doc.items[1..]
        .iter()
        .map(|h| h.as_heading().unwrap().label.clone())
        .collect();
    assert_eq!(
        labels,
        vec![
            format!("#tool/{}", TEST_PATH),
            format!("#tool-1/{}", TEST_PATH),
            format!("#tool-2/{}", TEST_PATH),
        ]
    );
    for label in &labels {
        assert!(doc.labeled_headings.contains_key(label));
        assert_eq!(
            doc.heading_by_label(label).unwrap().as_heading().unwrap().label,
            *label
        );
    }
}

#[test]
fn presuffixed_slug_collides_and_gains_another_suffix() {
    let doc = parse("# tool\n# tool\n# tool-1");
    let labels: Vec<String> = doc.items[1..]
        .iter()
        .map(|h| h.as_heading().unwrap().label.clone())
        .collect();
    assert_eq!(labels[0], format!("#tool/{}", TEST_PATH));
    assert_eq!(labels[1], format!("#tool-1/{}", TEST_PATH));
    // `tool-1` now collides with the suffixed label above it.
    assert_eq!(labels[2], format!("#tool-1-1/{}", TEST_PATH));
}

#[test]
fn slugs_drop_punctuation_and_join_with_dashes() {
    let doc = parse("# A b: c's (D)");
    let label = &doc.items[1].as_heading().unwrap().label;
    assert_eq!(label, &format!("#a-b-c-s-d/{}", TEST_PATH));
}

#[test]
fn styled_heading_uses_plain_text_for_the_slug() {
    let doc = parse("# *Styled* `code`");
    let label = &doc.items[1].as_heading().unwrap().label;
    assert_eq!(label, &format!("#styled-code/{}", TEST_PATH));
}

#[test]
fn headings_in_containers_are_labeled_too() {
    let doc = parse("> # quoted");
    let heading = &doc.items[1].children[0];
    let label = &heading.as_heading().unwrap().label;
    assert!(doc.labeled_headings.contains_key(label));
}
