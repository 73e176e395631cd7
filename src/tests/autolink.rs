use super::{para, parse, text_of};
use crate::nodes::ItemType;
use ntest::test_case;
use pretty_assertions::assert_eq;

#[test]
fn pointy_uri_autolink() {
    let doc = parse("go to <https://example.com/x> now");
    let p = para(&doc, 1);
    let link = p.children[1].as_link().unwrap();
    assert_eq!(link.url, "https://example.com/x");
    assert_eq!(link.text, "https://example.com/x");
    assert_eq!(p.children[1].pos, (0, 6, 0, 28).into());
}

#[test]
fn pointy_email_autolink() {
    let doc = parse("<user@example.com>");
    let link = para(&doc, 1).children[0].as_link().unwrap();
    assert_eq!(link.url, "mailto:user@example.com");
    assert_eq!(link.text, "user@example.com");
}

#[test]
fn bare_url_in_text() {
    let doc = parse("visit https://example.com/a today");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 3);
    assert_eq!(text_of(&p.children[0]), "visit ");
    let link = p.children[1].as_link().unwrap();
    assert_eq!(link.url, "https://example.com/a");
    assert_eq!(text_of(&p.children[2]), " today");
}

#[test]
fn www_autolink_gets_a_scheme() {
    let doc = parse("see www.example.com please");
    let link = para(&doc, 1).children[1].as_link().unwrap();
    assert_eq!(link.url, "http://www.example.com");
    assert_eq!(link.text, "www.example.com");
}

#[test]
fn bare_email_in_text() {
    let doc = parse("mail me@example.com ok");
    let link = para(&doc, 1).children[1].as_link().unwrap();
    assert_eq!(link.url, "mailto:me@example.com");
}

#[test_case("www.google.com.", "www.google.com")]
#[test_case("www.google.com,", "www.google.com")]
#[test_case("www.google.com!", "www.google.com")]
#[test_case("www.google.com?", "www.google.com")]
fn trailing_punctuation_is_excluded(input: &str, expected: &str) {
    let doc = parse(input);
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 2);
    let link = p.children[0].as_link().unwrap();
    assert_eq!(link.text, expected);
    assert_eq!(text_of(&p.children[1]), &input[input.len() - 1..]);
}

#[test]
fn unbalanced_paren_is_trimmed() {
    let doc = parse("x (see www.example.com/a) y");
    let link = para(&doc, 1).children[1].as_link().unwrap();
    assert_eq!(link.text, "www.example.com/a");
}

#[test]
fn balanced_paren_is_kept() {
    let doc = parse("www.example.com/a_(b)");
    let link = para(&doc, 1).children[0].as_link().unwrap();
    assert_eq!(link.text, "www.example.com/a_(b)");
}

#[test]
fn mid_word_is_not_an_autolink() {
    let doc = parse("xhttps://nope and awww.nope.com");
    let p = para(&doc, 1);
    assert_eq!(p.children.len(), 1);
}
