//! Small string helpers shared by the block and inline passes.

use crate::ctype::ispunct;
use unicode_categories::UnicodeCategories;

/// Case-folds and whitespace-collapses a reference-link or footnote label,
/// so `[FOO bar]` and `[foo   BAR]` key the same definition.
pub fn normalize_label(label: &str) -> String {
    let folded = caseless::default_case_fold_str(label.trim());
    let mut out = String::with_capacity(folded.len());
    let mut last_was_ws = false;
    for c in folded.chars() {
        if c.is_whitespace() {
            if !last_was_ws {
                out.push(' ');
                last_was_ws = true;
            }
        } else {
            out.push(c);
            last_was_ws = false;
        }
    }
    out
}

/// ASCII punctuation may be backslash-escaped; everything else keeps the
/// backslash literally.
pub fn is_escapable(c: char) -> bool {
    ispunct(c)
}

/// Strips backslash escapes from destination/title text.
pub fn unescape_all(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&n) if is_escapable(n) => {
                    out.push(n);
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Unicode-aware "whitespace" for the flanking rules.
pub fn is_flanking_whitespace(c: char) -> bool {
    c.is_whitespace()
}

/// Unicode-aware "punctuation" for the flanking rules: ASCII punctuation
/// plus the Unicode `P` categories.
pub fn is_flanking_punctuation(c: char) -> bool {
    ispunct(c) || c.is_punctuation()
}

/// Strips a wrapping `<…>` from a link destination.
pub fn strip_url_brackets(url: &str) -> &str {
    if url.len() >= 2 && url.starts_with('<') && url.ends_with('>') {
        &url[1..url.len() - 1]
    } else {
        url
    }
}
