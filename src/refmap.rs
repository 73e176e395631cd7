//! Label bookkeeping: reference-link definitions, footnote definitions and
//! the heading slugger.
//!
//! All three maps share one key shape, `#<name>/<absolute-path>`, so a
//! combined multi-file document keeps per-file namespaces apart.

use rustc_hash::FxHashSet;
use unicode_categories::UnicodeCategories;

use crate::strings::normalize_label;

/// Builds the `#<label>/<path>` key for reference links and footnotes.
pub fn label_key(label: &str, path: &str) -> String {
    format!("#{}/{}", normalize_label(label), path)
}

/// Converts heading text to canonical, unique anchors of the form
/// `#<slug>/<path>`.
///
/// Uniqueness is tracked per instance; use one slugger per parsed document.
/// The first `tool` becomes `#tool/p`, the second `#tool-1/p`, and a
/// heading whose own text already ends in `-1` keeps colliding until a
/// further suffix frees it (`#tool-1-1/p`).
#[derive(Debug, Default)]
pub struct HeadingSlugger {
    seen: FxHashSet<String>,
}

impl HeadingSlugger {
    pub fn new() -> Self {
        HeadingSlugger::default()
    }

    /// Lowercases, keeps letters and digits, joins everything else with
    /// `-`, then suffixes `-1`, `-2`, … until the label is free.
    pub fn label_for(&mut self, heading_text: &str, path: &str) -> String {
        let slug = slugify(heading_text);

        let mut uniq = 0usize;
        loop {
            let candidate = if uniq == 0 {
                format!("#{}/{}", slug, path)
            } else {
                format!("#{}-{}/{}", slug, uniq, path)
            };
            if self.seen.insert(candidate.clone()) {
                return candidate;
            }
            uniq += 1;
        }
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.to_lowercase().chars() {
        if c.is_letter() || c.is_number() || c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}
