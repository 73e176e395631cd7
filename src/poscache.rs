//! A read-only interval index over a finalised document, answering "which
//! items cover this source rectangle, outermost first".
//!
//! The cache borrows the document; queries may run from any number of
//! readers as long as nobody mutates it. There is no incremental update:
//! reparse, rebuild.

use crate::nodes::{Document, Item, ItemType, Sourcepos};

/// Per top-level entry: the item plus its summary span.
struct TopEntry<'d> {
    item: &'d Item,
    span: Sourcepos,
}

/// Lexicographic overlap of two inclusive spans.
fn intersects(a: &Sourcepos, b: &Sourcepos) -> bool {
    !a.is_synthetic() && !b.is_synthetic() && a.start <= b.end && b.start <= a.end
}

/// The position cache.
///
/// ```
/// let doc = marktree::parse_document("> Quote.");
/// let cache = marktree::PosCache::new(&doc);
/// let chain = cache.find_first_in_cache((0, 2, 0, 2).into());
/// assert_eq!(chain.len(), 3); // Blockquote, Paragraph, Text
/// ```
pub struct PosCache<'d> {
    top: Vec<TopEntry<'d>>,
}

impl<'d> PosCache<'d> {
    /// Indexes every positioned top-level item and footnote body,
    /// ordered by start position.
    pub fn new(doc: &'d Document) -> Self {
        let mut top: Vec<TopEntry<'d>> = doc
            .items
            .iter()
            .chain(doc.footnotes.values())
            .filter(|i| !i.pos.is_synthetic())
            .map(|item| TopEntry {
                item,
                span: item.pos,
            })
            .collect();
        top.sort_by_key(|e| (e.span.start, e.span.end));
        PosCache { top }
    }

    /// The ancestor chain of the first item (in document order) whose span
    /// intersects `rect`: outermost first, descending through structural
    /// containers to the first intersecting leaf. Empty when nothing
    /// touches the rectangle.
    pub fn find_first_in_cache(&self, rect: Sourcepos) -> Vec<&'d Item> {
        // Top-level spans are disjoint and ordered, so their ends are
        // ordered too: binary search to the first entry that can overlap,
        // then scan the window.
        let lo = self.top.partition_point(|e| e.span.end < rect.start);

        let mut found = None;
        for entry in &self.top[lo..] {
            if entry.span.start > rect.end {
                break;
            }
            if intersects(&entry.span, &rect) {
                found = Some(entry.item);
                break;
            }
        }

        let mut chain = Vec::new();
        let mut cursor = match found {
            Some(item) => item,
            None => return chain,
        };

        loop {
            chain.push(cursor);
            // User-defined items are indexed by span only; predefined
            // leaves end the chain.
            if cursor.item_type() == ItemType::UserDefined || !cursor.is_structural_container() {
                break;
            }
            match cursor.children.iter().find(|c| intersects(&c.pos, &rect)) {
                Some(child) => cursor = child,
                None => break,
            }
        }
        chain
    }
}
