//! Multi-file document assembly.
//!
//! With the recursive switch on, every resolved link whose target is an
//! existing local Markdown file is queued; each file is parsed completely
//! before the next starts. Per-file subtrees are prefixed with an `Anchor`
//! carrying the file's canonical path and separated by `PageBreak`s; the
//! visited set breaks cycles. Afterwards link urls that point at a visited
//! file are rewritten to that file's anchor label, and `#fragment` urls
//! become full heading labels when the current file defines them.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::nodes::{Document, Item, ItemValue, Sourcepos};
use crate::parser::{parse_into, IdGen, Parser};
use crate::refmap::HeadingSlugger;

pub(crate) fn parse_file(parser: &Parser, path: &Path, recursive: bool) -> io::Result<Document> {
    let root = path.canonicalize()?;

    let mut doc = Document::new();
    let mut ids = IdGen::default();
    let mut slugger = HeadingSlugger::new();

    let mut visited: FxHashSet<PathBuf> = FxHashSet::default();
    visited.insert(root.clone());
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root);

    let mut first = true;
    while let Some(file) = queue.pop_front() {
        let text = match fs::read_to_string(&file) {
            Ok(text) => text,
            Err(err) if first => return Err(err),
            // A vanished linked file loses its anchor; its links stay text.
            Err(_) => continue,
        };

        if !first {
            doc.items.push(Item::new(
                ids.next(),
                ItemValue::PageBreak,
                Sourcepos::synthetic(),
            ));
        }

        let before = doc.items.len();
        let label = file.to_string_lossy().to_string();
        parse_into(parser, &text, &label, &mut doc, &mut ids, &mut slugger);

        if recursive {
            let base = file.parent().map(Path::to_path_buf).unwrap_or_default();
            let mut targets = Vec::new();
            for item in &doc.items[before..] {
                collect_markdown_links(item, &base, parser.markdown_extensions(), &mut targets);
            }
            for target in targets {
                if visited.insert(target.clone()) {
                    queue.push_back(target);
                }
            }
        }
        first = false;
    }

    if recursive {
        rewrite_links(&mut doc);
    }
    Ok(doc)
}

fn is_local_url(url: &str) -> bool {
    !url.is_empty() && !url.starts_with('#') && !url.contains(':')
}

fn resolve_markdown_target(url: &str, base: &Path, extensions: &[String]) -> Option<PathBuf> {
    if !is_local_url(url) {
        return None;
    }
    let candidate = base.join(url);
    let ext = candidate.extension()?.to_string_lossy().to_string();
    if !extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
        return None;
    }
    candidate.canonicalize().ok()
}

fn collect_markdown_links(
    item: &Item,
    base: &Path,
    extensions: &[String],
    targets: &mut Vec<PathBuf>,
) {
    if let ItemValue::Link(ref link) = item.value {
        if let Some(target) = resolve_markdown_target(&link.url, base, extensions) {
            targets.push(target);
        }
    }
    for child in &item.children {
        collect_markdown_links(child, base, extensions, targets);
    }
}

/// Rewrites link urls in the combined document: targets of visited files
/// become the anchor label, `#fragment`s become heading labels of the
/// current file when defined there.
fn rewrite_links(doc: &mut Document) {
    let headings: FxHashSet<String> = doc.labeled_headings.keys().cloned().collect();
    let anchors: FxHashSet<String> = doc
        .items
        .iter()
        .filter_map(|i| match i.value {
            ItemValue::Anchor(ref path) => Some(path.clone()),
            _ => None,
        })
        .collect();

    let mut current = String::new();
    let items = std::mem::take(&mut doc.items);
    doc.items = items
        .into_iter()
        .map(|mut item| {
            if let ItemValue::Anchor(ref path) = item.value {
                current = path.clone();
            }
            rewrite_item(&mut item, &current, &headings, &anchors);
            item
        })
        .collect();
}

fn rewrite_item(
    item: &mut Item,
    current: &str,
    headings: &FxHashSet<String>,
    anchors: &FxHashSet<String>,
) {
    if let ItemValue::Link(ref mut link) = item.value {
        if link.url.starts_with('#') {
            let full = format!("{}/{}", link.url, current);
            if headings.contains(&full) {
                link.url = full;
            }
        } else if is_local_url(&link.url) {
            let base = Path::new(current).parent().map(Path::to_path_buf).unwrap_or_default();
            if let Ok(target) = base.join(&link.url).canonicalize() {
                let label = target.to_string_lossy().to_string();
                if anchors.contains(&label) {
                    link.url = label;
                }
            }
        }
    }
    for child in item.children.iter_mut() {
        rewrite_item(child, current, headings, anchors);
    }
}
