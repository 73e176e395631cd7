//! Inline text post-processors.
//!
//! Plugins run after the core inline pass, once per paragraph-like
//! container, in ascending id order. A plugin sees the container's inline
//! items together with the parallel raw-text runs ([`TextData`]) of its
//! `Text` items, and must keep the two in step when it splits or removes
//! runs.

use crate::nodes::{Item, ItemValue, NodeId, Sourcepos, StyleDelim, StyleOpts};
use crate::strings::is_flanking_whitespace;

/// Identifier ordering the plugin chain.
pub type PluginId = i32;

/// The built-in GFM autolink pass.
pub const GITHUB_AUTOLINK_PLUGIN: PluginId = 1;
/// First id available for user plugins; ids below this are reserved.
pub const USER_DEFINED_PLUGIN: PluginId = 64;

/// The raw source slice behind one `Text` item: exactly the characters the
/// tokenizer consumed (escape backslashes included) plus their span.
#[derive(Debug, Clone, PartialEq)]
pub struct TextData {
    pub str: String,
    pub pos: Sourcepos,
}

/// State handed to a plugin invocation.
pub struct PluginContext<'a> {
    /// The parameters the plugin was registered with.
    pub params: &'a [String],
    pub(crate) next_id: &'a mut dyn FnMut() -> NodeId,
}

impl<'a> PluginContext<'a> {
    /// Allocates a document-unique id for an item the plugin creates.
    pub fn next_id(&mut self) -> NodeId {
        (self.next_id)()
    }
}

/// A registered text plugin: operates on the inline items of one container.
pub type TextPluginFn = fn(&mut Vec<Item>, &mut Vec<TextData>, &mut PluginContext);

#[derive(Clone)]
pub(crate) struct TextPluginEntry {
    pub id: PluginId,
    pub func: TextPluginFn,
    pub process_in_links: bool,
    pub params: Vec<String>,
}

/// The parametric emphasis-template plugin.
///
/// Register with `params = [marker, style-bit]`, e.g. `["^", "8"]`: the
/// marker becomes an emphasis delimiter with `*`-like open/close rules, the
/// decimal style bit is OR-ed into every text run between matched
/// delimiters, and the delimiter spans are recorded in the runs' open/close
/// style lists. Unmatched markers stay literal text.
pub fn emphasis_template_plugin(
    items: &mut Vec<Item>,
    raw: &mut Vec<TextData>,
    ctx: &mut PluginContext,
) {
    let marker = match ctx.params.get(0).and_then(|p| p.chars().next()) {
        Some(c) => c,
        None => return,
    };
    let style: StyleOpts = match ctx.params.get(1).and_then(|p| p.parse().ok()) {
        Some(s) => s,
        None => return,
    };

    let runs = find_marker_runs(items, raw, marker);
    if runs.is_empty() {
        return;
    }
    let matches = match_runs(&runs);
    if matches.is_empty() {
        return;
    }

    apply_matches(items, raw, &matches, style, ctx);
}

/// A run of marker characters inside one raw text run.
struct MarkerRun {
    /// Index of the `Text` item (into the items vec).
    item: usize,
    /// Char offset of the run within the raw string.
    offset: usize,
    len: usize,
    can_open: bool,
    can_close: bool,
    /// Line and starting virgin column of the run.
    line: i64,
    col: i64,
}

/// One matched delimiter pair, a single marker char on each side.
struct Match {
    open_item: usize,
    open_offset: usize,
    open_line: i64,
    open_col: i64,
    close_item: usize,
    close_offset: usize,
    close_line: i64,
    close_col: i64,
}

fn text_indices(items: &[Item]) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, it)| matches!(it.value, ItemValue::Text(..)))
        .map(|(i, _)| i)
        .collect()
}

fn find_marker_runs(items: &[Item], raw: &[TextData], marker: char) -> Vec<MarkerRun> {
    let texts = text_indices(items);
    debug_assert_eq!(texts.len(), raw.len());

    // The combined character sequence decides flanking: the char before a
    // run at the start of an item is the last char of the previous item's
    // raw text (consumed core delimiters leave no gap worth honouring).
    let mut runs = Vec::new();
    for (ri, &item_ix) in texts.iter().enumerate() {
        let chars: Vec<char> = raw[ri].str.chars().collect();
        let mut k = 0;
        while k < chars.len() {
            if chars[k] == '\\' {
                k += 2;
                continue;
            }
            if chars[k] != marker {
                k += 1;
                continue;
            }
            let len = chars[k..].iter().take_while(|&&c| c == marker).count();

            let before = if k > 0 {
                Some(chars[k - 1])
            } else if ri > 0 {
                raw[ri - 1].str.chars().last()
            } else {
                None
            };
            let after = if k + len < chars.len() {
                Some(chars[k + len])
            } else if ri + 1 < raw.len() {
                raw[ri + 1].str.chars().next()
            } else {
                None
            };

            let ws_before = before.map_or(true, is_flanking_whitespace);
            let ws_after = after.map_or(true, is_flanking_whitespace);

            runs.push(MarkerRun {
                item: item_ix,
                offset: k,
                len,
                can_open: !ws_after,
                can_close: !ws_before,
                line: raw[ri].pos.start.line,
                col: raw[ri].pos.start.column + k as i64,
            });
            k += len;
        }
    }
    runs
}

/// Stack matcher: each match consumes one marker char from the
/// content-adjacent end of the opener run and the content-adjacent start of
/// the closer run, so `^^text^^` yields two nested pairs and `^^text^`
/// leaves the outer opener literal.
fn match_runs(runs: &[MarkerRun]) -> Vec<Match> {
    struct Open {
        run: usize,
        consumed: usize,
    }
    let mut matches = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    for (ci, closer) in runs.iter().enumerate() {
        let mut remaining = closer.len;
        let mut consumed_close = 0;
        if closer.can_close {
            while remaining > 0 {
                let top = match stack.last_mut() {
                    Some(t) => t,
                    None => break,
                };
                let opener = &runs[top.run];
                // Content-adjacent char of the opener run is its last
                // unconsumed one.
                let open_offset = opener.offset + opener.len - 1 - top.consumed;
                let close_offset = closer.offset + consumed_close;
                matches.push(Match {
                    open_item: opener.item,
                    open_offset,
                    open_line: opener.line,
                    open_col: opener.col + (open_offset - opener.offset) as i64,
                    close_item: closer.item,
                    close_offset,
                    close_line: closer.line,
                    close_col: closer.col + (close_offset - closer.offset) as i64,
                });
                top.consumed += 1;
                if top.consumed == opener.len {
                    stack.pop();
                }
                remaining -= 1;
                consumed_close += 1;
            }
        }
        if remaining > 0 && closer.can_open && ci + 1 < runs.len() {
            // Leftover chars may still open against a later closer. Track
            // how many of this run's chars are already spoken for.
            stack.push(Open {
                run: ci,
                consumed: closer.len - remaining,
            });
        }
    }
    matches
}

fn apply_matches(
    items: &mut Vec<Item>,
    raw: &mut Vec<TextData>,
    matches: &[Match],
    style: StyleOpts,
    ctx: &mut PluginContext,
) {
    // Work per text item: which raw char offsets get removed, and which
    // style delimiters attach where. Style bits apply to every segment
    // strictly between an open and its close in paragraph order.
    let texts = text_indices(items);

    #[derive(Default, Clone)]
    struct PerItem {
        removed: Vec<usize>,
        /// Virgin columns of the removed markers that *open* a span.
        open_cols: Vec<i64>,
    }
    let mut per: Vec<PerItem> = vec![PerItem::default(); items.len()];

    for m in matches {
        per[m.open_item].removed.push(m.open_offset);
        per[m.close_item].removed.push(m.close_offset);
        per[m.open_item].open_cols.push(m.open_col);
    }

    // Rebuild each touched text item: split the raw run at removed marker
    // chars, style the spans between matched pairs, and re-home the
    // existing delimiter records on the surviving segments.
    let mut new_items: Vec<Item> = Vec::with_capacity(items.len());
    let mut new_raw: Vec<TextData> = Vec::with_capacity(raw.len());
    let mut ri = 0usize;
    let mut depth = 0usize;

    for (ix, item) in items.drain(..).enumerate() {
        if !texts.contains(&ix) {
            new_items.push(item);
            continue;
        }
        let data = &raw[ri];
        ri += 1;
        let info = &per[ix];
        if info.removed.is_empty() && depth == 0 {
            new_items.push(item);
            new_raw.push(data.clone());
            continue;
        }

        let (node, id) = match item {
            Item {
                value: ItemValue::Text(t),
                id,
                ..
            } => (t, id),
            _ => unreachable!(),
        };

        let chars: Vec<char> = data.str.chars().collect();
        let mut removed = info.removed.clone();
        removed.sort_unstable();

        // Cut points: every removed marker splits the run.
        let mut segments: Vec<(usize, usize, usize)> = Vec::new(); // (start, end, depth_after_start)
        let mut start = 0usize;
        for &r in &removed {
            if r > start {
                segments.push((start, r, depth));
            }
            // Opens increase depth for the following segment, closes
            // decrease it.
            let is_open = info
                .open_cols
                .contains(&(data.pos.start.column + r as i64));
            if is_open {
                depth += 1;
            } else {
                depth = depth.saturating_sub(1);
            }
            start = r + 1;
        }
        if start < chars.len() {
            segments.push((start, chars.len(), depth));
        }

        let mut first_of_item = true;
        let seg_count = segments.len();
        for (si, (s, e, d)) in segments.into_iter().enumerate() {
            // Strip escapes for the logical text of the segment.
            let seg_raw: String = chars[s..e].iter().collect();
            let seg_text = crate::strings::unescape_all(&seg_raw);
            let seg_pos = Sourcepos::new(
                data.pos.start.line,
                data.pos.start.column + s as i64,
                data.pos.start.line,
                data.pos.start.column + (e - 1) as i64,
            );
            let mut seg_node = node.clone();
            seg_node.text = seg_text;
            seg_node.opts = if d > 0 { node.opts | style } else { node.opts };
            seg_node.open_styles = Vec::new();
            seg_node.close_styles = Vec::new();
            if first_of_item {
                seg_node.open_styles = node.open_styles.clone();
                seg_node.space_before = node.space_before;
            } else {
                seg_node.space_before = false;
            }
            if si == seg_count - 1 {
                seg_node.close_styles = node.close_styles.clone();
                seg_node.space_after = node.space_after;
            } else {
                seg_node.space_after = false;
            }
            let seg_id = if first_of_item { id } else { ctx.next_id() };
            first_of_item = false;
            new_items.push(Item::new(seg_id, ItemValue::Text(seg_node), seg_pos));
            new_raw.push(TextData {
                str: seg_raw,
                pos: seg_pos,
            });
        }
    }

    // Attach the new delimiter records per matched pair: the open record
    // goes on the first text run strictly between the two markers, the
    // close record on the last. A pair enclosing no text run leaves no
    // record, keeping the open/close counts balanced.
    for m in matches {
        let open_at = (m.open_line, m.open_col);
        let close_at = (m.close_line, m.close_col);
        let mut first = None;
        let mut last = None;
        for (i, it) in new_items.iter().enumerate() {
            if !matches!(it.value, ItemValue::Text(..)) || it.pos.is_synthetic() {
                continue;
            }
            if (it.pos.start.line, it.pos.start.column) > open_at
                && (it.pos.end.line, it.pos.end.column) < close_at
            {
                if first.is_none() {
                    first = Some(i);
                }
                last = Some(i);
            }
        }
        if let (Some(f), Some(l)) = (first, last) {
            if let ItemValue::Text(ref mut t) = new_items[f].value {
                t.open_styles.push(StyleDelim {
                    style,
                    pos: Sourcepos::new(m.open_line, m.open_col, m.open_line, m.open_col),
                });
            }
            if let ItemValue::Text(ref mut t) = new_items[l].value {
                t.close_styles.push(StyleDelim {
                    style,
                    pos: Sourcepos::new(m.close_line, m.close_col, m.close_line, m.close_col),
                });
            }
        }
    }

    for it in new_items.iter_mut() {
        if let ItemValue::Text(ref mut t) = it.value {
            t.open_styles
                .sort_by_key(|d| (d.pos.start.line, d.pos.start.column));
            t.close_styles
                .sort_by_key(|d| (d.pos.start.line, d.pos.start.column));
        }
    }

    // Empty runs (whole item was markers) vanish.
    let mut merged_raw = Vec::new();
    let mut kept = Vec::new();
    let mut raw_iter = new_raw.into_iter();
    for it in new_items {
        let is_text = matches!(it.value, ItemValue::Text(..));
        let rd = if is_text { raw_iter.next() } else { None };
        if let ItemValue::Text(ref t) = it.value {
            if t.text.is_empty() && t.open_styles.is_empty() && t.close_styles.is_empty() {
                continue;
            }
        }
        if let Some(rd) = rd {
            merged_raw.push(rd);
        }
        kept.push(it);
    }

    *items = kept;
    *raw = merged_raw;
}
