//! GFM extended autolinks: bare `www.`, `http(s)://`, `ftp://` and email
//! addresses inside plain text runs.
//!
//! Implemented as the built-in text plugin
//! [`GITHUB_AUTOLINK_PLUGIN`](super::plugins::GITHUB_AUTOLINK_PLUGIN): it
//! rescans every text run after the core inline pass and splits matched
//! spans out into links, trimming trailing punctuation per the GFM rule.

use crate::ctype::isalnum;
use crate::nodes::{Item, ItemValue, NodeLink, Sourcepos};
use crate::strings::unescape_all;

use super::plugins::{PluginContext, TextData};

pub fn github_autolinks(items: &mut Vec<Item>, raw: &mut Vec<TextData>, ctx: &mut PluginContext) {
    let mut out_items: Vec<Item> = Vec::with_capacity(items.len());
    let mut out_raw: Vec<TextData> = Vec::with_capacity(raw.len());
    let mut ri = 0usize;

    for item in items.drain(..) {
        if !matches!(item.value, ItemValue::Text(..)) {
            out_items.push(item);
            continue;
        }
        let data = raw[ri].clone();
        ri += 1;
        split_autolinks(item, data, ctx, &mut out_items, &mut out_raw);
    }

    *items = out_items;
    *raw = out_raw;
}

fn split_autolinks(
    item: Item,
    data: TextData,
    ctx: &mut PluginContext,
    out_items: &mut Vec<Item>,
    out_raw: &mut Vec<TextData>,
) {
    let chars: Vec<char> = data.str.chars().collect();
    let node = match &item.value {
        ItemValue::Text(t) => t.clone(),
        _ => unreachable!(),
    };

    let mut cursor = 0usize;
    let mut segments: Vec<(usize, usize, Option<AutolinkMatch>)> = Vec::new();

    while let Some(m) = find_autolink(&chars, cursor) {
        if m.start > cursor {
            segments.push((cursor, m.start, None));
        }
        let end = m.end;
        segments.push((m.start, end, Some(m)));
        cursor = end;
    }
    if segments.is_empty() {
        out_items.push(item);
        out_raw.push(data);
        return;
    }
    if cursor < chars.len() {
        segments.push((cursor, chars.len(), None));
    }

    let seg_count = segments.len();
    for (si, (s, e, link)) in segments.into_iter().enumerate() {
        let seg_raw: String = chars[s..e].iter().collect();
        let pos = Sourcepos::new(
            data.pos.start.line,
            data.pos.start.column + s as i64,
            data.pos.start.line,
            data.pos.start.column + (e - 1) as i64,
        );
        match link {
            Some(m) => {
                let text: String = chars[s..e].iter().collect();
                let mut link = NodeLink {
                    url: m.url,
                    title: String::new(),
                    text,
                    opts: node.opts,
                    ..NodeLink::default()
                };
                if si == 0 {
                    link.open_styles = node.open_styles.clone();
                }
                if si == seg_count - 1 {
                    link.close_styles = node.close_styles.clone();
                }
                out_items.push(Item::new(ctx.next_id(), ItemValue::Link(link), pos));
            }
            None => {
                let mut seg = node.clone();
                seg.text = unescape_all(&seg_raw);
                seg.open_styles = if si == 0 { node.open_styles.clone() } else { Vec::new() };
                seg.close_styles = if si == seg_count - 1 {
                    node.close_styles.clone()
                } else {
                    Vec::new()
                };
                seg.space_before = si == 0 && node.space_before;
                seg.space_after = si == seg_count - 1 && node.space_after;
                out_items.push(Item::new(ctx.next_id(), ItemValue::Text(seg), pos));
                out_raw.push(TextData { str: seg_raw, pos });
            }
        }
    }
}

struct AutolinkMatch {
    start: usize,
    end: usize,
    url: String,
}

/// Finds the next autolink candidate at or after `from`.
fn find_autolink(chars: &[char], from: usize) -> Option<AutolinkMatch> {
    let mut i = from;
    while i < chars.len() {
        // A candidate must sit at a word boundary.
        let boundary = i == 0
            || matches!(chars[i - 1], ' ' | '\t' | '(' | '*' | '_' | '~');

        if boundary {
            if let Some(m) = match_scheme(chars, i).or_else(|| match_www(chars, i)) {
                return Some(m);
            }
        }
        if chars[i] == '@' {
            if let Some(m) = match_email(chars, i) {
                return Some(m);
            }
        }
        i += 1;
    }
    None
}

fn starts_with_at(chars: &[char], at: usize, s: &str) -> bool {
    let pat: Vec<char> = s.chars().collect();
    chars.len() >= at + pat.len() && chars[at..at + pat.len()] == pat[..]
}

fn match_scheme(chars: &[char], at: usize) -> Option<AutolinkMatch> {
    let scheme_len = if starts_with_at(chars, at, "https://") {
        8
    } else if starts_with_at(chars, at, "http://") {
        7
    } else if starts_with_at(chars, at, "ftp://") {
        6
    } else {
        return None;
    };
    let end = trim_url_end(chars, at, link_end(chars, at + scheme_len));
    if end <= at + scheme_len {
        return None;
    }
    let url: String = chars[at..end].iter().collect();
    Some(AutolinkMatch {
        start: at,
        end,
        url,
    })
}

fn match_www(chars: &[char], at: usize) -> Option<AutolinkMatch> {
    if !starts_with_at(chars, at, "www.") {
        return None;
    }
    let end = trim_url_end(chars, at, link_end(chars, at + 4));
    if !valid_domain(&chars[at..end]) {
        return None;
    }
    let text: String = chars[at..end].iter().collect();
    Some(AutolinkMatch {
        start: at,
        end,
        url: format!("http://{}", text),
    })
}

fn match_email(chars: &[char], at_sign: usize) -> Option<AutolinkMatch> {
    // Local part: scan backwards over the permitted characters.
    let mut start = at_sign;
    while start > 0 {
        let c = chars[start - 1];
        if isalnum(c) || matches!(c, '.' | '-' | '_' | '+') {
            start -= 1;
        } else {
            break;
        }
    }
    if start == at_sign {
        return None;
    }

    let mut end = at_sign + 1;
    let mut last_dot = None;
    while end < chars.len() {
        let c = chars[end];
        if isalnum(c) || c == '-' || c == '_' {
            end += 1;
        } else if c == '.' && end + 1 < chars.len() && isalnum(chars[end + 1]) {
            last_dot = Some(end);
            end += 1;
        } else {
            break;
        }
    }
    last_dot?;
    // The final label may not end in `-` or `_`.
    if matches!(chars[end - 1], '-' | '_') {
        return None;
    }

    let addr: String = chars[start..end].iter().collect();
    Some(AutolinkMatch {
        start,
        end,
        url: format!("mailto:{}", addr),
    })
}

/// Everything up to whitespace or `<` belongs to the candidate.
fn link_end(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '<' {
        i += 1;
    }
    i
}

/// GFM trailing punctuation: strip `.,:;!?*_~'"` and any `)` without a
/// matching `(` inside the candidate.
fn trim_url_end(chars: &[char], start: usize, mut end: usize) -> usize {
    loop {
        if end <= start {
            return end;
        }
        let c = chars[end - 1];
        if matches!(c, '.' | ',' | ':' | ';' | '!' | '?' | '*' | '_' | '~' | '\'' | '"') {
            end -= 1;
            continue;
        }
        if c == ')' {
            let opens = chars[start..end].iter().filter(|&&x| x == '(').count();
            let closes = chars[start..end].iter().filter(|&&x| x == ')').count();
            if closes > opens {
                end -= 1;
                continue;
            }
        }
        return end;
    }
}

fn valid_domain(candidate: &[char]) -> bool {
    // `www.` plus at least one more label of letters and digits.
    let dots = candidate.iter().filter(|&&c| c == '.').count();
    dots >= 1
        && candidate.len() > 4
        && candidate[4..]
            .iter()
            .take_while(|&&c| c != '/')
            .any(|&c| isalnum(c))
}
