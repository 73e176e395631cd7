//! GFM table row handling for the block scanner.
//!
//! A table is a paragraph-candidate line followed by a delimiter row with
//! the same cell count; body rows follow until a blank line or a stricter
//! block start. Cell splitting must ignore pipes that are escaped (`\|`)
//! or sit inside an inline code span.

use crate::source::Line;

/// Splits one line into trimmed cell fragments, honouring escaped pipes
/// and backtick spans. Returns the cells plus whether any real pipe was
/// seen (a pipeless line is a single-cell body row but never a header).
pub(crate) fn split_row(line: &Line) -> (Vec<Line>, bool) {
    let chars = line.text.as_chars();
    let mut cuts: Vec<usize> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '`' => {
                let run = chars[i..].iter().take_while(|&&c| c == '`').count();
                // Pipes inside a matched backtick span do not split cells.
                let mut j = i + run;
                let mut closed = None;
                while j < chars.len() {
                    if chars[j] == '`' {
                        let r2 = chars[j..].iter().take_while(|&&c| c == '`').count();
                        if r2 == run {
                            closed = Some(j + r2);
                            break;
                        }
                        j += r2;
                    } else {
                        j += 1;
                    }
                }
                i = closed.unwrap_or(i + run);
            }
            '|' => {
                cuts.push(i);
                i += 1;
            }
            _ => i += 1,
        }
    }

    let had_pipe = !cuts.is_empty();
    let mut cells = Vec::new();
    let mut start = 0;
    cuts.push(chars.len());
    for &cut in &cuts {
        cells.push(trimmed_fragment(line, start, cut));
        start = cut + 1;
    }

    // A leading pipe produces an empty first fragment, a trailing pipe an
    // empty last one; both are syntax, not cells.
    if let Some(first) = cells.first() {
        if first.is_none() && had_pipe {
            cells.remove(0);
        }
    }
    if let Some(last) = cells.last() {
        if last.is_none() && had_pipe && !cells.is_empty() {
            cells.pop();
        }
    }

    (
        cells
            .into_iter()
            .map(|c| {
                c.unwrap_or(Line {
                    text: crate::pos_string::PosString::default(),
                    number: line.number,
                })
            })
            .collect(),
        had_pipe,
    )
}

/// Extracts `[start, end)` with surrounding spaces dropped; `None` when
/// nothing but whitespace remains.
fn trimmed_fragment(line: &Line, start: usize, end: usize) -> Option<Line> {
    let chars = line.text.as_chars();
    let end = end.min(chars.len());
    if start >= end {
        return None;
    }
    let lead = chars[start..end]
        .iter()
        .take_while(|&&c| c == ' ' || c == '\t')
        .count();
    let trail = chars[start + lead..end]
        .iter()
        .rev()
        .take_while(|&&c| c == ' ' || c == '\t')
        .count();
    let s = start + lead;
    let e = end - trail;
    if s >= e {
        return None;
    }
    Some(Line {
        text: line.text.substr(s, e - s),
        number: line.number,
    })
}
