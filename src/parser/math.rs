//! Dollar-math scanning rules shared by the inline pass.
//!
//! Inline math is `$…$` with a non-space character adjacent to both
//! delimiters, which keeps `$5 and $6` plain text. Display math is
//! `$$…$$` and may span lines; a fenced code block whose info string is
//! `math` becomes a block-level math item in the block phase.

/// Info-string value that turns a fenced code block into math.
pub const MATH_FENCE_SYNTAX: &str = "math";

/// Scans for the closing run of an inline/display math span.
///
/// `chars` is the paragraph's flattened char stream (line breaks appear as
/// `'\n'`), `open_end` the index just past the opening run, `dollars` the
/// opening run length (1 or 2). Returns the index of the closing run's
/// first char.
pub fn scan_to_closing_dollar(chars: &[char], open_end: usize, dollars: usize) -> Option<usize> {
    // A single-dollar span must open against a non-space and stays on one
    // line; a double-dollar span may wrap.
    match chars.get(open_end) {
        Some(&c) if dollars == 1 && (c == ' ' || c == '\n') => return None,
        None => return None,
        _ => (),
    }

    let mut i = open_end;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == '\n' && dollars == 1 {
            return None;
        }
        if c == '$' {
            let run = chars[i..].iter().take_while(|&&x| x == '$').count();
            if run == dollars && i > open_end {
                if dollars == 1 && chars[i - 1] == ' ' {
                    i += run;
                    continue;
                }
                return Some(i);
            }
            i += run;
            continue;
        }
        i += 1;
    }
    None
}
