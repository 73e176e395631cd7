//! The line producer the block scanner consumes. Lines carry their source
//! line number with them, so pushing a line back only rewinds the logical
//! cursor and never renumbers anything.

use crate::pos_string::PosString;

/// A single produced line: logical text plus its 0-based source line number.
#[derive(Debug, Clone)]
pub struct Line {
    pub text: PosString,
    pub number: i64,
}

/// Finite stream of [`Line`]s over an in-memory document, with an unbounded
/// push-back stack.
#[derive(Debug)]
pub struct LineSource {
    lines: Vec<Line>,
    next: usize,
    returned: Vec<Line>,
}

impl LineSource {
    /// Splits `text` on line endings (`\n`, `\r\n`, `\r`) and expands tabs,
    /// producing one [`Line`] per source line.
    pub fn new(text: &str, tab_stop: usize) -> Self {
        let mut lines = Vec::new();
        let mut number = 0i64;
        let mut rest = text;

        while !rest.is_empty() || (number == 0 && !text.is_empty()) {
            let (raw, remainder, had_ending) = match rest.find(|c| c == '\n' || c == '\r') {
                Some(i) => {
                    let raw = &rest[..i];
                    let after = if rest[i..].starts_with("\r\n") {
                        &rest[i + 2..]
                    } else {
                        &rest[i + 1..]
                    };
                    (raw, after, true)
                }
                None => (rest, "", false),
            };

            let mut text = PosString::new(raw);
            text.expand_tabs(tab_stop);
            lines.push(Line { text, number });

            number += 1;
            rest = remainder;
            if !had_ending {
                break;
            }
        }

        LineSource {
            lines,
            next: 0,
            returned: Vec::new(),
        }
    }

    /// Builds a source from already-prepared lines, as the container
    /// recursion does for stripped blockquote and list-item bodies.
    pub fn from_lines(lines: Vec<Line>) -> Self {
        LineSource {
            lines,
            next: 0,
            returned: Vec::new(),
        }
    }

    pub fn next_line(&mut self) -> Option<Line> {
        if let Some(line) = self.returned.pop() {
            return Some(line);
        }
        if self.next < self.lines.len() {
            let line = self.lines[self.next].clone();
            self.next += 1;
            Some(line)
        } else {
            None
        }
    }

    /// Returns an unconsumed line; the next [`next_line`](Self::next_line)
    /// call yields it again.
    pub fn push_back(&mut self, line: Line) {
        self.returned.push(line);
    }

    pub fn at_end(&self) -> bool {
        self.returned.is_empty() && self.next >= self.lines.len()
    }
}
