//! A mutable logical line that remembers, for every character, the column in
//! the raw source line it came from. Escape removal, tab expansion and
//! whitespace simplification all go through the mutators here, so positions
//! reported by the parser always point at the raw source.

use crate::ctype::isspace;

/// One logical line of content plus its virgin-column map.
///
/// The map is queried with [`virgin_pos`] and is monotonically
/// non-decreasing: if `i <= j` then `virgin_pos(i) <= virgin_pos(j)`.
///
/// [`virgin_pos`]: PosString::virgin_pos
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosString {
    chars: Vec<char>,
    virgin: Vec<i64>,
}

impl PosString {
    /// Wraps a raw source line; character `i` starts out mapping to column
    /// `i`.
    pub fn new(s: &str) -> Self {
        let chars: Vec<char> = s.chars().collect();
        let virgin = (0..chars.len() as i64).collect();
        PosString { chars, virgin }
    }

    /// Current logical content.
    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn char_at(&self, i: usize) -> Option<char> {
        self.chars.get(i).copied()
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().copied()
    }

    /// The logical content as a char slice.
    pub fn as_chars(&self) -> &[char] {
        &self.chars
    }

    /// Column in the raw source line that produced logical character `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn virgin_pos(&self, i: usize) -> i64 {
        self.virgin[i]
    }

    /// Like [`virgin_pos`](PosString::virgin_pos) but saturates at the ends,
    /// for querying one-past-the-end spans on a non-empty string.
    pub fn virgin_pos_clamped(&self, i: usize) -> i64 {
        if self.virgin.is_empty() {
            -1
        } else if i >= self.virgin.len() {
            self.virgin[self.virgin.len() - 1]
        } else {
            self.virgin[i]
        }
    }

    /// Replaces every non-overlapping occurrence of `needle`, left to right.
    ///
    /// Replacement characters inherit the virgin columns of the needle
    /// characters they stand for; when the replacement is longer than the
    /// needle, the surplus characters all map to the needle's last column.
    pub fn replace(&mut self, needle: &str, with: &str) {
        let needle: Vec<char> = needle.chars().collect();
        let with: Vec<char> = with.chars().collect();
        if needle.is_empty() {
            return;
        }

        let mut chars = Vec::with_capacity(self.chars.len());
        let mut virgin = Vec::with_capacity(self.virgin.len());
        let mut i = 0;
        while i < self.chars.len() {
            if self.chars[i..].starts_with(&needle[..]) {
                for (k, &c) in with.iter().enumerate() {
                    chars.push(c);
                    virgin.push(self.virgin[i + k.min(needle.len() - 1)]);
                }
                i += needle.len();
            } else {
                chars.push(self.chars[i]);
                virgin.push(self.virgin[i]);
                i += 1;
            }
        }
        self.chars = chars;
        self.virgin = virgin;
    }

    /// Removes `len` characters starting at `offset`. Characters after the
    /// gap keep their pre-deletion origins.
    pub fn remove(&mut self, offset: usize, len: usize) {
        let end = (offset + len).min(self.chars.len());
        let offset = offset.min(self.chars.len());
        self.chars.drain(offset..end);
        self.virgin.drain(offset..end);
    }

    /// Trims the ends and collapses every interior whitespace run to a
    /// single space; the surviving space keeps the run's first column.
    pub fn simplified(&self) -> PosString {
        let mut chars = Vec::with_capacity(self.chars.len());
        let mut virgin = Vec::with_capacity(self.virgin.len());
        let mut pending_space: Option<i64> = None;

        for (i, &c) in self.chars.iter().enumerate() {
            if isspace(c) {
                if pending_space.is_none() {
                    pending_space = Some(self.virgin[i]);
                }
            } else {
                if let Some(sp) = pending_space.take() {
                    if !chars.is_empty() {
                        chars.push(' ');
                        virgin.push(sp);
                    }
                }
                chars.push(c);
                virgin.push(self.virgin[i]);
            }
        }

        PosString { chars, virgin }
    }

    /// Extracts `len` characters starting at `offset` as a new string with
    /// the corresponding slice of the virgin map.
    pub fn substr(&self, offset: usize, len: usize) -> PosString {
        let offset = offset.min(self.chars.len());
        let end = (offset + len).min(self.chars.len());
        PosString {
            chars: self.chars[offset..end].to_vec(),
            virgin: self.virgin[offset..end].to_vec(),
        }
    }

    /// Expands tabs in place. Tab stops are fixed-width: every tab becomes
    /// `tab_stop` spaces, all mapping back to the tab's own column.
    pub fn expand_tabs(&mut self, tab_stop: usize) {
        if self.chars.contains(&'\t') {
            let spaces: String = " ".repeat(tab_stop);
            self.replace("\t", &spaces);
        }
    }

    /// Count of leading space characters.
    pub fn leading_spaces(&self) -> usize {
        self.chars.iter().take_while(|&&c| c == ' ').count()
    }

    /// Index of the first character that is not a space or tab, or `len()`.
    pub fn first_nonspace(&self) -> usize {
        self.chars
            .iter()
            .position(|&c| !matches!(c, ' ' | '\t'))
            .unwrap_or(self.chars.len())
    }

    /// True when the line holds nothing but spaces and tabs.
    pub fn is_blank(&self) -> bool {
        self.first_nonspace() == self.chars.len()
    }
}

impl From<&str> for PosString {
    fn from(s: &str) -> Self {
        PosString::new(s)
    }
}
