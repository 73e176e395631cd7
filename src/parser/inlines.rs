//! The inline pass: tokenizes a paragraph's content and resolves emphasis
//! with the CommonMark delimiter-run algorithm.
//!
//! Matched emphasis does not nest items. Each match yields a *style span*;
//! once the whole paragraph is resolved, every item between a span's
//! delimiters gets the span's bit OR-ed into its mask, the first item
//! receives the open delimiter record and the last the close record.
//! Consumed delimiter characters disappear; leftovers downgrade to text
//! and merge with equal neighbours.

use smallvec::SmallVec;

use crate::nodes::{
    Item, ItemValue, NodeCode, NodeLink, NodeMath, NodeText, Sourcepos, StyleDelim, StyleOpts,
    BOLD_TEXT, ITALIC_TEXT, STRIKETHROUGH_TEXT,
};
use crate::refmap::label_key;
use crate::scanners;
use crate::source::Line;
use crate::strings::{
    is_escapable, is_flanking_punctuation, is_flanking_whitespace, unescape_all,
};

use super::math;
use super::plugins::TextData;
use super::FileParser;

const MAX_LINK_LABEL_LENGTH: usize = 1000;

pub(crate) struct InlineResult {
    pub items: Vec<Item>,
    pub raw: Vec<TextData>,
}

pub(crate) fn parse_inlines(fp: &mut FileParser, lines: &[Line]) -> InlineResult {
    Subject::new(fp, lines).run()
}

/// One char of the flattened paragraph, remembering where it came from.
#[derive(Debug, Clone, Copy)]
struct PChar {
    ch: char,
    line: i64,
    col: i64,
}

struct Tok {
    item: Item,
    /// Raw source slice for `Text` items, feeding the plugin chain.
    raw: Option<String>,
    dead: bool,
}

struct Delim {
    tok: usize,
    ch: char,
    orig_len: usize,
    can_open: bool,
    can_close: bool,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Bracket {
    image: bool,
    tok: usize,
    delim_bottom: usize,
    content_start: usize,
    active: bool,
}

struct StyleSpan {
    style: StyleOpts,
    open_pos: Sourcepos,
    close_pos: Sourcepos,
    open_tok: usize,
    close_tok: usize,
}

pub(crate) struct Subject<'s, 'p> {
    fp: &'s mut FileParser<'p>,
    chars: Vec<PChar>,
    plain: Vec<char>,
    pos: usize,
    toks: Vec<Tok>,
    delims: Vec<Delim>,
    last_delim: Option<usize>,
    brackets: SmallVec<[Bracket; 8]>,
    spans: Vec<StyleSpan>,
    text: String,
    text_start: usize,
}

impl<'s, 'p> Subject<'s, 'p> {
    fn new(fp: &'s mut FileParser<'p>, lines: &[Line]) -> Self {
        let mut chars = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                let (l, c) = chars
                    .last()
                    .map(|p: &PChar| (p.line, p.col + 1))
                    .unwrap_or((line.number - 1, 0));
                chars.push(PChar { ch: '\n', line: l, col: c });
            }
            for k in 0..line.text.len() {
                chars.push(PChar {
                    ch: line.text.char_at(k).unwrap(),
                    line: line.number,
                    col: line.text.virgin_pos(k),
                });
            }
        }
        let plain = chars.iter().map(|p| p.ch).collect();
        Subject {
            fp,
            chars,
            plain,
            pos: 0,
            toks: Vec::new(),
            delims: Vec::new(),
            last_delim: None,
            brackets: SmallVec::new(),
            spans: Vec::new(),
            text: String::new(),
            text_start: 0,
        }
    }

    fn run(mut self) -> InlineResult {
        while self.pos < self.chars.len() {
            let c = self.plain[self.pos];

            // Leading whitespace of every logical line is layout.
            if (self.pos == 0 || self.plain[self.pos - 1] == '\n') && (c == ' ' || c == '\t') {
                self.pos += 1;
                continue;
            }

            match c {
                '\n' => self.handle_newline(),
                '\\' => self.handle_backslash(),
                '`' => self.handle_backticks(),
                '*' | '_' | '~' => self.handle_delim(c),
                '$' => self.handle_dollars(),
                '<' => self.handle_pointy_brace(),
                '[' => {
                    self.flush_text_to(self.pos);
                    let tok = self.emit_bracket_text("[", self.pos, self.pos);
                    self.push_bracket(false, tok, self.pos + 1);
                    self.pos += 1;
                }
                '!' if self.plain.get(self.pos + 1) == Some(&'[') => {
                    self.flush_text_to(self.pos);
                    let tok = self.emit_bracket_text("![", self.pos, self.pos + 1);
                    self.push_bracket(true, tok, self.pos + 2);
                    self.pos += 2;
                }
                ']' => self.handle_close_bracket(),
                _ => {
                    self.accumulate(c, 1);
                }
            }
        }
        self.flush_text_trimmed(self.pos);
        self.process_emphasis(0);
        self.apply_spans_from(0);
        self.finish()
    }

    // --------------------------------------------------------------
    // Text runs
    // --------------------------------------------------------------

    fn accumulate(&mut self, ch: char, width: usize) {
        if self.text.is_empty() {
            self.text_start = self.pos;
        }
        self.text.push(ch);
        self.pos += width;
    }

    fn span(&self, start: usize, end_inclusive: usize) -> Sourcepos {
        let s = &self.chars[start];
        let e = &self.chars[end_inclusive.min(self.chars.len() - 1)];
        Sourcepos::new(s.line, s.col, e.line, e.col)
    }

    fn flush_text_to(&mut self, end: usize) {
        if self.text.is_empty() {
            return;
        }
        let start = self.text_start;
        let text = std::mem::take(&mut self.text);
        let raw: String = self.plain[start..end].iter().collect();
        let space_before = start == 0
            || matches!(self.plain[start - 1], ' ' | '\t' | '\n');
        let space_after = end >= self.plain.len()
            || matches!(self.plain[end], ' ' | '\t' | '\n');
        let item = Item::new(
            self.fp.ids.next(),
            ItemValue::Text(NodeText {
                text,
                opts: 0,
                open_styles: Vec::new(),
                close_styles: Vec::new(),
                space_before,
                space_after,
            }),
            self.span(start, end.saturating_sub(1)),
        );
        self.toks.push(Tok {
            item,
            raw: Some(raw),
            dead: false,
        });
    }

    /// Flushes the open run with its trailing whitespace dropped, ending
    /// the span before the dropped characters.
    fn flush_text_trimmed(&mut self, end: usize) {
        let trimmed = self.text.trim_end_matches(|c| c == ' ' || c == '\t');
        let cut = self.text.len() - trimmed.len();
        if cut > 0 {
            let new_len = self.text.len() - cut;
            self.text.truncate(new_len);
        }
        self.flush_text_to(end - cut);
    }

    fn emit_bracket_text(&mut self, s: &str, start: usize, end: usize) -> usize {
        let item = Item::new(
            self.fp.ids.next(),
            ItemValue::Text(NodeText {
                text: s.to_string(),
                ..NodeText::default()
            }),
            self.span(start, end),
        );
        self.toks.push(Tok {
            item,
            raw: Some(s.to_string()),
            dead: false,
        });
        self.toks.len() - 1
    }

    // --------------------------------------------------------------
    // Simple handlers
    // --------------------------------------------------------------

    fn handle_newline(&mut self) {
        let spaces = self.text.len() - self.text.trim_end_matches(' ').len();
        let run_end = self.pos - spaces;
        if spaces > 0 {
            self.text.truncate(self.text.len() - spaces);
        }
        self.flush_text_to(run_end);

        if spaces >= 2 {
            let item = Item::new(
                self.fp.ids.next(),
                ItemValue::LineBreak,
                self.span(run_end, self.pos - 1),
            );
            self.toks.push(Tok {
                item,
                raw: None,
                dead: false,
            });
        }
        self.pos += 1;
    }

    fn handle_backslash(&mut self) {
        match self.plain.get(self.pos + 1) {
            Some(&'\n') => {
                self.flush_text_trimmed(self.pos);
                let item = Item::new(
                    self.fp.ids.next(),
                    ItemValue::LineBreak,
                    self.span(self.pos, self.pos),
                );
                self.toks.push(Tok {
                    item,
                    raw: None,
                    dead: false,
                });
                self.pos += 2;
            }
            Some(&c) if is_escapable(c) => {
                if self.text.is_empty() {
                    self.text_start = self.pos;
                }
                self.text.push(c);
                self.pos += 2;
            }
            _ => {
                self.accumulate('\\', 1);
            }
        }
    }

    fn handle_backticks(&mut self) {
        let n = run_at(&self.plain, self.pos, '`');
        let mut j = self.pos + n;
        let mut close = None;
        while j < self.plain.len() {
            if self.plain[j] == '`' {
                let r = run_at(&self.plain, j, '`');
                if r == n {
                    close = Some(j);
                    break;
                }
                j += r;
            } else {
                j += 1;
            }
        }

        match close {
            Some(j) => {
                self.flush_text_to(self.pos);
                let mut literal: String = self.plain[self.pos + n..j]
                    .iter()
                    .map(|&c| if c == '\n' { ' ' } else { c })
                    .collect();
                if literal.len() >= 2
                    && literal.starts_with(' ')
                    && literal.ends_with(' ')
                    && literal.chars().any(|c| c != ' ')
                {
                    literal = literal[1..literal.len() - 1].to_string();
                }
                let item = Item::new(
                    self.fp.ids.next(),
                    ItemValue::Code(NodeCode {
                        literal,
                        inline: true,
                        syntax: None,
                        start_delim: self.span(self.pos, self.pos + n - 1),
                        end_delim: self.span(j, j + n - 1),
                        syntax_pos: Sourcepos::synthetic(),
                    }),
                    self.span(self.pos, j + n - 1),
                );
                self.toks.push(Tok {
                    item,
                    raw: None,
                    dead: false,
                });
                self.pos = j + n;
            }
            None => {
                for _ in 0..n {
                    self.accumulate('`', 1);
                }
            }
        }
    }

    fn handle_dollars(&mut self) {
        let run = run_at(&self.plain, self.pos, '$');
        if run > 2 {
            for _ in 0..run {
                self.accumulate('$', 1);
            }
            return;
        }
        match math::scan_to_closing_dollar(&self.plain, self.pos + run, run) {
            Some(j) => {
                self.flush_text_to(self.pos);
                let literal: String = self.plain[self.pos + run..j].iter().collect();
                let item = Item::new(
                    self.fp.ids.next(),
                    ItemValue::Math(NodeMath {
                        literal,
                        inline: run == 1,
                        start_delim: self.span(self.pos, self.pos + run - 1),
                        end_delim: self.span(j, j + run - 1),
                        syntax_pos: Sourcepos::synthetic(),
                    }),
                    self.span(self.pos, j + run - 1),
                );
                self.toks.push(Tok {
                    item,
                    raw: None,
                    dead: false,
                });
                self.pos = j + run;
            }
            None => {
                for _ in 0..run {
                    self.accumulate('$', 1);
                }
            }
        }
    }

    fn handle_pointy_brace(&mut self) {
        if let Some(len) = scanners::autolink_uri(&self.plain, self.pos) {
            let inner: String = self.plain[self.pos + 1..self.pos + len - 1].iter().collect();
            self.emit_autolink(inner.clone(), inner, len);
            return;
        }
        if let Some(len) = scanners::autolink_email(&self.plain, self.pos) {
            let inner: String = self.plain[self.pos + 1..self.pos + len - 1].iter().collect();
            self.emit_autolink(format!("mailto:{}", inner), inner, len);
            return;
        }
        if let Some(len) = scanners::html_tag(&self.plain, self.pos) {
            self.flush_text_to(self.pos);
            let text: String = self.plain[self.pos..self.pos + len].iter().collect();
            let item = Item::new(
                self.fp.ids.next(),
                ItemValue::RawHtml(text),
                self.span(self.pos, self.pos + len - 1),
            );
            self.toks.push(Tok {
                item,
                raw: None,
                dead: false,
            });
            self.pos += len;
            return;
        }
        self.accumulate('<', 1);
    }

    fn emit_autolink(&mut self, url: String, text: String, len: usize) {
        self.flush_text_to(self.pos);
        let item = Item::new(
            self.fp.ids.next(),
            ItemValue::Link(NodeLink {
                url,
                title: String::new(),
                text,
                ..NodeLink::default()
            }),
            self.span(self.pos, self.pos + len - 1),
        );
        self.toks.push(Tok {
            item,
            raw: None,
            dead: false,
        });
        self.pos += len;
    }

    // --------------------------------------------------------------
    // Emphasis delimiters
    // --------------------------------------------------------------

    fn handle_delim(&mut self, ch: char) {
        self.flush_text_to(self.pos);
        let n = run_at(&self.plain, self.pos, ch);

        let before = if self.pos == 0 {
            None
        } else if self.plain[self.pos - 1] == '\n' {
            Some(' ')
        } else {
            Some(self.plain[self.pos - 1])
        };
        let after = self
            .plain
            .get(self.pos + n)
            .map(|&c| if c == '\n' { ' ' } else { c });

        let ws_before = before.map_or(true, is_flanking_whitespace);
        let ws_after = after.map_or(true, is_flanking_whitespace);
        let punct_before = before.map_or(false, is_flanking_punctuation);
        let punct_after = after.map_or(false, is_flanking_punctuation);

        let left_flanking = !ws_after && (!punct_after || ws_before || punct_before);
        let right_flanking = !ws_before && (!punct_before || ws_after || punct_after);

        let (can_open, can_close) = if ch == '_' {
            (
                left_flanking && (!right_flanking || punct_before),
                right_flanking && (!left_flanking || punct_after),
            )
        } else {
            (left_flanking, right_flanking)
        };

        let run_text: String = std::iter::repeat(ch).take(n).collect();
        let item = Item::new(
            self.fp.ids.next(),
            ItemValue::Text(NodeText {
                text: run_text.clone(),
                space_before: ws_before,
                space_after: ws_after,
                ..NodeText::default()
            }),
            self.span(self.pos, self.pos + n - 1),
        );
        self.toks.push(Tok {
            item,
            raw: Some(run_text),
            dead: false,
        });
        let tok = self.toks.len() - 1;

        if can_open || can_close {
            let ix = self.delims.len();
            self.delims.push(Delim {
                tok,
                ch,
                orig_len: n,
                can_open,
                can_close,
                prev: self.last_delim,
                next: None,
            });
            if let Some(last) = self.last_delim {
                self.delims[last].next = Some(ix);
            }
            self.last_delim = Some(ix);
        }

        self.pos += n;
    }

    fn remove_delim(&mut self, ix: usize) {
        let (prev, next) = (self.delims[ix].prev, self.delims[ix].next);
        if let Some(n) = next {
            self.delims[n].prev = prev;
        } else {
            self.last_delim = prev;
        }
        if let Some(p) = prev {
            self.delims[p].next = next;
        }
    }

    fn remove_delims_from(&mut self, stack_bottom: usize) {
        while let Some(last) = self.last_delim {
            if last < stack_bottom {
                break;
            }
            self.remove_delim(last);
        }
    }

    /// The delimiter-run resolver; a port of cmark's algorithm with the
    /// `openers_bottom` short-circuit and the multiple-of-three rule.
    fn process_emphasis(&mut self, stack_bottom: usize) {
        let mut openers_bottom = [stack_bottom; 8];

        // Walk down to the first delimiter above the bottom.
        let mut closer: Option<usize> = None;
        let mut candidate = self.last_delim;
        while let Some(c) = candidate {
            if c < stack_bottom {
                break;
            }
            closer = Some(c);
            candidate = self.delims[c].prev;
        }

        while let Some(c_ix) = closer {
            let c = &self.delims[c_ix];
            if !c.can_close {
                closer = c.next;
                continue;
            }

            let ix = match c.ch {
                '~' => 0,
                '_' => 1,
                '*' => 2 + (if c.can_open { 3 } else { 0 }) + c.orig_len % 3,
                _ => unreachable!(),
            };

            let (c_ch, c_orig, c_can_open) = (c.ch, c.orig_len, c.can_open);
            let mut opener = c.prev;
            let mut opener_found = false;
            let mut mod_three_rule_invoked = false;

            while let Some(o_ix) = opener {
                if o_ix < openers_bottom[ix] {
                    break;
                }
                let o = &self.delims[o_ix];
                if o.can_open && o.ch == c_ch {
                    // Runs summing to a multiple of three cannot pair
                    // unless both are multiples themselves.
                    let odd_match = (c_can_open || o.can_close)
                        && ((o.orig_len + c_orig) % 3 == 0)
                        && !(o.orig_len % 3 == 0 && c_orig % 3 == 0);
                    if !odd_match {
                        opener_found = true;
                        break;
                    } else {
                        mod_three_rule_invoked = true;
                    }
                }
                opener = o.prev;
            }

            let old_closer = c_ix;
            if opener_found {
                closer = self.insert_emph(opener.unwrap(), c_ix);
            } else {
                closer = self.delims[c_ix].next;
            }

            if !opener_found {
                if !mod_three_rule_invoked {
                    openers_bottom[ix] = old_closer;
                }
                if !c_can_open {
                    self.remove_delim(old_closer);
                }
            }
        }

        self.remove_delims_from(stack_bottom);
    }

    /// Consumes delimiter characters from a matched pair and records the
    /// resulting style span. Long `***` runs are truncated in place and
    /// rematched, exactly as the node-based algorithm does.
    fn insert_emph(&mut self, opener_ix: usize, closer_ix: usize) -> Option<usize> {
        let o_tok = self.delims[opener_ix].tok;
        let c_tok = self.delims[closer_ix].tok;
        let ch = self.delims[opener_ix].ch;

        let o_len = self.toks[o_tok].item.text().map_or(0, |t| t.chars().count());
        let c_len = self.toks[c_tok].item.text().map_or(0, |t| t.chars().count());

        let use_delims = if ch == '~' {
            // Strikethrough runs must consume each other exactly.
            if o_len != c_len || o_len > 2 {
                return None;
            }
            o_len
        } else if o_len >= 2 && c_len >= 2 {
            2
        } else {
            1
        };

        let style = if ch == '~' {
            STRIKETHROUGH_TEXT
        } else if use_delims == 2 {
            BOLD_TEXT
        } else {
            ITALIC_TEXT
        };

        // Opener loses its content-adjacent tail, closer its head.
        let open_pos;
        {
            let tok = &mut self.toks[o_tok];
            let pos = tok.item.pos;
            open_pos = Sourcepos::new(
                pos.end.line,
                pos.end.column - use_delims as i64 + 1,
                pos.end.line,
                pos.end.column,
            );
            truncate_run(tok, o_len - use_delims, true);
        }
        let close_pos;
        {
            let tok = &mut self.toks[c_tok];
            let pos = tok.item.pos;
            close_pos = Sourcepos::new(
                pos.start.line,
                pos.start.column,
                pos.start.line,
                pos.start.column + use_delims as i64 - 1,
            );
            truncate_run(tok, c_len - use_delims, false);
        }

        // Delimiters strictly between the pair are spent.
        let mut between = self.delims[closer_ix].prev;
        while let Some(d) = between {
            if d == opener_ix {
                break;
            }
            let prev = self.delims[d].prev;
            self.remove_delim(d);
            between = prev;
        }

        self.spans.push(StyleSpan {
            style,
            open_pos,
            close_pos,
            open_tok: o_tok,
            close_tok: c_tok,
        });

        if o_len - use_delims == 0 {
            self.toks[o_tok].dead = true;
            self.remove_delim(opener_ix);
        }
        if c_len - use_delims == 0 {
            self.toks[c_tok].dead = true;
            let next = self.delims[closer_ix].next;
            self.remove_delim(closer_ix);
            next
        } else {
            Some(closer_ix)
        }
    }

    /// Flattens resolved spans whose opener sits at or after `min_tok`
    /// onto the items between their delimiters.
    fn apply_spans_from(&mut self, min_tok: usize) {
        let mut rest = Vec::new();
        let spans = std::mem::take(&mut self.spans);
        for span in spans {
            if span.open_tok < min_tok {
                rest.push(span);
                continue;
            }
            let mut first: Option<usize> = None;
            let mut last: Option<usize> = None;
            for t in span.open_tok + 1..span.close_tok {
                let tok = &mut self.toks[t];
                if tok.dead {
                    continue;
                }
                if or_opts(&mut tok.item, span.style) {
                    if first.is_none() {
                        first = Some(t);
                    }
                    last = Some(t);
                }
            }
            if let Some(f) = first {
                add_open_style(
                    &mut self.toks[f].item,
                    StyleDelim {
                        style: span.style,
                        pos: span.open_pos,
                    },
                );
            }
            if let Some(l) = last {
                add_close_style(
                    &mut self.toks[l].item,
                    StyleDelim {
                        style: span.style,
                        pos: span.close_pos,
                    },
                );
            }
        }
        self.spans = rest;
    }

    // --------------------------------------------------------------
    // Brackets, links, images, footnote references
    // --------------------------------------------------------------

    fn push_bracket(&mut self, image: bool, tok: usize, content_start: usize) {
        self.brackets.push(Bracket {
            image,
            tok,
            delim_bottom: self.delims.len(),
            content_start,
            active: true,
        });
    }

    fn handle_close_bracket(&mut self) {
        self.flush_text_to(self.pos);

        let bracket = match self.brackets.pop() {
            Some(b) => b,
            None => {
                self.accumulate(']', 1);
                return;
            }
        };
        if !bracket.active {
            self.accumulate(']', 1);
            return;
        }

        // `[^id]` resolves against the footnote map.
        if !bracket.image {
            let content: String = self.plain[bracket.content_start..self.pos].iter().collect();
            if content.starts_with('^') && !content.contains('[') && !content.contains(']') {
                let key = label_key(&content, self.fp.path);
                if self.fp.footnote_labels.contains(&key) {
                    for t in bracket.tok + 1..self.toks.len() {
                        self.toks[t].dead = true;
                    }
                    let pos = Sourcepos::new(
                        self.toks[bracket.tok].item.pos.start.line,
                        self.toks[bracket.tok].item.pos.start.column,
                        self.chars[self.pos].line,
                        self.chars[self.pos].col,
                    );
                    self.toks[bracket.tok] = Tok {
                        item: Item::new(self.fp.ids.next(), ItemValue::FootnoteRef(key), pos),
                        raw: None,
                        dead: false,
                    };
                    self.remove_delims_from(bracket.delim_bottom);
                    self.pos += 1;
                    return;
                }
            }
        }

        // Inline form, then full/collapsed/shortcut reference.
        let mut target: Option<(String, String, usize)> = None;
        if self.plain.get(self.pos + 1) == Some(&'(') {
            target = self.scan_inline_link(self.pos + 1);
        }
        if target.is_none() {
            target = self.scan_reference_link(&bracket);
        }

        let (url, title, end) = match target {
            Some(t) => t,
            None => {
                self.accumulate(']', 1);
                return;
            }
        };

        self.process_emphasis(bracket.delim_bottom);
        self.apply_spans_from(bracket.tok);

        let mut children = Vec::new();
        let mut plain_text = String::new();
        for t in bracket.tok + 1..self.toks.len() {
            if self.toks[t].dead {
                continue;
            }
            self.toks[t].dead = true;
            let placeholder_id = self.toks[t].item.id;
            let mut item = std::mem::replace(
                &mut self.toks[t].item,
                Item::new(placeholder_id, ItemValue::PageBreak, Sourcepos::synthetic()),
            );
            match item.value {
                ItemValue::Text(ref t) => plain_text.push_str(&t.text),
                ItemValue::Code(ref c) => plain_text.push_str(&c.literal),
                _ => (),
            }
            sort_styles(&mut item);
            children.push(item);
        }

        let pos = Sourcepos::new(
            self.toks[bracket.tok].item.pos.start.line,
            self.toks[bracket.tok].item.pos.start.column,
            self.chars[(end - 1).min(self.chars.len() - 1)].line,
            self.chars[(end - 1).min(self.chars.len() - 1)].col,
        );
        let node = NodeLink {
            url,
            title,
            text: plain_text,
            ..NodeLink::default()
        };
        let value = if bracket.image {
            ItemValue::Image(node)
        } else {
            ItemValue::Link(node)
        };
        let mut item = Item::new(self.fp.ids.next(), value, pos);
        item.children = children;
        self.toks[bracket.tok] = Tok {
            item,
            raw: None,
            dead: false,
        };

        if !bracket.image {
            // Links do not nest: deactivate every older link opener.
            for b in self.brackets.iter_mut() {
                if !b.image {
                    b.active = false;
                }
            }
        }
        self.pos = end;
    }

    /// `(url "title")` following the closing bracket; `i` points at `(`.
    /// Returns the url, title and the char index just past `)`.
    fn scan_inline_link(&self, i: usize) -> Option<(String, String, usize)> {
        let mut j = self.spnl(i + 1);

        let url_start = j;
        let url_raw: String;
        if self.plain.get(j) == Some(&'<') {
            j += 1;
            while j < self.plain.len() && !matches!(self.plain[j], '>' | '\n' | '<') {
                if self.plain[j] == '\\' {
                    j += 1;
                }
                j += 1;
            }
            if self.plain.get(j) != Some(&'>') {
                return None;
            }
            url_raw = self.plain[url_start + 1..j].iter().collect();
            j += 1;
        } else {
            let mut depth = 0i32;
            while j < self.plain.len() {
                let c = self.plain[j];
                if c == '\\' {
                    j += 2;
                    continue;
                }
                if c.is_whitespace() {
                    break;
                }
                if c == '(' {
                    depth += 1;
                } else if c == ')' {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                j += 1;
            }
            url_raw = self.plain[url_start..j].iter().collect();
        }

        let mut title = String::new();
        let k = self.spnl(j);
        let mut j = k;
        if let Some(&q) = self.plain.get(j) {
            if q == '"' || q == '\'' || q == '(' {
                let close = if q == '(' { ')' } else { q };
                let t_start = j + 1;
                j += 1;
                while j < self.plain.len() && self.plain[j] != close {
                    if self.plain[j] == '\\' {
                        j += 1;
                    }
                    j += 1;
                }
                if j >= self.plain.len() {
                    return None;
                }
                title = unescape_all(
                    &self.plain[t_start..j].iter().collect::<String>(),
                );
                j += 1;
                j = self.spnl(j);
            }
        }

        if self.plain.get(j) != Some(&')') {
            return None;
        }
        Some((unescape_all(&url_raw), title, j + 1))
    }

    /// Full (`[label]`), collapsed (`[]`) and shortcut reference links.
    fn scan_reference_link(&self, bracket: &Bracket) -> Option<(String, String, usize)> {
        let content: String = self.plain[bracket.content_start..self.pos].iter().collect();

        let mut end = self.pos + 1;
        let mut label = content.clone();
        if self.plain.get(self.pos + 1) == Some(&'[') {
            let mut j = self.pos + 2;
            while j < self.plain.len()
                && self.plain[j] != ']'
                && j - self.pos < MAX_LINK_LABEL_LENGTH
            {
                if self.plain[j] == '\\' {
                    j += 1;
                }
                j += 1;
            }
            if self.plain.get(j) != Some(&']') {
                return None;
            }
            let explicit: String = self.plain[self.pos + 2..j].iter().collect();
            if !explicit.trim().is_empty() {
                label = explicit;
            }
            end = j + 1;
        }

        if label.trim().is_empty() {
            return None;
        }
        let key = label_key(&label, self.fp.path);
        let def = self.fp.doc.labeled_links.get(&key)?;
        Some((def.url.clone(), def.title.clone(), end))
    }

    fn spnl(&self, mut i: usize) -> usize {
        let mut seen_nl = false;
        while let Some(&c) = self.plain.get(i) {
            match c {
                ' ' | '\t' => i += 1,
                '\n' if !seen_nl => {
                    seen_nl = true;
                    i += 1;
                }
                _ => break,
            }
        }
        i
    }

    // --------------------------------------------------------------
    // Emit
    // --------------------------------------------------------------

    fn finish(mut self) -> InlineResult {
        let mut items: Vec<Item> = Vec::new();
        let mut raw: Vec<Option<String>> = Vec::new();

        for tok in self.toks.drain(..) {
            if tok.dead {
                continue;
            }
            if let ItemValue::Text(ref t) = tok.item.value {
                if t.text.is_empty() {
                    continue;
                }
            }

            // Leftover delimiter text downgrades and merges with an equal
            // neighbour on the same line.
            let mergeable = match (items.last(), &tok.item.value) {
                (Some(prev), ItemValue::Text(ref cur)) => match prev.value {
                    ItemValue::Text(ref p) => {
                        p.opts == cur.opts
                            && p.close_styles.is_empty()
                            && cur.open_styles.is_empty()
                            && prev.pos.end.line == tok.item.pos.start.line
                    }
                    _ => false,
                },
                _ => false,
            };

            if mergeable {
                let prev = items.last_mut().unwrap();
                if let (ItemValue::Text(ref mut p), ItemValue::Text(cur)) =
                    (&mut prev.value, tok.item.value)
                {
                    p.text.push_str(&cur.text);
                    p.close_styles = cur.close_styles;
                    p.space_after = cur.space_after;
                    prev.pos.end = tok.item.pos.end;
                    if let (Some(Some(pr)), Some(r)) = (raw.last_mut(), tok.raw) {
                        pr.push_str(&r);
                    }
                }
                continue;
            }

            raw.push(tok.raw);
            items.push(tok.item);
        }

        for item in items.iter_mut() {
            sort_styles(item);
        }

        let raw = items
            .iter()
            .zip(raw)
            .filter_map(|(item, r)| {
                if let ItemValue::Text(_) = item.value {
                    Some(TextData {
                        str: r.unwrap_or_default(),
                        pos: item.pos,
                    })
                } else {
                    None
                }
            })
            .collect();

        InlineResult { items, raw }
    }
}

fn run_at(plain: &[char], pos: usize, ch: char) -> usize {
    plain[pos..].iter().take_while(|&&c| c == ch).count()
}

/// Truncates a delimiter-run token to `keep` characters, dropping from the
/// tail (`from_end`) or the head.
fn truncate_run(tok: &mut Tok, keep: usize, from_end: bool) {
    if let ItemValue::Text(ref mut t) = tok.item.value {
        let len = t.text.chars().count();
        let drop = len - keep;
        if from_end {
            t.text.truncate(t.text.len() - drop);
            tok.item.pos.end.column -= drop as i64;
        } else {
            t.text = t.text.chars().skip(drop).collect();
            tok.item.pos.start.column += drop as i64;
        }
        if let Some(raw) = tok.raw.as_mut() {
            if from_end {
                raw.truncate(raw.len() - drop);
            } else {
                *raw = raw.chars().skip(drop).collect();
            }
        }
    }
}

fn or_opts(item: &mut Item, style: StyleOpts) -> bool {
    match item.value {
        ItemValue::Text(ref mut t) => {
            t.opts |= style;
            true
        }
        ItemValue::Link(ref mut l) | ItemValue::Image(ref mut l) => {
            l.opts |= style;
            true
        }
        _ => false,
    }
}

fn add_open_style(item: &mut Item, delim: StyleDelim) {
    match item.value {
        ItemValue::Text(ref mut t) => t.open_styles.push(delim),
        ItemValue::Link(ref mut l) | ItemValue::Image(ref mut l) => l.open_styles.push(delim),
        _ => (),
    }
}

fn add_close_style(item: &mut Item, delim: StyleDelim) {
    match item.value {
        ItemValue::Text(ref mut t) => t.close_styles.push(delim),
        ItemValue::Link(ref mut l) | ItemValue::Image(ref mut l) => l.close_styles.push(delim),
        _ => (),
    }
}

fn sort_styles(item: &mut Item) {
    let sort = |v: &mut Vec<StyleDelim>| {
        v.sort_by_key(|d| (d.pos.start.line, d.pos.start.column));
    };
    match item.value {
        ItemValue::Text(ref mut t) => {
            sort(&mut t.open_styles);
            sort(&mut t.close_styles);
        }
        ItemValue::Link(ref mut l) | ItemValue::Image(ref mut l) => {
            sort(&mut l.open_styles);
            sort(&mut l.close_styles);
        }
        _ => (),
    }
}
