//! The parser: a single forward block pass that splits the source into
//! classified fragments, followed by an inline pass per paragraph-bearing
//! fragment.
//!
//! The block pass resolves container nesting by stripping prefixes
//! (blockquote markers, list-item indentation) through [`PosString`], so
//! recursion always works on logical lines whose characters still know
//! their raw source columns. Reference and footnote definitions are
//! extracted here; the inline pass later resolves `[label]` references
//! against the completed maps.

mod inlines;
mod table;

pub mod autolink;
pub mod math;
pub mod plugins;

use std::io;
use std::path::Path;

use rustc_hash::FxHashSet;

use crate::nodes::{
    Document, Item, ItemValue, NodeCode, NodeHeading, NodeId, NodeListItem, NodeTable, ListType,
    Sourcepos, TableAlignment,
};
use crate::pos_string::PosString;
use crate::refmap::{label_key, HeadingSlugger};
use crate::scanners::{self, ListMarker, SetextChar};
use crate::source::{Line, LineSource};
use crate::strings::unescape_all;

use self::plugins::{
    PluginContext, PluginId, TextData, TextPluginEntry, TextPluginFn, GITHUB_AUTOLINK_PLUGIN,
};

/// Tabs expand to this many spaces before block scanning.
pub const TAB_STOP: usize = 4;
const CODE_INDENT: usize = 4;

/// Allocates document-unique [`NodeId`]s.
#[derive(Debug, Default)]
pub(crate) struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// The parser front object: plugin registry plus walker configuration.
///
/// ```
/// let doc = marktree::Parser::new().parse_text("foo *bar*", "/doc.md");
/// assert!(!doc.is_empty());
/// ```
pub struct Parser {
    plugins: Vec<TextPluginEntry>,
    extensions: Vec<String>,
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        let mut p = Parser {
            plugins: Vec::new(),
            extensions: vec!["md".into(), "markdown".into()],
        };
        p.add_text_plugin(
            GITHUB_AUTOLINK_PLUGIN,
            autolink::github_autolinks,
            false,
            Vec::new(),
        );
        p
    }

    /// Registers a text plugin. Plugins run in ascending id order; a second
    /// registration under the same id replaces the first.
    pub fn add_text_plugin(
        &mut self,
        id: PluginId,
        func: TextPluginFn,
        process_in_links: bool,
        params: Vec<String>,
    ) {
        self.plugins.retain(|e| e.id != id);
        self.plugins.push(TextPluginEntry {
            id,
            func,
            process_in_links,
            params,
        });
        self.plugins.sort_by_key(|e| e.id);
    }

    pub fn remove_text_plugin(&mut self, id: PluginId) {
        self.plugins.retain(|e| e.id != id);
    }

    /// File extensions the multi-file walker treats as Markdown.
    pub fn set_markdown_extensions(&mut self, extensions: Vec<String>) {
        self.extensions = extensions;
    }

    pub fn markdown_extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Parses a file; with `recursive` the walker follows links to local
    /// Markdown files, separating per-file subtrees with page breaks.
    pub fn parse(&self, path: impl AsRef<Path>, recursive: bool) -> io::Result<Document> {
        crate::walker::parse_file(self, path.as_ref(), recursive)
    }

    /// Parses in-memory text under a synthetic file path.
    pub fn parse_text(&self, text: &str, path: &str) -> Document {
        let mut doc = Document::new();
        let mut ids = IdGen::default();
        let mut slugger = HeadingSlugger::new();
        parse_into(self, text, path, &mut doc, &mut ids, &mut slugger);
        doc
    }
}

/// Convenience wrapper: parse one in-memory document.
pub fn parse_document(text: &str) -> Document {
    Parser::new().parse_text(text, "")
}

/// Parses `text` as one file and appends its subtree (anchor included) to
/// `doc`. The walker calls this once per visited file.
pub(crate) fn parse_into(
    parser: &Parser,
    text: &str,
    path: &str,
    doc: &mut Document,
    ids: &mut IdGen,
    slugger: &mut HeadingSlugger,
) {
    doc.items.push(Item::new(
        ids.next(),
        ItemValue::Anchor(path.to_string()),
        Sourcepos::synthetic(),
    ));

    let mut fp = FileParser {
        parser,
        path,
        doc,
        ids,
        slugger,
        pending_footnotes: Vec::new(),
        footnote_labels: FxHashSet::default(),
    };

    let mut src = LineSource::new(text, TAB_STOP);
    let blocks = fp.parse_blocks(&mut src);

    for pf in &fp.pending_footnotes {
        fp.footnote_labels.insert(pf.label.clone());
    }

    let footnotes = std::mem::take(&mut fp.pending_footnotes);
    for pf in footnotes {
        let children = fp.finalize_blocks(pf.blocks);
        let mut item = Item::new(
            fp.ids.next(),
            ItemValue::Footnote(pf.label.clone()),
            pf.pos,
        );
        item.children = children;
        fp.doc.footnotes.entry(pf.label).or_insert(item);
    }

    let items = fp.finalize_blocks(blocks);
    fp.doc.items.extend(items);
}

/// A classified block fragment; the inline pass runs when these are
/// finalised into items.
pub(crate) enum PBlock {
    Paragraph {
        lines: Vec<Line>,
    },
    Heading {
        level: u8,
        lines: Vec<Line>,
        pos: Sourcepos,
    },
    Code {
        node: NodeCode,
        pos: Sourcepos,
    },
    Quote {
        children: Vec<PBlock>,
        pos: Sourcepos,
    },
    List {
        children: Vec<PBlock>,
        pos: Sourcepos,
    },
    ListItem {
        node: NodeListItem,
        children: Vec<PBlock>,
        pos: Sourcepos,
    },
    Table {
        aligns: Vec<TableAlignment>,
        rows: Vec<PRow>,
        pos: Sourcepos,
    },
    Html {
        text: String,
        pos: Sourcepos,
    },
    Hr {
        pos: Sourcepos,
    },
}

pub(crate) struct PRow {
    pub cells: Vec<Line>,
    pub pos: Sourcepos,
}

struct PendingFootnote {
    label: String,
    blocks: Vec<PBlock>,
    pos: Sourcepos,
}

pub(crate) struct FileParser<'a> {
    parser: &'a Parser,
    pub(crate) path: &'a str,
    pub(crate) doc: &'a mut Document,
    pub(crate) ids: &'a mut IdGen,
    slugger: &'a mut HeadingSlugger,
    pending_footnotes: Vec<PendingFootnote>,
    pub(crate) footnote_labels: FxHashSet<String>,
}

fn last_virgin(line: &Line) -> Option<i64> {
    if line.text.is_empty() {
        None
    } else {
        Some(line.text.virgin_pos(line.text.len() - 1))
    }
}

fn line_span(line: &Line) -> Sourcepos {
    let start = if line.text.is_empty() {
        0
    } else {
        line.text.virgin_pos(line.text.first_nonspace().min(line.text.len() - 1))
    };
    Sourcepos::new(
        line.number,
        start,
        line.number,
        last_virgin(line).unwrap_or(start),
    )
}

/// Whether a line would start a block stricter than a paragraph, which
/// terminates lazy continuation.
fn is_block_start_line(chars: &[char]) -> bool {
    scanners::atx_heading_start(chars).is_some()
        || scanners::thematic_break(chars).is_some()
        || scanners::open_code_fence(chars).is_some()
        || scanners::blockquote_marker(chars).is_some()
        || scanners::list_marker(chars).is_some()
        || scanners::html_block_start(chars).is_some()
}

impl<'a> FileParser<'a> {
    fn parse_blocks(&mut self, src: &mut LineSource) -> Vec<PBlock> {
        let mut out: Vec<PBlock> = Vec::new();
        let mut para: Vec<Line> = Vec::new();

        while let Some(line) = src.next_line() {
            if line.text.is_blank() {
                flush_para(&mut out, &mut para);
                continue;
            }

            let indent = line.text.leading_spaces();

            if !para.is_empty() {
                // A setext underline retrofits the open paragraph into a
                // heading.
                if let Some(sc) = scanners::setext_heading_line(line.text.as_chars()) {
                    let level = match sc {
                        SetextChar::Equals => 1,
                        SetextChar::Hyphen => 2,
                    };
                    let lines = std::mem::take(&mut para);
                    let start = line_span(&lines[0]).start;
                    let end = line_span(&line).end;
                    out.push(PBlock::Heading {
                        level,
                        lines,
                        pos: (start, end).into(),
                    });
                    continue;
                }

                // A delimiter row turns the candidate header line above it
                // into a table.
                if let Some(aligns) = scanners::table_delimiter_row(line.text.as_chars()) {
                    let (cells, had_pipe) = table::split_row(para.last().unwrap());
                    if had_pipe && cells.len() == aligns.len() {
                        let header = para.pop().unwrap();
                        flush_para(&mut out, &mut para);
                        out.push(self.collect_table(src, header, line, aligns));
                        continue;
                    }
                }
            }

            if indent >= CODE_INDENT && para.is_empty() {
                out.push(self.collect_indented_code(src, line));
                continue;
            }

            if let Some(atx) = scanners::atx_heading_start(line.text.as_chars()) {
                flush_para(&mut out, &mut para);
                out.push(self.collect_atx_heading(line, atx.level, atx.marker_start, atx.text_start));
                continue;
            }

            if scanners::thematic_break(line.text.as_chars()).is_some() {
                flush_para(&mut out, &mut para);
                out.push(PBlock::Hr {
                    pos: line_span(&line),
                });
                continue;
            }

            if let Some(fence) = scanners::open_code_fence(line.text.as_chars()) {
                flush_para(&mut out, &mut para);
                out.push(self.collect_fenced_code(src, line, fence));
                continue;
            }

            if scanners::blockquote_marker(line.text.as_chars()).is_some() {
                flush_para(&mut out, &mut para);
                out.push(self.collect_quote(src, line));
                continue;
            }

            if let Some(marker) = scanners::list_marker(line.text.as_chars()) {
                // An ordered list interrupts a paragraph only from 1., and
                // an empty item never does.
                let interrupts = para.is_empty()
                    || (marker.content_start.is_some()
                        && (!marker.ordered || marker.start_number == 1));
                if interrupts {
                    flush_para(&mut out, &mut para);
                    out.push(self.collect_list(src, line, marker));
                    continue;
                }
            }

            if let Some(kind) = scanners::html_block_start(line.text.as_chars()) {
                flush_para(&mut out, &mut para);
                out.push(self.collect_html(src, line, kind));
                continue;
            }
            if para.is_empty() && scanners::html_block_start_7(line.text.as_chars()) {
                out.push(self.collect_html(src, line, 7));
                continue;
            }

            if para.is_empty() && self.try_definition(src, &line) {
                continue;
            }

            para.push(line);
        }

        flush_para(&mut out, &mut para);
        out
    }

    fn collect_atx_heading(
        &mut self,
        line: Line,
        level: u8,
        marker_start: usize,
        text_start: usize,
    ) -> PBlock {
        let start_col = line.text.virgin_pos(marker_start);
        let end_col = last_virgin(&line).unwrap_or(start_col);

        // Strip an optional closing hash run (` ###`).
        let mut text = line.text.substr(text_start, line.text.len() - text_start);
        let chars = text.as_chars();
        let mut end = chars.len();
        while end > 0 && (chars[end - 1] == ' ' || chars[end - 1] == '\t') {
            end -= 1;
        }
        let hashes = chars[..end].iter().rev().take_while(|&&c| c == '#').count();
        if hashes > 0 {
            let before = end - hashes;
            if before == 0 {
                end = 0;
            } else if chars[before - 1] == ' ' || chars[before - 1] == '\t' {
                end = before - 1;
            }
        }
        text = text.substr(0, end);

        PBlock::Heading {
            level,
            lines: vec![Line {
                text,
                number: line.number,
            }],
            pos: Sourcepos::new(line.number, start_col, line.number, end_col),
        }
    }

    fn collect_fenced_code(
        &mut self,
        src: &mut LineSource,
        open: Line,
        fence: scanners::FenceOpen,
    ) -> PBlock {
        let start = Sourcepos::new(
            open.number,
            open.text.virgin_pos(fence.fence_offset),
            open.number,
            open.text
                .virgin_pos(fence.fence_offset + fence.fence_length - 1),
        );
        let syntax_pos = match fence.info_start {
            Some(s) if s < fence.info_end => Sourcepos::new(
                open.number,
                open.text.virgin_pos(s),
                open.number,
                open.text.virgin_pos(fence.info_end - 1),
            ),
            _ => Sourcepos::synthetic(),
        };
        let info: Option<String> = fence.info_start.map(|s| {
            let raw: String = open.text.as_chars()[s..fence.info_end].iter().collect();
            unescape_all(raw.split_whitespace().next().unwrap_or(""))
        });
        let info = info.filter(|i| !i.is_empty());

        let mut literal = String::new();
        let mut end_delim = Sourcepos::synthetic();
        let mut last_line = open.number;
        let mut last_col = start.end.column;

        while let Some(line) = src.next_line() {
            if let Some((at, run)) =
                scanners::close_code_fence(line.text.as_chars(), fence.fence_char, fence.fence_length)
            {
                end_delim = Sourcepos::new(
                    line.number,
                    line.text.virgin_pos(at),
                    line.number,
                    line.text.virgin_pos(at + run - 1),
                );
                last_line = line.number;
                last_col = end_delim.end.column;
                break;
            }
            let strip = line.text.leading_spaces().min(fence.fence_offset);
            let content = line.text.substr(strip, line.text.len() - strip);
            literal.push_str(&content.as_string());
            literal.push('\n');
            last_line = line.number;
            if let Some(c) = last_virgin(&line) {
                last_col = c;
            }
        }

        let pos = Sourcepos::new(open.number, start.start.column, last_line, last_col);
        PBlock::Code {
            node: NodeCode {
                literal,
                inline: false,
                syntax: info,
                start_delim: start,
                end_delim,
                syntax_pos,
            },
            pos,
        }
    }

    fn collect_indented_code(&mut self, src: &mut LineSource, first: Line) -> PBlock {
        let mut lines = vec![first];
        let mut blanks: Vec<Line> = Vec::new();

        while let Some(line) = src.next_line() {
            if line.text.is_blank() {
                blanks.push(line);
                continue;
            }
            if line.text.leading_spaces() >= CODE_INDENT {
                lines.append(&mut blanks);
                lines.push(line);
            } else {
                src.push_back(line);
                break;
            }
        }

        let start_col = lines[0].text.virgin_pos(CODE_INDENT.min(lines[0].text.len() - 1));
        let pos = Sourcepos::new(
            lines[0].number,
            start_col,
            lines[lines.len() - 1].number,
            last_virgin(&lines[lines.len() - 1]).unwrap_or(start_col),
        );

        let mut literal = String::new();
        for line in &lines {
            let strip = line.text.leading_spaces().min(CODE_INDENT);
            literal.push_str(&line.text.substr(strip, line.text.len() - strip).as_string());
            literal.push('\n');
        }

        PBlock::Code {
            node: NodeCode {
                literal,
                inline: false,
                syntax: None,
                start_delim: Sourcepos::synthetic(),
                end_delim: Sourcepos::synthetic(),
                syntax_pos: Sourcepos::synthetic(),
            },
            pos,
        }
    }

    fn collect_quote(&mut self, src: &mut LineSource, first: Line) -> PBlock {
        let (marker_at, _) = scanners::blockquote_marker(first.text.as_chars()).unwrap();
        let start = Sourcepos::new(
            first.number,
            first.text.virgin_pos(marker_at),
            first.number,
            first.text.virgin_pos(marker_at),
        );

        let mut stripped: Vec<Line> = Vec::new();
        let mut end_line = first.number;
        let mut end_col = last_virgin(&first).unwrap_or(start.start.column);

        let mut line = first;
        loop {
            match scanners::blockquote_marker(line.text.as_chars()) {
                Some((_, content)) => {
                    end_line = line.number;
                    if let Some(c) = last_virgin(&line) {
                        end_col = c;
                    }
                    stripped.push(Line {
                        text: line.text.substr(content, line.text.len() - content),
                        number: line.number,
                    });
                }
                None => {
                    // Lazy continuation of the quote's trailing paragraph.
                    let lazy = !line.text.is_blank()
                        && stripped.last().map_or(false, |l| !l.text.is_blank())
                        && !is_block_start_line(line.text.as_chars());
                    if lazy {
                        end_line = line.number;
                        if let Some(c) = last_virgin(&line) {
                            end_col = c;
                        }
                        stripped.push(line);
                    } else {
                        src.push_back(line);
                        break;
                    }
                }
            }

            line = match src.next_line() {
                Some(l) => l,
                None => break,
            };
        }

        let children = self.parse_blocks(&mut LineSource::from_lines(stripped));
        PBlock::Quote {
            children,
            pos: Sourcepos::new(start.start.line, start.start.column, end_line, end_col),
        }
    }

    fn collect_list(&mut self, src: &mut LineSource, first: Line, marker: ListMarker) -> PBlock {
        let list_type = if marker.ordered {
            ListType::Ordered
        } else {
            ListType::Unordered
        };
        let list_marker_char = marker.marker_char;

        let mut items: Vec<PBlock> = Vec::new();
        let mut line = first;
        let mut m = marker;

        let list_start;
        let mut list_end;
        {
            let s = line.text.virgin_pos(m.marker_start);
            list_start = (line.number, s);
            list_end = (line.number, last_virgin(&line).unwrap_or(s));
        }

        loop {
            let (item, end) = self.collect_list_item(src, line, &m, list_type);
            list_end = end;
            items.push(item);

            // Look ahead: blanks, then either a sibling marker of the same
            // kind or the end of the list.
            let mut blanks = 0usize;
            let next = loop {
                match src.next_line() {
                    Some(l) if l.text.is_blank() => blanks += 1,
                    other => break other,
                }
            };
            let next = match next {
                Some(l) => l,
                None => break,
            };

            match scanners::list_marker(next.text.as_chars()) {
                Some(nm)
                    if nm.marker_char == list_marker_char
                        && nm.ordered == m.ordered
                        && (blanks == 0 || nm.content_start.is_some()) =>
                {
                    line = next;
                    m = nm;
                }
                _ => {
                    src.push_back(next);
                    break;
                }
            }
        }

        PBlock::List {
            children: items,
            pos: Sourcepos::new(list_start.0, list_start.1, list_end.0, list_end.1),
        }
    }

    fn collect_list_item(
        &mut self,
        src: &mut LineSource,
        line: Line,
        marker: &ListMarker,
        list_type: ListType,
    ) -> (PBlock, (i64, i64)) {
        let content_indent = marker.marker_start + marker.marker_width + 1;
        let delim = Sourcepos::new(
            line.number,
            line.text.virgin_pos(marker.marker_start),
            line.number,
            line.text
                .virgin_pos(marker.marker_start + marker.marker_width - 1),
        );

        let mut body: Vec<Line> = Vec::new();
        let mut end = (line.number, last_virgin(&line).unwrap_or(delim.end.column));

        if marker.content_start.is_some() {
            let strip = content_indent.min(line.text.len());
            body.push(Line {
                text: line.text.substr(strip, line.text.len() - strip),
                number: line.number,
            });
        }

        // Task-list checkbox opens the item's first content.
        let mut task = None;
        if let Some(first) = body.first_mut() {
            let fns = first.text.first_nonspace();
            let chars = first.text.as_chars();
            if fns < CODE_INDENT && chars.len() >= fns + 3 && chars[fns] == '[' {
                let mark = chars[fns + 1];
                let checked = match mark {
                    ' ' => Some(false),
                    'x' | 'X' => Some(true),
                    _ => None,
                };
                if checked.is_some()
                    && chars[fns + 2] == ']'
                    && matches!(chars.get(fns + 3), None | Some(&' ') | Some(&'\t'))
                {
                    task = checked;
                    let remove = (fns + 4).min(first.text.len()) - fns;
                    first.text.remove(fns, remove);
                }
            }
        }

        let mut blanks: Vec<Line> = Vec::new();
        while let Some(next) = src.next_line() {
            if next.text.is_blank() {
                blanks.push(Line {
                    text: PosString::default(),
                    number: next.number,
                });
                continue;
            }
            let ind = next.text.leading_spaces();
            if ind >= content_indent {
                body.append(&mut blanks);
                end = (next.number, last_virgin(&next).unwrap_or(end.1));
                body.push(Line {
                    text: next.text.substr(content_indent, next.text.len() - content_indent),
                    number: next.number,
                });
                continue;
            }
            // Lazy continuation of the item's trailing paragraph.
            let lazy = blanks.is_empty()
                && body.last().map_or(false, |l| !l.text.is_blank())
                && !is_block_start_line(next.text.as_chars());
            if lazy {
                end = (next.number, last_virgin(&next).unwrap_or(end.1));
                body.push(next);
                continue;
            }
            src.push_back(next);
            break;
        }

        let children = self.parse_blocks(&mut LineSource::from_lines(body));
        let pos = Sourcepos::new(delim.start.line, delim.start.column, end.0, end.1);
        (
            PBlock::ListItem {
                node: NodeListItem {
                    list_type,
                    start_number: marker.start_number,
                    delim,
                    task,
                },
                children,
                pos,
            },
            end,
        )
    }

    fn collect_table(
        &mut self,
        src: &mut LineSource,
        header: Line,
        delimiter: Line,
        aligns: Vec<TableAlignment>,
    ) -> PBlock {
        let (header_cells, _) = table::split_row(&header);
        let header_pos = line_span(&header);
        let mut rows = vec![PRow {
            cells: header_cells,
            pos: header_pos,
        }];

        let mut end = line_span(&delimiter).end;
        while let Some(line) = src.next_line() {
            if line.text.is_blank() || is_block_start_line(line.text.as_chars()) {
                src.push_back(line);
                break;
            }
            let pos = line_span(&line);
            let (cells, _) = table::split_row(&line);
            end = pos.end;
            rows.push(PRow { cells, pos });
        }

        PBlock::Table {
            aligns,
            rows,
            pos: (header_pos.start, end).into(),
        }
    }

    fn collect_html(&mut self, src: &mut LineSource, first: Line, kind: u8) -> PBlock {
        let start_col = first
            .text
            .virgin_pos(first.text.first_nonspace().min(first.text.len() - 1));
        let mut text = first.text.as_string();
        let mut end = (
            first.number,
            last_virgin(&first).unwrap_or(start_col),
        );

        let closed_on_open = kind <= 5 && scanners::html_block_end(first.text.as_chars(), kind);
        if !closed_on_open {
            while let Some(line) = src.next_line() {
                if kind >= 6 && line.text.is_blank() {
                    break;
                }
                text.push('\n');
                text.push_str(&line.text.as_string());
                if let Some(c) = last_virgin(&line) {
                    end = (line.number, c);
                } else {
                    end.0 = line.number;
                }
                if kind <= 5 && scanners::html_block_end(line.text.as_chars(), kind) {
                    break;
                }
            }
        }

        PBlock::Html {
            text,
            pos: Sourcepos::new(first.number, start_col, end.0, end.1),
        }
    }

    /// Link-reference and footnote definitions vanish from the block
    /// stream into the document's maps.
    fn try_definition(&mut self, src: &mut LineSource, line: &Line) -> bool {
        let chars = line.text.as_chars();
        let fns = line.text.first_nonspace();
        if fns > 3 || chars.get(fns) != Some(&'[') {
            return false;
        }

        if chars.get(fns + 1) == Some(&'^') {
            return self.try_footnote_definition(src, line, fns);
        }

        // `[label]: url "title"`.
        let mut i = fns + 1;
        let label_start = i;
        while i < chars.len() && chars[i] != ']' {
            if chars[i] == '\\' {
                i += 1;
            } else if chars[i] == '[' {
                return false;
            }
            i += 1;
        }
        if i >= chars.len() || chars.get(i + 1) != Some(&':') {
            return false;
        }
        let label: String = chars[label_start..i].iter().collect();
        if label.trim().is_empty() {
            return false;
        }

        let mut j = i + 2;
        while j < chars.len() && (chars[j] == ' ' || chars[j] == '\t') {
            j += 1;
        }
        if j >= chars.len() {
            return false;
        }
        let url_start = j;
        if chars[j] == '<' {
            while j < chars.len() && chars[j] != '>' {
                j += 1;
            }
            if j >= chars.len() {
                return false;
            }
            j += 1;
        } else {
            while j < chars.len() && chars[j] != ' ' && chars[j] != '\t' {
                j += 1;
            }
        }
        let url_raw: String = chars[url_start..j].iter().collect();
        let url = unescape_all(crate::strings::strip_url_brackets(&url_raw));

        let mut title = String::new();
        let rest: String = chars[j..].iter().collect();
        let rest_trim = rest.trim();
        if !rest_trim.is_empty() {
            match parse_def_title(rest_trim) {
                Some(t) => title = t,
                None => return false,
            }
        } else if let Some(next) = src.next_line() {
            // The title may occupy one continuation line.
            let cand = next.text.as_string();
            match parse_def_title(cand.trim()) {
                Some(t) if !cand.trim().is_empty() => title = t,
                _ => src.push_back(next),
            }
        }

        let key = label_key(&label, self.path);
        let pos = line_span(line);
        self.doc
            .labeled_links
            .entry(key)
            .or_insert(crate::nodes::LinkDef { url, title, pos });
        true
    }

    fn try_footnote_definition(&mut self, src: &mut LineSource, line: &Line, fns: usize) -> bool {
        let chars = line.text.as_chars();
        let mut i = fns + 2;
        while i < chars.len() && chars[i] != ']' && chars[i] != ' ' {
            i += 1;
        }
        if chars.get(i) != Some(&']') || chars.get(i + 1) != Some(&':') || i == fns + 2 {
            return false;
        }
        let id: String = chars[fns + 1..i].iter().collect();

        let mut content = i + 2;
        if chars.get(content) == Some(&' ') {
            content += 1;
        }
        let mut body = vec![Line {
            text: line.text.substr(content, line.text.len() - content),
            number: line.number,
        }];

        let start = Sourcepos::new(line.number, line.text.virgin_pos(fns), line.number, 0);
        let mut end = (line.number, last_virgin(line).unwrap_or(start.start.column));

        // Continuation blocks are indented by four spaces (tabs already
        // expand to the same).
        let mut blanks: Vec<Line> = Vec::new();
        while let Some(next) = src.next_line() {
            if next.text.is_blank() {
                blanks.push(Line {
                    text: PosString::default(),
                    number: next.number,
                });
                continue;
            }
            if next.text.leading_spaces() >= CODE_INDENT {
                body.append(&mut blanks);
                end = (next.number, last_virgin(&next).unwrap_or(end.1));
                body.push(Line {
                    text: next.text.substr(CODE_INDENT, next.text.len() - CODE_INDENT),
                    number: next.number,
                });
                continue;
            }
            src.push_back(next);
            break;
        }

        let blocks = self.parse_blocks(&mut LineSource::from_lines(body));
        self.pending_footnotes.push(PendingFootnote {
            label: label_key(&format!("^{}", id), self.path),
            blocks,
            pos: Sourcepos::new(start.start.line, start.start.column, end.0, end.1),
        });
        true
    }

    // ------------------------------------------------------------------
    // Finalisation: pending blocks become items, paragraphs go through the
    // inline pass and the plugin chain.
    // ------------------------------------------------------------------

    pub(crate) fn finalize_blocks(&mut self, blocks: Vec<PBlock>) -> Vec<Item> {
        let mut out = Vec::new();
        for block in blocks {
            match block {
                PBlock::Paragraph { lines } => {
                    if let Some(item) = self.finalize_paragraph(&lines) {
                        out.push(item);
                    }
                }
                PBlock::Heading { level, lines, pos } => {
                    if let Some(item) = self.finalize_heading(level, &lines, pos) {
                        out.push(item);
                    }
                }
                PBlock::Code { node, pos } => {
                    let item = if node.syntax.as_deref() == Some(math::MATH_FENCE_SYNTAX) {
                        Item::new(
                            self.ids.next(),
                            ItemValue::Math(crate::nodes::NodeMath {
                                literal: node.literal,
                                inline: false,
                                start_delim: node.start_delim,
                                end_delim: node.end_delim,
                                syntax_pos: node.syntax_pos,
                            }),
                            pos,
                        )
                    } else {
                        Item::new(self.ids.next(), ItemValue::Code(node), pos)
                    };
                    out.push(item);
                }
                PBlock::Quote { children, pos } => {
                    let mut item = Item::new(self.ids.next(), ItemValue::Blockquote, pos);
                    item.children = self.finalize_blocks(children);
                    out.push(item);
                }
                PBlock::List { children, pos } => {
                    let mut item = Item::new(self.ids.next(), ItemValue::List, pos);
                    item.children = self.finalize_blocks(children);
                    out.push(item);
                }
                PBlock::ListItem {
                    node,
                    children,
                    pos,
                } => {
                    let mut item = Item::new(self.ids.next(), ItemValue::ListItem(node), pos);
                    item.children = self.finalize_blocks(children);
                    out.push(item);
                }
                PBlock::Table { aligns, rows, pos } => {
                    out.push(self.finalize_table(aligns, rows, pos));
                }
                PBlock::Html { text, pos } => {
                    out.push(Item::new(self.ids.next(), ItemValue::RawHtml(text), pos));
                }
                PBlock::Hr { pos } => {
                    out.push(Item::new(self.ids.next(), ItemValue::HorizontalLine, pos));
                }
            }
        }
        out
    }

    /// Inline-parses `lines` into a paragraph item and runs the plugin
    /// chain over it.
    fn finalize_paragraph(&mut self, lines: &[Line]) -> Option<Item> {
        let result = inlines::parse_inlines(self, lines);
        let mut items = result.items;
        let mut raw = result.raw;
        if items.is_empty() {
            return None;
        }

        self.run_text_plugins(&mut items, &mut raw);
        if items.is_empty() {
            return None;
        }

        let pos = span_of_items(&items);
        let mut para = Item::new(self.ids.next(), ItemValue::Paragraph, pos);
        para.children = items;
        Some(para)
    }

    fn finalize_heading(&mut self, level: u8, lines: &[Line], pos: Sourcepos) -> Option<Item> {
        let para = self.finalize_paragraph(lines)?;

        let mut text = String::new();
        para.walk(&mut |it| match it.value {
            ItemValue::Text(ref t) => text.push_str(&t.text),
            ItemValue::Code(ref c) if c.inline => text.push_str(&c.literal),
            _ => (),
        });
        let label = self.slugger.label_for(text.trim(), self.path);

        let id = self.ids.next();
        let mut heading = Item::new(
            id,
            ItemValue::Heading(NodeHeading { level, label: label.clone() }),
            pos,
        );
        heading.children = vec![para];
        self.doc.labeled_headings.insert(label, id);
        Some(heading)
    }

    fn finalize_table(
        &mut self,
        aligns: Vec<TableAlignment>,
        rows: Vec<PRow>,
        pos: Sourcepos,
    ) -> Item {
        let columns = aligns.len();
        let mut table = Item::new(
            self.ids.next(),
            ItemValue::Table(NodeTable { alignments: aligns }),
            pos,
        );

        for row in rows {
            let mut row_item = Item::new(self.ids.next(), ItemValue::TableRow, row.pos);
            for i in 0..columns {
                let (mut cells, cell_pos) = match row.cells.get(i) {
                    Some(cell) if !cell.text.is_empty() => {
                        let res = inlines::parse_inlines(self, std::slice::from_ref(cell));
                        let mut items = res.items;
                        let mut raw = res.raw;
                        self.run_text_plugins(&mut items, &mut raw);
                        let pos = if items.is_empty() {
                            line_span(cell)
                        } else {
                            span_of_items(&items)
                        };
                        (items, pos)
                    }
                    // A row shorter than the header is padded.
                    _ => (Vec::new(), Sourcepos::synthetic()),
                };
                let mut cell_item = Item::new(self.ids.next(), ItemValue::TableCell, cell_pos);
                cell_item.children.append(&mut cells);
                row_item.children.push(cell_item);
            }
            table.children.push(row_item);
        }
        table
    }

    fn run_text_plugins(&mut self, items: &mut Vec<Item>, raw: &mut Vec<TextData>) {
        let parser = self.parser;
        for entry in &parser.plugins {
            let ids = &mut *self.ids;
            let mut alloc = move || ids.next();
            let mut ctx = PluginContext {
                params: &entry.params,
                next_id: &mut alloc,
            };
            (entry.func)(items, raw, &mut ctx);

            if entry.process_in_links {
                for item in items.iter_mut() {
                    if let ItemValue::Link(_) | ItemValue::Image(_) = item.value {
                        let mut link_raw: Vec<TextData> = item
                            .children
                            .iter()
                            .filter_map(|c| {
                                c.as_text().map(|t| TextData {
                                    str: t.text.clone(),
                                    pos: c.pos,
                                })
                            })
                            .collect();
                        (entry.func)(&mut item.children, &mut link_raw, &mut ctx);
                    }
                }
            }
        }
    }
}

fn flush_para(out: &mut Vec<PBlock>, para: &mut Vec<Line>) {
    if !para.is_empty() {
        out.push(PBlock::Paragraph {
            lines: std::mem::take(para),
        });
    }
}

fn span_of_items(items: &[Item]) -> Sourcepos {
    let mut start = None;
    let mut end = None;
    for it in items {
        if it.pos.is_synthetic() {
            continue;
        }
        if start.map_or(true, |s| it.pos.start < s) {
            start = Some(it.pos.start);
        }
        if end.map_or(true, |e| it.pos.end > e) {
            end = Some(it.pos.end);
        }
    }
    match (start, end) {
        (Some(s), Some(e)) => (s, e).into(),
        _ => Sourcepos::synthetic(),
    }
}

/// Parses the title part of a link definition: one quoted/parenthesised
/// string spanning the rest of the line.
fn parse_def_title(rest: &str) -> Option<String> {
    let chars: Vec<char> = rest.chars().collect();
    let open = *chars.first()?;
    let close = match open {
        '"' => '"',
        '\'' => '\'',
        '(' => ')',
        _ => return None,
    };
    if chars.len() < 2 || chars[chars.len() - 1] != close {
        return None;
    }
    let inner: String = chars[1..chars.len() - 1].iter().collect();
    Some(unescape_all(&inner))
}
