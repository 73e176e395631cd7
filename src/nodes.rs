//! The document tree.
//!
//! A parsed document is an ordered sequence of [`Item`]s; every item carries
//! an inclusive [`Sourcepos`] span in the raw source's 0-based line/column
//! coordinates. Inline styling is not nested: emphasis and friends are
//! flattened onto the text runs as a bitmask plus the source positions of
//! the delimiters that produced them.

use rustc_hash::FxHashMap;
use std::fmt;

/// Style bitmask carried by [`NodeText`], [`NodeLink`] and image items.
pub type StyleOpts = u16;

/// No inline styling.
pub const TEXT_WITHOUT_FORMAT: StyleOpts = 0;
/// `*emphasis*` / `_emphasis_`.
pub const ITALIC_TEXT: StyleOpts = 1;
/// `**strong**` / `__strong__`.
pub const BOLD_TEXT: StyleOpts = 2;
/// `~~strikethrough~~` (GFM).
pub const STRIKETHROUGH_TEXT: StyleOpts = 4;
/// First bit available to user-defined emphasis templates.
pub const USER_DEFINED_STYLE: StyleOpts = 8;

/// A 0-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineColumn {
    pub line: i64,
    pub column: i64,
}

impl LineColumn {
    pub fn new(line: i64, column: i64) -> Self {
        LineColumn { line, column }
    }

    pub fn column_add(&self, offset: i64) -> Self {
        LineColumn {
            line: self.line,
            column: self.column + offset,
        }
    }
}

impl From<(i64, i64)> for LineColumn {
    fn from((line, column): (i64, i64)) -> Self {
        LineColumn { line, column }
    }
}

/// An inclusive source span: `start` is the first character of the
/// construct, `end` the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sourcepos {
    pub start: LineColumn,
    pub end: LineColumn,
}

impl Sourcepos {
    pub fn new(start_line: i64, start_column: i64, end_line: i64, end_column: i64) -> Self {
        Sourcepos {
            start: LineColumn::new(start_line, start_column),
            end: LineColumn::new(end_line, end_column),
        }
    }

    /// The span of items that exist in the tree but not in the source:
    /// anchors, page breaks, absent delimiters. All coordinates are `-1`.
    pub fn synthetic() -> Self {
        Sourcepos::new(-1, -1, -1, -1)
    }

    pub fn is_synthetic(&self) -> bool {
        self.start.line < 0
    }

    /// Lexicographic containment of `other` within `self`, both inclusive.
    pub fn contains(&self, other: &Sourcepos) -> bool {
        !self.is_synthetic()
            && !other.is_synthetic()
            && self.start <= other.start
            && other.end <= self.end
    }

    pub fn contains_point(&self, line: i64, column: i64) -> bool {
        self.contains(&Sourcepos::new(line, column, line, column))
    }
}

impl From<(i64, i64, i64, i64)> for Sourcepos {
    fn from((sl, sc, el, ec): (i64, i64, i64, i64)) -> Self {
        Sourcepos::new(sl, sc, el, ec)
    }
}

impl From<(LineColumn, LineColumn)> for Sourcepos {
    fn from((start, end): (LineColumn, LineColumn)) -> Self {
        Sourcepos { start, end }
    }
}

impl fmt::Display for Sourcepos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

/// The source record of one style delimiter (`*`, `~~`, a plugin marker, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleDelim {
    pub style: StyleOpts,
    pub pos: Sourcepos,
}

impl StyleDelim {
    pub fn style(&self) -> StyleOpts {
        self.style
    }
}

/// Stable identifier of an item within its document; label maps refer to
/// tree nodes through these instead of pointers, so a cloned document's
/// maps keep working against the clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Numeric discriminator of an item, including the user-defined band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Anchor,
    PageBreak,
    HorizontalLine,
    Heading,
    Paragraph,
    Blockquote,
    List,
    ListItem,
    Code,
    Math,
    Table,
    TableRow,
    TableCell,
    LineBreak,
    Text,
    Link,
    Image,
    FootnoteRef,
    Footnote,
    RawHtml,
    /// Anything produced by an embedding on top of the predefined set;
    /// opaque consumers index these by span only.
    UserDefined,
}

/// Whether a list is bulleted or numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    Unordered,
    Ordered,
}

/// Column alignment of a table, from the delimiter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAlignment {
    Left,
    Center,
    Right,
}

/// A heading's metadata. Its single child is the `Paragraph` holding the
/// heading text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHeading {
    /// 1–6.
    pub level: u8,
    /// Synthesised anchor of the form `#<slug>/<absolute-path>`, unique
    /// within the document.
    pub label: String,
}

/// A list item's metadata; the children are its block content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeListItem {
    pub list_type: ListType,
    /// Ordinal the marker carries; meaningful for ordered lists only.
    pub start_number: i64,
    /// Span of the marker itself (`-`, `3.`, …).
    pub delim: Sourcepos,
    /// `Some(checked)` when the item opens with a task-list checkbox.
    pub task: Option<bool>,
}

/// An inline code span or a code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCode {
    pub literal: String,
    pub inline: bool,
    /// Fenced-code info string, when present.
    pub syntax: Option<String>,
    /// Opening backtick run or fence; synthetic for indented blocks.
    pub start_delim: Sourcepos,
    /// Closing run or fence; synthetic when unterminated or indented.
    pub end_delim: Sourcepos,
    /// Span of the info string; synthetic when absent.
    pub syntax_pos: Sourcepos,
}

/// Inline (`$…$`), display (`$$…$$`) or fenced (```` ```math ````) math.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMath {
    pub literal: String,
    pub inline: bool,
    pub start_delim: Sourcepos,
    pub end_delim: Sourcepos,
    /// Span of the `math` tag for the fenced form; synthetic otherwise.
    pub syntax_pos: Sourcepos,
}

/// Table metadata; children are the rows, row 0 the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTable {
    pub alignments: Vec<TableAlignment>,
}

impl NodeTable {
    pub fn columns_count(&self) -> usize {
        self.alignments.len()
    }
}

/// A run of text with uniform styling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeText {
    pub text: String,
    pub opts: StyleOpts,
    /// Delimiters that opened styles on this run, ordered by position.
    pub open_styles: Vec<StyleDelim>,
    /// Delimiters that closed styles on this run, ordered by position.
    pub close_styles: Vec<StyleDelim>,
    /// Whether the logical line had whitespace immediately before/after the
    /// run; emitters use these for word joining around inline HTML.
    pub space_before: bool,
    pub space_after: bool,
}

/// A link's destination or an image's source, plus its own styling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeLink {
    pub url: String,
    pub title: String,
    /// Plain rendition of the bracketed content; styled content lives in
    /// the item's children.
    pub text: String,
    pub opts: StyleOpts,
    pub open_styles: Vec<StyleDelim>,
    pub close_styles: Vec<StyleDelim>,
}

/// The item payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    /// Marker inserted once per file processed; the `String` is that file's
    /// absolute path.
    Anchor(String),
    /// Separator between per-file subtrees in multi-file mode.
    PageBreak,
    /// Thematic break.
    HorizontalLine,
    Heading(NodeHeading),
    /// Ordered sequence of inline items.
    Paragraph,
    /// Ordered sequence of block items.
    Blockquote,
    /// Children are `ListItem`s.
    List,
    ListItem(NodeListItem),
    Code(NodeCode),
    Math(NodeMath),
    Table(NodeTable),
    TableRow,
    /// Children are inline items.
    TableCell,
    /// Hard line break.
    LineBreak,
    Text(NodeText),
    Link(NodeLink),
    Image(NodeLink),
    /// Reference to a footnote body; the `String` is the key into
    /// [`Document::footnotes`].
    FootnoteRef(String),
    /// A footnote body; children are blocks. Lives in
    /// [`Document::footnotes`], not in the item sequence.
    Footnote(String),
    /// Opaque HTML preserved verbatim.
    RawHtml(String),
    /// User-defined band; indexed by span only.
    Custom(u32),
}

/// A single document node: payload, span, stable id and owned children.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: NodeId,
    pub pos: Sourcepos,
    pub value: ItemValue,
    pub children: Vec<Item>,
}

impl Item {
    pub fn new(id: NodeId, value: ItemValue, pos: Sourcepos) -> Self {
        Item {
            id,
            pos,
            value,
            children: Vec::new(),
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self.value {
            ItemValue::Anchor(..) => ItemType::Anchor,
            ItemValue::PageBreak => ItemType::PageBreak,
            ItemValue::HorizontalLine => ItemType::HorizontalLine,
            ItemValue::Heading(..) => ItemType::Heading,
            ItemValue::Paragraph => ItemType::Paragraph,
            ItemValue::Blockquote => ItemType::Blockquote,
            ItemValue::List => ItemType::List,
            ItemValue::ListItem(..) => ItemType::ListItem,
            ItemValue::Code(..) => ItemType::Code,
            ItemValue::Math(..) => ItemType::Math,
            ItemValue::Table(..) => ItemType::Table,
            ItemValue::TableRow => ItemType::TableRow,
            ItemValue::TableCell => ItemType::TableCell,
            ItemValue::LineBreak => ItemType::LineBreak,
            ItemValue::Text(..) => ItemType::Text,
            ItemValue::Link(..) => ItemType::Link,
            ItemValue::Image(..) => ItemType::Image,
            ItemValue::FootnoteRef(..) => ItemType::FootnoteRef,
            ItemValue::Footnote(..) => ItemType::Footnote,
            ItemValue::RawHtml(..) => ItemType::RawHtml,
            ItemValue::Custom(..) => ItemType::UserDefined,
        }
    }

    /// Containers the position cache descends into before reporting leaves.
    pub fn is_structural_container(&self) -> bool {
        matches!(
            self.item_type(),
            ItemType::Blockquote
                | ItemType::List
                | ItemType::ListItem
                | ItemType::Paragraph
                | ItemType::Table
                | ItemType::TableRow
                | ItemType::TableCell
                | ItemType::Footnote
        )
    }

    /// The run's text, if this is a `Text` item.
    pub fn text(&self) -> Option<&str> {
        match self.value {
            ItemValue::Text(ref t) => Some(&t.text),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&NodeText> {
        match self.value {
            ItemValue::Text(ref t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut NodeText> {
        match self.value {
            ItemValue::Text(ref mut t) => Some(t),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&NodeLink> {
        match self.value {
            ItemValue::Link(ref l) | ItemValue::Image(ref l) => Some(l),
            _ => None,
        }
    }

    pub fn as_heading(&self) -> Option<&NodeHeading> {
        match self.value {
            ItemValue::Heading(ref h) => Some(h),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&NodeCode> {
        match self.value {
            ItemValue::Code(ref c) => Some(c),
            _ => None,
        }
    }

    pub fn as_math(&self) -> Option<&NodeMath> {
        match self.value {
            ItemValue::Math(ref m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list_item(&self) -> Option<&NodeListItem> {
        match self.value {
            ItemValue::ListItem(ref li) => Some(li),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&NodeTable> {
        match self.value {
            ItemValue::Table(ref t) => Some(t),
            _ => None,
        }
    }

    /// The style bitmask of inline items that carry one.
    pub fn opts(&self) -> Option<StyleOpts> {
        match self.value {
            ItemValue::Text(ref t) => Some(t.opts),
            ItemValue::Link(ref l) | ItemValue::Image(ref l) => Some(l.opts),
            _ => None,
        }
    }

    /// Depth-first pre-order walk over this item and its children.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Item)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}

/// A resolved `[label]: url "title"` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDef {
    pub url: String,
    pub title: String,
    pub pos: Sourcepos,
}

/// A parsed document: the item sequence plus the three label maps.
///
/// All items are owned by the document; cloning yields a structurally equal
/// tree sharing nothing with the original.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub items: Vec<Item>,
    /// `#<folded-label>/<path>` → link definition.
    pub labeled_links: FxHashMap<String, LinkDef>,
    /// `#<slug>/<path>` → heading item id.
    pub labeled_headings: FxHashMap<String, NodeId>,
    /// `#<id>/<path>` → footnote body (an [`ItemValue::Footnote`] item).
    pub footnotes: FxHashMap<String, Item>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    /// True when the document holds no real content (anchors and page
    /// breaks do not count).
    pub fn is_empty(&self) -> bool {
        !self
            .items
            .iter()
            .any(|i| !matches!(i.item_type(), ItemType::Anchor | ItemType::PageBreak))
    }

    /// Finds an item anywhere in the tree (footnote bodies included) by id.
    pub fn find(&self, id: NodeId) -> Option<&Item> {
        fn dfs(item: &Item, id: NodeId) -> Option<&Item> {
            if item.id == id {
                return Some(item);
            }
            item.children.iter().find_map(|c| dfs(c, id))
        }
        self.items
            .iter()
            .find_map(|i| dfs(i, id))
            .or_else(|| self.footnotes.values().find_map(|f| dfs(f, id)))
    }

    /// Looks a heading up through [`Document::labeled_headings`].
    pub fn heading_by_label(&self, label: &str) -> Option<&Item> {
        self.labeled_headings
            .get(label)
            .and_then(|&id| self.find(id))
    }
}
