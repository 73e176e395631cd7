//! A CommonMark + GFM Markdown parser producing a document tree annotated
//! with exact source positions.
//!
//! On top of CommonMark 0.30, the parser understands the GFM extensions
//! (tables, task lists, strikethrough, autolinks), inline and display
//! LaTeX math (`$…$`, `$$…$$`, fenced `math` blocks), footnotes with
//! multi-paragraph bodies, and multi-file document assembly following
//! links between local Markdown files. Every item carries an inclusive
//! `(line, column)` span, 0-based, including the spans of the emphasis
//! delimiters that styled each text run.
//!
//! ```
//! use marktree::nodes::{ItemType, ITALIC_TEXT};
//!
//! let doc = marktree::parse_document("foo *bar*");
//! let para = &doc.items[1]; // items[0] is the file anchor
//! assert_eq!(para.item_type(), ItemType::Paragraph);
//! assert_eq!(para.children[1].as_text().unwrap().opts, ITALIC_TEXT);
//! ```
//!
//! Parsing never fails: malformed constructs degrade to literal text. The
//! only fallible entry point is [`Parser::parse`], which reports I/O
//! errors for the root file.

#![allow(clippy::too_many_arguments)]

mod ctype;
mod refmap;
mod scanners;
mod strings;
mod walker;

pub mod nodes;
pub mod pos_string;
pub mod poscache;
pub mod source;

mod parser;

pub use parser::autolink;
pub use parser::math;
pub use parser::plugins;
pub use parser::{parse_document, Parser, TAB_STOP};
pub use pos_string::PosString;
pub use poscache::PosCache;
pub use source::{Line, LineSource};

#[cfg(test)]
mod tests;
