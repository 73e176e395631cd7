//! Command-line front-end: parse a Markdown file and print the item tree.

use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;

use marktree::nodes::{Document, Item, ItemValue};

#[derive(ClapParser)]
#[command(version, about = "Parse Markdown into a position-annotated item tree")]
struct Cli {
    /// The Markdown file to parse.
    file: PathBuf,

    /// Follow links to local Markdown files and assemble one document.
    #[arg(short, long)]
    recursive: bool,

    /// File extensions the walker treats as Markdown.
    #[arg(long = "extension", value_name = "EXT", default_values_t = [String::from("md"), String::from("markdown")])]
    extensions: Vec<String>,

    /// Also print the label maps (links, headings, footnotes).
    #[arg(long)]
    labels: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut parser = marktree::Parser::new();
    parser.set_markdown_extensions(cli.extensions.clone());

    let doc = match parser.parse(&cli.file, cli.recursive) {
        Ok(doc) => doc,
        Err(err) => {
            eprintln!("marktree: {}: {}", cli.file.display(), err);
            process::exit(1);
        }
    };

    for item in &doc.items {
        print_item(item, 0);
    }

    if cli.labels {
        print_labels(&doc);
    }
}

fn print_item(item: &Item, depth: usize) {
    let indent = "  ".repeat(depth);
    let pos = if item.pos.is_synthetic() {
        String::new()
    } else {
        format!(" [{}]", item.pos)
    };
    println!("{}{}{}", indent, describe(item), pos);
    for child in &item.children {
        print_item(child, depth + 1);
    }
}

fn describe(item: &Item) -> String {
    match item.value {
        ItemValue::Anchor(ref path) => format!("anchor {}", path),
        ItemValue::PageBreak => "page-break".into(),
        ItemValue::HorizontalLine => "horizontal-line".into(),
        ItemValue::Heading(ref h) => format!("heading level={} label={}", h.level, h.label),
        ItemValue::Paragraph => "paragraph".into(),
        ItemValue::Blockquote => "blockquote".into(),
        ItemValue::List => "list".into(),
        ItemValue::ListItem(ref li) => match li.task {
            Some(checked) => format!("list-item task checked={}", checked),
            None => format!("list-item {:?} start={}", li.list_type, li.start_number),
        },
        ItemValue::Code(ref c) => format!(
            "code inline={} syntax={}",
            c.inline,
            c.syntax.as_deref().unwrap_or("-")
        ),
        ItemValue::Math(ref m) => format!("math inline={} {:?}", m.inline, m.literal),
        ItemValue::Table(ref t) => format!("table columns={}", t.columns_count()),
        ItemValue::TableRow => "table-row".into(),
        ItemValue::TableCell => "table-cell".into(),
        ItemValue::LineBreak => "line-break".into(),
        ItemValue::Text(ref t) => format!("text {:?} opts={:#06b}", t.text, t.opts),
        ItemValue::Link(ref l) => format!("link url={:?} text={:?}", l.url, l.text),
        ItemValue::Image(ref l) => format!("image url={:?} text={:?}", l.url, l.text),
        ItemValue::FootnoteRef(ref label) => format!("footnote-ref {}", label),
        ItemValue::Footnote(ref label) => format!("footnote {}", label),
        ItemValue::RawHtml(ref html) => format!("raw-html {:?}", truncated(html)),
        ItemValue::Custom(tag) => format!("custom tag={}", tag),
    }
}

fn truncated(s: &str) -> String {
    if s.chars().count() > 40 {
        let head: String = s.chars().take(40).collect();
        format!("{}…", head)
    } else {
        s.to_string()
    }
}

fn print_labels(doc: &Document) {
    let mut links: Vec<_> = doc.labeled_links.iter().collect();
    links.sort_by_key(|(k, _)| k.clone());
    for (label, def) in links {
        println!("link {} -> {}", label, def.url);
    }

    let mut headings: Vec<_> = doc.labeled_headings.keys().collect();
    headings.sort();
    for label in headings {
        println!("heading {}", label);
    }

    let mut footnotes: Vec<_> = doc.footnotes.keys().collect();
    footnotes.sort();
    for label in footnotes {
        println!("footnote {}", label);
    }
}
