//! Hand-rolled per-line recognisers for the block scanner and a few inline
//! constructs. Every function works on the logical line as a char slice and
//! returns char indices, which the callers translate to virgin columns.

use crate::ctype::{isalnum, isalpha, isdigit, isspace};
use crate::nodes::TableAlignment;

/// Up to three spaces of indentation keep a construct at the current level.
const MAX_INDENT: usize = 3;

fn indent(line: &[char]) -> usize {
    line.iter().take_while(|&&c| c == ' ').count()
}

/// An ATX heading opener: marker run position, level and where the text
/// begins (after the run and any following spaces).
pub struct AtxHeading {
    pub level: u8,
    pub marker_start: usize,
    pub text_start: usize,
}

pub fn atx_heading_start(line: &[char]) -> Option<AtxHeading> {
    let i = indent(line);
    if i > MAX_INDENT || line.get(i) != Some(&'#') {
        return None;
    }
    let level = line[i..].iter().take_while(|&&c| c == '#').count();
    if level > 6 {
        return None;
    }
    let after = i + level;
    match line.get(after) {
        None => (),
        Some(&c) if c == ' ' || c == '\t' => (),
        _ => return None,
    }
    let text_start = after
        + line[after..]
            .iter()
            .take_while(|&&c| c == ' ' || c == '\t')
            .count();
    Some(AtxHeading {
        level: level as u8,
        marker_start: i,
        text_start,
    })
}

pub enum SetextChar {
    Equals,
    Hyphen,
}

pub fn setext_heading_line(line: &[char]) -> Option<SetextChar> {
    let i = indent(line);
    if i > MAX_INDENT {
        return None;
    }
    let c = *line.get(i)?;
    if c != '=' && c != '-' {
        return None;
    }
    let run = line[i..].iter().take_while(|&&x| x == c).count();
    let rest = &line[i + run..];
    if run > 0 && rest.iter().all(|&x| x == ' ' || x == '\t') {
        Some(if c == '=' {
            SetextChar::Equals
        } else {
            SetextChar::Hyphen
        })
    } else {
        None
    }
}

pub fn thematic_break(line: &[char]) -> Option<char> {
    let i = indent(line);
    if i > MAX_INDENT {
        return None;
    }
    let c = *line.get(i)?;
    if c != '*' && c != '-' && c != '_' {
        return None;
    }
    let mut count = 0;
    for &x in &line[i..] {
        if x == c {
            count += 1;
        } else if x != ' ' && x != '\t' {
            return None;
        }
    }
    if count >= 3 {
        Some(c)
    } else {
        None
    }
}

/// An opening code fence.
pub struct FenceOpen {
    pub fence_char: char,
    pub fence_length: usize,
    pub fence_offset: usize,
    /// Char index where the info string starts (spaces skipped); `None`
    /// when the line ends at the fence.
    pub info_start: Option<usize>,
    pub info_end: usize,
}

pub fn open_code_fence(line: &[char]) -> Option<FenceOpen> {
    let i = indent(line);
    if i > MAX_INDENT {
        return None;
    }
    let c = *line.get(i)?;
    if c != '`' && c != '~' {
        return None;
    }
    let run = line[i..].iter().take_while(|&&x| x == c).count();
    if run < 3 {
        return None;
    }
    let rest = &line[i + run..];
    // An info string on a backtick fence cannot contain backticks.
    if c == '`' && rest.contains(&'`') {
        return None;
    }
    let info_rel = rest.iter().position(|&x| x != ' ' && x != '\t');
    let info_end = i
        + run
        + rest.len()
        - rest
            .iter()
            .rev()
            .take_while(|&&x| x == ' ' || x == '\t')
            .count();
    Some(FenceOpen {
        fence_char: c,
        fence_length: run,
        fence_offset: i,
        info_start: info_rel.map(|r| i + run + r),
        info_end,
    })
}

/// A closing fence: same char, at least the opening length, nothing else.
pub fn close_code_fence(line: &[char], fence_char: char, min_len: usize) -> Option<(usize, usize)> {
    let i = indent(line);
    if i > MAX_INDENT {
        return None;
    }
    let run = line[i..].iter().take_while(|&&x| x == fence_char).count();
    if run >= min_len && line[i + run..].iter().all(|&x| x == ' ' || x == '\t') {
        Some((i, run))
    } else {
        None
    }
}

pub fn blockquote_marker(line: &[char]) -> Option<(usize, usize)> {
    let i = indent(line);
    if i > MAX_INDENT || line.get(i) != Some(&'>') {
        return None;
    }
    let content = if line.get(i + 1) == Some(&' ') {
        i + 2
    } else {
        i + 1
    };
    Some((i, content))
}

/// A list-item marker.
pub struct ListMarker {
    pub ordered: bool,
    pub start_number: i64,
    /// Bullet char, or the ordered delimiter (`.` / `)`).
    pub marker_char: char,
    pub marker_start: usize,
    /// Width of the marker itself (bullet = 1; `12.` = 3).
    pub marker_width: usize,
    /// Char index of the item's content on this line; `None` when the
    /// marker is followed by end-of-line.
    pub content_start: Option<usize>,
}

pub fn list_marker(line: &[char]) -> Option<ListMarker> {
    let i = indent(line);
    if i > MAX_INDENT {
        return None;
    }
    let c = *line.get(i)?;

    let (ordered, start_number, marker_char, width) = if c == '-' || c == '+' || c == '*' {
        (false, 0, c, 1)
    } else if isdigit(c) {
        let digits = line[i..].iter().take_while(|&&x| isdigit(x)).count();
        if digits > 9 {
            return None;
        }
        let delim = *line.get(i + digits)?;
        if delim != '.' && delim != ')' {
            return None;
        }
        let n: i64 = line[i..i + digits]
            .iter()
            .collect::<String>()
            .parse()
            .ok()?;
        (true, n, delim, digits + 1)
    } else {
        return None;
    };

    // The marker must be followed by a space or the end of the line.
    match line.get(i + width) {
        None => Some(ListMarker {
            ordered,
            start_number,
            marker_char,
            marker_start: i,
            marker_width: width,
            content_start: None,
        }),
        Some(&x) if x == ' ' || x == '\t' => {
            let spaces = line[i + width..]
                .iter()
                .take_while(|&&s| s == ' ' || s == '\t')
                .count();
            let content = i + width + spaces;
            Some(ListMarker {
                ordered,
                start_number,
                marker_char,
                marker_start: i,
                marker_width: width,
                content_start: if content < line.len() {
                    Some(content)
                } else {
                    None
                },
            })
        }
        _ => None,
    }
}

/// Parses a table delimiter row (`| :--- | :---: |`), yielding one
/// alignment per column.
pub fn table_delimiter_row(line: &[char]) -> Option<Vec<TableAlignment>> {
    let mut aligns = Vec::new();
    let trimmed_start = indent(line);
    if trimmed_start > MAX_INDENT {
        return None;
    }
    let mut cells: Vec<&[char]> = Vec::new();
    let mut cell_start = trimmed_start;
    let mut seen_pipe = false;
    for (k, &c) in line.iter().enumerate().skip(trimmed_start) {
        if c == '|' {
            seen_pipe = true;
            cells.push(&line[cell_start..k]);
            cell_start = k + 1;
        }
    }
    cells.push(&line[cell_start..]);
    if !seen_pipe {
        return None;
    }

    for (k, cell) in cells.iter().enumerate() {
        let inner: Vec<char> = cell
            .iter()
            .copied()
            .filter(|&c| c != ' ' && c != '\t')
            .collect();
        if inner.is_empty() {
            // Leading/trailing pipe produces empty edge cells.
            if k == 0 || k == cells.len() - 1 {
                continue;
            }
            return None;
        }
        let left = inner[0] == ':';
        let right = inner[inner.len() - 1] == ':';
        let dashes = &inner[left as usize..inner.len() - right as usize];
        if dashes.is_empty() || dashes.iter().any(|&c| c != '-') {
            return None;
        }
        aligns.push(if left && right {
            TableAlignment::Center
        } else if right {
            TableAlignment::Right
        } else {
            TableAlignment::Left
        });
    }

    if aligns.is_empty() {
        None
    } else {
        Some(aligns)
    }
}

const BLOCK_TAGS: [&str; 62] = [
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "section", "source",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

const VERBATIM_TAGS: [&str; 4] = ["pre", "script", "style", "textarea"];

fn tag_name_at(line: &[char], mut i: usize) -> Option<(String, usize)> {
    let start = i;
    while i < line.len() && (isalnum(line[i]) || line[i] == '-') {
        i += 1;
    }
    if i == start || !isalpha(line[start]) {
        None
    } else {
        Some((line[start..i].iter().collect::<String>().to_lowercase(), i))
    }
}

/// Detects the start of an HTML block, returning its CommonMark kind (1–6).
/// Kind 7 has its own scanner because it may not interrupt a paragraph.
pub fn html_block_start(line: &[char]) -> Option<u8> {
    let i = indent(line);
    if i > MAX_INDENT || line.get(i) != Some(&'<') {
        return None;
    }
    let rest: String = line[i..].iter().collect();
    let lower = rest.to_lowercase();

    if lower.starts_with("<!--") {
        return Some(2);
    }
    if lower.starts_with("<?") {
        return Some(3);
    }
    if lower.starts_with("<![cdata[") {
        return Some(5);
    }
    if rest.starts_with("<!") && rest[2..].starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Some(4);
    }

    let close = rest.starts_with("</");
    let name_at = i + if close { 2 } else { 1 };
    if let Some((name, after)) = tag_name_at(line, name_at) {
        let next_ok = match line.get(after) {
            None => true,
            Some(&c) if c == ' ' || c == '\t' || c == '>' => true,
            Some(&'/') if line.get(after + 1) == Some(&'>') => true,
            _ => false,
        };
        if next_ok {
            if !close && VERBATIM_TAGS.contains(&name.as_str()) {
                return Some(1);
            }
            if BLOCK_TAGS.contains(&name.as_str()) {
                return Some(6);
            }
        }
    }
    None
}

/// Kind 7: a line consisting of one complete open or close tag (any name
/// except the verbatim ones) and trailing whitespace only.
pub fn html_block_start_7(line: &[char]) -> bool {
    let i = indent(line);
    if i > MAX_INDENT || line.get(i) != Some(&'<') {
        return false;
    }
    if let Some(len) = html_tag(line, i) {
        let name_at = if line.get(i + 1) == Some(&'/') { i + 2 } else { i + 1 };
        if let Some((name, _)) = tag_name_at(line, name_at) {
            if VERBATIM_TAGS.contains(&name.as_str()) {
                return false;
            }
        }
        return line[i + len..].iter().all(|&c| c == ' ' || c == '\t');
    }
    false
}

/// The end condition of a given HTML block kind for one line.
pub fn html_block_end(line: &[char], kind: u8) -> bool {
    let lower: String = line.iter().collect::<String>().to_lowercase();
    match kind {
        1 => VERBATIM_TAGS
            .iter()
            .any(|t| lower.contains(&format!("</{}>", t))),
        2 => lower.contains("-->"),
        3 => lower.contains("?>"),
        4 => lower.contains('>'),
        5 => lower.contains("]]>"),
        // Kinds 6 and 7 end on a blank line, handled by the caller.
        _ => false,
    }
}

/// Scans one complete inline HTML construct starting at `pos` (which must
/// be `<`): open/close tag, comment, processing instruction, declaration or
/// CDATA section. Returns its length in chars.
pub fn html_tag(line: &[char], pos: usize) -> Option<usize> {
    if line.get(pos) != Some(&'<') {
        return None;
    }
    let rest = &line[pos..];

    // Comment: `<!--` … `-->`, not starting with `>` / `->`.
    if rest.len() >= 7 && rest[1] == '!' && rest[2] == '-' && rest[3] == '-' {
        let body = &rest[4..];
        let mut k = 0;
        while k + 2 < body.len() {
            if body[k] == '-' && body[k + 1] == '-' && body[k + 2] == '>' {
                return Some(4 + k + 3);
            }
            k += 1;
        }
        return None;
    }

    // Processing instruction: `<?` … `?>`.
    if rest.len() >= 2 && rest[1] == '?' {
        let mut k = 2;
        while k + 1 < rest.len() {
            if rest[k] == '?' && rest[k + 1] == '>' {
                return Some(k + 2);
            }
            k += 1;
        }
        return None;
    }

    // CDATA: `<![CDATA[` … `]]>`.
    let cdata: Vec<char> = "<![CDATA[".chars().collect();
    if rest.len() > cdata.len() && rest[..cdata.len()] == cdata[..] {
        let mut k = cdata.len();
        while k + 2 < rest.len() {
            if rest[k] == ']' && rest[k + 1] == ']' && rest[k + 2] == '>' {
                return Some(k + 3);
            }
            k += 1;
        }
        return None;
    }

    // Declaration: `<!` letter … `>`.
    if rest.len() >= 2 && rest[1] == '!' {
        if rest.len() > 2 && rest[2].is_ascii_alphabetic() {
            for (k, &c) in rest.iter().enumerate().skip(2) {
                if c == '>' {
                    return Some(k + 1);
                }
            }
        }
        return None;
    }

    let close = rest.len() > 1 && rest[1] == '/';
    let mut k = if close { 2 } else { 1 };
    let (_, after) = tag_name_at(rest, k)?;
    k = after;

    if close {
        while k < rest.len() && (rest[k] == ' ' || rest[k] == '\t') {
            k += 1;
        }
        return if rest.get(k) == Some(&'>') {
            Some(k + 1)
        } else {
            None
        };
    }

    // Attributes.
    loop {
        let ws = rest[k..]
            .iter()
            .take_while(|&&c| c == ' ' || c == '\t')
            .count();
        let mut j = k + ws;
        match rest.get(j) {
            Some(&'>') => return Some(j + 1),
            Some(&'/') if rest.get(j + 1) == Some(&'>') => return Some(j + 2),
            Some(&c) if ws > 0 && (isalpha(c) || c == '_' || c == ':') => {
                // Attribute name.
                j += 1;
                while j < rest.len()
                    && (isalnum(rest[j]) || matches!(rest[j], '_' | ':' | '.' | '-'))
                {
                    j += 1;
                }
                // Optional value.
                let ws2 = rest[j..]
                    .iter()
                    .take_while(|&&c| c == ' ' || c == '\t')
                    .count();
                if rest.get(j + ws2) == Some(&'=') {
                    j += ws2 + 1;
                    j += rest[j..]
                        .iter()
                        .take_while(|&&c| c == ' ' || c == '\t')
                        .count();
                    match rest.get(j) {
                        Some(&q) if q == '"' || q == '\'' => {
                            j += 1;
                            while j < rest.len() && rest[j] != q {
                                j += 1;
                            }
                            if j >= rest.len() {
                                return None;
                            }
                            j += 1;
                        }
                        Some(_) => {
                            let start = j;
                            while j < rest.len()
                                && !matches!(
                                    rest[j],
                                    ' ' | '\t' | '"' | '\'' | '=' | '<' | '>' | '`'
                                )
                            {
                                j += 1;
                            }
                            if j == start {
                                return None;
                            }
                        }
                        None => return None,
                    }
                }
                k = j;
                continue;
            }
            _ => return None,
        }
    }
}

/// `<scheme:body>` autolink starting at `pos` (the `<`); returns the length
/// including both angle brackets.
pub fn autolink_uri(line: &[char], pos: usize) -> Option<usize> {
    if line.get(pos) != Some(&'<') {
        return None;
    }
    let rest = &line[pos + 1..];
    if rest.is_empty() || !isalpha(rest[0]) {
        return None;
    }
    let scheme_len = rest
        .iter()
        .take_while(|&&c| isalnum(c) || c == '+' || c == '.' || c == '-')
        .count();
    if !(2..=32).contains(&scheme_len) || rest.get(scheme_len) != Some(&':') {
        return None;
    }
    for (k, &c) in rest.iter().enumerate().skip(scheme_len + 1) {
        if c == '>' {
            return Some(k + 2);
        }
        if isspace(c) || c == '<' {
            return None;
        }
    }
    None
}

/// `<addr@host>` autolink starting at `pos`; returns the length including
/// both angle brackets.
pub fn autolink_email(line: &[char], pos: usize) -> Option<usize> {
    if line.get(pos) != Some(&'<') {
        return None;
    }
    let rest = &line[pos + 1..];
    let user_len = rest
        .iter()
        .take_while(|&&c| {
            isalnum(c) || ".!#$%&'*+/=?^_`{|}~-".contains(c)
        })
        .count();
    if user_len == 0 || rest.get(user_len) != Some(&'@') {
        return None;
    }
    let mut k = user_len + 1;
    loop {
        let label = rest[k..]
            .iter()
            .take_while(|&&c| isalnum(c) || c == '-')
            .count();
        if label == 0 || label > 63 {
            return None;
        }
        k += label;
        match rest.get(k) {
            Some(&'.') => k += 1,
            Some(&'>') => return Some(k + 2),
            _ => return None,
        }
    }
}
