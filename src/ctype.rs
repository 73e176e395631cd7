//! Character classification used by the scanners, matching cmark's locale
//! independent ctype tables. The parser walks `char`s, so everything here
//! takes `char` and answers `false` for non-ASCII input unless noted.

pub fn isspace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

pub fn is_space_or_tab(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

pub fn ispunct(ch: char) -> bool {
    matches!(ch,
        '!'..='/' | ':'..='@' | '['..='`' | '{'..='~')
}

pub fn isdigit(ch: char) -> bool {
    ch.is_ascii_digit()
}

pub fn isalpha(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

pub fn isalnum(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
}
