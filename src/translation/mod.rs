//! Lightweight SQL scanning: finds named placeholders and statement boundaries while skipping
//! string literals, quoted identifiers and comments.
//!
//! Warning: this is a state machine, not a parser. A `;` inside a `CREATE TRIGGER ... BEGIN ... END`
//! body is still treated as a statement boundary by [`split_statements`].

mod parsers;
mod scanner;

use parsers::{is_block_comment_end, is_block_comment_start, is_line_comment_start, is_named_sigil};
use scanner::{State, scan_ident};

/// A `:name`, `@name` or `$name` reference found in SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedPlaceholder<'a> {
    pub sigil: char,
    pub name: &'a str,
}

impl NamedPlaceholder<'_> {
    /// The placeholder as written, sigil included.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}{}", self.sigil, self.name)
    }
}

#[derive(Default)]
struct Scan<'a> {
    named: Vec<NamedPlaceholder<'a>>,
    statements: Vec<&'a str>,
}

fn scan(sql: &str) -> Scan<'_> {
    let mut out = Scan::default();
    let bytes = sql.as_bytes();
    let mut state = State::Normal;
    let mut idx = 0;
    let mut stmt_start = 0;
    let mut has_code = false;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => {
                    state = State::SingleQuoted;
                    has_code = true;
                }
                b'"' => {
                    state = State::DoubleQuoted;
                    has_code = true;
                }
                b'`' => {
                    state = State::Backtick;
                    has_code = true;
                }
                b'[' => {
                    state = State::Bracketed;
                    has_code = true;
                }
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment;
                    idx += 1;
                }
                b';' => {
                    if has_code {
                        out.statements.push(sql[stmt_start..idx].trim());
                    }
                    stmt_start = idx + 1;
                    has_code = false;
                }
                _ if is_named_sigil(b) => {
                    has_code = true;
                    if let Some((end, name)) = scan_ident(bytes, idx + 1) {
                        let placeholder = NamedPlaceholder {
                            sigil: b as char,
                            name,
                        };
                        if !out.named.contains(&placeholder) {
                            out.named.push(placeholder);
                        }
                        idx = end - 1;
                    }
                }
                _ if !b.is_ascii_whitespace() => has_code = true,
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backtick => {
                if b == b'`' {
                    if bytes.get(idx + 1) == Some(&b'`') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if is_block_comment_end(bytes, idx) {
                    state = State::Normal;
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    if has_code {
        out.statements.push(sql[stmt_start..].trim());
    }
    out
}

/// Named placeholders in order of first appearance, each distinct spelling once.
#[must_use]
pub fn named_placeholders(sql: &str) -> Vec<NamedPlaceholder<'_>> {
    scan(sql).named
}

/// Split a script into its statements, dropping empty and comment-only fragments.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<&str> {
    scan(sql).statements
}
