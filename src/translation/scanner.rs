use super::parsers::is_ident_byte;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backtick,
    Bracketed,
    LineComment,
    BlockComment,
}

/// Returns the end offset and the identifier starting at `start`, if any.
pub(super) fn scan_ident(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && is_ident_byte(bytes[idx]) {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|ident| (idx, ident))
    }
}
