use std::ops::Range;

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    // `E'...'`: backslash escapes the next byte
    EscapeQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// True when the quote at `idx` opens an escape string constant (`E'...'`).
fn is_escape_string_start(bytes: &[u8], idx: usize) -> bool {
    idx >= 1
        && matches!(bytes[idx - 1], b'E' | b'e')
        && (idx < 2 || !is_ident_byte(bytes[idx - 2]))
}

fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// `$tag$` opener starting at `start`; returns the tag and the index of its closing `$`.
fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !is_ident_byte(b) {
            return None;
        }
        idx += 1;
    }
    // `$1` style positional placeholders are not tags
    if bytes.get(start + 1).is_some_and(u8::is_ascii_digit) {
        return None;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len()
        && bytes[idx + 1..end].starts_with(tag.as_bytes())
        && bytes.get(end) == Some(&b'$')
}

/// Byte ranges of `sql` holding plain SQL code.
///
/// String literals, quoted identifiers, comments and dollar-quoted bodies are excluded.
/// Range boundaries always fall on ASCII bytes, so slicing `sql` with them is safe.
pub(super) fn code_spans(sql: &str) -> Vec<Range<usize>> {
    let bytes = sql.as_bytes();
    let mut spans = Vec::new();
    let mut state = State::Normal;
    let mut start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => {
                let next = match b {
                    b'\'' if is_escape_string_start(bytes, idx) => Some(State::EscapeQuoted),
                    b'\'' => Some(State::SingleQuoted),
                    b'"' => Some(State::DoubleQuoted),
                    _ if is_line_comment_start(bytes, idx) => Some(State::LineComment),
                    _ if is_block_comment_start(bytes, idx) => Some(State::BlockComment(1)),
                    b'$' => try_start_dollar_quote(bytes, idx).map(|(tag, _)| State::DollarQuoted(tag)),
                    _ => None,
                };
                if let Some(next) = next {
                    if start < idx {
                        spans.push(start..idx);
                    }
                    match &next {
                        State::LineComment | State::BlockComment(_) => idx += 1,
                        State::DollarQuoted(tag) => idx += tag.len() + 1,
                        _ => {}
                    }
                    state = next;
                }
            }
            State::SingleQuoted | State::DoubleQuoted => {
                let quote = if matches!(state, State::SingleQuoted) { b'\'' } else { b'"' };
                if b == quote {
                    if bytes.get(idx + 1) == Some(&quote) {
                        idx += 1; // escaped quote
                    } else {
                        state = State::Normal;
                        start = idx + 1;
                    }
                }
            }
            State::EscapeQuoted => {
                if b == b'\\' {
                    idx += 1;
                } else if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                        start = idx + 1;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                    start = idx;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    idx += 1;
                    if depth == 1 {
                        state = State::Normal;
                        start = idx + 1;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                    start = idx + 1;
                }
            }
        }
        idx += 1;
    }

    if matches!(state, State::Normal) && start < bytes.len() {
        spans.push(start..bytes.len());
    }
    spans
}

/// Identifier starting at `start`: `[A-Za-z_][A-Za-z0-9_]*`.
pub(super) fn scan_identifier(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let first = *bytes.get(start)?;
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }
    let mut idx = start + 1;
    while idx < bytes.len() && is_ident_byte(bytes[idx]) {
        idx += 1;
    }
    std::str::from_utf8(&bytes[start..idx])
        .ok()
        .map(|ident| (idx, ident))
}

/// Words of the statement with the parenthesis depth they appear at.
pub(super) fn code_words(sql: &str) -> Vec<(u32, &str)> {
    let bytes = sql.as_bytes();
    let mut words = Vec::new();
    let mut depth: u32 = 0;
    for span in code_spans(sql) {
        let mut idx = span.start;
        while idx < span.end {
            match bytes[idx] {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                _ => {}
            }
            if let Some((end, word)) = scan_identifier(bytes, idx) {
                let end = end.min(span.end);
                words.push((depth, &word[..end - idx]));
                idx = end;
                continue;
            }
            idx += 1;
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(sql: &str) -> String {
        code_spans(sql).into_iter().map(|r| &sql[r]).collect()
    }

    #[test]
    fn strips_literals_and_comments() {
        assert_eq!(code("select 'a:b', x -- :c\nfrom t"), "select , x \nfrom t");
        assert_eq!(code("select /* :a /* :b */ */ 1"), "select  1");
        assert_eq!(code(r#"select "odd""col" from t"#), "select  from t");
    }

    #[test]
    fn strips_dollar_quoted_bodies() {
        assert_eq!(code("select $fn$ :x $fn$ + :y"), "select  + :y");
        assert_eq!(code("select $1"), "select $1");
    }

    #[test]
    fn escape_strings_honor_backslashes() {
        assert_eq!(code(r"select E'it\'s :x' || :y"), "select E || :y");
        assert_eq!(code(r"select e'a\\' , :y"), "select e , :y");
        // an identifier ending in e is not an escape prefix
        assert_eq!(code(r"select name'a\' , :y"), "select name , :y");
    }
}
