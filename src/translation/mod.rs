use std::borrow::Cow;
use std::fmt::Write;

mod scanner;

use scanner::{code_spans, code_words, scan_identifier};

/// Positional placeholder style a backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    Sqlite,
}

impl PlaceholderStyle {
    fn prefix(self) -> char {
        match self {
            PlaceholderStyle::Postgres => '$',
            PlaceholderStyle::Sqlite => '?',
        }
    }
}

/// SQL rewritten to positional placeholders plus the parameter names, in position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSql<'a> {
    pub sql: Cow<'a, str>,
    pub names: Vec<String>,
}

/// Rewrite `:name` placeholders into the backend's positional style.
///
/// Repeated names share one position, `::` casts are left alone, and placeholders inside
/// string literals, quoted identifiers, comments and dollar-quoted blocks are ignored:
/// ```rust
/// use sql_map::prelude::*;
///
/// let bound = bind_named_placeholders(
///     "select * from t where a = :id or b = :id and c = ':id'",
///     PlaceholderStyle::Postgres,
/// );
/// assert_eq!(bound.sql, "select * from t where a = $1 or b = $1 and c = ':id'");
/// assert_eq!(bound.names, vec!["id".to_string()]);
/// ```
/// Returns a borrowed `Cow` when the statement has no named placeholders.
#[must_use]
pub fn bind_named_placeholders(sql: &str, style: PlaceholderStyle) -> BoundSql<'_> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut names: Vec<String> = Vec::new();
    let mut copied = 0;

    for span in code_spans(sql) {
        let mut idx = span.start;
        while idx < span.end {
            if bytes[idx] != b':' {
                idx += 1;
                continue;
            }
            if bytes.get(idx + 1) == Some(&b':') {
                idx += 2; // cast
                continue;
            }
            let Some((ident_end, ident)) = scan_identifier(bytes, idx + 1) else {
                idx += 1;
                continue;
            };
            let position = if let Some(pos) = names.iter().position(|n| n == ident) {
                pos + 1
            } else {
                names.push(ident.to_owned());
                names.len()
            };
            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
            buf.push_str(&sql[copied..idx]);
            buf.push(style.prefix());
            let _ = write!(buf, "{position}");
            copied = ident_end;
            idx = ident_end;
        }
    }

    let sql = match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    };
    BoundSql { sql, names }
}

const MAIN_KEYWORDS: &[&str] = &["SELECT", "INSERT", "UPDATE", "DELETE", "MERGE"];

/// Postgres-style command tag for a statement that touched `rowcount` rows.
///
/// `INSERT` reports `INSERT 0 n`, row-counting commands report `<KEYWORD> n`, anything
/// else reports its leading keyword. `WITH` statements report their main command.
#[must_use]
pub fn command_tag(sql: &str, rowcount: i64) -> String {
    let words = code_words(sql);
    let Some((_, first)) = words.first() else {
        return String::new();
    };
    let mut keyword = first.to_ascii_uppercase();
    if keyword == "WITH" {
        if let Some((_, main)) = words.iter().skip(1).find(|(depth, word)| {
            *depth == 0
                && MAIN_KEYWORDS
                    .iter()
                    .any(|kw| word.eq_ignore_ascii_case(kw))
        }) {
            keyword = main.to_ascii_uppercase();
        }
    }
    let rows = rowcount.max(0);
    match keyword.as_str() {
        "INSERT" => format!("INSERT 0 {rows}"),
        "SELECT" | "UPDATE" | "DELETE" | "MERGE" | "VALUES" | "FETCH" | "MOVE" | "COPY" => {
            format!("{keyword} {rows}")
        }
        _ => keyword,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_named_to_sqlite() {
        let bound = bind_named_placeholders(
            "insert into t (a, b) values (:a, :b)",
            PlaceholderStyle::Sqlite,
        );
        assert_eq!(bound.sql, "insert into t (a, b) values (?1, ?2)");
        assert_eq!(bound.names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn repeated_names_share_a_position() {
        let bound = bind_named_placeholders(
            "select * from t where a = :x or b = :y or c = :x",
            PlaceholderStyle::Postgres,
        );
        assert_eq!(bound.sql, "select * from t where a = $1 or b = $2 or c = $1");
        assert_eq!(bound.names.len(), 2);
    }

    #[test]
    fn leaves_casts_literals_and_comments() {
        let sql = "select :v::int, ':nope' -- :nope\n/* :nope */ from t";
        let bound = bind_named_placeholders(sql, PlaceholderStyle::Postgres);
        assert_eq!(bound.sql, "select $1::int, ':nope' -- :nope\n/* :nope */ from t");
        assert_eq!(bound.names, vec!["v".to_string()]);
    }

    #[test]
    fn skips_names_inside_escape_strings() {
        let sql = r"select E'don\'t :touch' as s, :id";
        let bound = bind_named_placeholders(sql, PlaceholderStyle::Postgres);
        assert_eq!(bound.sql, r"select E'don\'t :touch' as s, $1");
        assert_eq!(bound.names, vec!["id".to_string()]);
    }

    #[test]
    fn borrows_when_nothing_to_bind() {
        let sql = "SELECT id, name FROM users WHERE id = 7";
        let bound = bind_named_placeholders(sql, PlaceholderStyle::Sqlite);
        assert!(matches!(bound.sql, Cow::Borrowed(_)));
        assert!(bound.names.is_empty());
    }

    #[test]
    fn command_tags() {
        assert_eq!(command_tag("insert into t values (1)", 1), "INSERT 0 1");
        assert_eq!(command_tag("  UPDATE t SET a = 1", 3), "UPDATE 3");
        assert_eq!(command_tag("-- hi\nselect 1", 1), "SELECT 1");
        assert_eq!(command_tag("create table t (a int)", -1), "CREATE");
        assert_eq!(
            command_tag("with x as (select 1) delete from t where a in (select * from x)", 2),
            "DELETE 2"
        );
        assert_eq!(command_tag("", 0), "");
    }
}
