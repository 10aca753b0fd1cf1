//! SQL text normalization
//!
//! Canonicalizes raw SQL so that queries differing only in literal values,
//! keyword casing, comments or whitespace collapse to the same text.
//!
//! This is a heuristic, not a grammar. Known limitations:
//! - floating point literals become `?.?`
//! - negative numbers keep their sign (`-?`)
//! - backslash-escaped quotes are not understood

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Placeholder for single-quoted string literals
pub const STRING_PLACEHOLDER: &str = "'?'";

/// Placeholder for integer literals
pub const NUMBER_PLACEHOLDER: &str = "?";

/// Mask for string literals that open with a `%` wildcard
const WILDCARD_MASK: &str = "'%'";

static INTEGER_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\b").expect("integer literal regex"));

static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "AVG", "BETWEEN", "BY", "CASE", "COUNT",
        "CREATE", "CROSS", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT",
        "EXISTS", "EXPLAIN", "FALSE", "FETCH", "FIRST", "FOR", "FROM", "FULL", "GROUP",
        "HAVING", "ILIKE", "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN",
        "LEFT", "LIKE", "LIMIT", "MAX", "MIN", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR",
        "ORDER", "OUTER", "OVER", "PARTITION", "RETURNING", "RIGHT", "SELECT", "SET", "SUM",
        "TABLE", "THEN", "TRUE", "UNION", "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WITH",
    ]
    .into_iter()
    .collect()
});

/// Keywords written like function calls: no space before `(`
static FUNCTION_KEYWORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["AVG", "COUNT", "MAX", "MIN", "SUM"].into_iter().collect());

/// How terminated single-quoted literals are written out
#[derive(Clone, Copy)]
enum LiteralMode {
    Placeholder,
    WildcardMask,
}

/// Normalize raw SQL text into its canonical form.
///
/// Never fails: unterminated quotes or comments are carried through as-is.
pub fn normalize(raw_sql: &str) -> String {
    let formatted = canonicalize_tokens(raw_sql, LiteralMode::Placeholder);
    INTEGER_LITERAL.replace_all(&formatted, NUMBER_PLACEHOLDER).trim().to_string()
}

/// Canonical text with comments removed and each string literal masked as
/// `'%'` when it starts with a wildcard, `'?'` otherwise.
///
/// Used for pattern checks that need to know the literal's leading
/// character without matching inside comments or literal contents.
pub fn mask_literals(raw_sql: &str) -> String {
    canonicalize_tokens(raw_sql, LiteralMode::WildcardMask)
}

/// Strip comments, canonicalize whitespace, uppercase keywords and replace
/// single-quoted literals.
///
/// Spacing is rebuilt rather than copied: comparison operators get one space
/// on each side, commas one space after, parentheses none inside. Double-quoted
/// and backtick identifiers are copied verbatim.
fn canonicalize_tokens(sql: &str, literals: LiteralMode) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut pending_space = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // Line comment
        if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            pending_space = true;
            continue;
        }

        // Block comment
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i = (i + 2).min(chars.len());
            pending_space = true;
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            i += 1;
            continue;
        }

        match c {
            '(' => {
                if space_before_paren(&out) {
                    out.push(' ');
                }
                out.push('(');
                pending_space = false;
                i += 1;
                continue;
            },
            ')' | ',' => {
                out.push(c);
                pending_space = c == ',';
                i += 1;
                continue;
            },
            '=' | '<' | '>' | '!' => {
                if !out.is_empty() && !out.ends_with('(') {
                    out.push(' ');
                }
                while i < chars.len() && matches!(chars[i], '=' | '<' | '>' | '!') {
                    out.push(chars[i]);
                    i += 1;
                }
                pending_space = true;
                continue;
            },
            _ => {},
        }

        if pending_space && !out.is_empty() && !out.ends_with('(') {
            out.push(' ');
        }
        pending_space = false;

        match c {
            '\'' => {
                let (end, terminated) = scan_quoted(&chars, i);
                if terminated {
                    let wildcard = chars.get(i + 1) == Some(&'%');
                    out.push_str(match literals {
                        LiteralMode::WildcardMask if wildcard => WILDCARD_MASK,
                        _ => STRING_PLACEHOLDER,
                    });
                } else {
                    out.extend(&chars[i..end]);
                }
                i = end;
            },
            '"' | '`' => {
                let (end, _) = scan_quoted(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            },
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let upper = word.to_ascii_uppercase();
                if KEYWORDS.contains(upper.as_str()) {
                    out.push_str(&upper);
                } else {
                    out.push_str(&word);
                }
            },
            c if c.is_ascii_digit() => {
                // Keep identifier-like runs such as `1abc` intact
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    out.push(chars[i]);
                    i += 1;
                }
            },
            c => {
                out.push(c);
                i += 1;
            },
        }
    }

    out
}

/// `IN (`, `VALUES (` and `= (` keep a space; calls like `COUNT(` and
/// `lower(` do not.
fn space_before_paren(out: &str) -> bool {
    match out.chars().last() {
        None | Some('(') => false,
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
            let word = out.rsplit(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).next().unwrap_or("");
            KEYWORDS.contains(word) && !FUNCTION_KEYWORDS.contains(word)
        },
        Some(_) => true,
    }
}

/// Find the end of the quoted region starting at `start`.
///
/// Returns the index after the closing quote and whether one was found. A
/// doubled quote inside the region is an escaped quote.
fn scan_quoted(chars: &[char], start: usize) -> (usize, bool) {
    let quote = chars[start];
    let mut i = start + 1;

    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return (i + 1, true);
        }
        i += 1;
    }

    (i, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_replaces_literals() {
        assert_eq!(
            normalize("select * from users where id = 123"),
            "SELECT * FROM users WHERE id = ?"
        );
        assert_eq!(
            normalize("SELECT name FROM users WHERE email = 'a@b.com'"),
            "SELECT name FROM users WHERE email = '?'"
        );
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_comments() {
        let sql = "  SELECT *\n\tFROM   users -- trailing note\n WHERE /* inline */ id = 7 ";
        assert_eq!(normalize(sql), "SELECT * FROM users WHERE id = ?");
    }

    #[test]
    fn test_normalize_keeps_identifier_case() {
        assert_eq!(
            normalize("select u.Name from Users u join orders o on u.id = o.user_id"),
            "SELECT u.Name FROM Users u JOIN orders o ON u.id = o.user_id"
        );
    }

    #[test]
    fn test_normalize_leaves_digits_inside_identifiers() {
        assert_eq!(normalize("select col1 from t2 where x = 5"), "SELECT col1 FROM t2 WHERE x = ?");
    }

    #[test]
    fn test_normalize_keywords_inside_strings_untouched() {
        // Literal is replaced, so only the placeholder survives
        assert_eq!(
            normalize("select 1 from t where note = 'select from where'"),
            "SELECT ? FROM t WHERE note = '?'"
        );
    }

    #[test]
    fn test_normalize_escaped_quote() {
        let escaped = normalize("select * from t where s = 'it''s'");
        assert_eq!(escaped, "SELECT * FROM t WHERE s = '?'");
        assert_eq!(escaped, normalize("select * from t where s = 'abc'"));
        assert_eq!(normalize("select * from t where s = ''"), escaped);
    }

    #[test]
    fn test_normalize_spacing_around_operators() {
        let expected = "SELECT * FROM users WHERE id = ?";
        assert_eq!(normalize("select * from users where id=5"), expected);
        assert_eq!(normalize("select * from users where id =5"), expected);
        assert_eq!(normalize("select * from users where id = 5"), expected);

        assert_eq!(normalize("select count( * ) from t"), "SELECT COUNT(*) FROM t");
        assert_eq!(normalize("select COUNT (*) from t"), "SELECT COUNT(*) FROM t");
        assert_eq!(normalize("select a,b , c from t where x<>1 and y>=2"), "SELECT a, b, c FROM t WHERE x <> ? AND y >= ?");
        assert_eq!(normalize("select * from t where id in(1,2)"), normalize("select * from t where id in ( 1 , 2 )"));
        assert_eq!(normalize("select * from t where id in(1,2)"), "SELECT * FROM t WHERE id IN (?, ?)");
        assert_eq!(normalize("select lower (name) from t"), "SELECT lower(name) FROM t");
    }

    #[test]
    fn test_mask_literals_marks_leading_wildcards() {
        assert_eq!(
            mask_literals("select * from t where a like '%x' and b like 'y%' -- like '%z'"),
            "SELECT * FROM t WHERE a LIKE '%' AND b LIKE '?'"
        );
        assert_eq!(mask_literals("select * from t where note = 'LIKE ''%a'"), "SELECT * FROM t WHERE note = '?'");
        assert_eq!(mask_literals("select * from t where id = 5"), "SELECT * FROM t WHERE id = 5");
    }

    #[test]
    fn test_normalize_float_and_negative_limitations() {
        assert_eq!(normalize("select * from t where p = 1.5"), "SELECT * FROM t WHERE p = ?.?");
        assert_eq!(normalize("select * from t where p = -3"), "SELECT * FROM t WHERE p = -?");
    }

    #[test]
    fn test_normalize_malformed_sql_does_not_panic() {
        assert_eq!(normalize("select * from t where s = 'unterminated"), "SELECT * FROM t WHERE s = 'unterminated");
        assert_eq!(normalize("select /* never closed"), "SELECT");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(")))((( = = ;"), "))) (((= = ;");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "select * from users where id = 123",
            "SELECT u.name, o.total FROM users u JOIN orders o ON u.id = o.user_id WHERE o.total > 12.5",
            "select count(*) from big_table where status = 'x' -- hi",
            "update t set a = 'b''c' where id in (1, 2, 3)",
            "select count( * ),max(x) from t where a=1 and b<>'z' group by c",
            "select * from t where name like '%abc'",
        ];
        for sql in samples {
            let once = normalize(sql);
            assert_eq!(normalize(&once), once, "not idempotent for {sql}");
        }
    }
}
