//! Suggestion engine for query recommendations
//!
//! Generates index candidates from WHERE equality filters and JOIN ... ON
//! keys, plus rewrite hints for non-sargable patterns. Pattern matching runs
//! on an uppercased copy of the normalized text, so proposed columns are
//! uppercased (`ID`, `U.ID`).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::services::query_analyzer::models::{IndexReason, RecItem, Recommendation, ScoredRow};
use crate::services::query_analyzer::parser::mask_literals;

pub const LEADING_WILDCARD_SUGGESTION: &str =
    "avoid leading wildcard in LIKE; consider trigram or full-text index";

static WHERE_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\bWHERE\s+(.+)").expect("where clause regex"));

static EQUALITY_FILTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z_][A-Z0-9_\.]*)\s*=\s*(?:\?|'\?')").expect("equality filter regex")
});

static JOIN_KEYS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bON\s+([A-Z_][A-Z0-9_\.]*)\s*=\s*([A-Z_][A-Z0-9_\.]*)").expect("join key regex")
});

static LEADING_WILDCARD_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLIKE\s+'%").expect("leading wildcard regex"));

/// A query-rewrite heuristic, independent of the index suggestions
struct RewriteCheck {
    applies: fn(&str) -> bool,
    suggestion: &'static str,
}

const REWRITE_CHECKS: &[RewriteCheck] = &[RewriteCheck {
    applies: has_leading_wildcard,
    suggestion: LEADING_WILDCARD_SUGGESTION,
}];

fn has_leading_wildcard(sql: &str) -> bool {
    LEADING_WILDCARD_LIKE.is_match(sql)
}

/// Suggestion engine for generating index and rewrite recommendations
pub struct SuggestionEngine;

impl SuggestionEngine {
    /// Index candidates from WHERE equality and JOIN ON predicates,
    /// deduplicated by (type, column) in first-seen order
    pub fn suggest_index(normalized: &str) -> Vec<RecItem> {
        let upper = normalized.to_uppercase();
        let mut suggestions = Vec::new();

        if let Some(clause) = WHERE_CLAUSE.captures(&upper).and_then(|c| c.get(1)) {
            for condition in split_conditions(clause.as_str()) {
                if let Some(column) = EQUALITY_FILTER.captures(condition).and_then(|c| c.get(1)) {
                    suggestions.push(RecItem::create_index(column.as_str(), IndexReason::WhereFilter));
                }
            }
        }

        for keys in JOIN_KEYS.captures_iter(&upper) {
            for side in [keys.get(1), keys.get(2)].into_iter().flatten() {
                suggestions.push(RecItem::create_index(side.as_str(), IndexReason::JoinKey));
            }
        }

        dedup(suggestions)
    }

    /// Rewrite hints for the given text
    pub fn rewrite_suggestions(sql: &str) -> Vec<RecItem> {
        REWRITE_CHECKS
            .iter()
            .filter(|check| (check.applies)(sql))
            .map(|check| RecItem::rewrite(check.suggestion))
            .collect()
    }

    /// Index candidates followed by rewrite hints for a normalized statement
    pub fn suggest(normalized: &str) -> Vec<RecItem> {
        let mut recs = Self::suggest_index(normalized);
        recs.extend(Self::rewrite_suggestions(normalized));
        dedup(recs)
    }

    /// Build the recommendation for a scored row.
    ///
    /// Index candidates are only proposed for rows flagged by the model or
    /// by a rule. Rewrite checks always run, against the raw query with
    /// comments removed and literals masked, since normalization erases
    /// the wildcard.
    pub fn recommend(row: &ScoredRow) -> Recommendation {
        let mut recs = Vec::new();

        if row.is_flagged() {
            recs.extend(Self::suggest_index(&row.features.normalized));
        }

        recs.extend(Self::rewrite_suggestions(&mask_literals(&row.features.record.query)));

        Recommendation {
            query_id: row.query_id().to_string(),
            recs: dedup(recs),
            explain: row.reasons.clone(),
        }
    }
}

/// Split a WHERE clause on top-level AND/OR, descending into fully
/// parenthesized groups. Quoted regions are skipped.
fn split_conditions(clause: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let bytes = clause.as_bytes();
    let mut depth: i32 = 0;
    let mut in_quote = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quote {
            if b == b'\'' {
                in_quote = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' => in_quote = true,
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ if depth == 0 && b.is_ascii_whitespace() => {
                let rest = &clause[i + 1..];
                let keyword_len = ["AND", "OR"].iter().find_map(|kw| {
                    let boundary = rest.as_bytes().get(kw.len()).copied();
                    (rest.starts_with(kw) && boundary.is_none_or(|c| c.is_ascii_whitespace() || c == b'('))
                        .then_some(kw.len())
                });
                if let Some(len) = keyword_len {
                    parts.push(&clause[start..i]);
                    i += 1 + len;
                    start = i;
                    continue;
                }
            },
            _ => {},
        }
        i += 1;
    }
    parts.push(&clause[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .flat_map(|p| match strip_outer_parens(p) {
            Some(inner) => split_conditions(inner),
            None => vec![p],
        })
        .collect()
}

/// Inner text when the whole condition is wrapped in one pair of parentheses
fn strip_outer_parens(condition: &str) -> Option<&str> {
    let inner = condition.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    for b in inner.bytes() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            },
            _ => {},
        }
    }
    (depth == 0).then_some(inner)
}

fn dedup(items: Vec<RecItem>) -> Vec<RecItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let (kind, key) = item.dedup_key();
            seen.insert((kind, key.to_string()))
        })
        .collect()
}
