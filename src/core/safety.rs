//! SQL safety policy for generated statements.
//!
//! Layered allowlist/denylist checks over a single fixed table:
//! - One statement, no comments, no backticks
//! - `SELECT ... FROM <table> ...` with no other source (including `IN <table>`)
//! - No blacklisted keyword as a whole token
//! - `LIMIT` only as a trailing integer clause
//! - At least one known column or aggregate unless selecting `*`
//!
//! This is a conservative heuristic, not a SQL grammar: false rejections are
//! acceptable, false acceptances are not.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::limit::ends_with_limit;
use crate::domain::Schema;

/// Keywords that disqualify a statement wherever they appear
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "drop", "delete", "update", "insert", "alter", "truncate", "grant", "revoke", "create",
    "replace", "merge", "call", "execute", "exec", "attach", "detach", "pragma", "vacuum",
    "reindex", "copy", "into", "upsert",
];

/// Tokens that would introduce a second source or statement
const SOURCE_KEYWORDS: &[&str] = &["join", "union", "intersect", "except"];

/// Aggregate functions accepted in place of a column reference
pub const AGGREGATE_FUNCTIONS: &[&str] = &["count", "avg", "min", "max", "sum"];

/// Comment markers (rejected outright)
const COMMENT_MARKERS: &[&str] = &["--", "/*", "*/", "#"];

static WORD: OnceLock<Regex> = OnceLock::new();
static SHAPE: OnceLock<Regex> = OnceLock::new();
static SOURCE: OnceLock<Regex> = OnceLock::new();
static AGGREGATE: OnceLock<Regex> = OnceLock::new();
static IN_SOURCE: OnceLock<Regex> = OnceLock::new();

/// Whole-word tokens (same notion of "word" as `\b`)
fn word_pattern() -> &'static Regex {
    WORD.get_or_init(|| Regex::new(r"\w+").expect("static pattern"))
}

/// `SELECT <columns> FROM <source> [clauses]`, anchored, case-insensitive, multi-line
fn shape_pattern() -> &'static Regex {
    SHAPE.get_or_init(|| {
        Regex::new(
            r"(?is)^\s*select\b(?P<columns>.*?)\bfrom\s+(?P<source>.+?)(?:\s+(?:where|group\s+by|having|order\s+by|limit)\b.*)?$",
        )
        .expect("static pattern")
    })
}

/// A table reference with an optional alias
fn source_pattern() -> &'static Regex {
    SOURCE.get_or_init(|| {
        Regex::new(r#"(?i)^"?(?P<table>\w+)"?(?:\s+(?:as\s+)?(?P<alias>\w+))?$"#)
            .expect("static pattern")
    })
}

fn aggregate_pattern() -> &'static Regex {
    AGGREGATE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:count|avg|min|max|sum)\s*\(").expect("static pattern")
    })
}

/// `IN` followed by a table or function name rather than a parenthesized list
fn in_source_pattern() -> &'static Regex {
    IN_SOURCE.get_or_init(|| {
        Regex::new(r#"(?i)\bin(?:\s+[\w"\[]|\s*["\[])"#).expect("static pattern")
    })
}

/// A statement that passed the policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery(String);

impl ValidatedQuery {
    /// The statement text (no trailing separator)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the statement text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Policy for generated SQL against one table
#[derive(Debug, Clone)]
pub struct SqlPolicy {
    /// Table name, lowercase
    table: String,

    /// Allowlisted column identifiers, lowercase
    allowed_columns: HashSet<String>,

    /// Blacklisted keywords, lowercase
    forbidden_keywords: HashSet<String>,
}

impl SqlPolicy {
    /// Policy for a schema with the default keyword blacklist
    pub fn for_schema(schema: &Schema) -> Self {
        Self {
            table: schema.table.to_lowercase(),
            allowed_columns: schema.columns().map(str::to_lowercase).collect(),
            forbidden_keywords: FORBIDDEN_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// The table this policy allows
    pub fn table(&self) -> &str {
        &self.table
    }

    /// First blacklisted keyword appearing as a whole token, if any
    pub fn forbidden_keyword(&self, sql: &str) -> Option<String> {
        word_pattern()
            .find_iter(sql)
            .map(|m| m.as_str().to_lowercase())
            .find(|word| self.forbidden_keywords.contains(word))
    }

    /// Whether any allowlisted column appears as a whole token
    pub fn references_known_column(&self, sql: &str) -> bool {
        word_pattern()
            .find_iter(sql)
            .any(|m| self.allowed_columns.contains(&m.as_str().to_lowercase()))
    }

    /// Validate a candidate statement
    pub fn validate(&self, candidate: &str) -> Result<ValidatedQuery, PolicyViolation> {
        // 1. Non-empty after dropping one trailing separator
        let mut sql = candidate.trim();
        if let Some(stripped) = sql.strip_suffix(';') {
            sql = stripped.trim();
        }
        if sql.is_empty() {
            return Err(PolicyViolation::Empty);
        }

        // 2. Single statement
        if sql.contains(';') {
            return Err(PolicyViolation::MultipleStatements);
        }

        // 3. No comments
        if let Some(marker) = COMMENT_MARKERS.iter().find(|m| sql.contains(*m)) {
            return Err(PolicyViolation::Comment {
                marker: marker.to_string(),
            });
        }

        // Identifier quoting or leftover markdown
        if sql.contains('`') {
            return Err(PolicyViolation::Backtick);
        }

        // 4. SELECT ... FROM <table> ... and nothing else as a source
        let shape = shape_pattern()
            .captures(sql)
            .ok_or(PolicyViolation::NotASelect)?;
        let source = shape.name("source").map(|m| m.as_str().trim()).unwrap_or("");
        self.check_source(source)?;
        self.check_single_source(sql)?;

        // 5. Blacklisted keywords anywhere
        if let Some(keyword) = self.forbidden_keyword(sql) {
            return Err(PolicyViolation::ForbiddenKeyword { keyword });
        }

        // 6. LIMIT only as the closing integer clause
        let has_limit = word_pattern()
            .find_iter(sql)
            .any(|m| m.as_str().eq_ignore_ascii_case("limit"));
        if has_limit && !ends_with_limit(sql) {
            return Err(PolicyViolation::InvalidLimit);
        }

        // 7. Known columns or an aggregate, unless selecting everything
        let columns = shape.name("columns").map(|m| m.as_str().trim()).unwrap_or("");
        if columns != "*"
            && !self.references_known_column(sql)
            && !aggregate_pattern().is_match(sql)
        {
            return Err(PolicyViolation::NoKnownColumns);
        }

        Ok(ValidatedQuery(sql.to_string()))
    }

    fn check_source(&self, source: &str) -> Result<(), PolicyViolation> {
        let foreign = || PolicyViolation::ForeignSource {
            found: source.to_string(),
        };

        let captures = source_pattern().captures(source).ok_or_else(foreign)?;
        let table = captures.name("table").map(|m| m.as_str()).unwrap_or("");
        if !table.eq_ignore_ascii_case(&self.table) {
            return Err(foreign());
        }

        // An alias that is really a keyword means the source clause is malformed
        if let Some(alias) = captures.name("alias") {
            let alias = alias.as_str().to_lowercase();
            if SOURCE_KEYWORDS.contains(&alias.as_str()) || alias == "select" || alias == "from" {
                return Err(foreign());
            }
        }

        Ok(())
    }

    fn check_single_source(&self, sql: &str) -> Result<(), PolicyViolation> {
        let mut selects = 0;
        let mut froms = 0;

        for word in word_pattern().find_iter(sql) {
            let word = word.as_str().to_lowercase();
            match word.as_str() {
                "select" => selects += 1,
                "from" => froms += 1,
                w if SOURCE_KEYWORDS.contains(&w) => {
                    return Err(PolicyViolation::ForeignSource {
                        found: w.to_string(),
                    });
                }
                _ => {}
            }
        }

        if let Some(found) = in_source_pattern().find(sql) {
            return Err(PolicyViolation::ForeignSource {
                found: found.as_str().to_string(),
            });
        }

        if selects != 1 || froms != 1 {
            return Err(PolicyViolation::NestedStatement);
        }

        Ok(())
    }
}

/// Why a statement was rejected (for logs only; callers see one generic failure)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("Statement is empty")]
    Empty,

    #[error("Statement separator found before the end of the statement")]
    MultipleStatements,

    #[error("Comment marker found: {marker}")]
    Comment { marker: String },

    #[error("Backtick found in statement")]
    Backtick,

    #[error("Statement is not SELECT ... FROM ...")]
    NotASelect,

    #[error("Statement reads from a source other than the allowed table: {found}")]
    ForeignSource { found: String },

    #[error("Statement contains a nested SELECT or FROM")]
    NestedStatement,

    #[error("Forbidden keyword: {keyword}")]
    ForbiddenKeyword { keyword: String },

    #[error("LIMIT is not a trailing integer clause")]
    InvalidLimit,

    #[error("Statement references no known column and no aggregate")]
    NoKnownColumns,
}
