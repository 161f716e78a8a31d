//! Row cap enforcement for validated statements.

use std::sync::OnceLock;

use regex::Regex;

use super::safety::ValidatedQuery;

static LIMIT_CLAUSE: OnceLock<Regex> = OnceLock::new();

/// `LIMIT n`, `LIMIT n OFFSET m` or `LIMIT m, n` closing the statement
fn limit_clause() -> &'static Regex {
    LIMIT_CLAUSE.get_or_init(|| {
        Regex::new(r"(?i)\blimit\s+\d+(?:\s*,\s*\d+|\s+offset\s+\d+)?\s*$")
            .expect("static pattern")
    })
}

/// Whether the statement ends with an integer row limit
pub(crate) fn ends_with_limit(sql: &str) -> bool {
    limit_clause().is_match(sql)
}

/// Statement text with a row cap present exactly once.
///
/// An existing trailing `LIMIT n` is kept as written, even if larger than `row_cap`.
pub fn enforce_limit(query: &ValidatedQuery, row_cap: u32) -> String {
    let sql = query.as_str();
    if ends_with_limit(sql) {
        sql.to_string()
    } else {
        format!("{} LIMIT {}", sql.trim_end(), row_cap)
    }
}
