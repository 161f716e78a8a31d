//! Candidate statement extraction from free-form generator output.

use std::sync::OnceLock;

use regex::Regex;

use super::error::AskError;

static SELECT_WORD: OnceLock<Regex> = OnceLock::new();

/// Markdown code delimiter (inline span or fence)
const BACKTICK: char = '`';

fn select_word() -> &'static Regex {
    SELECT_WORD.get_or_init(|| Regex::new(r"(?i)\bselect\b").expect("static pattern"))
}

/// Take the first SELECT-shaped fragment out of `raw`.
///
/// The fragment runs from the first whole-word `SELECT` up to the first
/// statement separator, a backtick closing inline code or a fence, or the
/// end of the text.
pub fn extract_statement(raw: &str) -> Result<String, AskError> {
    let start = select_word()
        .find(raw)
        .map(|m| m.start())
        .ok_or_else(|| AskError::Generation("no SELECT statement produced".to_string()))?;

    let rest = &raw[start..];
    let end = [rest.find(';'), rest.find(BACKTICK)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len());

    Ok(rest[..end].trim().to_string())
}
