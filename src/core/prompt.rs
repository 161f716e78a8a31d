//! Prompt rendering for SQL generation.
//!
//! Deterministic: the same question, schema and model always produce the
//! same request. The column list in the prompt is advisory; the policy in
//! `safety` is what enforces it.

use crate::domain::{GenerationRequest, Question, Schema};

use super::safety::FORBIDDEN_KEYWORDS;

/// Keywords named in the prompt as examples of what is forbidden
const PROMPT_FORBIDDEN_EXAMPLES: usize = 7;

/// Render a question into a generation request
pub fn build_request(question: &Question, schema: &Schema, model: &str) -> GenerationRequest {
    let row_cap = question.row_cap();
    let table = schema.table;

    let columns = schema.columns().collect::<Vec<_>>().join(", ");
    let forbidden = FORBIDDEN_KEYWORDS
        .iter()
        .take(PROMPT_FORBIDDEN_EXAMPLES)
        .map(|k| k.to_uppercase())
        .collect::<Vec<_>>()
        .join(", ");

    let prompt = format!(
        r#"You translate natural-language questions into SQL for a single table named `{table}`.
Return ONLY ONE valid SQL statement (SELECT ... FROM {table} ...), with no extra text.
Strict rules:
  - Use only the table `{table}`.
  - Allowed clauses: SELECT, FROM, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT.
  - Forbidden: {forbidden}, etc. No comments, no joins, no subqueries.
  - Allowed columns: {columns}
  - Nutrient values are per 100g; energ_kcal is energy in kcal, lipid_tot is total fat.
  - For a ranking ("which food has the most iron?") use ORDER BY iron DESC LIMIT 1.
  - For an upper bound ("under 300 kcal") use energ_kcal <= 300.
  - If no columns are mentioned, return all columns (SELECT *).
  - Respect the suggested max_results: {row_cap}
Examples:
  Input: "Dame alimentos altos en proteína y bajos en grasa"
  Output: SELECT {key}, {name}, protein, lipid_tot FROM {table} WHERE protein >= 10 AND lipid_tot <= 10 ORDER BY protein DESC LIMIT {row_cap}
  Input: "¿Qué alimento tiene más hierro?"
  Output: SELECT {key}, {name}, iron FROM {table} ORDER BY iron DESC LIMIT 1

Translate ONLY the following question to SQL:
"""{question}"""
"#,
        key = schema.key_column,
        name = schema.name_column,
        question = question.text.trim(),
    );

    GenerationRequest {
        prompt,
        model: model.to_string(),
        row_cap_hint: Some(row_cap),
    }
}
