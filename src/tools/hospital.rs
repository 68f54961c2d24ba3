//! Hospital directory tool — natural language in, natural language out.
//!
//! Two model round trips around one SQL execution:
//! 1. text-to-SQL: the question plus the table DDL produce a single SELECT,
//! 2. the SELECT runs against the in-memory directory,
//! 3. synthesis: the rows are phrased back as a plain-language answer.
//!
//! The directory rejects anything that is not one SELECT statement, so a
//! confused model reply fails loudly instead of mutating the table.

use std::sync::Arc;

use tracing::debug;

use crate::directory::{HospitalDirectory, Row, TABLE_NAME};
use crate::error::AppError;
use crate::llm::{ChatMessage, LlmProvider};

pub struct HospitalLookup {
    directory: Arc<HospitalDirectory>,
    llm: LlmProvider,
}

impl HospitalLookup {
    pub fn new(directory: Arc<HospitalDirectory>, llm: LlmProvider) -> Self {
        Self { directory, llm }
    }

    /// Answer a natural-language question about the hospital table.
    pub async fn answer(&self, question: &str) -> Result<String, AppError> {
        let sql = self.generate_sql(question).await?;
        debug!(question, sql, "text-to-sql");

        let rows = self.directory.query(&sql)?;
        debug!(rows = rows.len(), "directory query executed");

        self.synthesize(question, &sql, &rows).await
    }

    async fn generate_sql(&self, question: &str) -> Result<String, AppError> {
        let prompt = build_sql_prompt(question);
        let reply = self
            .llm
            .complete(&[
                ChatMessage::system(
                    "You translate questions into SQLite SELECT statements. \
                     Reply with the SQL statement only — no explanation, no markdown.",
                ),
                ChatMessage::user(prompt),
            ])
            .await?;
        Ok(strip_code_fences(&reply))
    }

    async fn synthesize(
        &self,
        question: &str,
        sql: &str,
        rows: &[Row],
    ) -> Result<String, AppError> {
        let rendered = format_rows(rows);
        let prompt = format!(
            "### Question\n{question}\n\n### SQL\n{sql}\n\n### Result rows\n{rendered}\n\n\
             Answer the question in one or two plain sentences using only the result rows. \
             If the rows are empty, say that no matching hospital was found."
        );
        let reply = self
            .llm
            .complete(&[
                ChatMessage::system("You phrase database results as short, friendly answers."),
                ChatMessage::user(prompt),
            ])
            .await?;
        Ok(reply)
    }
}

fn build_sql_prompt(question: &str) -> String {
    format!(
        "Table schema:\n{}\n\nQuestion: {question}\n\n\
         Write one SQLite SELECT statement over the {TABLE_NAME} table that answers \
         the question. Match hospital names case-insensitively and with LIKE when the \
         question names only part of a hospital. Return the SQL only.",
        HospitalDirectory::schema_ddl()
    )
}

/// Strip a surrounding Markdown code fence (with optional `sql` tag) and any
/// leading `sql:` label models like to add.
fn strip_code_fences(reply: &str) -> String {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.strip_prefix("sql").unwrap_or(rest);
        text = rest.trim_start_matches(['\r', '\n']);
        if let Some(end) = text.rfind("```") {
            text = &text[..end];
        }
    }
    let text = text.trim();
    let text = text
        .strip_prefix("sql:")
        .or_else(|| text.strip_prefix("SQL:"))
        .unwrap_or(text);
    text.trim().to_string()
}

/// Render rows as `name=value` lines for the synthesis prompt.
fn format_rows(rows: &[Row]) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_plain_statement_unchanged() {
        assert_eq!(
            strip_code_fences("SELECT * FROM chitwon_hospital"),
            "SELECT * FROM chitwon_hospital"
        );
    }

    #[test]
    fn strip_fenced_sql() {
        let fenced = "```sql\nSELECT contact FROM chitwon_hospital\n```";
        assert_eq!(strip_code_fences(fenced), "SELECT contact FROM chitwon_hospital");
    }

    #[test]
    fn strip_untagged_fence_and_label() {
        assert_eq!(strip_code_fences("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("SQL: SELECT 1"), "SELECT 1");
    }

    #[test]
    fn format_rows_named_pairs() {
        let rows = vec![vec![
            ("hospital_name".to_string(), "Bharatpur Hospital.".to_string()),
            ("contact".to_string(), "056-597003".to_string()),
        ]];
        assert_eq!(
            format_rows(&rows),
            "hospital_name=Bharatpur Hospital., contact=056-597003"
        );
    }

    #[test]
    fn format_empty_rows() {
        assert_eq!(format_rows(&[]), "(no rows)");
    }

    #[test]
    fn sql_prompt_contains_schema_and_question() {
        let p = build_sql_prompt("Which hospital treats cancer?");
        assert!(p.contains("chitwon_hospital"));
        assert!(p.contains("Which hospital treats cancer?"));
    }
}
