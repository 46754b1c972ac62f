//! Prompts for answering questions with SQL over the `articles` table.
//!
//! The model writes one query, the caller validates and runs it, and the
//! model then phrases the answer from the rows.

use crate::client::{ChatMessage, OllamaClient};
use crate::error::LlmError;

const SCHEMA_PROMPT: &str = "\
You are an agent that writes queries for a PostgreSQL database holding an `articles` table of \
industry news coverage. Given a question, write one syntactically correct PostgreSQL query that \
answers it.

Rules:
- Return ONLY the SQL, with no explanation.
- Write exactly one read-only statement starting with SELECT or WITH.
- Never write DML or DDL (INSERT, UPDATE, DELETE, DROP, ALTER, CREATE and so on).
- Never select every column; only ask for the columns the question needs.
- Order by a relevant column when that makes the answer more useful.
- Do not generate embeddings; only query existing columns.

Table `articles` (identifiers are unquoted lowercase):
- articleid: unique identifier of the article record
- artdate: publication date (may be null)
- month: month label, e.g. 'Jul'
- year: publication year (integer, primary for time grouping)
- competname: firm the article is about, e.g. 'Deloitte', 'KPMG'
- kpmgtotalimpact: numeric impact score attributed to KPMG
- deloittetotalimpact: impact score attributed to Deloitte
- eytotalimpact: impact score attributed to EY
- pwctotalimpact: impact score attributed to PwC
- issue: topical issue or theme
- industry: industry segment referenced
- comments: free-text commentary
- comments_embedding: vector(384) embedding of comments
- spokespersonname: named spokesperson cited (if any)
- created_at, updated_at: row timestamps";

/// Messages asking the model to write SQL for `question`.
#[must_use]
pub fn query_messages(question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SCHEMA_PROMPT),
        ChatMessage::user(format!("Question: {question}")),
    ]
}

/// Messages asking the model to answer `question` from the query and its rows.
#[must_use]
pub fn answer_messages(question: &str, sql: &str, rows: &serde_json::Value) -> Vec<ChatMessage> {
    vec![ChatMessage::user(format!(
        "Given the following user question, corresponding SQL query, and SQL result, \
         answer the user question.\n\n\
         Question: {question}\n\
         SQL Query: {sql}\n\
         SQL Result: {rows}"
    ))]
}

/// Strip Markdown code fences, a leading `SQL:` label and trailing
/// semicolons from a model reply.
#[must_use]
pub fn clean_sql(reply: &str) -> String {
    let mut text = reply.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (`sql`, `postgresql`, ...) on the fence line.
        text = rest.split_once('\n').map_or("", |(_, body)| body);
        if let Some(end) = text.rfind("```") {
            text = &text[..end];
        }
    }

    let text = text.trim();
    let text = text
        .strip_prefix("SQL:")
        .or_else(|| text.strip_prefix("sql:"))
        .unwrap_or(text);

    text.trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
        .to_string()
}

/// Ask the model for SQL answering `question` and return it cleaned.
///
/// # Errors
///
/// Returns [`LlmError`] if the chat request fails or the cleaned reply is
/// empty.
pub async fn write_query(client: &OllamaClient, question: &str) -> Result<String, LlmError> {
    let reply = client.chat(&query_messages(question), 0.0).await?;
    let sql = clean_sql(&reply);
    if sql.is_empty() {
        return Err(LlmError::EmptyResponse("generated SQL".to_string()));
    }
    tracing::debug!(sql = %sql, "model wrote query");
    Ok(sql)
}

/// Ask the model to phrase the answer to `question` from `rows`.
///
/// # Errors
///
/// Returns [`LlmError`] if the chat request fails.
pub async fn answer_question(
    client: &OllamaClient,
    question: &str,
    sql: &str,
    rows: &serde_json::Value,
) -> Result<String, LlmError> {
    client
        .chat(&answer_messages(question, sql, rows), 0.0)
        .await
}
