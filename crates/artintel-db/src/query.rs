//! Guarded execution of model-written SQL.
//!
//! Only a single `SELECT`/`WITH` statement is accepted, and it runs inside a
//! read-only transaction that is always rolled back.

use sqlx::PgPool;

use crate::DbError;

/// Keywords that never belong in a read-only question.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "merge", "drop", "alter", "create", "truncate", "grant",
    "revoke", "copy", "call", "do", "vacuum", "reindex", "cluster", "comment", "lock",
    "refresh", "listen", "notify", "set", "reset",
];

/// Check that `sql` is one read-only statement and return it normalised
/// (trimmed, trailing semicolons removed).
///
/// Keyword matching works on whole words, so columns such as `created_at` or
/// `updated_at` are fine. String literals and quoted identifiers are skipped,
/// so `issue = 'Reset'` or `LIKE '%;%'` pass.
///
/// # Errors
///
/// Returns [`DbError::RejectedQuery`] describing why the statement is refused.
pub fn validate_read_only_sql(sql: &str) -> Result<String, DbError> {
    let trimmed = sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if trimmed.is_empty() {
        return Err(DbError::RejectedQuery("empty query".to_string()));
    }

    let masked = mask_quoted(trimmed);
    if masked.contains(';') {
        return Err(DbError::RejectedQuery(
            "multiple statements are not allowed".to_string(),
        ));
    }

    let lowered = masked.to_lowercase();
    let mut words = lowered
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty());

    match words.next() {
        Some("select" | "with") => {}
        Some(first) => {
            return Err(DbError::RejectedQuery(format!(
                "only SELECT queries are allowed, got '{first}'"
            )));
        }
        None => return Err(DbError::RejectedQuery("empty query".to_string())),
    }

    if let Some(word) = words.find(|w| FORBIDDEN_KEYWORDS.contains(w)) {
        return Err(DbError::RejectedQuery(format!(
            "statement contains forbidden keyword '{word}'"
        )));
    }

    Ok(trimmed.to_string())
}

/// Copy of `sql` with the contents of `'...'` literals and `"..."`
/// identifiers replaced by spaces. Doubled quotes stay inside the literal;
/// backslash escapes are honoured in `E'...'` strings.
fn mask_quoted(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut before = [None::<char>; 2];

    while let Some(c) = chars.next() {
        if c != '\'' && c != '"' {
            out.push(c);
            before = [before[1], Some(c)];
            continue;
        }

        let escape_string = c == '\''
            && matches!(before[1], Some('e' | 'E'))
            && !before[0].is_some_and(|p| p.is_ascii_alphanumeric() || p == '_');

        out.push(c);
        while let Some(inner) = chars.next() {
            if escape_string && inner == '\\' {
                chars.next();
                out.push_str("  ");
            } else if inner == c {
                if chars.peek() == Some(&c) {
                    chars.next();
                    out.push_str("  ");
                } else {
                    out.push(c);
                    break;
                }
            } else {
                out.push(' ');
            }
        }
        before = [None, Some(c)];
    }

    out
}

/// Run a validated query and return its rows as a JSON array, at most
/// `max_rows` of them.
///
/// # Errors
///
/// Returns [`DbError::RejectedQuery`] if validation fails, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn run_read_only_query(
    pool: &PgPool,
    sql: &str,
    max_rows: i64,
) -> Result<serde_json::Value, DbError> {
    let sql = validate_read_only_sql(sql)?;
    let wrapped = format!(
        "SELECT COALESCE(json_agg(t), '[]'::json) \
         FROM (SELECT * FROM ({sql}) AS q LIMIT {max_rows}) AS t"
    );

    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION READ ONLY")
        .execute(&mut *tx)
        .await?;
    let rows: serde_json::Value = sqlx::query_scalar(&wrapped).fetch_one(&mut *tx).await?;
    tx.rollback().await?;

    Ok(rows)
}
