//! `artintel ask`: answer a question by letting the model write SQL.

use std::io::{self, BufRead, Write};

use anyhow::Context;
use artintel_core::AppConfig;
use artintel_llm::{sql, OllamaClient};

pub(crate) async fn run_ask(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    question: &str,
    assume_yes: bool,
    max_rows: i64,
) -> anyhow::Result<()> {
    let client = OllamaClient::new(config).context("failed to build model client")?;

    let generated = sql::write_query(&client, question)
        .await
        .context("model failed to write a query")?;
    let query = artintel_db::validate_read_only_sql(&generated)
        .with_context(|| format!("refusing to run generated SQL:\n{generated}"))?;

    println!("SQL:\n{query}\n");

    if !assume_yes && !confirm("Run this query? [y/N] ")? {
        println!("aborted");
        return Ok(());
    }

    let rows = artintel_db::run_read_only_query(pool, &query, max_rows)
        .await
        .context("query failed")?;
    println!("Result:\n{}\n", serde_json::to_string_pretty(&rows)?);

    let answer = sql::answer_question(&client, question, &query, &rows)
        .await
        .context("model failed to answer")?;
    println!("Answer:\n{answer}");
    Ok(())
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
