//! Embedding command handlers: `embed`, `status` and `similar`.

use anyhow::Context;
use artintel_core::AppConfig;
use artintel_llm::{embed_for_storage, OllamaClient};

/// Characters of a comment shown by `similar`.
const SNIPPET_CHARS: usize = 70;

/// Embed pending comments in batches of `batch_size` until `limit` vectors
/// are stored, no pending rows remain, or a whole batch fails.
///
/// Returns the number of embeddings stored.
///
/// # Errors
///
/// Returns an error if the pending-row query fails. Per-row embedding and
/// storage failures are logged and skipped.
pub(crate) async fn embed_pending(
    pool: &sqlx::PgPool,
    client: &OllamaClient,
    batch_size: i64,
    limit: Option<u32>,
) -> anyhow::Result<usize> {
    let mut remaining = limit.map(|l| usize::try_from(l).unwrap_or(usize::MAX));
    let mut stored = 0usize;

    tracing::info!(
        model = %client.embed_model(),
        batch_size,
        ?limit,
        "embedding pending comments"
    );

    loop {
        let want = match remaining {
            Some(0) => break,
            Some(r) => batch_size.min(i64::try_from(r).unwrap_or(i64::MAX)),
            None => batch_size,
        };

        let rows = artintel_db::list_pending_embeddings(pool, want)
            .await
            .context("failed to list pending embeddings")?;
        if rows.is_empty() {
            break;
        }

        let mut stored_in_batch = 0usize;
        for row in &rows {
            let vector = match embed_for_storage(client, row.comments.trim()).await {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::warn!(article_id = %row.articleid, error = %e, "embedding failed");
                    continue;
                }
            };
            match artintel_db::store_embedding(pool, &row.articleid, &vector).await {
                Ok(true) => stored_in_batch += 1,
                Ok(false) => {
                    tracing::warn!(
                        article_id = %row.articleid,
                        "article vanished before embedding was stored"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        article_id = %row.articleid,
                        error = %e,
                        "storing embedding failed"
                    );
                }
            }
        }

        stored += stored_in_batch;
        if let Some(r) = remaining.as_mut() {
            *r = r.saturating_sub(stored_in_batch);
        }
        tracing::info!(stored, "embedding batch done");

        // Failed rows stay pending and would be selected again.
        if stored_in_batch == 0 {
            tracing::warn!("no embeddings stored in the last batch, stopping");
            break;
        }
    }

    Ok(stored)
}

pub(crate) async fn run_embed(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    batch_size: i64,
    limit: Option<u32>,
) -> anyhow::Result<()> {
    let client = OllamaClient::new(config).context("failed to build model client")?;
    let stored = embed_pending(pool, &client, batch_size, limit).await?;
    println!("stored {stored} embeddings");
    Ok(())
}

pub(crate) async fn run_status(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let status = artintel_db::embedding_status(pool)
        .await
        .context("failed to read embedding status")?;
    println!(
        "articles: {} | embedded: {} | pending: {}",
        status.total,
        status.embedded,
        status.pending()
    );
    Ok(())
}

/// `artintel similar <query>`: print the `k` nearest comments.
pub(crate) async fn run_similar(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    query: &str,
    k: i64,
) -> anyhow::Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("similarity query must not be empty");
    }

    let client = OllamaClient::new(config).context("failed to build model client")?;
    let vector = embed_for_storage(&client, query)
        .await
        .context("failed to embed query")?;
    let hits = artintel_db::find_similar(pool, &vector, k)
        .await
        .context("similarity search failed")?;

    if hits.is_empty() {
        println!("no embedded articles yet; run `artintel embed` first");
    }
    for hit in hits {
        println!(
            "{}\t{:.6}\t{}...",
            hit.articleid,
            hit.distance,
            snippet(hit.comments.as_deref())
        );
    }
    Ok(())
}

/// First [`SNIPPET_CHARS`] characters of `comment` on one line.
fn snippet(comment: Option<&str>) -> String {
    comment
        .unwrap_or_default()
        .chars()
        .take(SNIPPET_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
#[path = "embed_test.rs"]
mod tests;
