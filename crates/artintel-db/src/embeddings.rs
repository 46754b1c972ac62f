//! Storage and similarity search for `articles.comments_embedding` (pgvector).

use sqlx::PgPool;

use crate::DbError;

/// Comments shorter than this (after trimming) are not worth embedding.
pub const MIN_COMMENT_CHARS: i32 = 5;

/// An article whose comment still needs an embedding.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingEmbedding {
    pub articleid: String,
    pub comments: String,
}

/// A nearest-neighbour hit, closest first.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SimilarArticle {
    pub articleid: String,
    pub comments: Option<String>,
    /// L2 distance to the query vector.
    pub distance: f64,
}

/// Render a vector as a pgvector text literal, e.g. `[0.1,0.2]`.
fn vector_literal(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(","))
}

/// Fetch up to `limit` articles with a usable comment and no embedding yet.
///
/// Ordered by `articleid` so repeated batches walk the table predictably.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pending_embeddings(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<PendingEmbedding>, DbError> {
    let rows = sqlx::query_as::<_, PendingEmbedding>(
        "SELECT articleid, comments \
         FROM articles \
         WHERE comments IS NOT NULL \
           AND length(trim(comments)) >= $1 \
           AND comments_embedding IS NULL \
         ORDER BY articleid \
         LIMIT $2",
    )
    .bind(MIN_COMMENT_CHARS)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Store the embedding for one article and bump `updated_at`.
///
/// Returns `false` if no article has that id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails (including a dimension
/// mismatch with the `vector(384)` column).
pub async fn store_embedding(
    pool: &PgPool,
    article_id: &str,
    embedding: &[f32],
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE articles \
         SET comments_embedding = $1::vector, updated_at = NOW() \
         WHERE articleid = $2",
    )
    .bind(vector_literal(embedding))
    .bind(article_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Return the `k` embedded articles closest to `embedding` by L2 distance.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_similar(
    pool: &PgPool,
    embedding: &[f32],
    k: i64,
) -> Result<Vec<SimilarArticle>, DbError> {
    if embedding.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, SimilarArticle>(
        "SELECT articleid, comments, \
                (comments_embedding <-> $1::vector)::double precision AS distance \
         FROM articles \
         WHERE comments_embedding IS NOT NULL \
         ORDER BY comments_embedding <-> $1::vector, articleid \
         LIMIT $2",
    )
    .bind(vector_literal(embedding))
    .bind(k)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
