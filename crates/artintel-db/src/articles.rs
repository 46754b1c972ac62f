//! Database operations for the `articles` table.

use artintel_core::NewArticle;
use sqlx::{PgExecutor, PgPool};

use crate::DbError;

/// Row counts describing embedding coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct EmbeddingStatus {
    pub total: i64,
    pub embedded: i64,
}

impl EmbeddingStatus {
    #[must_use]
    pub fn pending(&self) -> i64 {
        (self.total - self.embedded).max(0)
    }
}

/// Insert an article or overwrite every imported column of the existing row
/// with the same `articleid`, bumping `updated_at`.
///
/// The embedding column is left untouched so re-importing does not discard
/// vectors.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_article<'e, E>(executor: E, article: &NewArticle) -> Result<(), DbError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO articles ( \
             articleid, artdate, month, year, competname, \
             kpmgtotalimpact, deloittetotalimpact, eytotalimpact, pwctotalimpact, \
             issue, industry, comments, spokespersonname \
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (articleid) DO UPDATE SET \
             artdate = EXCLUDED.artdate, \
             month = EXCLUDED.month, \
             year = EXCLUDED.year, \
             competname = EXCLUDED.competname, \
             kpmgtotalimpact = EXCLUDED.kpmgtotalimpact, \
             deloittetotalimpact = EXCLUDED.deloittetotalimpact, \
             eytotalimpact = EXCLUDED.eytotalimpact, \
             pwctotalimpact = EXCLUDED.pwctotalimpact, \
             issue = EXCLUDED.issue, \
             industry = EXCLUDED.industry, \
             comments = EXCLUDED.comments, \
             spokespersonname = EXCLUDED.spokespersonname, \
             updated_at = NOW()",
    )
    .bind(&article.article_id)
    .bind(article.art_date)
    .bind(&article.month)
    .bind(article.year)
    .bind(&article.compet_name)
    .bind(article.kpmg_total_impact)
    .bind(article.deloitte_total_impact)
    .bind(article.ey_total_impact)
    .bind(article.pwc_total_impact)
    .bind(&article.issue)
    .bind(&article.industry)
    .bind(&article.comments)
    .bind(&article.spokesperson_name)
    .execute(executor)
    .await?;

    Ok(())
}

/// Count all articles and those that already carry an embedding.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn embedding_status(pool: &PgPool) -> Result<EmbeddingStatus, DbError> {
    let status = sqlx::query_as::<_, EmbeddingStatus>(
        "SELECT COUNT(*) AS total, \
                COUNT(comments_embedding) AS embedded \
         FROM articles",
    )
    .fetch_one(pool)
    .await?;

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_never_negative() {
        let status = EmbeddingStatus {
            total: 3,
            embedded: 5,
        };
        assert_eq!(status.pending(), 0);
    }

    #[test]
    fn pending_is_difference() {
        let status = EmbeddingStatus {
            total: 10,
            embedded: 4,
        };
        assert_eq!(status.pending(), 6);
    }
}
