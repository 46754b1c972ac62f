//! CSV import into the `articles` table.

use std::fmt::Display;
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use artintel_core::{ArticleCsvRow, NewArticle};
use sqlx::Connection;

/// Rows committed per transaction.
const BATCH_SIZE: usize = 200;

/// Only the first few bad rows are logged individually.
const LOGGED_FAILURES: usize = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Open a CSV export for reading. Headers are trimmed and short rows are
/// accepted; missing trailing fields become null.
///
/// # Errors
///
/// Returns an error if `path` is not an existing file or cannot be opened.
pub(crate) fn open_csv(path: &Path) -> anyhow::Result<csv::Reader<File>> {
    if !path.is_file() {
        anyhow::bail!("CSV file not found: {}", path.display());
    }
    csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open CSV {}", path.display()))
}

/// Import every row of the CSV at `path`, upserting on `articleid`.
///
/// Each row runs in its own savepoint so a bad row is skipped without
/// aborting the surrounding batch transaction.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a transaction cannot be
/// started or committed. Per-row decode and insert failures are counted in
/// [`ImportSummary::skipped`] instead.
pub(crate) async fn import_csv(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<ImportSummary> {
    let mut reader = open_csv(path)?;
    let mut summary = ImportSummary::default();
    let mut in_batch = 0usize;

    let mut tx = pool.begin().await.context("failed to start import transaction")?;

    for (index, record) in reader.deserialize::<ArticleCsvRow>().enumerate() {
        let row_number = index + 1;
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                note_failure(&mut summary, row_number, &e);
                continue;
            }
        };

        let article = NewArticle::from_csv_row(row, summary.imported + 1);
        let mut savepoint = Connection::begin(&mut *tx).await?;
        match artintel_db::upsert_article(&mut *savepoint, &article).await {
            Ok(()) => {
                savepoint.commit().await?;
                summary.imported += 1;
                in_batch += 1;
            }
            Err(e) => {
                savepoint.rollback().await?;
                note_failure(&mut summary, row_number, &e);
            }
        }

        if in_batch == BATCH_SIZE {
            tx.commit().await.context("failed to commit import batch")?;
            tracing::debug!(imported = summary.imported, "import batch committed");
            tx = pool.begin().await.context("failed to start import transaction")?;
            in_batch = 0;
        }
    }

    tx.commit().await.context("failed to commit import batch")?;

    tracing::info!(
        path = %path.display(),
        imported = summary.imported,
        skipped = summary.skipped,
        "CSV import complete"
    );
    Ok(summary)
}

fn note_failure(summary: &mut ImportSummary, row: usize, error: &dyn Display) {
    summary.skipped += 1;
    if summary.skipped <= LOGGED_FAILURES {
        tracing::warn!(row, error = %error, "skipping CSV row");
    } else if summary.skipped == LOGGED_FAILURES + 1 {
        tracing::warn!("further CSV row failures will not be logged individually");
    }
}

/// `artintel import <path>`: migrate, then import.
pub(crate) async fn run_import(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    artintel_db::run_migrations(pool)
        .await
        .context("failed to run migrations")?;
    let summary = import_csv(pool, path).await?;
    println!(
        "imported {} rows from {} ({} skipped)",
        summary.imported,
        path.display(),
        summary.skipped
    );
    Ok(())
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod tests;
