use std::io::Write;

use artintel_core::EMBEDDING_DIM;

use super::*;

const HEADER: &str = "ArticleID,Month,Year,KPMGTotalImpact,Issue,Comments\n";

fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file
}

async fn article_ids(pool: &sqlx::PgPool) -> Vec<String> {
    sqlx::query_scalar::<_, String>("SELECT articleid FROM articles ORDER BY articleid")
        .fetch_all(pool)
        .await
        .expect("select ids failed")
}

// ---------------------------------------------------------------------------
// CSV decoding
// ---------------------------------------------------------------------------

#[test]
fn missing_file_is_an_error() {
    let err = open_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
    assert!(err.to_string().contains("CSV file not found"));
}

#[test]
fn rows_decode_into_articles() {
    let file = write_csv(
        " ArticleID ,ArtDate,Month,Year,KPMGTotalImpact,Issue,SpokespersonName\n\
         A-1,2025-01-15,Jan,2025,3.5,Rates,Alice\n\
         ,15/01/2025,Jan,20x5,,,\n",
    );
    let mut reader = open_csv(file.path()).expect("open csv");
    let rows: Vec<ArticleCsvRow> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .expect("rows decode");
    assert_eq!(rows.len(), 2);

    let first = NewArticle::from_csv_row(rows[0].clone(), 1);
    assert_eq!(first.article_id, "A-1");
    assert_eq!(first.year, Some(2025));
    assert_eq!(first.kpmg_total_impact, Some(3.5));
    assert_eq!(first.spokesperson_name.as_deref(), Some("Alice"));

    let second = NewArticle::from_csv_row(rows[1].clone(), 2);
    assert_eq!(second.article_id, "row_2");
    assert!(second.year.is_none());
    assert!(second.kpmg_total_impact.is_none());
}

#[test]
fn short_rows_are_accepted() {
    let file = write_csv("ArticleID,Month,Year\nA-9,Mar\n");
    let mut reader = open_csv(file.path()).expect("open csv");
    let rows: Vec<ArticleCsvRow> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .expect("short row decodes");
    assert_eq!(rows[0].month.as_deref(), Some("Mar"));
    assert!(rows[0].year.is_none());
}

#[test]
fn only_first_failures_are_logged_but_all_counted() {
    let mut summary = ImportSummary::default();
    for row in 0..8 {
        note_failure(&mut summary, row, &"bad");
    }
    assert_eq!(summary.skipped, 8);
    assert_eq!(summary.imported, 0);
}

// ---------------------------------------------------------------------------
// Import into Postgres
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn failing_row_is_skipped_and_batch_continues(pool: sqlx::PgPool) {
    let too_long = "x".repeat(300);
    let file = write_csv(&format!(
        "{HEADER}\
         A-1,Jan,2025,1.5,Rates,first\n\
         {too_long},Jan,2025,2.0,Rates,bad\n\
         ,Feb,2025,,Tax,third\n"
    ));

    let summary = import_csv(&pool, file.path())
        .await
        .expect("import should survive a failing row");

    assert_eq!(
        summary,
        ImportSummary {
            imported: 2,
            skipped: 1
        }
    );
    // The blank id is numbered from rows imported so far, not from its
    // position in the file.
    assert_eq!(article_ids(&pool).await, ["A-1", "row_2"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn imports_more_rows_than_one_batch(pool: sqlx::PgPool) {
    let rows = BATCH_SIZE + 5;
    let mut contents = String::from(HEADER);
    for n in 0..rows {
        contents.push_str(&format!(
            "A-{n:04},Mar,2024,{},Rates,comment {n}\n",
            n % 7
        ));
    }
    let file = write_csv(&contents);

    let summary = import_csv(&pool, file.path()).await.expect("import failed");
    assert_eq!(
        summary,
        ImportSummary {
            imported: rows,
            skipped: 0
        }
    );

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
        .fetch_one(&pool)
        .await
        .expect("count failed");
    assert_eq!(count, i64::try_from(rows).unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn reimport_updates_rows_and_keeps_embeddings(pool: sqlx::PgPool) {
    let first = write_csv(&format!("{HEADER}A-1,Jan,2025,1.0,Rates,Rates held steady\n"));
    import_csv(&pool, first.path())
        .await
        .expect("first import failed");

    let mut vector = vec![0.0_f32; EMBEDDING_DIM];
    vector[0] = 1.0;
    let stored = artintel_db::store_embedding(&pool, "A-1", &vector)
        .await
        .expect("store embedding failed");
    assert!(stored);

    let second = write_csv(&format!(
        "{HEADER}A-1,Feb,2025,4.5,Housing,Rates held steady\n"
    ));
    let summary = import_csv(&pool, second.path())
        .await
        .expect("re-import failed");
    assert_eq!(summary.imported, 1);

    let (month, impact, issue, embedded): (Option<String>, Option<f64>, Option<String>, bool) =
        sqlx::query_as(
            "SELECT month, kpmgtotalimpact, issue, comments_embedding IS NOT NULL \
             FROM articles WHERE articleid = 'A-1'",
        )
        .fetch_one(&pool)
        .await
        .expect("select failed");

    assert_eq!(month.as_deref(), Some("Feb"));
    assert_eq!(impact, Some(4.5));
    assert_eq!(issue.as_deref(), Some("Housing"));
    assert!(embedded, "re-import must not clear the stored embedding");
}
