//! Impact metrics aggregation over the article table.
//!
//! Every metric is its own query. A failing query becomes a [`Diagnostic`] in
//! the returned report and the remaining metrics still run; only failing to
//! obtain a connection at all is surfaced as an error.

use std::collections::BTreeMap;

use artintel_core::{
    impact_candidates, quote_ident, select_impact_column, sort_monthly_counts, AggregateReport,
    Diagnostic, DiagnosticKind, ImpactBucket, ImpactCandidate, MaxImpact, MetricsConfig,
    MonthlyCount, TopSpokesperson,
};
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("aggregate connect: {0}")]
    Connect(#[source] sqlx::Error),
}

impl AggregateError {
    /// The report a caller should render for this failure: no metrics and a
    /// single connectivity diagnostic.
    #[must_use]
    pub fn into_report(self) -> AggregateReport {
        AggregateReport::unreachable(self.to_string())
    }
}

/// Metrics that do not depend on an impact column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericMetrics {
    pub total_articles: Option<i64>,
    pub top_spokesperson: Option<TopSpokesperson>,
    pub monthly_counts: Option<Vec<MonthlyCount>>,
}

/// Metrics computed over the selected impact column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImpactMetrics {
    pub avg_impact: Option<f64>,
    pub max_impact: Option<MaxImpact>,
    pub impact_distribution: Option<BTreeMap<String, i64>>,
}

/// Compute the full aggregate report for the configured table.
///
/// One connection is held for the whole run and returned to the pool when
/// this function exits, whatever happened to the individual queries.
///
/// # Errors
///
/// Returns [`AggregateError::Connect`] if no connection can be acquired.
/// Per-metric failures are reported in [`AggregateReport::errors`] instead.
pub async fn aggregate(
    pool: &PgPool,
    config: &MetricsConfig,
) -> Result<AggregateReport, AggregateError> {
    let mut conn = pool.acquire().await.map_err(|e| {
        tracing::error!(error = %e, "aggregate could not acquire a connection");
        AggregateError::Connect(e)
    })?;

    let mut report = AggregateReport::default();

    let (generic, diagnostics) = run_generic_metrics(&mut conn, &config.table).await;
    report.total_articles = generic.total_articles;
    report.top_spokesperson = generic.top_spokesperson;
    report.monthly_counts = generic.monthly_counts;
    report.errors.extend(diagnostics);

    let (column, diagnostics) = detect_impact_column(&mut conn, config).await;
    report.errors.extend(diagnostics);

    if let Some(column) = column {
        report.company_impact_field = Some(config.label_for(&column));
        let (impact, diagnostics) = run_impact_metrics(&mut conn, &config.table, &column).await;
        report.avg_impact = impact.avg_impact;
        report.max_impact = impact.max_impact;
        report.impact_distribution = impact.impact_distribution;
        report.errors.extend(diagnostics);
    } else {
        report.company_impact_field = None;
        report.avg_impact = None;
        report.push_error(Diagnostic::new(
            DiagnosticKind::NoImpactColumn,
            "no impact column detected",
        ));
    }

    tracing::info!(
        table = %config.table,
        impact_field = ?report.company_impact_field,
        total_articles = ?report.total_articles,
        diagnostics = report.errors.len(),
        "aggregate complete"
    );

    Ok(report)
}

/// Choose the impact column to report on.
///
/// Lists the table's columns, ranks the impact candidates (configured order
/// first, then discovered suffix matches) and counts populated rows in each.
/// Returns `None` when no candidate exists or the column list could not be
/// read; the latter also yields a `schema_introspection` diagnostic.
pub async fn detect_impact_column(
    conn: &mut PgConnection,
    config: &MetricsConfig,
) -> (Option<String>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();

    let columns = match sqlx::query_scalar::<_, String>(
        "SELECT column_name::text \
         FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 \
         ORDER BY ordinal_position",
    )
    .bind(&config.table)
    .fetch_all(&mut *conn)
    .await
    {
        Ok(columns) => columns,
        Err(e) => {
            tracing::warn!(table = %config.table, error = %e, "column introspection failed");
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::SchemaIntrospection,
                format!("detect_impact: {e}"),
            ));
            return (None, diagnostics);
        }
    };

    let table = quote_ident(&config.table);
    let mut candidates = Vec::new();
    for column in impact_candidates(config, &columns) {
        let col = quote_ident(&column);
        let sql = format!(
            "SELECT COUNT(*) FROM {table} WHERE {col} IS NOT NULL AND TRIM({col}::text) <> ''"
        );
        let non_null = match sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut *conn)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(column = %column, error = %e, "impact probe failed");
                diagnostics.push(Diagnostic::metric(&format!("impact_probe {column}"), e));
                0
            }
        };
        tracing::debug!(column = %column, non_null, "impact candidate");
        candidates.push(ImpactCandidate { column, non_null });
    }

    let selected = select_impact_column(&candidates).map(|c| c.column.clone());
    (selected, diagnostics)
}

/// Total count, most-cited spokesperson and month-ordered counts.
///
/// Each sub-metric is independent: a failure leaves that field `None` and
/// adds a `metric_query` diagnostic.
pub async fn run_generic_metrics(
    conn: &mut PgConnection,
    table: &str,
) -> (GenericMetrics, Vec<Diagnostic>) {
    let table = quote_ident(table);
    let mut metrics = GenericMetrics::default();
    let mut diagnostics = Vec::new();

    let sql = format!("SELECT COUNT(*) FROM {table}");
    match sqlx::query_scalar::<_, i64>(&sql).fetch_one(&mut *conn).await {
        Ok(total) => metrics.total_articles = Some(total),
        Err(e) => record(&mut diagnostics, "total_articles", &e),
    }

    // Ties on count resolve by name so reruns agree.
    let sql = format!(
        "SELECT spokespersonname, COUNT(*) AS c \
         FROM {table} \
         WHERE spokespersonname IS NOT NULL AND TRIM(spokespersonname) <> '' \
         GROUP BY spokespersonname \
         ORDER BY c DESC, spokespersonname ASC \
         LIMIT 1"
    );
    match sqlx::query_as::<_, (String, i64)>(&sql)
        .fetch_optional(&mut *conn)
        .await
    {
        Ok(row) => {
            metrics.top_spokesperson =
                row.map(|(spokespersonname, article_count)| TopSpokesperson {
                    spokespersonname,
                    article_count,
                });
        }
        Err(e) => record(&mut diagnostics, "top_spokesperson", &e),
    }

    let sql = format!("SELECT month, year, COUNT(*) FROM {table} GROUP BY month, year");
    match sqlx::query_as::<_, (Option<String>, Option<i32>, i64)>(&sql)
        .fetch_all(&mut *conn)
        .await
    {
        Ok(rows) => {
            let mut counts: Vec<MonthlyCount> = rows
                .into_iter()
                .map(|(month, year, count)| MonthlyCount { month, year, count })
                .collect();
            sort_monthly_counts(&mut counts);
            metrics.monthly_counts = Some(counts);
        }
        Err(e) => record(&mut diagnostics, "monthly_counts", &e),
    }

    (metrics, diagnostics)
}

/// Mean, maximum row and bucketed distribution of `column`.
///
/// Nulls are ignored everywhere: they never become the maximum and are not
/// counted in any bucket.
pub async fn run_impact_metrics(
    conn: &mut PgConnection,
    table: &str,
    column: &str,
) -> (ImpactMetrics, Vec<Diagnostic>) {
    let table = quote_ident(table);
    let col = quote_ident(column);
    let mut metrics = ImpactMetrics::default();
    let mut diagnostics = Vec::new();

    let sql = format!("SELECT AVG({col})::double precision FROM {table} WHERE {col} IS NOT NULL");
    match sqlx::query_scalar::<_, Option<f64>>(&sql)
        .fetch_one(&mut *conn)
        .await
    {
        Ok(avg) => metrics.avg_impact = avg,
        Err(e) => record(&mut diagnostics, "avg_impact", &e),
    }

    let sql = format!(
        "SELECT articleid, {col}::double precision AS impact, issue, spokespersonname \
         FROM {table} \
         WHERE {col} IS NOT NULL \
         ORDER BY {col} DESC NULLS LAST, articleid ASC \
         LIMIT 1"
    );
    match sqlx::query_as::<_, (String, f64, Option<String>, Option<String>)>(&sql)
        .fetch_optional(&mut *conn)
        .await
    {
        Ok(row) => {
            metrics.max_impact =
                row.map(|(articleid, impact, issue, spokespersonname)| MaxImpact {
                    articleid,
                    impact,
                    issue,
                    spokespersonname,
                });
        }
        Err(e) => record(&mut diagnostics, "max_impact", &e),
    }

    let bucket = ImpactBucket::sql_case(&col);
    let sql = format!(
        "SELECT bucket, COUNT(*) \
         FROM (SELECT {bucket} AS bucket FROM {table} WHERE {col} IS NOT NULL) t \
         GROUP BY bucket"
    );
    match sqlx::query_as::<_, (String, i64)>(&sql)
        .fetch_all(&mut *conn)
        .await
    {
        Ok(rows) => {
            metrics.impact_distribution = Some(
                rows.into_iter()
                    .filter(|(_, count)| *count > 0)
                    .collect(),
            );
        }
        Err(e) => record(&mut diagnostics, "impact_distribution", &e),
    }

    (metrics, diagnostics)
}

fn record(diagnostics: &mut Vec<Diagnostic>, metric: &str, error: &sqlx::Error) {
    tracing::warn!(metric, error = %error, "metric query failed");
    diagnostics.push(Diagnostic::metric(metric, error));
}
