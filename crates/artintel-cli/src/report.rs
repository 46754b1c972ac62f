//! Aggregation, summary and the combined report pipeline.

use std::path::Path;

use anyhow::Context;
use artintel_core::{load_metrics_config, AggregateReport, AppConfig, MetricsConfig};
use artintel_db::AggregateError;
use artintel_llm::{summary::aggregates_json, OllamaClient, Summariser};

use crate::ingest;

fn metrics_config(config: &AppConfig) -> anyhow::Result<MetricsConfig> {
    load_metrics_config(&config.metrics_path).with_context(|| {
        format!(
            "failed to load metrics config from {}",
            config.metrics_path.display()
        )
    })
}

/// `artintel aggregate`: print the report as JSON.
///
/// An unreachable database still prints a report (with its single
/// connectivity diagnostic) before failing.
pub(crate) async fn run_aggregate(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let metrics = metrics_config(config)?;
    match artintel_db::aggregate(pool, &metrics).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            let message = e.to_string();
            println!("{}", serde_json::to_string_pretty(&e.into_report())?);
            Err(anyhow::anyhow!(message))
        }
    }
}

/// `artintel summarise`: aggregate, then print only the summary.
pub(crate) async fn run_summarise(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let metrics = metrics_config(config)?;
    let report = artintel_db::aggregate(pool, &metrics)
        .await
        .unwrap_or_else(AggregateError::into_report);

    let client = OllamaClient::new(config).context("failed to build model client")?;
    println!("{}", Summariser::new(&client).summarise(&report).await);
    Ok(())
}

/// Everything the report pipeline produced.
#[derive(Debug)]
pub(crate) struct PipelineOutput {
    pub report: AggregateReport,
    pub summary: String,
    pub errors: Vec<String>,
}

/// Optional ingest, then aggregate, then summarise.
///
/// Ingest runs only when `csv` names an existing file. Stage failures are
/// collected as pipeline errors; an unreachable database leaves the summary
/// step with an empty report.
pub(crate) async fn run_pipeline(
    pool: &sqlx::PgPool,
    client: &OllamaClient,
    metrics: &MetricsConfig,
    csv: Option<&Path>,
) -> PipelineOutput {
    let mut errors = Vec::new();

    match csv {
        Some(path) if path.is_file() => match ingest::import_csv(pool, path).await {
            Ok(summary) => {
                tracing::info!(
                    imported = summary.imported,
                    skipped = summary.skipped,
                    "ingest stage done"
                );
            }
            Err(e) => errors.push(format!("ingest: {e:#}")),
        },
        Some(path) => {
            tracing::info!(path = %path.display(), "CSV not found, skipping ingest");
        }
        None => tracing::debug!("no CSV configured, skipping ingest"),
    }

    let report = match artintel_db::aggregate(pool, metrics).await {
        Ok(report) => report,
        Err(e) => {
            errors.push(e.to_string());
            AggregateReport::default()
        }
    };
    errors.extend(report.errors.iter().map(ToString::to_string));

    let summary = Summariser::new(client).summarise(&report).await;

    PipelineOutput {
        report,
        summary,
        errors,
    }
}

/// `artintel report [--csv <path>]`.
pub(crate) async fn run_report(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    csv: Option<&Path>,
) -> anyhow::Result<()> {
    let metrics = metrics_config(config)?;
    let client = OllamaClient::new(config).context("failed to build model client")?;
    let csv = csv.or(config.articles_csv.as_deref());

    let output = run_pipeline(pool, &client, &metrics, csv).await;

    println!("== Aggregates ==");
    println!("{}", aggregates_json(&output.report));
    println!();
    println!("== Summary ==");
    println!("{}", output.summary);
    println!();
    println!("== Errors ==");
    if output.errors.is_empty() {
        println!("(none)");
    }
    for error in &output.errors {
        println!("- {error}");
    }
    Ok(())
}
