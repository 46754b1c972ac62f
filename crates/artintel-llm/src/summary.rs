//! Executive summary of an [`AggregateReport`].
//!
//! The chat model is steered with a few-shot prompt built from synthetic
//! aggregate/summary pairs. If the model cannot be reached or answers with
//! nothing, a deterministic one-line summary is built from the numbers.

use std::fmt::Write as _;

use artintel_core::AggregateReport;

use crate::client::{ChatMessage, OllamaClient};

/// Returned instead of a summary when there is nothing to summarise.
pub const EMPTY_SUMMARY: &str = "None";

const PREFIX: &str = "You are an analyst assistant. Given aggregate media metrics produce an \
executive summary. Include: total articles, average impact (2dp) for the detected company impact \
field (company_impact_field), distribution buckets, highest impact article (id if available) with \
impact, issue and spokesperson, and top spokesperson overall. State 'not reported' where data is \
missing. If aggregates are empty return None. Keep it concise (fewer than 6 sentences unless there \
are more than 1200 articles).";

const SUFFIX: &str = "Aggregates JSON (keys may be a subset):";

/// Synthetic examples: aggregates JSON and the summary an analyst wrote.
const EXAMPLES: [(&str, &str); 3] = [
    (
        r#"{"total_articles":64,"company_impact_field":"KPMGTotalImpact","avg_impact":2.84,"max_impact":{"articleid":"K-2024-07-118","impact":9.5,"issue":"Birth rate","spokespersonname":"Terry Rawnsley"},"top_spokesperson":{"spokespersonname":"Terry Rawnsley","article_count":21},"impact_distribution":{"0_1":18,"1_3":25,"3_6":14,"6_10":7}}"#,
        "Impact was led by a concentration of birth-rate related coverage spearheaded by Terry \
Rawnsley. Brendan Rynne provided macro-economic commentary spanning interest rates, productivity \
and fiscal settings. Minor additional impact came from other spokespeople and syndicated report \
mentions.",
    ),
    (
        r#"{"total_articles":6,"company_impact_field":"PwCTotalImpact","avg_impact":0.42,"max_impact":{"articleid":"P-2025-02-003","impact":1.2,"issue":"Investment ranking","spokespersonname":null},"top_spokesperson":null,"impact_distribution":{"0_1":5,"1_3":1}}"#,
        "Minor impact month: a UK Prime Minister reference to a PwC investment ranking dominated \
sparse coverage; no standout high-impact spokesperson beyond incidental mentions.",
    ),
    (
        r#"{"total_articles":31,"company_impact_field":"EYTotalImpact","avg_impact":3.67,"max_impact":{"articleid":"E-2025-01-027","impact":8.8,"issue":"Interest rates","spokespersonname":"Cherelle Murphy"},"top_spokesperson":{"spokespersonname":"Cherelle Murphy","article_count":19},"impact_distribution":{"0_1":4,"1_3":9,"3_6":11,"6_10":7}}"#,
        "Cherelle Murphy (19 articles) delivered over three-quarters of EY's economic impact with \
commentary on rate speculation following the release of inflation data and the low interest in \
studying economics. Paula Gadsby (4 articles) contributed almost a quarter of impact with her view \
on central bank action on rates.",
    ),
];

/// The metric fields of `report` as pretty JSON, without diagnostics.
#[must_use]
pub fn aggregates_json(report: &AggregateReport) -> String {
    let mut value = serde_json::to_value(report).unwrap_or_default();
    if let Some(map) = value.as_object_mut() {
        map.remove("errors");
    }
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
}

/// Assemble the few-shot prompt for `aggregates` (a JSON document).
#[must_use]
pub fn build_prompt(aggregates: &str) -> String {
    let mut prompt = String::from(PREFIX);
    prompt.push_str("\n\n");
    for (example_aggregates, example_summary) in EXAMPLES {
        let _ = write!(
            prompt,
            "Aggregates:\n{example_aggregates}\nSummary:\n{example_summary}\n---\n"
        );
    }
    let _ = write!(prompt, "\n{SUFFIX}\n{aggregates}\n\nSummary:");
    prompt
}

/// Deterministic summary built straight from the numbers.
///
/// Returns [`EMPTY_SUMMARY`] when the report carries none of the summarised
/// metrics.
#[must_use]
pub fn fallback_summary(report: &AggregateReport) -> String {
    let mut parts = Vec::new();

    if let Some(total) = report.total_articles {
        parts.push(format!("Total articles: {total}."));
    }
    if let Some(avg) = report.avg_impact {
        parts.push(format!("Average impact: {avg:.2}."));
    }
    if let Some(dist) = report.impact_distribution.as_ref().filter(|d| !d.is_empty()) {
        let buckets: Vec<String> = dist.iter().map(|(k, v)| format!("{k}:{v}")).collect();
        parts.push(format!("Dist {}", buckets.join(", ")));
    }
    if let Some(max) = &report.max_impact {
        parts.push(format!(
            "Top {} {} {} {}",
            max.articleid,
            max.impact,
            max.issue.as_deref().unwrap_or(EMPTY_SUMMARY),
            max.spokespersonname.as_deref().unwrap_or(EMPTY_SUMMARY),
        ));
    }
    if let Some(top) = &report.top_spokesperson {
        parts.push(format!(
            "Top spokesperson {} ({})",
            top.spokespersonname, top.article_count
        ));
    }

    if parts.is_empty() {
        EMPTY_SUMMARY.to_string()
    } else {
        parts.join(" ")
    }
}

/// Few-shot summariser backed by the chat model.
pub struct Summariser<'a> {
    client: &'a OllamaClient,
}

impl<'a> Summariser<'a> {
    #[must_use]
    pub fn new(client: &'a OllamaClient) -> Self {
        Self { client }
    }

    /// Summarise `report`.
    ///
    /// Never fails: an empty report yields [`EMPTY_SUMMARY`] without calling
    /// the model, and any model error yields [`fallback_summary`].
    pub async fn summarise(&self, report: &AggregateReport) -> String {
        if !report.has_metrics() {
            return EMPTY_SUMMARY.to_string();
        }

        let prompt = build_prompt(&aggregates_json(report));
        match self.client.chat(&[ChatMessage::user(prompt)], 0.0).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(
                    model = %self.client.chat_model(),
                    error = %e,
                    "summary model failed, using fallback"
                );
                fallback_summary(report)
            }
        }
    }
}
