//! Aggregate report types and the pure parts of the metrics computation:
//! impact buckets, calendar-month ordering and impact-column selection.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::metrics_config::MetricsConfig;

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The database could not be reached; nothing was computed.
    Connectivity,
    /// Column metadata could not be listed; impact detection was skipped.
    SchemaIntrospection,
    /// A single metric query failed; the other metrics are unaffected.
    MetricQuery,
    /// No impact-suffixed column exists. Informational.
    NoImpactColumn,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::Connectivity => write!(f, "connectivity"),
            DiagnosticKind::SchemaIntrospection => write!(f, "schema_introspection"),
            DiagnosticKind::MetricQuery => write!(f, "metric_query"),
            DiagnosticKind::NoImpactColumn => write!(f, "no_impact_column"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A failed metric query, labelled with the metric key.
    pub fn metric(metric: &str, error: impl std::fmt::Display) -> Self {
        Self::new(DiagnosticKind::MetricQuery, format!("{metric}: {error}"))
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxImpact {
    pub articleid: String,
    pub impact: f64,
    pub issue: Option<String>,
    pub spokespersonname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSpokesperson {
    pub spokespersonname: String,
    pub article_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub month: Option<String>,
    pub year: Option<i32>,
    pub count: i64,
}

/// Metrics computed for one run plus every non-fatal problem met on the way.
///
/// Each metric is independently optional: `None` means "not reported", never
/// zero. `errors` keeps diagnostics in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_articles: Option<i64>,
    pub company_impact_field: Option<String>,
    pub avg_impact: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_impact: Option<MaxImpact>,
    pub top_spokesperson: Option<TopSpokesperson>,
    /// Non-zero buckets only, keyed by [`ImpactBucket::label`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_distribution: Option<BTreeMap<String, i64>>,
    pub monthly_counts: Option<Vec<MonthlyCount>>,
    pub errors: Vec<Diagnostic>,
}

impl AggregateReport {
    /// Report for a run that could not reach the database at all.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            errors: vec![Diagnostic::new(DiagnosticKind::Connectivity, message)],
            ..Self::default()
        }
    }

    /// `true` if at least one metric was computed.
    #[must_use]
    pub fn has_metrics(&self) -> bool {
        self.total_articles.is_some()
            || self.company_impact_field.is_some()
            || self.avg_impact.is_some()
            || self.max_impact.is_some()
            || self.top_spokesperson.is_some()
            || self.impact_distribution.is_some()
            || self.monthly_counts.is_some()
    }

    pub fn push_error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }
}

// ---------------------------------------------------------------------------
// Impact buckets
// ---------------------------------------------------------------------------

/// Half-open histogram ranges `[0,1) [1,3) [3,6) [6,inf)`.
///
/// Anything below 1 (including negatives) lands in the first bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImpactBucket {
    UpToOne,
    OneToThree,
    ThreeToSix,
    SixAndAbove,
}

impl ImpactBucket {
    pub const ALL: [ImpactBucket; 4] = [
        ImpactBucket::UpToOne,
        ImpactBucket::OneToThree,
        ImpactBucket::ThreeToSix,
        ImpactBucket::SixAndAbove,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ImpactBucket::UpToOne => "0_1",
            ImpactBucket::OneToThree => "1_3",
            ImpactBucket::ThreeToSix => "3_6",
            ImpactBucket::SixAndAbove => "6_10",
        }
    }

    /// Exclusive upper bound, `None` for the open-ended last bucket.
    #[must_use]
    pub fn upper_bound(self) -> Option<f64> {
        match self {
            ImpactBucket::UpToOne => Some(1.0),
            ImpactBucket::OneToThree => Some(3.0),
            ImpactBucket::ThreeToSix => Some(6.0),
            ImpactBucket::SixAndAbove => None,
        }
    }

    /// SQL `CASE` expression that labels `expr` with its bucket. Boundary
    /// values belong to the upper bucket. `expr` must already be quoted.
    #[must_use]
    pub fn sql_case(expr: &str) -> String {
        let mut sql = String::from("CASE");
        for bucket in Self::ALL {
            if let Some(upper) = bucket.upper_bound() {
                let _ = write!(sql, " WHEN {expr} < {upper} THEN '{}'", bucket.label());
            } else {
                let _ = write!(sql, " ELSE '{}'", bucket.label());
            }
        }
        sql.push_str(" END");
        sql
    }
}

// ---------------------------------------------------------------------------
// Calendar ordering
// ---------------------------------------------------------------------------

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar index of a month label (`Jan` = 1 .. `Dec` = 12), 13 for anything
/// unrecognised or missing.
#[must_use]
pub fn month_index(label: Option<&str>) -> u8 {
    let Some(label) = label.map(str::trim) else {
        return 13;
    };
    MONTH_LABELS
        .iter()
        .zip(1u8..)
        .find(|(m, _)| m.eq_ignore_ascii_case(label))
        .map_or(13, |(_, idx)| idx)
}

/// Order by year ascending (missing years last), then calendar month, then
/// label so unrecognised months still sort deterministically.
pub fn sort_monthly_counts(counts: &mut [MonthlyCount]) {
    counts.sort_by(|a, b| {
        (a.year.is_none(), a.year, month_index(a.month.as_deref()), &a.month).cmp(&(
            b.year.is_none(),
            b.year,
            month_index(b.month.as_deref()),
            &b.month,
        ))
    });
}

// ---------------------------------------------------------------------------
// Impact column selection
// ---------------------------------------------------------------------------

/// A candidate impact column and how many rows populate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactCandidate {
    pub column: String,
    pub non_null: i64,
}

/// Rank the candidate impact columns present in `columns`.
///
/// Configured columns come first in configured order (matched
/// case-insensitively, returned with the schema's spelling), followed by any
/// other column ending with the impact suffix, alphabetically.
#[must_use]
pub fn impact_candidates(config: &MetricsConfig, columns: &[String]) -> Vec<String> {
    let suffix = config.impact_suffix.to_lowercase();

    let mut ranked: Vec<String> = config
        .impact_fields
        .iter()
        .filter_map(|field| {
            columns
                .iter()
                .find(|c| c.eq_ignore_ascii_case(&field.column))
                .cloned()
        })
        .collect();

    let mut discovered: Vec<String> = columns
        .iter()
        .filter(|c| c.to_lowercase().ends_with(&suffix))
        .filter(|c| !ranked.iter().any(|r| r.eq_ignore_ascii_case(c)))
        .cloned()
        .collect();
    discovered.sort();
    discovered.dedup();

    ranked.extend(discovered);
    ranked
}

/// Pick the candidate with the strictly highest populated-row count.
///
/// Ties keep the earlier candidate, so when nothing is populated the first
/// (highest priority) candidate is returned. `None` only for an empty slice.
#[must_use]
pub fn select_impact_column(candidates: &[ImpactCandidate]) -> Option<&ImpactCandidate> {
    let (first, rest) = candidates.split_first()?;
    Some(rest.iter().fold(first, |best, candidate| {
        if candidate.non_null > best.non_null {
            candidate
        } else {
            best
        }
    }))
}
