use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dimension of the `comments_embedding` column.
pub const EMBEDDING_DIM: usize = 384;

/// Date layouts accepted in the `ArtDate` CSV column, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// One raw CSV row as exported by the media-monitoring tool.
///
/// Every field is optional text; typing happens in [`NewArticle::from_csv_row`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticleCsvRow {
    #[serde(rename = "ArticleID")]
    pub article_id: Option<String>,
    #[serde(rename = "ArtDate")]
    pub art_date: Option<String>,
    #[serde(rename = "Month")]
    pub month: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "CompetName")]
    pub compet_name: Option<String>,
    #[serde(rename = "KPMGTotalImpact")]
    pub kpmg_total_impact: Option<String>,
    #[serde(rename = "DeloitteTotalImpact")]
    pub deloitte_total_impact: Option<String>,
    #[serde(rename = "EYTotalImpact")]
    pub ey_total_impact: Option<String>,
    #[serde(rename = "PwCTotalImpact")]
    pub pwc_total_impact: Option<String>,
    #[serde(rename = "Issue")]
    pub issue: Option<String>,
    #[serde(rename = "Industry")]
    pub industry: Option<String>,
    #[serde(rename = "Comments")]
    pub comments: Option<String>,
    #[serde(rename = "SpokespersonName")]
    pub spokesperson_name: Option<String>,
}

/// A typed article ready to be upserted into the `articles` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewArticle {
    pub article_id: String,
    pub art_date: Option<NaiveDate>,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub compet_name: Option<String>,
    pub kpmg_total_impact: Option<f64>,
    pub deloitte_total_impact: Option<f64>,
    pub ey_total_impact: Option<f64>,
    pub pwc_total_impact: Option<f64>,
    pub issue: Option<String>,
    pub industry: Option<String>,
    pub comments: Option<String>,
    pub spokesperson_name: Option<String>,
}

impl NewArticle {
    /// Type a raw CSV row.
    ///
    /// `ordinal` is the 1-based position used to synthesise `row_<n>` when the
    /// row has no `ArticleID`. Unparseable dates, years and numbers become
    /// `None` rather than failing the row.
    #[must_use]
    pub fn from_csv_row(row: ArticleCsvRow, ordinal: usize) -> Self {
        Self {
            article_id: non_blank(row.article_id).unwrap_or_else(|| format!("row_{ordinal}")),
            art_date: row.art_date.as_deref().and_then(parse_art_date),
            month: non_blank(row.month),
            year: row.year.as_deref().and_then(parse_year),
            compet_name: non_blank(row.compet_name),
            kpmg_total_impact: row.kpmg_total_impact.as_deref().and_then(parse_number),
            deloitte_total_impact: row.deloitte_total_impact.as_deref().and_then(parse_number),
            ey_total_impact: row.ey_total_impact.as_deref().and_then(parse_number),
            pwc_total_impact: row.pwc_total_impact.as_deref().and_then(parse_number),
            issue: non_blank(row.issue),
            industry: non_blank(row.industry),
            comments: non_blank(row.comments),
            spokesperson_name: non_blank(row.spokesperson_name),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse an `ArtDate` cell using the first matching layout.
#[must_use]
pub fn parse_art_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Years are accepted only as plain ASCII digits (no sign, no whitespace).
#[must_use]
pub fn parse_year(raw: &str) -> Option<i32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Blank, unparseable or non-finite (`NaN`, `inf`) numeric cells are treated
/// as missing.
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
