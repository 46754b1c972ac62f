//! Domain types, configuration and pure metric logic shared by the
//! `artintel` crates.

pub mod aggregate;
pub mod app_config;
pub mod articles;
pub mod config;
pub mod metrics_config;

use thiserror::Error;

pub use aggregate::{
    impact_candidates, month_index, select_impact_column, sort_monthly_counts, AggregateReport,
    Diagnostic, DiagnosticKind, ImpactBucket, ImpactCandidate, MaxImpact, MonthlyCount,
    TopSpokesperson,
};
pub use app_config::{AppConfig, Environment};
pub use articles::{ArticleCsvRow, NewArticle, EMBEDDING_DIM};
pub use config::{load_app_config, load_app_config_from_env};
pub use metrics_config::{load_metrics_config, ImpactFieldConfig, MetricsConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read metrics config at {path}: {source}")]
    MetricsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse metrics config: {0}")]
    MetricsFileParse(#[from] serde_yaml::Error),

    #[error("invalid metrics config: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Quote a Postgres identifier, doubling any embedded double quotes.
///
/// Table and column names reach SQL through string interpolation (they cannot
/// be bound as parameters), so every interpolated name goes through here.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Validate that `name` is a plain lowercase-able identifier
/// (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// # Errors
///
/// Returns [`CoreError::InvalidIdentifier`] otherwise.
pub fn validate_ident(name: &str) -> Result<(), CoreError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidIdentifier(name.to_string()))
    }
}
