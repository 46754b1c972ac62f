use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{validate_ident, ConfigError};

/// One known impact column and the name it is reported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactFieldConfig {
    /// Column name as stored by Postgres (lowercase for unquoted DDL).
    pub column: String,
    /// Display name used in `company_impact_field`, e.g. `KPMGTotalImpact`.
    pub label: String,
}

/// Where the aggregator looks and which impact columns it prefers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_table")]
    pub table: String,
    /// Any column whose lowercase name ends with this is an impact candidate.
    #[serde(default = "default_impact_suffix")]
    pub impact_suffix: String,
    /// Ranked known candidates; earlier entries win ties.
    #[serde(default = "default_impact_fields")]
    pub impact_fields: Vec<ImpactFieldConfig>,
}

fn default_table() -> String {
    "articles".to_string()
}

fn default_impact_suffix() -> String {
    "totalimpact".to_string()
}

fn default_impact_fields() -> Vec<ImpactFieldConfig> {
    [
        ("kpmgtotalimpact", "KPMGTotalImpact"),
        ("pwctotalimpact", "PwCTotalImpact"),
        ("deloittetotalimpact", "DeloitteTotalImpact"),
        ("eytotalimpact", "EYTotalImpact"),
    ]
    .into_iter()
    .map(|(column, label)| ImpactFieldConfig {
        column: column.to_string(),
        label: label.to_string(),
    })
    .collect()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            impact_suffix: default_impact_suffix(),
            impact_fields: default_impact_fields(),
        }
    }
}

impl MetricsConfig {
    /// Same config pointed at a different table. The name is folded to
    /// lowercase like any unquoted Postgres identifier.
    #[must_use]
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = table.to_lowercase();
        self
    }

    /// Fold table and candidate column names to lowercase.
    ///
    /// The schema is created with unquoted DDL, so Postgres stores every name
    /// in lowercase while the aggregator quotes what it interpolates.
    #[must_use]
    pub fn fold_identifiers(mut self) -> Self {
        self.table = self.table.to_lowercase();
        for field in &mut self.impact_fields {
            field.column = field.column.to_lowercase();
        }
        self
    }

    /// Display label for a column, falling back to the column name itself for
    /// columns discovered from the schema.
    #[must_use]
    pub fn label_for(&self, column: &str) -> String {
        self.impact_fields
            .iter()
            .find(|f| f.column.eq_ignore_ascii_case(column))
            .map_or_else(|| column.to_string(), |f| f.label.clone())
    }

    /// Check the config is usable before any SQL is built from it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] on an invalid or non-lowercase
    /// table name, an empty suffix, an invalid or duplicated candidate column,
    /// or an empty label.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ident(&self.table)
            .map_err(|e| ConfigError::Validation(format!("table: {e}")))?;
        if self.table.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Validation(format!(
                "table '{}' must be lowercase",
                self.table
            )));
        }

        if self.impact_suffix.trim().is_empty() {
            return Err(ConfigError::Validation(
                "impact_suffix must be non-empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.impact_fields {
            validate_ident(&field.column)
                .map_err(|e| ConfigError::Validation(format!("impact field: {e}")))?;

            if field.label.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "impact field '{}' has an empty label",
                    field.column
                )));
            }

            if !seen.insert(field.column.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate impact field: '{}'",
                    field.column
                )));
            }
        }

        Ok(())
    }
}

/// Load and validate the metrics configuration from a YAML file.
///
/// Table and column names are folded to lowercase before validation. A
/// missing file is not an error: the built-in defaults (table `articles`,
/// the four tracked firms) are returned instead.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// fails validation.
pub fn load_metrics_config(path: &Path) -> Result<MetricsConfig, ConfigError> {
    if !path.exists() {
        return Ok(MetricsConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::MetricsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let config = serde_yaml::from_str::<MetricsConfig>(&content)?.fold_identifiers();
    config.validate()?;

    Ok(config)
}
