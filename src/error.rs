use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("{source_name} is missing required columns: {}", missing.join(", "))]
    SchemaViolation {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Computation failed: {0}")]
    ComputationFailure(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// Whether the aggregation path answers this error with synthetic data.
    ///
    /// Data-shaped failures (absent file, absent columns, malformed rows,
    /// failed math) fall back; misconfiguration and caller mistakes do not.
    pub fn is_fallback_eligible(&self) -> bool {
        !matches!(
            self,
            ProcessingError::Config(_)
                | ProcessingError::InvalidParameter(_)
                | ProcessingError::TaskJoin(_)
        )
    }

    /// Overflow-checked count addition
    pub fn add_counts(total: u64, value: u64, what: &str) -> Result<u64> {
        total
            .checked_add(value)
            .ok_or_else(|| ProcessingError::ComputationFailure(format!("{} overflowed", what)))
    }

    pub fn schema_violation(source_name: impl Into<String>, missing: Vec<String>) -> Self {
        ProcessingError::SchemaViolation {
            source_name: source_name.into(),
            missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_lists_columns() {
        let err = ProcessingError::schema_violation(
            "presence.csv",
            vec!["LT".to_string(), "Femei 65+".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "presence.csv is missing required columns: LT, Femei 65+"
        );
        assert!(err.is_fallback_eligible());
    }

    #[test]
    fn test_config_errors_do_not_fall_back() {
        assert!(!ProcessingError::Config("bad".to_string()).is_fallback_eligible());
        assert!(ProcessingError::MissingInput("x".to_string()).is_fallback_eligible());
    }
}
