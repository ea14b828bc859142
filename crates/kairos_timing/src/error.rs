//! Error types for STA artifact ingestion.

/// Errors that can occur while reading STA reports and metrics.
#[derive(Debug, thiserror::Error)]
pub enum TimingError {
    /// No `Startpoint:` block was found in any of the reports.
    #[error("no timing paths found in report")]
    NoPaths,

    /// The consolidated metrics document could not be parsed.
    #[error("failed to parse STA metrics: {0}")]
    Metrics(String),

    /// The metrics document has no entries for the requested corner.
    #[error("no metrics for corner '{0}'")]
    MissingCorner(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_no_paths() {
        assert_eq!(
            TimingError::NoPaths.to_string(),
            "no timing paths found in report"
        );
    }

    #[test]
    fn display_missing_corner() {
        let err = TimingError::MissingCorner("nom_ff_n40C_1v95".to_string());
        assert_eq!(err.to_string(), "no metrics for corner 'nom_ff_n40C_1v95'");
    }
}
