//! Report error types.
//!
//! Aggregations are total over empty input, so these errors only describe
//! contract violations (malformed records, mismatched chart shapes) and
//! failures of the collaborators around the core.

use thiserror::Error;

/// Errors raised while building reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A chart or table has parallel vectors of different lengths.
    #[error("shape mismatch in {context}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// A feedback row carries a rating outside 1..=5.
    #[error("invalid rating {rating} from user {user_id} on module {module_id}")]
    InvalidRating {
        user_id: String,
        module_id: String,
        rating: u8,
    },

    /// The requested student is not part of the snapshot.
    #[error("student not found: {0}")]
    UnknownStudent(String),

    /// The requested module is not part of the snapshot.
    #[error("module not found: {0}")]
    UnknownModule(String),

    /// The requested class is not part of the snapshot.
    #[error("class not found: {0}")]
    UnknownClass(String),

    /// The viewer may not see manager-only aggregates.
    #[error("access denied for viewer {0}")]
    AccessDenied(String),

    /// The data gateway failed to deliver a record set.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// A configuration value could not be interpreted.
    #[error("invalid config value for {key}: {message}")]
    InvalidConfig { key: String, message: String },
}

impl ReportError {
    /// Returns `true` for errors caused by a defect in the code producing
    /// the data rather than by missing or unreachable data.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ReportError::ShapeMismatch { .. } | ReportError::InvalidRating { .. }
        )
    }
}

/// Check that a parallel vector matches the expected length.
pub fn ensure_len(context: &str, expected: usize, actual: usize) -> Result<(), ReportError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ReportError::ShapeMismatch {
            context: context.to_string(),
            expected,
            actual,
        })
    }
}
