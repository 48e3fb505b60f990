use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoanError {
    #[error("Invalid input: {field} ({reason})")]
    InvalidInput { field: String, reason: String },
}

impl LoanError {
    pub(crate) fn invalid(field: &str, reason: &str) -> Self {
        LoanError::InvalidInput {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
