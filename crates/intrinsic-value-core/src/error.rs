use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntrinsicError {
    /// A valuation assumption the DCF model cannot work with. Raised before
    /// any projection is computed.
    #[error("Invalid assumption: {field}: {reason}")]
    InvalidAssumption { field: String, reason: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Arithmetic overflow in {context} (last value: {last_value})")]
    Overflow { context: String, last_value: Decimal },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl IntrinsicError {
    pub(crate) fn assumption(field: &str, reason: impl Into<String>) -> Self {
        IntrinsicError::InvalidAssumption {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for IntrinsicError {
    fn from(e: serde_json::Error) -> Self {
        IntrinsicError::SerializationError(e.to_string())
    }
}
