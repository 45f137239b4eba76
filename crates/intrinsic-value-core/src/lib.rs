pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

pub use error::IntrinsicError;
pub use types::*;

/// Standard result type for all intrinsic-value operations
pub type IntrinsicResult<T> = Result<T, IntrinsicError>;
