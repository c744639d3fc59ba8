//! # Error Types
//!
//! Defines error types used across services.

use thiserror::Error;

/// Errors parsing a decimal [`Amount`](crate::entities::Amount).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The input was empty.
    #[error("Amount is empty")]
    Empty,

    /// The input is not a plain non-negative decimal.
    #[error("Invalid amount: {0:?}")]
    Invalid(String),

    /// More than two fractional digits.
    #[error("Amount has more than two decimal places: {0:?}")]
    TooManyDecimals(String),

    /// The amount does not fit in 64 bits of hundredths.
    #[error("Amount overflow")]
    Overflow,
}

/// A payload decoded fine but violates a field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// A required identifier was empty.
    #[error("Field `{0}` must not be empty")]
    EmptyField(&'static str),

    /// A bid value must be strictly positive.
    #[error("Bid value must be positive")]
    NonPositiveValue,

    /// The signature carried no bytes.
    #[error("Signature is empty")]
    EmptySignature,

    /// The announced window ends before it starts.
    #[error("Auction ends before it starts")]
    InvertedWindow,
}
