//! Validation errors for parsing core values.

/// Errors returned when a raw string cannot become a core value.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationError {
    /// Symbol is empty, longer than 8 bytes, or has illegal characters.
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),
    /// Price is not a plain decimal with at most two fractional digits.
    #[error("invalid price: {0:?}")]
    InvalidPrice(String),
    /// Segment code is not one of TSE, OTC, ESB.
    #[error("unknown market segment: {0:?}")]
    UnknownSegment(String),
}
