use thiserror::Error;

// Error
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Error)]
pub enum QRError {
    // Encoder
    #[error("Empty data")]
    EmptyData,
    #[error("Data too long for the requested version")]
    DataTooLong,
    #[error("Capacity overflow: data does not fit in any version")]
    CapacityOverflow,
    #[error("Invalid version")]
    InvalidVersion,
    #[error("Invalid error correction level")]
    InvalidECLevel,
    #[error("Invalid character")]
    InvalidChar,
    #[error("Invalid masking pattern")]
    InvalidMaskingPattern,

    // Constrained builder
    #[error("Template mismatch: expected {expected} entries, found {actual}")]
    TemplateMismatch { expected: usize, actual: usize },
}

pub type QRResult<T> = Result<T, QRError>;
