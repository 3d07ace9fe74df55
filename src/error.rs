use thiserror::Error;

/// Failure modes for decoding and cache construction.
///
/// Non-fatal conditions (unknown event code, a message whose issue time is
/// implausibly old, a duplicate update) are never represented here — they
/// are absorbed by the caller as degraded-but-admitted messages per the
/// taxonomy in the decoder/cache contracts.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AlertError {
    #[error("malformed SAME header at position {position}: {reason}")]
    Decode { position: usize, reason: String },

    #[error("confidence {confidence} below required threshold at position {position}")]
    LowConfidence { position: usize, confidence: u8 },

    #[error("VTEC string is not well-formed: {0}")]
    VtecDecode(String),

    #[error("receiver location is invalid")]
    InvalidLocation,

    #[error("no clock source was supplied")]
    InvalidClock,
}

pub type Result<T> = std::result::Result<T, AlertError>;
