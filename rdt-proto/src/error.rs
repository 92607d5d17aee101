use thiserror::Error;

/// A fragment could not be decoded from raw bytes.
///
/// A `ParseError` is a framing-level failure (too short, unknown type byte) —
/// it is distinct from a CRC mismatch on a DATA fragment, which parses fine
/// and is instead reported by [`crate::verify_data_crc`] once the caller
/// knows it is looking at a bulk-data fragment rather than metadata.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("fragment shorter than the {0}-byte header")]
    TooShort(usize),

    #[error("unknown fragment type byte: {0:#x}")]
    UnknownType(u8),

    #[error("NAK data region is not a whole number of 2-byte indices")]
    MalformedNak,
}
