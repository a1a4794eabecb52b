use thiserror::Error;

/// Possible errors when decoding a record of `__consumer_offsets`.
///
/// None of these is fatal: the record that caused it is dropped, and decoding continues
/// with the next one.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    /// Key schema version is not an offset commit (e.g. `2` is Group Metadata).
    #[error("Unsupported key version {0}: not an offset commit")]
    UnsupportedKeyVersion(i16),

    /// Value schema version is neither `0` nor `1`.
    #[error("Unsupported value version {0}")]
    UnsupportedValueVersion(i16),

    /// A field (or a string length prefix) claims more bytes than those left in the buffer.
    #[error("Truncated record reading '{field}': needed {needed} bytes, {remaining} remaining")]
    TruncatedRecord {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// A string field is not valid UTF-8.
    #[error("Field '{field}' is not valid UTF-8")]
    InvalidUtf8 {
        field: &'static str,
    },

    /// Records of `__consumer_offsets` always carry a key.
    #[error("Record has no key")]
    MissingKey,

    /// Record has no value (a.k.a. "tombstone"): there is no offset to decode.
    #[error("Record has no value (tombstone)")]
    MissingValue,
}

pub type DecodeResult<T> = Result<T, DecodeError>;
