use super::errors::{DecodeError, DecodeResult};
use super::reader::BytesReader;

const KEY_V0_OFFSET_COMMIT: i16 = 0;
const KEY_V1_OFFSET_COMMIT: i16 = 1;
const VALUE_V0: i16 = 0;
const VALUE_V1: i16 = 1;

/// Key of an offset commit record: who committed what.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffsetCommitKey {
    /// Schema version of the key (`0` or `1`)
    pub version: i16,
    /// Consumer Group that committed
    pub group: String,
    /// Topic the commit refers to
    pub topic: String,
    /// Partition the commit refers to
    pub partition: i32,
}

/// Value of an offset commit record: the committed offset and when.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffsetCommitValue {
    /// Schema version of the value (`0` or `1`)
    pub version: i16,
    /// Committed offset
    pub offset: i64,
    /// Free-form metadata set by the committing Consumer
    pub metadata: String,
    /// Milliseconds since epoch of when the commit happened
    pub commit_timestamp: i64,
}

/// Decode the key of a `__consumer_offsets` record.
///
/// Layout (big-endian): `i16 version`, then for versions `0` and `1`:
/// `string group`, `string topic`, `i32 partition`.
/// Any other version, including `2` (Group Metadata), is [`DecodeError::UnsupportedKeyVersion`].
pub fn decode_commit_key(bytes: &[u8]) -> DecodeResult<OffsetCommitKey> {
    let mut reader = BytesReader::new(bytes);

    let version = reader.read_i16("key.version")?;
    match version {
        KEY_V0_OFFSET_COMMIT | KEY_V1_OFFSET_COMMIT => Ok(OffsetCommitKey {
            version,
            group: reader.read_string("key.group")?,
            topic: reader.read_string("key.topic")?,
            partition: reader.read_i32("key.partition")?,
        }),
        _ => Err(DecodeError::UnsupportedKeyVersion(version)),
    }
}

/// Decode the value of a `__consumer_offsets` offset commit record.
///
/// Layout (big-endian): `i16 version` (`0` or `1`), `i64 offset`, `string metadata`,
/// `i64 commit_timestamp`. Bytes after the commit timestamp are not read:
/// that includes the expiration timestamp that version `1` appends.
pub fn decode_commit_value(bytes: &[u8]) -> DecodeResult<OffsetCommitValue> {
    let mut reader = BytesReader::new(bytes);

    let version = reader.read_i16("value.version")?;
    if version != VALUE_V0 && version != VALUE_V1 {
        return Err(DecodeError::UnsupportedValueVersion(version));
    }

    let offset = reader.read_i64("value.offset")?;
    let metadata = reader.read_string("value.metadata")?;
    let commit_timestamp = reader.read_i64("value.commit_timestamp")?;

    if reader.remaining() > 0 {
        trace!("Ignoring {} trailing bytes of value version {}", reader.remaining(), version);
    }

    Ok(OffsetCommitValue {
        version,
        offset,
        metadata,
        commit_timestamp,
    })
}
