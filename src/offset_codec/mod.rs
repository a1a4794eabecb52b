//! Decoding of the records of `__consumer_offsets`, Kafka's internal offset-commit log.
//!
//! Each record is a pair of binary buffers: a key (who committed, for which topic partition)
//! and a value (what offset, when). Only offset commits are decoded:
//! Group Metadata records are rejected with [`DecodeError::UnsupportedKeyVersion`].

mod commit;
mod errors;
mod reader;

pub use commit::{decode_commit_key, decode_commit_value};
pub use errors::{DecodeError, DecodeResult};

use crate::kafka_types::PartitionOffset;

/// Decode a whole `__consumer_offsets` record into the [`PartitionOffset`] it commits.
///
/// The key is decoded first: a record that isn't an offset commit is rejected without
/// looking at its value.
pub fn decode_commit(key: Option<&[u8]>, value: Option<&[u8]>) -> DecodeResult<PartitionOffset> {
    let key = decode_commit_key(key.ok_or(DecodeError::MissingKey)?)?;
    let value = decode_commit_value(value.ok_or(DecodeError::MissingValue)?)?;

    Ok(PartitionOffset {
        topic: key.topic,
        partition: key.partition,
        offset: value.offset,
        timestamp: value.commit_timestamp,
        group: key.group,
    })
}

/// Encoders that build `__consumer_offsets` records byte by byte, to feed the decoder in tests.
#[cfg(test)]
pub(crate) mod fixtures {
    fn put_string(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u16).to_be_bytes());
        buf.extend_from_slice(s.as_bytes());
    }

    pub(crate) fn encode_commit_key(version: i16, group: &str, topic: &str, partition: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&version.to_be_bytes());
        put_string(&mut buf, group);
        put_string(&mut buf, topic);
        buf.extend_from_slice(&partition.to_be_bytes());
        buf
    }

    pub(crate) fn encode_group_metadata_key(group: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2i16.to_be_bytes());
        put_string(&mut buf, group);
        buf
    }

    pub(crate) fn encode_commit_value(version: i16, offset: i64, metadata: &str, commit_timestamp: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&version.to_be_bytes());
        buf.extend_from_slice(&offset.to_be_bytes());
        put_string(&mut buf, metadata);
        buf.extend_from_slice(&commit_timestamp.to_be_bytes());
        buf
    }
}
