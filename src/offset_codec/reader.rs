use super::errors::{DecodeError, DecodeResult};

/// Reads big-endian primitives out of a byte slice, never past its end.
///
/// Every read names the field being read, so that a [`DecodeError::TruncatedRecord`]
/// says exactly where the record was cut short.
pub(super) struct BytesReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BytesReader<'a> {
    pub(super) fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
        }
    }

    pub(super) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, needed: usize, field: &'static str) -> DecodeResult<&'a [u8]> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(DecodeError::TruncatedRecord {
                field,
                needed,
                remaining,
            });
        }

        let slice = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, field: &'static str) -> DecodeResult<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.take(N, field)?);
        Ok(arr)
    }

    pub(super) fn read_i16(&mut self, field: &'static str) -> DecodeResult<i16> {
        self.take_array(field).map(i16::from_be_bytes)
    }

    pub(super) fn read_i32(&mut self, field: &'static str) -> DecodeResult<i32> {
        self.take_array(field).map(i32::from_be_bytes)
    }

    pub(super) fn read_i64(&mut self, field: &'static str) -> DecodeResult<i64> {
        self.take_array(field).map(i64::from_be_bytes)
    }

    /// Reads a string: unsigned 16 bits length prefix, followed by as many UTF-8 bytes.
    pub(super) fn read_string(&mut self, field: &'static str) -> DecodeResult<String> {
        let len = u16::from_be_bytes(self.take_array(field)?) as usize;
        let bytes = self.take(len, field)?;

        std::str::from_utf8(bytes).map(str::to_owned).map_err(|_| DecodeError::InvalidUtf8 {
            field,
        })
    }
}
