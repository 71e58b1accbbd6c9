use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::value::NullBitmap;

/// The payload part of a binary row packet, split into NULL bitmap and values.
#[derive(Debug, Clone, Copy)]
pub struct BinaryRowPayload<'a> {
    pub(crate) null_bitmap: &'a [u8],
    pub(crate) values: &'a [u8],
    pub(crate) num_columns: usize,
}

impl<'a> BinaryRowPayload<'a> {
    /// Parse a row packet: `0x00`, NULL bitmap of `(num_columns + 9) / 8` bytes, values
    pub fn parse(payload: &'a [u8], num_columns: usize) -> Result<Self> {
        let (header, data) = read_int_1(payload)?;
        if header != 0x00 {
            return Err(Error::InvalidPacket);
        }
        Self::from_stored(data, num_columns)
    }

    /// Reconstruct a row from its stored form (bitmap immediately followed by values)
    pub fn from_stored(data: &'a [u8], num_columns: usize) -> Result<Self> {
        let (null_bitmap, values) = read_string_fix(data, NullBitmap::result_set_len(num_columns))?;
        Ok(Self {
            null_bitmap,
            values,
            num_columns,
        })
    }

    pub fn null_bitmap(&self) -> NullBitmap<'a> {
        NullBitmap::for_result_set(self.null_bitmap)
    }

    /// Append bitmap and values to `out`, the form read back by `from_stored`
    pub fn write_stored(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.null_bitmap);
        out.extend_from_slice(self.values);
    }

    pub fn values(&self) -> &'a [u8] {
        self.values
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }
}
