//! Binary protocol values as they appear in a `COM_STMT_EXECUTE` result row.

use crate::constant::{ColumnFlags, ColumnType};
use crate::error::{Error, Result, eyre};
use crate::protocol::command::ColumnTypeAndFlags;
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// A borrowed value decoded from one column of a binary row
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    /// NULL value
    Null,
    /// Signed integer (TINYINT, SMALLINT, YEAR, INT, BIGINT)
    SignedInt(i64),
    /// Unsigned integer (the same types with `UNSIGNED`)
    UnsignedInt(u64),
    /// FLOAT - 4-byte floating point
    Float(f32),
    /// DOUBLE - 8-byte floating point
    Double(f64),
    /// DATE/DATETIME/TIMESTAMP - 0 bytes (0000-00-00 00:00:00)
    Timestamp0,
    /// DATE/DATETIME/TIMESTAMP - 4 bytes (ymd)
    Timestamp4(&'a Timestamp4),
    /// DATE/DATETIME/TIMESTAMP - 7 bytes (ymd + hms)
    Timestamp7(&'a Timestamp7),
    /// DATE/DATETIME/TIMESTAMP - 11 bytes (ymd + hms + microseconds)
    Timestamp11(&'a Timestamp11),
    /// TIME - 0 bytes (00:00:00)
    Time0,
    /// TIME - 8 bytes (without microseconds)
    Time8(&'a Time8),
    /// TIME - 12 bytes (with microseconds)
    Time12(&'a Time12),
    /// Strings, BLOBs, DECIMAL, JSON, BIT, ENUM, SET, GEOMETRY
    Byte(&'a [u8]),
}

fn cast_prefix<'a, T>(data: &'a [u8]) -> Result<(&'a T, &'a [u8])>
where
    T: FromBytes + KnownLayout + Immutable,
{
    T::ref_from_prefix(data).map_err(|_| Error::UnexpectedEof)
}

impl<'a> Value<'a> {
    /// Parse a single non-NULL binary protocol value based on column type and flags
    ///
    /// Returns the parsed value and the remaining bytes
    pub fn parse(type_and_flags: &ColumnTypeAndFlags, data: &'a [u8]) -> Result<(Self, &'a [u8])> {
        let is_unsigned = type_and_flags.flags.contains(ColumnFlags::UNSIGNED_FLAG);

        match type_and_flags.column_type {
            ColumnType::MYSQL_TYPE_NULL => Ok((Value::Null, data)),

            ColumnType::MYSQL_TYPE_TINY => {
                let (val, rest) = read_int_1(data)?;
                let value = if is_unsigned {
                    Value::UnsignedInt(u64::from(val))
                } else {
                    Value::SignedInt(i64::from(val as i8))
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => {
                let (val, rest) = read_int_2(data)?;
                let value = if is_unsigned {
                    Value::UnsignedInt(u64::from(val))
                } else {
                    Value::SignedInt(i64::from(val as i16))
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG => {
                let (val, rest) = read_int_4(data)?;
                let value = if is_unsigned {
                    Value::UnsignedInt(u64::from(val))
                } else {
                    Value::SignedInt(i64::from(val as i32))
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_LONGLONG => {
                let (val, rest) = read_int_8(data)?;
                let value = if is_unsigned {
                    Value::UnsignedInt(val)
                } else {
                    Value::SignedInt(val as i64)
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_FLOAT => {
                let (val, rest) = read_int_4(data)?;
                Ok((Value::Float(f32::from_bits(val)), rest))
            }

            ColumnType::MYSQL_TYPE_DOUBLE => {
                let (val, rest) = read_int_8(data)?;
                Ok((Value::Double(f64::from_bits(val)), rest))
            }

            ColumnType::MYSQL_TYPE_DATE
            | ColumnType::MYSQL_TYPE_DATETIME
            | ColumnType::MYSQL_TYPE_TIMESTAMP
            | ColumnType::MYSQL_TYPE_TIMESTAMP2
            | ColumnType::MYSQL_TYPE_DATETIME2
            | ColumnType::MYSQL_TYPE_NEWDATE => {
                let (len, rest) = read_int_1(data)?;
                match len {
                    0 => Ok((Value::Timestamp0, rest)),
                    4 => cast_prefix(rest).map(|(ts, rest)| (Value::Timestamp4(ts), rest)),
                    7 => cast_prefix(rest).map(|(ts, rest)| (Value::Timestamp7(ts), rest)),
                    11 => cast_prefix(rest).map(|(ts, rest)| (Value::Timestamp11(ts), rest)),
                    _ => Err(Error::LibraryBug(eyre!(
                        "invalid timestamp length: {}",
                        len
                    ))),
                }
            }

            ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => {
                let (len, rest) = read_int_1(data)?;
                match len {
                    0 => Ok((Value::Time0, rest)),
                    8 => cast_prefix(rest).map(|(time, rest)| (Value::Time8(time), rest)),
                    12 => cast_prefix(rest).map(|(time, rest)| (Value::Time12(time), rest)),
                    _ => Err(Error::LibraryBug(eyre!("invalid time length: {}", len))),
                }
            }

            ColumnType::MYSQL_TYPE_VARCHAR
            | ColumnType::MYSQL_TYPE_VAR_STRING
            | ColumnType::MYSQL_TYPE_STRING
            | ColumnType::MYSQL_TYPE_BLOB
            | ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
            | ColumnType::MYSQL_TYPE_GEOMETRY
            | ColumnType::MYSQL_TYPE_JSON
            | ColumnType::MYSQL_TYPE_DECIMAL
            | ColumnType::MYSQL_TYPE_NEWDECIMAL
            | ColumnType::MYSQL_TYPE_ENUM
            | ColumnType::MYSQL_TYPE_SET
            | ColumnType::MYSQL_TYPE_BIT
            | ColumnType::MYSQL_TYPE_TYPED_ARRAY => {
                let (bytes, rest) = read_string_lenenc(data)?;
                Ok((Value::Byte(bytes), rest))
            }
        }
    }
}

// ============================================================================
// Temporal Types
// ============================================================================

/// TIMESTAMP - 4 bytes (DATE/DATETIME/TIMESTAMP with date only)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp4 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
}

/// TIMESTAMP - 7 bytes (DATE/DATETIME/TIMESTAMP without microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp7 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// TIMESTAMP - 11 bytes (DATE/DATETIME/TIMESTAMP with microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp11 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

/// TIME - 8 bytes: is_negative (1), days (4 LE), hour (1), minute (1), second (1)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Time8 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// TIME - 12 bytes: the 8-byte layout followed by microsecond (4 LE)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Time12 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

// ============================================================================
// NULL Bitmap
// ============================================================================

/// NULL bitmap for binary protocol
///
/// For result sets (COM_STMT_EXECUTE response), the bitmap has an offset of 2 bits.
/// For prepared statement parameters, the offset is 0 bits.
#[derive(Debug, Clone, Copy)]
pub struct NullBitmap<'a> {
    bitmap: &'a [u8],
    offset: usize,
}

impl<'a> NullBitmap<'a> {
    /// Byte length of a result row bitmap for `num_columns` columns
    pub fn result_set_len(num_columns: usize) -> usize {
        (num_columns + 7 + 2) >> 3
    }

    /// Create a NULL bitmap for result sets (offset = 2)
    pub fn for_result_set(bitmap: &'a [u8]) -> Self {
        Self { bitmap, offset: 2 }
    }

    /// Check if the column at the given index is NULL
    pub fn is_null(&self, idx: usize) -> bool {
        let bit_pos = idx + self.offset;
        self.bitmap
            .get(bit_pos >> 3)
            .is_some_and(|byte| byte & (1 << (bit_pos & 7)) != 0)
    }
}
