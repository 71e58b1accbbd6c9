use crate::constant::ColumnType;
use crate::datetime::{DateTime, Time};
use crate::protocol::primitive::*;

/// An owned prepared-statement parameter
///
/// Statements keep one slot per placeholder; an explicit SQL NULL is `Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Param {
    #[default]
    Null,
    Signed(i64),
    Unsigned(u64),
    Float(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(DateTime),
    DateTime(DateTime),
    Time(Time),
}

impl Param {
    pub fn is_null(&self) -> bool {
        matches!(self, Param::Null)
    }

    /// Encode parameter type
    ///
    /// Format:
    /// - Byte 0: MySQL type (MYSQL_TYPE_*)
    /// - Byte 1: Unsigned flag (0x80 if unsigned, 0x00 otherwise)
    pub fn encode_type(&self, out: &mut Vec<u8>) {
        let (column_type, unsigned) = match self {
            Param::Null => (ColumnType::MYSQL_TYPE_NULL, false),
            Param::Signed(_) => (ColumnType::MYSQL_TYPE_LONGLONG, false),
            Param::Unsigned(_) => (ColumnType::MYSQL_TYPE_LONGLONG, true),
            Param::Float(_) => (ColumnType::MYSQL_TYPE_FLOAT, false),
            Param::Double(_) => (ColumnType::MYSQL_TYPE_DOUBLE, false),
            Param::Text(_) => (ColumnType::MYSQL_TYPE_VAR_STRING, false),
            Param::Bytes(_) => (ColumnType::MYSQL_TYPE_BLOB, false),
            Param::Date(_) => (ColumnType::MYSQL_TYPE_DATE, false),
            Param::DateTime(_) => (ColumnType::MYSQL_TYPE_DATETIME, false),
            Param::Time(_) => (ColumnType::MYSQL_TYPE_TIME, false),
        };
        out.push(column_type as u8);
        out.push(if unsigned { 0x80 } else { 0x00 });
    }

    /// Encode parameter value (binary encoded). NULL writes nothing.
    pub fn encode_value(&self, out: &mut Vec<u8>) {
        match self {
            Param::Null => {}
            Param::Signed(v) => write_int_8(out, *v as u64),
            Param::Unsigned(v) => write_int_8(out, *v),
            Param::Float(v) => write_int_4(out, v.to_bits()),
            Param::Double(v) => write_int_8(out, v.to_bits()),
            Param::Text(s) => write_bytes_lenenc(out, s.as_bytes()),
            Param::Bytes(b) => write_bytes_lenenc(out, b),
            Param::Date(d) => {
                write_int_1(out, 4);
                write_int_2(out, d.year);
                write_int_1(out, d.month);
                write_int_1(out, d.day);
            }
            Param::DateTime(dt) => {
                write_int_1(out, 11);
                write_int_2(out, dt.year);
                write_int_1(out, dt.month);
                write_int_1(out, dt.day);
                write_int_1(out, dt.hour);
                write_int_1(out, dt.minute);
                write_int_1(out, dt.second);
                write_int_4(out, dt.microsecond);
            }
            Param::Time(t) => {
                write_int_1(out, 12);
                write_int_1(out, u8::from(t.negative));
                write_int_4(out, t.hours / 24);
                write_int_1(out, (t.hours % 24) as u8);
                write_int_1(out, t.minutes);
                write_int_1(out, t.seconds);
                write_int_4(out, t.microseconds);
            }
        }
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Signed(i64::from(value))
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Param::Signed(i64::from(value))
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Signed(value)
    }
}

impl From<u32> for Param {
    fn from(value: u32) -> Self {
        Param::Unsigned(u64::from(value))
    }
}

impl From<u64> for Param {
    fn from(value: u64) -> Self {
        Param::Unsigned(value)
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Double(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_owned())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map_or(Param::Null, Into::into)
    }
}
