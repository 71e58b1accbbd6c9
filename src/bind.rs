use crate::col::Column;
use crate::constant::ColumnType;
use crate::datetime::MysqlTime;
use crate::protocol::command::ColumnTypeAndFlags;
use crate::protocol::value::Value;

/// The decoded value held by a [`Bind`]
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BindValue {
    #[default]
    Null,
    Signed(i64),
    Unsigned(u64),
    Float(f32),
    Double(f64),
    /// Strings, BLOBs, DECIMAL, JSON, BIT, ENUM, SET, GEOMETRY
    Bytes(Vec<u8>),
    Temporal(MysqlTime),
}

/// Output buffer for one column, refilled on every fetched row
///
/// Views that do not match the stored variant return the zero value of the view,
/// except that the signed and unsigned integer views reinterpret each other.
#[derive(Debug, Clone)]
pub struct Bind {
    type_and_flags: ColumnTypeAndFlags,
    value: BindValue,
}

impl Bind {
    pub fn new(type_and_flags: ColumnTypeAndFlags) -> Self {
        Self {
            type_and_flags,
            value: BindValue::Null,
        }
    }

    pub fn for_column(column: &Column) -> Self {
        Self::new(column.type_and_flags())
    }

    pub fn type_and_flags(&self) -> &ColumnTypeAndFlags {
        &self.type_and_flags
    }

    pub fn column_type(&self) -> ColumnType {
        self.type_and_flags.column_type
    }

    pub fn value(&self) -> &BindValue {
        &self.value
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, BindValue::Null)
    }

    pub fn set_null(&mut self) {
        self.value = BindValue::Null;
    }

    /// Copy a decoded wire value into the buffer
    pub fn store(&mut self, value: Value<'_>) {
        self.value = match value {
            Value::Null => BindValue::Null,
            Value::SignedInt(v) => BindValue::Signed(v),
            Value::UnsignedInt(v) => BindValue::Unsigned(v),
            Value::Float(v) => BindValue::Float(v),
            Value::Double(v) => BindValue::Double(v),
            Value::Byte(bytes) => {
                // reuse the allocation of the previous row
                if let BindValue::Bytes(buffer) = &mut self.value {
                    buffer.clear();
                    buffer.extend_from_slice(bytes);
                    return;
                }
                BindValue::Bytes(bytes.to_vec())
            }
            temporal => match MysqlTime::from_value(&temporal) {
                Some(time) => BindValue::Temporal(time),
                None => BindValue::Null,
            },
        };
    }

    pub fn signed(&self) -> i64 {
        match self.value {
            BindValue::Signed(v) => v,
            BindValue::Unsigned(v) => v as i64,
            _ => 0,
        }
    }

    pub fn unsigned(&self) -> u64 {
        match self.value {
            BindValue::Unsigned(v) => v,
            BindValue::Signed(v) => v as u64,
            _ => 0,
        }
    }

    pub fn float(&self) -> f32 {
        match self.value {
            BindValue::Float(v) => v,
            _ => 0.0,
        }
    }

    pub fn double(&self) -> f64 {
        match self.value {
            BindValue::Double(v) => v,
            _ => 0.0,
        }
    }

    /// Empty for NULL and non-byte values
    pub fn bytes(&self) -> &[u8] {
        match &self.value {
            BindValue::Bytes(bytes) => bytes,
            _ => &[],
        }
    }

    /// All-zero for NULL and non-temporal values
    pub fn time(&self) -> MysqlTime {
        match self.value {
            BindValue::Temporal(time) => time,
            _ => MysqlTime::default(),
        }
    }
}
