use crate::constant::{ColumnFlags, ColumnType};
use crate::error::Error;
use crate::protocol::command::{ColumnDefinition, ColumnTypeAndFlags};

/// Owned column metadata of a stored result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub schema: String,
    /// Table alias as written in the query
    pub table: String,
    pub org_table: String,
    /// Column alias as written in the query
    pub name: String,
    pub org_name: String,
    pub charset: u16,
    pub column_length: u32,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub decimals: u8,
    /// Longest value (in wire bytes) seen in this column across the stored rows
    pub max_length: usize,
}

impl Column {
    pub fn type_and_flags(&self) -> ColumnTypeAndFlags {
        ColumnTypeAndFlags {
            column_type: self.column_type,
            flags: self.flags,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED_FLAG)
    }
}

impl TryFrom<&ColumnDefinition<'_>> for Column {
    type Error = Error;

    fn try_from(def: &ColumnDefinition<'_>) -> Result<Self, Self::Error> {
        let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();
        Ok(Self {
            schema: text(def.schema),
            table: text(def.table_alias),
            org_table: text(def.table_original),
            name: text(def.name_alias),
            org_name: text(def.name_original),
            charset: def.tail.charset(),
            column_length: def.tail.column_length(),
            column_type: def.tail.column_type()?,
            flags: def.tail.flags(),
            decimals: def.tail.decimals(),
            max_length: 0,
        })
    }
}
