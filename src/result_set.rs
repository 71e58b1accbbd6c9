//! Cursor-style access to a stored prepared-statement result.
//!
//! [`ResultSet`] is the surface a scripting host binds: every accessor takes a
//! column index and never fails. Out-of-range indices, NULL values and an invalid
//! result set all read as the zero value of the accessor's type.

use crate::bind::Bind;
use crate::col::Column;
use crate::constant::ColumnType;
use crate::datetime::{DateTime, Time};
use crate::error::{Error, Result};
use crate::handler::StoredResult;
use crate::log::LogSink;
use crate::protocol::BinaryRowPayload;
use crate::protocol::value::Value;

/// Producer of the stored result a [`ResultSet`] walks over
///
/// `Statement` is the production implementation; hosts and tests may supply their own.
pub trait ResultSetSource {
    /// Execute and buffer the complete result client-side
    fn store_result(&mut self) -> Result<StoredResult>;

    /// Where the result set reports failures
    fn log_sink(&self) -> &dyn LogSink;

    /// Record that the host consumed the result set through a callback
    fn mark_result_set_handled(&mut self);
}

/// Result of one statement execution with one [`Bind`] per column
///
/// Holds the source exclusively for its whole lifetime; dropping the result set
/// releases the stored rows and hands the source back.
pub struct ResultSet<'s> {
    source: &'s mut dyn ResultSetSource,
    stored: StoredResult,
    binds: Vec<Bind>,
    /// Index of the next row `next()` will decode
    cursor: usize,
    /// Row currently decoded into `binds`
    current: Option<usize>,
}

impl std::fmt::Debug for ResultSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("columns", &self.stored.columns())
            .field("row_count", &self.stored.row_count())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<'s> ResultSet<'s> {
    /// Store the result of `source` and bind its columns
    ///
    /// A failure to store is logged through the source's sink and leaves the result set
    /// invalid. A statement without a result set is invalid without a log line.
    #[tracing::instrument(skip_all)]
    pub fn new(source: &'s mut dyn ResultSetSource) -> Self {
        let stored = match source.store_result() {
            Ok(stored) => stored,
            Err(err) => {
                source.log_sink().log(&format!("ResultSet::new: {err}"));
                StoredResult::default()
            }
        };

        let binds = stored
            .columns()
            .map(|columns| columns.iter().map(Bind::for_column).collect())
            .unwrap_or_default();

        tracing::trace!(rows = stored.row_count(), "result set stored");

        Self {
            source,
            stored,
            binds,
            cursor: 0,
            current: None,
        }
    }

    /// `true` iff column metadata was obtained
    pub fn is_valid(&self) -> bool {
        self.stored.columns().is_some()
    }

    pub fn field_count(&self) -> usize {
        self.binds.len()
    }

    /// Decode the next stored row into the binds
    ///
    /// Returns `false` at the end of the data and on a decode failure; the latter is
    /// also logged and ends the iteration.
    pub fn next(&mut self) -> bool {
        let Some(data) = self.stored.row(self.cursor) else {
            self.clear_binds();
            return false;
        };

        match decode_row(data, &mut self.binds) {
            Ok(()) => {
                self.current = Some(self.cursor);
                self.cursor += 1;
                true
            }
            Err(err) => {
                self.source
                    .log_sink()
                    .log(&format!("ResultSet::next: row {}: {err}", self.cursor));
                self.cursor = self.stored.row_count();
                self.clear_binds();
                false
            }
        }
    }

    fn clear_binds(&mut self) {
        self.current = None;
        for bind in &mut self.binds {
            bind.set_null();
        }
    }

    fn bind(&self, index: usize) -> Option<&Bind> {
        self.binds.get(index)
    }

    /// `None` is the "no field" answer for an out-of-range index
    pub fn column_type(&self, index: usize) -> Option<ColumnType> {
        self.bind(index).map(Bind::column_type)
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.bind(index).is_none_or(Bind::is_null)
    }

    pub fn get_boolean(&self, index: usize) -> bool {
        self.get_u64(index) != 0
    }

    pub fn get_i8(&self, index: usize) -> i8 {
        self.get_i64(index) as i8
    }

    pub fn get_i16(&self, index: usize) -> i16 {
        self.get_i64(index) as i16
    }

    pub fn get_i32(&self, index: usize) -> i32 {
        self.get_i64(index) as i32
    }

    pub fn get_i64(&self, index: usize) -> i64 {
        self.bind(index).map_or(0, Bind::signed)
    }

    pub fn get_u8(&self, index: usize) -> u8 {
        self.get_u64(index) as u8
    }

    pub fn get_u16(&self, index: usize) -> u16 {
        self.get_u64(index) as u16
    }

    pub fn get_u32(&self, index: usize) -> u32 {
        self.get_u64(index) as u32
    }

    pub fn get_u64(&self, index: usize) -> u64 {
        self.bind(index).map_or(0, Bind::unsigned)
    }

    pub fn get_f32(&self, index: usize) -> f32 {
        self.bind(index).map_or(0.0, Bind::float)
    }

    pub fn get_f64(&self, index: usize) -> f64 {
        self.bind(index).map_or(0.0, Bind::double)
    }

    /// Byte value of the column as text. Invalid UTF-8 is replaced, not rejected.
    pub fn get_string(&self, index: usize) -> String {
        let bytes = self.bind(index).map_or(&[][..], Bind::bytes);
        match simdutf8::basic::from_utf8(bytes) {
            Ok(text) => text.to_owned(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Date part of a temporal column; time fields are zero for `DATE` columns
    pub fn get_date(&self, index: usize) -> DateTime {
        self.get_datetime(index)
    }

    pub fn get_time(&self, index: usize) -> Time {
        self.bind(index)
            .map(|bind| Time::from_mysql_time(&bind.time()))
            .unwrap_or_default()
    }

    pub fn get_datetime(&self, index: usize) -> DateTime {
        self.bind(index)
            .map(|bind| DateTime::from_mysql_time(&bind.time()))
            .unwrap_or_default()
    }

    /// Tell the owning statement that the host consumed this result set
    pub fn callback_invoked(&mut self) {
        self.source.mark_result_set_handled();
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.stored.columns()?.get(index)
    }

    /// Position of the first column whose alias is `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.stored
            .columns()?
            .iter()
            .position(|column| column.name == name)
    }

    pub fn columns(&self) -> &[Column] {
        self.stored.columns().unwrap_or_default()
    }

    /// Number of rows stored client-side
    pub fn row_count(&self) -> usize {
        self.stored.row_count()
    }

    /// Index of the row currently decoded, `None` before the first `next()` and after the end
    pub fn row_index(&self) -> Option<usize> {
        self.current
    }
}

/// Decode one stored row into `binds`, one bind per column
fn decode_row(data: &[u8], binds: &mut [Bind]) -> Result<()> {
    let row = BinaryRowPayload::from_stored(data, binds.len())?;
    let null_bitmap = row.null_bitmap();
    let mut values = row.values();

    for (idx, bind) in binds.iter_mut().enumerate() {
        if null_bitmap.is_null(idx) {
            bind.set_null();
            continue;
        }
        let (value, rest) = Value::parse(bind.type_and_flags(), values)?;
        bind.store(value);
        values = rest;
    }

    if !values.is_empty() {
        return Err(Error::InvalidPacket);
    }
    Ok(())
}
