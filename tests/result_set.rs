//! Result set behavior driven by recorded `COM_STMT_EXECUTE` responses; no server needed.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use zero_mysql_bind::constant::{ColumnFlags, ColumnType};
use zero_mysql_bind::error::{Error, Result};
use zero_mysql_bind::protocol::primitive::{write_bytes_lenenc, write_int_2, write_int_4};
use zero_mysql_bind::{
    DateTime, FnLogSink, LogSink, ResultSet, ResultSetSource, StoredResult, Time,
};

type Lines = Rc<RefCell<Vec<String>>>;

struct FakeSource {
    result: Option<Result<StoredResult>>,
    sink: Box<dyn LogSink>,
    handled: bool,
}

impl FakeSource {
    fn new(result: Result<StoredResult>) -> (Self, Lines) {
        let lines = Lines::default();
        let captured = Rc::clone(&lines);
        let source = Self {
            result: Some(result),
            sink: Box::new(FnLogSink(move |message: &str| {
                captured.borrow_mut().push(message.to_string());
            })),
            handled: false,
        };
        (source, lines)
    }
}

impl ResultSetSource for FakeSource {
    fn store_result(&mut self) -> Result<StoredResult> {
        self.result
            .take()
            .unwrap_or_else(|| Err(Error::BadUsageError("already stored".to_string())))
    }

    fn log_sink(&self) -> &dyn LogSink {
        &*self.sink
    }

    fn mark_result_set_handled(&mut self) {
        self.handled = true;
    }
}

fn column_definition(name: &str, column_type: ColumnType, flags: ColumnFlags) -> Vec<u8> {
    let mut out = Vec::new();
    write_bytes_lenenc(&mut out, b"def");
    write_bytes_lenenc(&mut out, b"test");
    write_bytes_lenenc(&mut out, b"t");
    write_bytes_lenenc(&mut out, b"t");
    write_bytes_lenenc(&mut out, name.as_bytes());
    write_bytes_lenenc(&mut out, name.as_bytes());
    out.push(0x0c);
    write_int_2(&mut out, 45);
    write_int_4(&mut out, 255);
    out.push(column_type as u8);
    write_int_2(&mut out, flags.bits());
    out.push(0);
    write_int_2(&mut out, 0);
    out
}

/// OK packet with the `0xFE` header that ends rows under `CLIENT_DEPRECATE_EOF`
const OK_EOF: [u8; 7] = [0xFE, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];

fn store(columns: &[(&str, ColumnType, ColumnFlags)], rows: &[Vec<u8>]) -> StoredResult {
    let mut payloads = vec![vec![columns.len() as u8]];
    for (name, column_type, flags) in columns {
        payloads.push(column_definition(name, *column_type, *flags));
    }
    payloads.extend(rows.iter().cloned());
    payloads.push(OK_EOF.to_vec());
    StoredResult::from_payloads(payloads.iter().map(Vec::as_slice), true).unwrap()
}

/// `id INT, name VARCHAR` with rows (42, "hello"), (NULL, NULL), (7, "")
fn users() -> StoredResult {
    store(
        &[
            ("id", ColumnType::MYSQL_TYPE_LONG, ColumnFlags::empty()),
            ("name", ColumnType::MYSQL_TYPE_VAR_STRING, ColumnFlags::empty()),
        ],
        &[
            vec![0x00, 0x00, 42, 0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o'],
            vec![0x00, 0b0000_1100],
            vec![0x00, 0x00, 7, 0, 0, 0, 0],
        ],
    )
}

#[test]
fn reads_int_and_string_columns() {
    let (mut source, lines) = FakeSource::new(Ok(users()));
    let mut rs = ResultSet::new(&mut source);

    assert!(rs.is_valid());
    assert_eq!(rs.field_count(), 2);
    assert_eq!(rs.row_count(), 3);
    assert_eq!(rs.column_type(0), Some(ColumnType::MYSQL_TYPE_LONG));

    assert!(rs.next());
    assert_eq!(rs.row_index(), Some(0));
    assert_eq!(rs.get_i32(0), 42);
    assert_eq!(rs.get_u32(0), 42);
    assert_eq!(rs.get_i8(0), 42);
    assert!(rs.get_boolean(0));
    assert!(!rs.is_null(0));
    assert_eq!(rs.get_string(1), "hello");

    assert!(rs.next());
    assert!(rs.is_null(0));
    assert!(rs.is_null(1));
    assert_eq!(rs.get_i64(0), 0);
    assert_eq!(rs.get_u64(0), 0);
    assert_eq!(rs.get_f64(0), 0.0);
    assert!(!rs.get_boolean(0));
    assert_eq!(rs.get_string(1), "");

    assert!(rs.next());
    assert_eq!(rs.get_i16(0), 7);
    assert!(!rs.is_null(1));
    assert_eq!(rs.get_string(1), "");

    assert!(lines.borrow().is_empty());
}

#[test]
fn next_keeps_returning_false_after_exhaustion() {
    let (mut source, _lines) = FakeSource::new(Ok(users()));
    let mut rs = ResultSet::new(&mut source);

    let mut rows = 0;
    while rs.next() {
        rows += 1;
    }
    assert_eq!(rows, 3);
    assert!(!rs.next());
    assert!(!rs.next());
    assert_eq!(rs.row_index(), None);
    assert_eq!(rs.get_i32(0), 0);
    assert!(rs.is_null(0));
}

#[test]
fn out_of_range_index_reads_defaults() {
    let (mut source, lines) = FakeSource::new(Ok(users()));
    let mut rs = ResultSet::new(&mut source);
    assert!(rs.next());

    for index in [2, 3, usize::MAX] {
        assert_eq!(rs.column_type(index), None);
        assert!(rs.is_null(index));
        assert!(!rs.get_boolean(index));
        assert_eq!(rs.get_i8(index), 0);
        assert_eq!(rs.get_i16(index), 0);
        assert_eq!(rs.get_i32(index), 0);
        assert_eq!(rs.get_i64(index), 0);
        assert_eq!(rs.get_u8(index), 0);
        assert_eq!(rs.get_u16(index), 0);
        assert_eq!(rs.get_u32(index), 0);
        assert_eq!(rs.get_u64(index), 0);
        assert_eq!(rs.get_f32(index), 0.0);
        assert_eq!(rs.get_f64(index), 0.0);
        assert_eq!(rs.get_string(index), "");
        assert_eq!(rs.get_date(index), DateTime::default());
        assert_eq!(rs.get_datetime(index), DateTime::default());
        assert_eq!(rs.get_time(index), Time::default());
        assert!(rs.column(index).is_none());
    }
    assert!(lines.borrow().is_empty());
}

#[test]
fn store_failure_invalidates_and_logs_once() {
    let (mut source, lines) = FakeSource::new(Err(Error::BadUsageError("boom".to_string())));
    let mut rs = ResultSet::new(&mut source);

    assert!(!rs.is_valid());
    assert_eq!(rs.field_count(), 0);
    assert!(!rs.next());
    assert!(!rs.next());
    assert!(rs.is_null(0));
    assert_eq!(rs.get_i32(0), 0);
    assert_eq!(rs.get_string(0), "");
    assert_eq!(rs.column_type(0), None);
    assert!(rs.columns().is_empty());
    drop(rs);

    let lines = lines.borrow();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("ResultSet::new: "));
    assert!(lines[0].contains("boom"));
}

#[test]
fn statement_without_result_set_is_invalid_without_log() {
    let ok = [0x00, 0x03, 0x00, 0x02, 0x00, 0x00, 0x00];
    let stored = StoredResult::from_payloads([&ok[..]], true).unwrap();
    assert_eq!(stored.outcome().affected_rows, 3);

    let (mut source, lines) = FakeSource::new(Ok(stored));
    let mut rs = ResultSet::new(&mut source);
    assert!(!rs.is_valid());
    assert!(!rs.next());
    assert!(lines.borrow().is_empty());
}

#[test]
fn decode_failure_ends_iteration_and_logs() {
    let stored = store(
        &[("id", ColumnType::MYSQL_TYPE_LONG, ColumnFlags::empty())],
        &[vec![0x00, 0x00, 1, 0, 0, 0], vec![0x00, 0x00, 42, 0]],
    );
    let (mut source, lines) = FakeSource::new(Ok(stored));
    let mut rs = ResultSet::new(&mut source);

    assert!(rs.next());
    assert_eq!(rs.get_i32(0), 1);
    assert!(!rs.next());
    assert!(!rs.next());
    assert_eq!(rs.get_i32(0), 0);
    drop(rs);

    let lines = lines.borrow();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("ResultSet::next: row 1"));
}

#[test]
fn callback_invoked_marks_source() {
    let (mut source, _lines) = FakeSource::new(Ok(users()));
    {
        let mut rs = ResultSet::new(&mut source);
        rs.callback_invoked();
    }
    assert!(source.handled);
}

#[test]
fn exposes_column_metadata() {
    let (mut source, _lines) = FakeSource::new(Ok(users()));
    let rs = ResultSet::new(&mut source);

    let id = rs.column(0).unwrap();
    assert_eq!(id.name, "id");
    assert_eq!(id.table, "t");
    assert_eq!(id.schema, "test");
    assert_eq!(id.charset, 45);
    assert_eq!(id.max_length, 4);
    assert_eq!(rs.column(1).unwrap().max_length, 5);
    assert_eq!(rs.column_index("name"), Some(1));
    assert_eq!(rs.column_index("missing"), None);
}

#[test]
fn reads_unsigned_and_floating_columns() {
    let mut row = vec![0x00, 0x00];
    row.extend_from_slice(&u64::MAX.to_le_bytes());
    row.extend_from_slice(&1.5f32.to_le_bytes());
    row.extend_from_slice(&(-2.25f64).to_le_bytes());
    let stored = store(
        &[
            ("big", ColumnType::MYSQL_TYPE_LONGLONG, ColumnFlags::UNSIGNED_FLAG),
            ("f", ColumnType::MYSQL_TYPE_FLOAT, ColumnFlags::empty()),
            ("d", ColumnType::MYSQL_TYPE_DOUBLE, ColumnFlags::empty()),
        ],
        &[row],
    );
    let (mut source, _lines) = FakeSource::new(Ok(stored));
    let mut rs = ResultSet::new(&mut source);

    assert!(rs.next());
    assert_eq!(rs.get_u64(0), u64::MAX);
    assert_eq!(rs.get_i64(0), -1);
    assert_eq!(rs.get_u8(0), u8::MAX);
    assert_eq!(rs.get_f32(1), 1.5);
    assert_eq!(rs.get_f64(1), 0.0);
    assert_eq!(rs.get_f64(2), -2.25);
    assert_eq!(rs.get_i32(2), 0);
}

#[test]
fn reads_temporal_columns() {
    let mut row = vec![0x00, 0x00];
    // DATETIME 2024-03-15 10:20:30.000123
    row.extend_from_slice(&[11, 0xE8, 0x07, 3, 15, 10, 20, 30]);
    row.extend_from_slice(&123u32.to_le_bytes());
    // DATE 1999-12-31
    row.extend_from_slice(&[4, 0xCF, 0x07, 12, 31]);
    // TIME -1 day 02:03:04
    row.extend_from_slice(&[8, 1, 1, 0, 0, 0, 2, 3, 4]);
    let stored = store(
        &[
            ("at", ColumnType::MYSQL_TYPE_DATETIME, ColumnFlags::empty()),
            ("on", ColumnType::MYSQL_TYPE_DATE, ColumnFlags::empty()),
            ("took", ColumnType::MYSQL_TYPE_TIME, ColumnFlags::empty()),
        ],
        &[row],
    );
    let (mut source, _lines) = FakeSource::new(Ok(stored));
    let mut rs = ResultSet::new(&mut source);

    assert!(rs.next());

    let mut expected = DateTime::new(2024, 3, 15, 10, 20, 30);
    expected.microsecond = 123;
    assert_eq!(rs.get_datetime(0), expected);
    assert_eq!(
        rs.get_time(0),
        Time {
            microseconds: 123,
            ..Time::new(10, 20, 30)
        }
    );
    assert_eq!(rs.get_date(1), DateTime::from_date(1999, 12, 31));

    let took = rs.get_time(2);
    assert!(took.negative);
    assert_eq!((took.hours, took.minutes, took.seconds), (26, 3, 4));
    assert_eq!(took.total_seconds(), -(26 * 3600 + 3 * 60 + 4));
    assert_eq!(rs.get_string(2), "");
}

#[test]
fn classic_eof_response() {
    let mut payloads = vec![
        vec![1],
        column_definition("n", ColumnType::MYSQL_TYPE_TINY, ColumnFlags::empty()),
    ];
    payloads.push(vec![0xFE, 0x00, 0x00, 0x02, 0x00]);
    payloads.push(vec![0x00, 0x00, 0xFF]);
    payloads.push(vec![0xFE, 0x01, 0x00, 0x02, 0x00]);
    let stored = StoredResult::from_payloads(payloads.iter().map(Vec::as_slice), false).unwrap();
    assert_eq!(stored.outcome().warnings, 1);

    let (mut source, _lines) = FakeSource::new(Ok(stored));
    let mut rs = ResultSet::new(&mut source);
    assert!(rs.next());
    assert_eq!(rs.get_i8(0), -1);
    assert!(!rs.next());
}

#[test]
fn terminating_ok_reports_its_warnings() {
    let payloads = [
        vec![1],
        column_definition("n", ColumnType::MYSQL_TYPE_TINY, ColumnFlags::empty()),
        vec![0x00, 0x00, 0x05],
        vec![0xFE, 0x00, 0x00, 0x02, 0x00, 0x03, 0x00],
    ];
    let stored = StoredResult::from_payloads(payloads.iter().map(Vec::as_slice), true).unwrap();
    assert_eq!(stored.row_count(), 1);
    assert_eq!(stored.outcome().warnings, 3);
    assert_eq!(stored.outcome().affected_rows, 0);
}

#[test]
fn truncated_response_is_rejected() {
    let payloads = [vec![1u8]];
    assert!(matches!(
        StoredResult::from_payloads(payloads.iter().map(Vec::as_slice), true),
        Err(Error::UnexpectedEof)
    ));
}
