use crate::constant::ColumnType;
use crate::datetime::{DateTime, Time};
use crate::protocol::r#trait::param::Param;
use crate::protocol::r#trait::params::Params;

fn encode(param: &Param) -> (Vec<u8>, Vec<u8>) {
    let mut types = Vec::new();
    let mut values = Vec::new();
    param.encode_type(&mut types);
    param.encode_value(&mut values);
    (types, values)
}

#[test]
fn test_param_signed() {
    let (types, values) = encode(&Param::Signed(-42));
    assert_eq!(types, vec![ColumnType::MYSQL_TYPE_LONGLONG as u8, 0x00]);
    assert_eq!(values, (-42i64).to_le_bytes());
}

#[test]
fn test_param_unsigned() {
    let (types, values) = encode(&Param::Unsigned(12_345_678_901_234));
    assert_eq!(types, vec![ColumnType::MYSQL_TYPE_LONGLONG as u8, 0x80]);
    assert_eq!(values, 12_345_678_901_234u64.to_le_bytes());
}

#[test]
fn test_param_double() {
    let (types, values) = encode(&Param::Double(3.5));
    assert_eq!(types, vec![ColumnType::MYSQL_TYPE_DOUBLE as u8, 0x00]);
    assert_eq!(values, 3.5f64.to_bits().to_le_bytes());
}

#[test]
fn test_param_text() {
    let (types, values) = encode(&Param::from("Hello, MySQL!"));
    assert_eq!(types, vec![ColumnType::MYSQL_TYPE_VAR_STRING as u8, 0x00]);
    assert_eq!(values[0], 13);
    assert_eq!(&values[1..], b"Hello, MySQL!");
}

#[test]
fn test_param_null_writes_no_value() {
    let (types, values) = encode(&Param::from(None::<i64>));
    assert_eq!(types, vec![ColumnType::MYSQL_TYPE_NULL as u8, 0x00]);
    assert!(values.is_empty());
}

#[test]
fn test_param_datetime() {
    let mut dt = DateTime::new(2024, 2, 29, 23, 59, 58);
    dt.microsecond = 7;
    let (types, values) = encode(&Param::DateTime(dt));
    assert_eq!(types, vec![ColumnType::MYSQL_TYPE_DATETIME as u8, 0x00]);
    assert_eq!(
        values,
        vec![11, 0xE8, 0x07, 2, 29, 23, 59, 58, 7, 0, 0, 0]
    );
}

#[test]
fn test_param_time_splits_days() {
    let (_, values) = encode(&Param::Time(Time::new(50, 1, 2)));
    assert_eq!(values, vec![12, 0, 2, 0, 0, 0, 2, 1, 2, 0, 0, 0, 0]);
}

#[test]
fn test_params_null_bitmap() {
    let params = vec![
        Param::Null,
        Param::Signed(1),
        Param::Null,
        Param::Signed(1),
        Param::Signed(1),
        Param::Signed(1),
        Param::Signed(1),
        Param::Signed(1),
        Param::Null,
    ];
    let mut bitmap = Vec::new();
    params.as_slice().write_null_bitmap(&mut bitmap);
    assert_eq!(bitmap, vec![0b0000_0101, 0b0000_0001]);
    assert_eq!(Params::len(params.as_slice()), 9);
}
