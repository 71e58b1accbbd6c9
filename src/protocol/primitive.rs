//! Fixed-width, length-encoded and NUL-terminated primitives of the MySQL wire format.
//!
//! Readers return the decoded value together with the unconsumed remainder.

use crate::error::{Error, Result};

#[inline]
fn read_array<const N: usize>(data: &[u8]) -> Result<([u8; N], &[u8])> {
    let (head, rest) = data.split_first_chunk::<N>().ok_or(Error::UnexpectedEof)?;
    Ok((*head, rest))
}

/// Read 1-byte integer
pub fn read_int_1(data: &[u8]) -> Result<(u8, &[u8])> {
    let (&first, rest) = data.split_first().ok_or(Error::UnexpectedEof)?;
    Ok((first, rest))
}

/// Read 2-byte little-endian integer
pub fn read_int_2(data: &[u8]) -> Result<(u16, &[u8])> {
    let (bytes, rest) = read_array::<2>(data)?;
    Ok((u16::from_le_bytes(bytes), rest))
}

/// Read 3-byte little-endian integer
pub fn read_int_3(data: &[u8]) -> Result<(u32, &[u8])> {
    let ([a, b, c], rest) = read_array::<3>(data)?;
    Ok((u32::from_le_bytes([a, b, c, 0]), rest))
}

/// Read 4-byte little-endian integer
pub fn read_int_4(data: &[u8]) -> Result<(u32, &[u8])> {
    let (bytes, rest) = read_array::<4>(data)?;
    Ok((u32::from_le_bytes(bytes), rest))
}

/// Read 8-byte little-endian integer
pub fn read_int_8(data: &[u8]) -> Result<(u64, &[u8])> {
    let (bytes, rest) = read_array::<8>(data)?;
    Ok((u64::from_le_bytes(bytes), rest))
}

/// Read length-encoded integer
///
/// `0xFB` (NULL in text rows) and `0xFF` (ERR header) are not valid here.
pub fn read_int_lenenc(data: &[u8]) -> Result<(u64, &[u8])> {
    let (first, rest) = read_int_1(data)?;
    match first {
        0xFC => read_int_2(rest).map(|(v, rest)| (u64::from(v), rest)),
        0xFD => read_int_3(rest).map(|(v, rest)| (u64::from(v), rest)),
        0xFE => read_int_8(rest),
        0xFB | 0xFF => Err(Error::InvalidPacket),
        val => Ok((u64::from(val), rest)),
    }
}

/// Read fixed-length string
pub fn read_string_fix(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if data.len() < len {
        return Err(Error::UnexpectedEof);
    }
    Ok(data.split_at(len))
}

/// Read null-terminated string
pub fn read_string_null(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let pos = data
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::UnexpectedEof)?;
    Ok((&data[..pos], &data[pos + 1..]))
}

/// Read length-encoded string
pub fn read_string_lenenc(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = read_int_lenenc(data)?;
    let len = usize::try_from(len).map_err(|_| Error::InvalidPacket)?;
    read_string_fix(rest, len)
}

/// Write 1-byte integer
pub fn write_int_1(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write 2-byte little-endian integer
pub fn write_int_2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 3-byte little-endian integer
pub fn write_int_3(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Write 4-byte little-endian integer
pub fn write_int_4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 8-byte little-endian integer
pub fn write_int_8(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write length-encoded integer
pub fn write_int_lenenc(out: &mut Vec<u8>, value: u64) {
    match value {
        0..251 => out.push(value as u8),
        251..0x1_0000 => {
            out.push(0xFC);
            write_int_2(out, value as u16);
        }
        0x1_0000..0x100_0000 => {
            out.push(0xFD);
            write_int_3(out, value as u32);
        }
        _ => {
            out.push(0xFE);
            write_int_8(out, value);
        }
    }
}

/// Write null-terminated string
pub fn write_string_null(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

/// Write length-encoded bytes
pub fn write_bytes_lenenc(out: &mut Vec<u8>, data: &[u8]) {
    write_int_lenenc(out, data.len() as u64);
    out.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenenc_boundaries() {
        for value in [0u64, 250, 251, 0xFFFF, 0x1_0000, 0xFF_FFFF, 0x100_0000, u64::MAX] {
            let mut out = Vec::new();
            write_int_lenenc(&mut out, value);
            let (decoded, rest) = read_int_lenenc(&out).unwrap();
            assert_eq!(decoded, value);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn test_lenenc_rejects_null_marker() {
        assert!(matches!(read_int_lenenc(&[0xFB]), Err(Error::InvalidPacket)));
    }

    #[test]
    fn test_short_reads() {
        assert!(matches!(read_int_4(&[1, 2, 3]), Err(Error::UnexpectedEof)));
        assert!(matches!(read_string_null(b"abc"), Err(Error::UnexpectedEof)));
        assert!(matches!(
            read_string_lenenc(&[5, b'a', b'b']),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn test_string_null() {
        let (s, rest) = read_string_null(b"8.0.36\0tail").unwrap();
        assert_eq!(s, b"8.0.36");
        assert_eq!(rest, b"tail");
    }
}
