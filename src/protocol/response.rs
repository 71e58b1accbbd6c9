use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// Raw OK packet payload, or the `0xFE`-headed OK that terminates rows under `CLIENT_DEPRECATE_EOF`
#[derive(Debug, Clone, Copy)]
pub struct OkPayloadBytes<'a>(pub &'a [u8]);

impl<'a> OkPayloadBytes<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        self.0
    }
}

/// Raw ERR packet payload
#[derive(Debug, Clone, Copy)]
pub struct ErrPayloadBytes<'a>(pub &'a [u8]);

/// Raw classic EOF packet payload, sent when `CLIENT_DEPRECATE_EOF` is not negotiated
#[derive(Debug, Clone, Copy)]
pub struct EofPayloadBytes<'a>(pub &'a [u8]);

/// Packet that terminates the rows of a result set
///
/// Both forms start with `0xFE`; which one arrives depends on `CLIENT_DEPRECATE_EOF`,
/// not on the bytes.
#[derive(Debug, Clone, Copy)]
pub enum ResultSetEnd<'a> {
    Ok(OkPayloadBytes<'a>),
    Eof(EofPayloadBytes<'a>),
}

/// Classic EOF packet: header `0xFE` and fewer than 9 bytes
pub fn is_eof_packet(payload: &[u8]) -> bool {
    payload.first() == Some(&0xFE) && payload.len() < 9
}

/// Classic EOF packet response
#[derive(Debug, Clone)]
pub struct EofPayload {
    pub warnings: u16,
    pub status_flags: ServerStatusFlags,
}

impl TryFrom<EofPayloadBytes<'_>> for EofPayload {
    type Error = Error;

    fn try_from(bytes: EofPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0xFE {
            return Err(Error::InvalidPacket);
        }

        let (warnings, rest) = read_int_2(data)?;
        let (status_flags, _rest) = read_int_2(rest)?;

        Ok(EofPayload {
            warnings,
            status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
        })
    }
}

/// OK packet response
#[derive(Debug, Clone)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
}

impl TryFrom<OkPayloadBytes<'_>> for OkPayload {
    type Error = Error;

    fn try_from(bytes: OkPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.bytes())?;
        if header != 0x00 && header != 0xFE {
            return Err(Error::InvalidPacket);
        }

        let (affected_rows, rest) = read_int_lenenc(data)?;
        let (last_insert_id, rest) = read_int_lenenc(rest)?;
        let (status_flags, rest) = read_int_2(rest)?;
        let (warnings, _info) = read_int_2(rest)?;

        Ok(OkPayload {
            affected_rows,
            last_insert_id,
            status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
            warnings,
        })
    }
}

/// ERR packet response
#[derive(Debug, Clone, thiserror::Error)]
#[error("ERROR {} ({}): {}", self.error_code, self.sql_state, self.message)]
pub struct ErrPayload {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl TryFrom<ErrPayloadBytes<'_>> for ErrPayload {
    type Error = Error;

    fn try_from(bytes: ErrPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0xFF {
            return Err(Error::InvalidPacket);
        }

        let (error_code, data) = read_int_2(data)?;

        // SQL state is present under CLIENT_PROTOCOL_41, marked by '#'
        let (sql_state, message) = match data.split_first() {
            Some((b'#', rest)) => {
                let (state, rest) = read_string_fix(rest, 5)?;
                (String::from_utf8_lossy(state).into_owned(), rest)
            }
            _ => (String::new(), data),
        };

        Ok(ErrPayload {
            error_code,
            sql_state,
            message: String::from_utf8_lossy(message).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_payload() {
        // affected_rows=3, last_insert_id=300 (0xFC lenenc), autocommit, 1 warning
        let payload = [0x00, 0x03, 0xFC, 0x2C, 0x01, 0x02, 0x00, 0x01, 0x00];
        let ok = OkPayload::try_from(OkPayloadBytes(&payload)).unwrap();
        assert_eq!(ok.affected_rows, 3);
        assert_eq!(ok.last_insert_id, 300);
        assert!(ok.status_flags.contains(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT));
        assert_eq!(ok.warnings, 1);
    }

    #[test]
    fn test_err_payload() {
        let mut payload = vec![0xFF, 0x7A, 0x04, b'#'];
        payload.extend_from_slice(b"42S02");
        payload.extend_from_slice(b"Table 'test.nope' doesn't exist");
        let err = ErrPayload::try_from(ErrPayloadBytes(&payload)).unwrap();
        assert_eq!(err.error_code, 1146);
        assert_eq!(err.sql_state, "42S02");
        assert_eq!(err.message, "Table 'test.nope' doesn't exist");
        assert_eq!(
            err.to_string(),
            "ERROR 1146 (42S02): Table 'test.nope' doesn't exist"
        );
    }

    #[test]
    fn test_eof_payload() {
        let eof = EofPayload::try_from(EofPayloadBytes(&[0xFE, 0x03, 0x00, 0x22, 0x00])).unwrap();
        assert_eq!(eof.warnings, 3);
        assert!(eof.status_flags.contains(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT));

        assert!(matches!(
            EofPayload::try_from(EofPayloadBytes(&[0xFE, 0x03])),
            Err(Error::UnexpectedEof)
        ));
        assert!(matches!(
            EofPayload::try_from(EofPayloadBytes(&[0x00, 0, 0, 0, 0])),
            Err(Error::InvalidPacket)
        ));
    }

    #[test]
    fn test_terminating_ok_with_fe_header() {
        // 7 bytes, so it also passes the classic EOF length check
        let payload = [0xFE, 0x00, 0x00, 0x02, 0x00, 0x03, 0x00];
        assert!(is_eof_packet(&payload));
        let ok = OkPayload::try_from(OkPayloadBytes(&payload)).unwrap();
        assert_eq!(ok.warnings, 3);
        assert!(ok.status_flags.contains(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT));
    }

    #[test]
    fn test_eof_detection() {
        assert!(is_eof_packet(&[0xFE, 0x00, 0x00, 0x02, 0x00]));
        assert!(!is_eof_packet(&[0xFE; 9]));
        assert!(!is_eof_packet(&[0x00]));
        assert!(!is_eof_packet(&[]));
    }
}
