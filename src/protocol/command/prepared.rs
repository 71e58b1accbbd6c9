use crate::constant::CommandByte;
use crate::error::{Error, Result};
use crate::protocol::BinaryRowPayload;
use crate::protocol::command::ColumnDefinitionBytes;
use crate::protocol::primitive::*;
use crate::protocol::response::{
    EofPayloadBytes, ErrPayloadBytes, OkPayloadBytes, ResultSetEnd, is_eof_packet,
};
use crate::protocol::r#trait::BinaryResultSetHandler;
use crate::protocol::r#trait::params::Params;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Prepared statement OK response (zero-copy)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct PrepareOk {
    statement_id: U32LE,
    num_columns: U16LE,
    num_params: U16LE,
    _reserved: u8,
    warning_count: U16LE,
}

impl PrepareOk {
    /// Get the statement ID
    pub fn statement_id(&self) -> u32 {
        self.statement_id.get()
    }

    /// Get the number of columns in the result set
    pub fn num_columns(&self) -> u16 {
        self.num_columns.get()
    }

    /// Get the number of parameters in the prepared statement
    pub fn num_params(&self) -> u16 {
        self.num_params.get()
    }

    /// Get the warning count
    pub fn warning_count(&self) -> u16 {
        self.warning_count.get()
    }
}

/// Write COM_STMT_PREPARE command
pub fn write_prepare(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::StmtPrepare as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Read COM_STMT_PREPARE response
pub fn read_prepare_ok(payload: &[u8]) -> Result<&PrepareOk> {
    match payload.first() {
        Some(0x00) => {}
        Some(0xFF) => return Err(ErrPayloadBytes(payload).into()),
        _ => return Err(Error::InvalidPacket),
    }
    PrepareOk::ref_from_prefix(&payload[1..])
        .map(|(ok, _)| ok)
        .map_err(|_| Error::InvalidPacket)
}

/// Write COM_STMT_EXECUTE command
pub fn write_execute<P: Params + ?Sized>(out: &mut Vec<u8>, statement_id: u32, params: &P) {
    write_int_1(out, CommandByte::StmtExecute as u8);
    write_int_4(out, statement_id);

    // flags (1 byte) - CURSOR_TYPE_NO_CURSOR
    write_int_1(out, 0x00);

    // iteration count (4 bytes) - always 1
    write_int_4(out, 1);

    if !params.is_empty() {
        params.write_null_bitmap(out);

        // new-params-bound-flag: types are resent on every execute
        write_int_1(out, 0x01);
        params.write_types(out);
        params.write_values(out);
    }
}

/// Write COM_STMT_CLOSE command
pub fn write_close_statement(out: &mut Vec<u8>, statement_id: u32) {
    write_int_1(out, CommandByte::StmtClose as u8);
    write_int_4(out, statement_id);
}

/// Write COM_STMT_RESET command
pub fn write_reset_statement(out: &mut Vec<u8>, statement_id: u32) {
    write_int_1(out, CommandByte::StmtReset as u8);
    write_int_4(out, statement_id);
}

// ============================================================================
// State Machine API for COM_STMT_EXECUTE responses
// ============================================================================

/// Event produced by one step of [`Exec`]
#[derive(Debug)]
pub enum ExecResult<'a> {
    /// Need more payload data
    NeedPayload,
    /// Execute returned OK (no result set)
    NoResultSet(OkPayloadBytes<'a>),
    /// Result set header with the column count
    ResultSetStart { num_columns: usize },
    /// One column definition packet (raw bytes)
    Column(ColumnDefinitionBytes<'a>),
    /// Row data received
    Row(BinaryRowPayload<'a>),
    /// Rows finished with the terminating OK or classic EOF packet
    Eof(ResultSetEnd<'a>),
}

/// State machine for reading a `COM_STMT_EXECUTE` response
///
/// Pure parsing state machine without I/O dependencies.
/// Each call to `drive()` accepts a payload with its own independent lifetime.
#[derive(Debug)]
pub enum Exec {
    /// Waiting for initial execute response
    Start { deprecate_eof: bool },
    /// Reading column definitions
    ReadingColumns {
        num_columns: usize,
        remaining: usize,
        deprecate_eof: bool,
    },
    /// Waiting for the classic EOF packet that follows column definitions
    ColumnsEof { num_columns: usize },
    /// Reading rows
    ReadingRows {
        num_columns: usize,
        deprecate_eof: bool,
    },
    /// Finished
    Finished,
}

impl Default for Exec {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Exec {
    /// `deprecate_eof` must match the negotiated `CLIENT_DEPRECATE_EOF` capability
    pub fn new(deprecate_eof: bool) -> Self {
        Self::Start { deprecate_eof }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Whether the column definitions are behind and only rows and the terminator remain
    pub fn is_reading_rows(&self) -> bool {
        matches!(self, Self::ReadingRows { .. })
    }

    /// Drive the state machine with the next payload
    pub fn drive<'a>(&mut self, payload: &'a [u8]) -> Result<ExecResult<'a>> {
        let Some(&header) = payload.first() else {
            return Err(Error::InvalidPacket);
        };
        if header == 0xFF {
            *self = Self::Finished;
            return Err(ErrPayloadBytes(payload).into());
        }

        match self {
            Self::Start { deprecate_eof } => {
                if header == 0x00 {
                    *self = Self::Finished;
                    return Ok(ExecResult::NoResultSet(OkPayloadBytes(payload)));
                }

                let (column_count, _rest) = read_int_lenenc(payload)?;
                let num_columns = usize::try_from(column_count).map_err(|_| Error::InvalidPacket)?;
                if num_columns == 0 {
                    return Err(Error::InvalidPacket);
                }
                *self = Self::ReadingColumns {
                    num_columns,
                    remaining: num_columns,
                    deprecate_eof: *deprecate_eof,
                };
                Ok(ExecResult::ResultSetStart { num_columns })
            }

            Self::ReadingColumns {
                num_columns,
                remaining,
                deprecate_eof,
            } => {
                *remaining -= 1;
                if *remaining == 0 {
                    let num_columns = *num_columns;
                    *self = if *deprecate_eof {
                        Self::ReadingRows {
                            num_columns,
                            deprecate_eof: true,
                        }
                    } else {
                        Self::ColumnsEof { num_columns }
                    };
                }
                Ok(ExecResult::Column(ColumnDefinitionBytes(payload)))
            }

            Self::ColumnsEof { num_columns } => {
                if !is_eof_packet(payload) {
                    return Err(Error::InvalidPacket);
                }
                *self = Self::ReadingRows {
                    num_columns: *num_columns,
                    deprecate_eof: false,
                };
                Ok(ExecResult::NeedPayload)
            }

            Self::ReadingRows {
                num_columns,
                deprecate_eof,
            } => match header {
                0x00 => Ok(ExecResult::Row(BinaryRowPayload::parse(
                    payload,
                    *num_columns,
                )?)),
                0xFE => {
                    let end = if *deprecate_eof {
                        ResultSetEnd::Ok(OkPayloadBytes(payload))
                    } else {
                        ResultSetEnd::Eof(EofPayloadBytes(payload))
                    };
                    *self = Self::Finished;
                    Ok(ExecResult::Eof(end))
                }
                _ => Err(Error::InvalidPacket),
            },

            Self::Finished => Err(Error::InvalidPacket),
        }
    }

    /// Drive the state machine and forward the event to `handler`.
    ///
    /// Returns `true` once the response is complete.
    pub fn feed<H>(&mut self, payload: &[u8], handler: &mut H) -> Result<bool>
    where
        H: BinaryResultSetHandler + ?Sized,
    {
        let result = self.drive(payload)?;
        let finished = result.is_terminal();
        result.dispatch(handler)?;
        Ok(finished)
    }
}

impl ExecResult<'_> {
    /// Whether this event ends the response
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NoResultSet(_) | Self::Eof(_))
    }

    /// Forward this event to the matching `handler` callback
    pub fn dispatch<H>(self, handler: &mut H) -> Result<()>
    where
        H: BinaryResultSetHandler + ?Sized,
    {
        match self {
            Self::NeedPayload => Ok(()),
            Self::NoResultSet(ok) => handler.no_result_set(ok),
            Self::ResultSetStart { num_columns } => handler.resultset_start(num_columns),
            Self::Column(col) => handler.col(col),
            Self::Row(row) => handler.row(&row),
            Self::Eof(eof) => handler.resultset_end(eof),
        }
    }
}
