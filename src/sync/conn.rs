use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use zerocopy::{FromZeros, IntoBytes};

use crate::buffer::BufferSet;
use crate::constant::{CapabilityFlags, CommandByte};
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::BinaryResultSetHandler;
use crate::protocol::command::prepared::{
    Exec, read_prepare_ok, write_close_statement, write_execute, write_prepare,
    write_reset_statement,
};
use crate::protocol::command::utility::write_bare_command;
use crate::protocol::connection::{Handshake, HandshakeConfig, HandshakeResult};
use crate::protocol::packet::{MAX_PAYLOAD_LEN, PacketHeader};
use crate::protocol::response::{ErrPayloadBytes, is_eof_packet};
use crate::protocol::r#trait::params::Params;

/// Server-side statement handle returned by `COM_STMT_PREPARE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedInfo {
    pub statement_id: u32,
    pub num_params: usize,
    pub num_columns: usize,
}

/// A blocking MySQL connection speaking the prepared-statement subset of the protocol
#[derive(Debug)]
pub struct Conn {
    stream: BufReader<TcpStream>,
    buffer_set: BufferSet,
    capability_flags: CapabilityFlags,
    server_version: String,
    connection_id: u32,
    /// Sequence id for the next packet written
    sequence_id: u8,
    /// Set when the stream position within the protocol is no longer known
    broken: bool,
}

impl Conn {
    /// Create a new MySQL connection from connection options
    pub fn new<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts: Opts = opts.try_into()?;

        if opts.host.is_empty() {
            return Err(Error::BadConfigError(
                "Missing host in connection options".to_string(),
            ));
        }

        let stream = TcpStream::connect((opts.host.as_str(), opts.port))?;
        stream.set_nodelay(opts.tcp_nodelay)?;
        stream.set_read_timeout(opts.read_timeout)?;
        stream.set_write_timeout(opts.write_timeout)?;

        Self::new_with_stream(stream, &opts)
    }

    /// Run the handshake on an already connected TCP stream
    #[tracing::instrument(skip_all)]
    pub fn new_with_stream(stream: TcpStream, opts: &Opts) -> Result<Self> {
        let mut conn = Self {
            stream: BufReader::new(stream),
            buffer_set: BufferSet::new(),
            capability_flags: CapabilityFlags::empty(),
            server_version: String::new(),
            connection_id: 0,
            sequence_id: 0,
            broken: false,
        };

        let mut handshake = Handshake::new(HandshakeConfig {
            username: opts.user.clone(),
            password: opts.password.clone(),
            database: opts.db.clone(),
            capabilities: opts.capabilities,
        });

        loop {
            conn.read_packet()?;
            match handshake.drive(&conn.buffer_set.read_buffer)? {
                HandshakeResult::InitialHandshake {
                    handshake_response,
                    initial_handshake,
                } => {
                    conn.server_version = initial_handshake.server_version;
                    conn.connection_id = initial_handshake.connection_id;
                    conn.buffer_set
                        .start_payload()
                        .extend_from_slice(&handshake_response);
                    conn.write_payload()?;
                }
                HandshakeResult::Write(packet) => {
                    conn.buffer_set.start_payload().extend_from_slice(&packet);
                    conn.write_payload()?;
                }
                HandshakeResult::NeedPayload => {}
                HandshakeResult::Connected { capability_flags } => {
                    conn.capability_flags = capability_flags;
                    break;
                }
            }
        }

        tracing::debug!(
            server_version = %conn.server_version,
            connection_id = conn.connection_id,
            "connected"
        );
        Ok(conn)
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Get the negotiated capability flags
    pub fn capability_flags(&self) -> CapabilityFlags {
        self.capability_flags
    }

    /// Get the connection ID assigned by the server
    pub fn connection_id(&self) -> u64 {
        u64::from(self.connection_id)
    }

    /// Whether an earlier I/O or framing failure left the connection unusable
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.broken {
            return Err(Error::ConnectionBroken);
        }
        Ok(())
    }

    fn deprecate_eof(&self) -> bool {
        self.capability_flags
            .contains(CapabilityFlags::CLIENT_DEPRECATE_EOF)
    }

    /// Read the next payload into the read buffer
    fn read_packet(&mut self) -> Result<()> {
        match read_payload(&mut self.stream, &mut self.buffer_set.read_buffer) {
            Ok(last_sequence_id) => {
                self.sequence_id = last_sequence_id.wrapping_add(1);
                Ok(())
            }
            Err(err) => {
                self.broken = true;
                Err(err)
            }
        }
    }

    /// Start a new command: sequence ids restart at zero
    fn new_command(&mut self) -> &mut Vec<u8> {
        self.sequence_id = 0;
        self.buffer_set.start_payload()
    }

    /// Write the payload in the write buffer, splitting it into 16MB packets if necessary
    #[tracing::instrument(skip_all)]
    fn write_payload(&mut self) -> Result<()> {
        let result = self.write_packets();
        if result.is_err() {
            self.broken = true;
        }
        result
    }

    fn write_packets(&mut self) -> Result<()> {
        let payload_len = self.buffer_set.payload().len();
        let stream = self.stream.get_mut();

        if payload_len < MAX_PAYLOAD_LEN {
            stream.write_all(self.buffer_set.single_packet(self.sequence_id))?;
            self.sequence_id = self.sequence_id.wrapping_add(1);
        } else {
            for chunk in self.buffer_set.payload().chunks(MAX_PAYLOAD_LEN) {
                let header = PacketHeader::encode(chunk.len(), self.sequence_id);
                self.sequence_id = self.sequence_id.wrapping_add(1);
                stream.write_all(header.as_bytes())?;
                stream.write_all(chunk)?;
            }
            // a payload that is an exact multiple of the packet size ends with an empty packet
            if payload_len % MAX_PAYLOAD_LEN == 0 {
                let header = PacketHeader::encode(0, self.sequence_id);
                self.sequence_id = self.sequence_id.wrapping_add(1);
                stream.write_all(header.as_bytes())?;
            }
        }

        stream.flush()?;
        Ok(())
    }

    /// Prepare `sql` on the server
    ///
    /// Parameter and column definitions sent with the response are skipped.
    #[tracing::instrument(skip_all)]
    pub fn prepare(&mut self, sql: &str) -> Result<PreparedInfo> {
        self.ensure_usable()?;
        write_prepare(self.new_command(), sql);
        self.write_payload()?;

        self.read_packet()?;
        let prepare_ok = match read_prepare_ok(&self.buffer_set.read_buffer) {
            Ok(prepare_ok) => prepare_ok,
            Err(err) => {
                // an ERR packet is the whole response
                if !matches!(err, Error::ServerError(_)) {
                    self.broken = true;
                }
                return Err(err);
            }
        };
        let info = PreparedInfo {
            statement_id: prepare_ok.statement_id(),
            num_params: usize::from(prepare_ok.num_params()),
            num_columns: usize::from(prepare_ok.num_columns()),
        };

        for count in [info.num_params, info.num_columns] {
            if count == 0 {
                continue;
            }
            for _ in 0..count {
                self.read_packet()?;
            }
            if !self.deprecate_eof() {
                self.read_packet()?;
                if !is_eof_packet(&self.buffer_set.read_buffer) {
                    self.broken = true;
                    return Err(Error::InvalidPacket);
                }
            }
        }

        tracing::debug!(
            statement_id = info.statement_id,
            num_params = info.num_params,
            num_columns = info.num_columns,
            "prepared"
        );
        Ok(info)
    }

    /// Execute a prepared statement, forwarding the response to `handler`
    ///
    /// If the handler fails, the rest of the response is still drained so the
    /// connection stays usable, and the handler's error is returned. A malformed row
    /// is skipped the same way; a malformed packet anywhere else breaks the connection.
    #[tracing::instrument(skip_all)]
    pub fn exec<P, H>(&mut self, statement_id: u32, params: &P, handler: &mut H) -> Result<()>
    where
        P: Params + ?Sized,
        H: BinaryResultSetHandler + ?Sized,
    {
        self.ensure_usable()?;
        write_execute(self.new_command(), statement_id, params);
        self.write_payload()?;

        let mut exec = Exec::new(self.deprecate_eof());
        let mut handler_error = None;

        loop {
            self.read_packet()?;
            let result = match exec.drive(&self.buffer_set.read_buffer) {
                Ok(result) => result,
                // an ERR packet ends the response
                Err(err @ Error::ServerError(_)) => return Err(err),
                Err(err) => {
                    self.discard_response(&exec)?;
                    return Err(err);
                }
            };
            let finished = result.is_terminal();
            if handler_error.is_none()
                && let Err(err) = result.dispatch(handler)
            {
                handler_error = Some(err);
            }
            if finished {
                break;
            }
        }

        match handler_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Skip the rest of a response that failed to parse
    ///
    /// Rows are skipped up to the terminator or an ERR packet. Before the rows start,
    /// the stream position is unknown and the connection is marked broken instead.
    fn discard_response(&mut self, exec: &Exec) -> Result<()> {
        if !exec.is_reading_rows() {
            self.broken = true;
            return Ok(());
        }
        tracing::warn!("discarding the rest of a malformed result set");
        loop {
            self.read_packet()?;
            if matches!(self.buffer_set.read_buffer.first(), Some(0xFE | 0xFF)) {
                return Ok(());
            }
        }
    }

    /// Deallocate a prepared statement. The server sends no response.
    #[tracing::instrument(skip_all)]
    pub fn close_statement(&mut self, statement_id: u32) -> Result<()> {
        self.ensure_usable()?;
        write_close_statement(self.new_command(), statement_id);
        self.write_payload()
    }

    /// Reset the server-side state of a prepared statement
    #[tracing::instrument(skip_all)]
    pub fn reset_statement(&mut self, statement_id: u32) -> Result<()> {
        self.ensure_usable()?;
        write_reset_statement(self.new_command(), statement_id);
        self.write_payload()?;
        self.read_ok()
    }

    /// Send a ping to the server to check if the connection is alive
    pub fn ping(&mut self) -> Result<()> {
        self.ensure_usable()?;
        write_bare_command(self.new_command(), CommandByte::Ping);
        self.write_payload()?;
        self.read_ok()
    }

    fn read_ok(&mut self) -> Result<()> {
        self.read_packet()?;
        match self.buffer_set.read_buffer.first() {
            Some(0x00) => Ok(()),
            Some(0xFF) => Err(ErrPayloadBytes(&self.buffer_set.read_buffer).into()),
            _ => Err(Error::InvalidPacket),
        }
    }
}

impl Drop for Conn {
    fn drop(&mut self) {
        // handshake never completed, or the server would misread the packet
        if self.capability_flags.is_empty() || self.broken {
            return;
        }
        write_bare_command(self.new_command(), CommandByte::Quit);
        if let Err(err) = self.write_payload() {
            tracing::debug!(%err, "failed to send COM_QUIT");
        }
    }
}

/// Read a complete MySQL payload, concatenating packets if they span multiple 16MB chunks
/// Returns the sequence_id of the last packet read.
#[tracing::instrument(skip_all)]
pub fn read_payload<R: BufRead>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<u8> {
    buffer.clear();

    let mut header = PacketHeader::new_zeroed();
    let mut current_length = MAX_PAYLOAD_LEN;
    let mut sequence_id = 0;

    while current_length == MAX_PAYLOAD_LEN {
        reader.read_exact(header.as_mut_bytes())?;
        current_length = header.length();
        sequence_id = header.sequence_id;

        let start = buffer.len();
        buffer.resize(start + current_length, 0);
        reader.read_exact(&mut buffer[start..])?;
    }

    Ok(sequence_id)
}
