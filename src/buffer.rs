use zerocopy::IntoBytes;

use crate::protocol::packet::PacketHeader;

const HEADER_LEN: usize = 4;

/// Read and write buffers a `Conn` reuses across commands
///
/// The write buffer starts with a slot for the packet header, so a payload that fits
/// in one packet is framed in place and sent with a single write.
#[derive(Debug)]
pub struct BufferSet {
    /// Payload of the last packet read, joined across 16MB splits
    pub read_buffer: Vec<u8>,
    write_buffer: Vec<u8>,
}

impl BufferSet {
    pub fn new() -> Self {
        Self {
            read_buffer: Vec::new(),
            write_buffer: vec![0; HEADER_LEN],
        }
    }

    /// Discard the previous outgoing payload and return the buffer to append the next one to
    pub fn start_payload(&mut self) -> &mut Vec<u8> {
        self.write_buffer.clear();
        self.write_buffer.resize(HEADER_LEN, 0);
        &mut self.write_buffer
    }

    pub fn payload(&self) -> &[u8] {
        self.write_buffer.get(HEADER_LEN..).unwrap_or_default()
    }

    /// Fill the header slot and return the framed packet
    ///
    /// Only valid for payloads shorter than `MAX_PAYLOAD_LEN`.
    pub fn single_packet(&mut self, sequence_id: u8) -> &[u8] {
        let header = PacketHeader::encode(self.payload().len(), sequence_id);
        if let Some(slot) = self.write_buffer.first_chunk_mut::<HEADER_LEN>() {
            slot.copy_from_slice(header.as_bytes());
        }
        &self.write_buffer
    }
}
