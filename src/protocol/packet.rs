use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Largest payload a single packet can carry; longer payloads continue in the next packet
pub const MAX_PAYLOAD_LEN: usize = 0xFF_FFFF;

/// MySQL packet header (zero-copy)
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn encode(length: usize, sequence_id: u8) -> Self {
        let len = (length as u32).to_le_bytes();
        Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        }
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = PacketHeader::encode(0x01_0203, 7);
        assert_eq!(header.as_bytes(), &[0x03, 0x02, 0x01, 7]);
        assert_eq!(header.length(), 0x01_0203);

        let parsed = PacketHeader::ref_from_bytes(&[0xFF, 0xFF, 0xFF, 2]).unwrap();
        assert_eq!(parsed.length(), MAX_PAYLOAD_LEN);
        assert_eq!(parsed.sequence_id, 2);
    }
}
