pub mod reader;
pub mod writer;

pub use reader::DecodeError;
pub use writer::EncodeError;

/// Largest message handled over plain UDP. Anything bigger is out of
/// contract and gets cut off by the receiving socket.
pub const PACKET_SIZE: usize = 4096;

#[derive(Clone)]
pub struct BytePacketBuffer {
    pub buf: [u8; PACKET_SIZE],
    /// Number of valid bytes in `buf`. Reads never go past this point.
    pub len: usize,
    pub pos: usize,
    /// Positions of names already written, for back-reference compression.
    pub(crate) writing_labels: std::collections::HashMap<String, usize>,
}

impl Default for BytePacketBuffer {
    /// This gives us a fresh buffer for holding the packet contents, and a
    /// field for keeping track of where we are.
    fn default() -> Self {
        BytePacketBuffer {
            buf: [0; PACKET_SIZE],
            len: 0,
            pos: 0,
            writing_labels: Default::default(),
        }
    }
}

impl BytePacketBuffer {
    /// Wrap the payload of a received datagram.
    pub fn new(buf: [u8; PACKET_SIZE], len: usize) -> Self {
        Self {
            buf,
            len,
            pos: 0,
            writing_labels: Default::default(),
        }
    }

    /// Current position within buffer
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The valid bytes of the message.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}
