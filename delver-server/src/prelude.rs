use std::net::SocketAddr;

/// Room for the biggest datagram the resolver handles.
pub const BUFFER_SIZE: usize = 4096;

pub struct Message {
    pub address: SocketAddr,
    pub buffer: [u8; BUFFER_SIZE],
    pub size: usize,
}

impl Message {
    /// The valid bytes of the datagram.
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.size]
    }
}
