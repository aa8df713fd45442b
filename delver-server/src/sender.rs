use crate::prelude::Message;
use std::sync::Arc;
use tokio::net::UdpSocket;

#[derive(Debug)]
pub struct Sender {
    socket: Arc<UdpSocket>,
}

impl Sender {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }

    /// Write a reply datagram back to the client it belongs to.
    pub async fn send(&self, reply: &Message) -> std::io::Result<()> {
        let sent = self.socket.send_to(reply.bytes(), reply.address).await?;
        tracing::debug!("sent {sent} byte reply to {}", reply.address);
        Ok(())
    }
}
