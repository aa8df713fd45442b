use delver_proto::buffer::{BytePacketBuffer, DecodeError, EncodeError};
use delver_proto::packet::header::Header;
use delver_proto::packet::question::Question;
use delver_proto::packet::{DnsPacket, Entry, QueryType};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt::Display;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    /// Name server every resolution starts from.
    #[serde(default = "Config::default_root")]
    pub root: SocketAddr,
    /// Port used when chasing referrals.
    #[serde(default = "Config::default_port")]
    pub port: u16,
    /// Seconds to wait for each upstream reply.
    #[serde(default = "Config::default_timeout")]
    pub timeout: u64,
    /// Upper bound on referral chains.
    #[serde(default = "Config::default_max_hops")]
    pub max_hops: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            port: Self::default_port(),
            timeout: Self::default_timeout(),
            max_hops: Self::default_max_hops(),
        }
    }
}

impl Config {
    pub fn default_root() -> SocketAddr {
        // a.root-servers.net
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(198, 41, 0, 4), 53))
    }

    pub fn default_port() -> u16 {
        53
    }

    pub fn default_timeout() -> u64 {
        10
    }

    pub fn default_max_hops() -> usize {
        8
    }
}

impl Config {
    pub async fn build(self) -> std::io::Result<RecursiveResolverService> {
        Ok(RecursiveResolverService {
            root: self.root,
            port: self.port,
            timeout: Duration::from_secs(self.timeout),
            max_hops: self.max_hops,
        })
    }
}

#[derive(Debug)]
pub enum ResolveError {
    Encode(EncodeError),
    Decode(DecodeError),
    Io(std::io::Error),
    /// No reply from the target within the per-attempt deadline.
    UpstreamTimeout,
    /// The referral chain exceeded the hop budget.
    ReferralLoop,
    /// A referral carrying neither glue nor name servers.
    EmptyReferral,
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(inner) => write!(f, "couldn't encode query: {inner}"),
            Self::Decode(inner) => write!(f, "malformed message: {inner}"),
            Self::Io(inner) => write!(f, "upstream exchange failed: {inner}"),
            Self::UpstreamTimeout => write!(f, "no reply from upstream server"),
            Self::ReferralLoop => write!(f, "referral chain too long"),
            Self::EmptyReferral => write!(f, "referral without name servers"),
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<EncodeError> for ResolveError {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<DecodeError> for ResolveError {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<std::io::Error> for ResolveError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// A successful resolution: the parsed reply and its raw bytes, the
/// upstream transaction id still in front.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub packet: DnsPacket,
    pub bytes: Vec<u8>,
}

#[async_trait::async_trait]
pub trait ResolverService {
    async fn resolve(&self, query: &[u8]) -> Result<Resolution, ResolveError>;
}

pub struct RecursiveResolverService {
    root: SocketAddr,
    port: u16,
    timeout: Duration,
    max_hops: usize,
}

impl RecursiveResolverService {
    /// One request/reply exchange with a name server. The query goes out
    /// under a fresh random transaction id.
    async fn exchange(
        &self,
        socket: &UdpSocket,
        query: &[u8],
        target: SocketAddr,
    ) -> Result<(DnsPacket, Vec<u8>), ResolveError> {
        let mut message = query.to_vec();
        let id: u16 = rand::random();
        message[..2].copy_from_slice(&id.to_be_bytes());
        socket.send_to(&message, target).await?;

        let mut buffer = BytePacketBuffer::default();
        let received = tokio::time::timeout(self.timeout, socket.recv_from(&mut buffer.buf)).await;
        let (size, _) = match received {
            Ok(result) => result?,
            Err(_) => return Err(ResolveError::UpstreamTimeout),
        };
        buffer.len = size;
        tracing::debug!("received {size} bytes from {target}");

        let bytes = buffer.bytes().to_vec();
        let packet = DnsPacket::try_from(buffer)?;
        Ok((packet, bytes))
    }

    /// Walk the delegation hierarchy from the root until a server answers.
    ///
    /// Every upstream exchange, nested name server lookups included, takes
    /// one hop from the same per-resolution counter.
    fn walk<'a>(
        &'a self,
        socket: &'a UdpSocket,
        query: &'a [u8],
        hops: &'a mut usize,
    ) -> BoxFuture<'a, Result<Resolution, ResolveError>> {
        async move {
            let mut target = self.root;
            loop {
                if *hops == 0 {
                    return Err(ResolveError::ReferralLoop);
                }
                *hops -= 1;

                let (packet, bytes) = self.exchange(socket, query, target).await?;

                if !packet.answers.is_empty() {
                    for record in packet.answers.iter().filter_map(Entry::record) {
                        tracing::debug!("answer: {record}");
                    }
                    return Ok(Resolution { packet, bytes });
                }

                if let Some(addr) = packet.glue() {
                    tracing::debug!("following glue to {addr}");
                    target = SocketAddr::from((addr, self.port));
                    continue;
                }

                let Some(host) = packet.referral() else {
                    return Err(ResolveError::EmptyReferral);
                };
                tracing::debug!("resolving name server {host}");
                let nested_query = build_query(host, QueryType::A)?;
                let nested = self.walk(socket, &nested_query, &mut *hops).await?;
                let Some(addr) = nested.packet.answer_a() else {
                    return Err(ResolveError::EmptyReferral);
                };
                target = SocketAddr::from((addr, self.port));
            }
        }
        .boxed()
    }
}

#[async_trait::async_trait]
impl ResolverService for RecursiveResolverService {
    #[tracing::instrument(skip_all)]
    async fn resolve(&self, query: &[u8]) -> Result<Resolution, ResolveError> {
        // one short lived socket per resolution, released on every exit path
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        let mut hops = self.max_hops;
        self.walk(&socket, query, &mut hops).await
    }
}

/// Encode a standard query: random id, flags zero, a single question.
fn build_query(host: &str, qtype: QueryType) -> Result<Vec<u8>, ResolveError> {
    let mut packet = DnsPacket::new(Header::question(rand::random()))
        .with_question(Question::new(host.to_string(), qtype));
    let buffer = packet.create_buffer()?;
    Ok(buffer.bytes().to_vec())
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockResolverService {
    inner: std::collections::HashMap<Vec<u8>, Vec<u8>>,
}

#[cfg(test)]
impl MockResolverService {
    /// Register the raw reply served for a question section.
    pub fn with_response(mut self, fingerprint: &[u8], bytes: Vec<u8>) -> Self {
        self.inner.insert(fingerprint.to_vec(), bytes);
        self
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl ResolverService for MockResolverService {
    async fn resolve(&self, query: &[u8]) -> Result<Resolution, ResolveError> {
        use delver_proto::buffer::PACKET_SIZE;
        use delver_proto::packet::header::HEADER_SIZE;

        let fingerprint = &query[HEADER_SIZE..];
        let Some(bytes) = self.inner.get(fingerprint) else {
            return Err(ResolveError::UpstreamTimeout);
        };
        let mut buf = [0u8; PACKET_SIZE];
        buf[..bytes.len()].copy_from_slice(bytes);
        let packet = DnsPacket::try_from(BytePacketBuffer::new(buf, bytes.len()))?;
        Ok(Resolution {
            packet,
            bytes: bytes.clone(),
        })
    }
}
