use super::error::HandleError;
use crate::repository::cache::CacheService;
use crate::repository::resolver::ResolverService;
use delver_proto::packet::header::HEADER_SIZE;
use delver_server::prelude::{Message, BUFFER_SIZE};
use std::sync::Arc;

pub(crate) struct DnsHandler {
    cache: Arc<dyn CacheService + Send + Sync>,
    resolver: Arc<dyn ResolverService + Send + Sync>,
}

impl DnsHandler {
    pub fn new(
        cache: Arc<dyn CacheService + Send + Sync>,
        resolver: Arc<dyn ResolverService + Send + Sync>,
    ) -> Self {
        Self { cache, resolver }
    }
}

impl DnsHandler {
    async fn try_handle(&self, query: &[u8]) -> Result<Vec<u8>, HandleError> {
        if query.len() <= HEADER_SIZE {
            return Err(HandleError::EmptyQuery);
        }

        // the question bytes identify the query, whatever transaction id
        // the client picked
        let fingerprint = &query[HEADER_SIZE..];

        if let Some(body) = self.cache.request(fingerprint).await {
            tracing::debug!("found in cache");
            let mut reply = Vec::with_capacity(2 + body.len());
            reply.extend_from_slice(&query[..2]);
            reply.extend_from_slice(&body);
            return Ok(reply);
        }

        tracing::debug!("not found in cache, resolving");
        let resolution = self.resolver.resolve(query).await?;

        let ttl = resolution.packet.answer_ttl().unwrap_or(0);
        self.cache
            .persist(fingerprint, &resolution.bytes[2..], ttl)
            .await;

        // hand the raw reply back under the id the client knows
        let mut reply = resolution.bytes;
        reply[..2].copy_from_slice(&query[..2]);
        Ok(reply)
    }
}

#[async_trait::async_trait]
impl delver_server::Handler for DnsHandler {
    #[tracing::instrument(skip_all, fields(origin = ?message.address, id = tracing::field::Empty))]
    async fn handle(&self, message: Message) -> Option<Message> {
        let query = message.bytes();
        if query.len() >= 2 {
            let id = u16::from_be_bytes([query[0], query[1]]);
            tracing::Span::current().record("id", id);
        }

        match self.try_handle(query).await {
            Ok(reply) if reply.len() <= BUFFER_SIZE => {
                let mut buffer = [0u8; BUFFER_SIZE];
                buffer[..reply.len()].copy_from_slice(&reply);
                Some(Message {
                    address: message.address,
                    buffer,
                    size: reply.len(),
                })
            }
            Ok(_) => {
                tracing::warn!("dropping oversized reply");
                None
            }
            Err(HandleError::EmptyQuery) => {
                tracing::debug!("dropping short datagram");
                None
            }
            Err(HandleError::Resolve(error)) => {
                tracing::warn!("unable to resolve query: {error}");
                None
            }
        }
    }
}
