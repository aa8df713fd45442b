use crate::repository::cache::CacheService;
use clap::Args;
use delver_server::UdpServer;
use std::sync::Arc;

/// Starts the resolver, the core of the machine
#[derive(Args, Debug)]
pub struct Command;

impl Command {
    pub async fn run(&self, config: crate::config::Config) {
        tracing::info!("preparing dns server");
        let cache_service = Arc::new(
            config
                .cache
                .build()
                .await
                .expect("unable to build cache service"),
        );
        let resolver_service = config
            .resolver
            .build()
            .await
            .expect("unable to build resolver service");
        let handler =
            crate::dns::handler::DnsHandler::new(cache_service.clone(), Arc::new(resolver_service));

        let address = config.dns.address();
        let server = UdpServer::new(address, handler);

        tokio::select! {
            result = server.run() => {
                result.expect("unable to run udp server");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
            }
        }

        // one snapshot per process, written on the way out
        if let Err(error) = cache_service.save().await {
            tracing::error!("couldn't save cache snapshot: {error}");
        }
    }
}
