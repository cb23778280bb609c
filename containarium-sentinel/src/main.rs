use std::sync::Arc;

use clap::Parser;
use containarium_core::CancellationToken;
use containarium_sentinel::certs::CertCache;
use containarium_sentinel::config::SentinelConfig;
use containarium_sentinel::passthrough::{parse_forward_ports, PassthroughForwarder};
use containarium_sentinel::state_machine::Sentinel;
use containarium_sentinel::{certs, status};
use tracing_subscriber::EnvFilter;

fn init_tracing(filter: &str, format: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);
    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = SentinelConfig::parse();
    init_tracing(&config.log_filter, &config.log_format);

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("default rustls CryptoProvider already installed"))?;

    let fallback = certs::CertCache::load_fallback(&config.fallback_cert, &config.fallback_key)?;
    let cert_cache = Arc::new(CertCache::new(
        config.api_base_url.clone(),
        config.api_token.clone(),
        config.cert_cache_dir.clone(),
        fallback,
    ));
    if let Err(err) = cert_cache.sync().await {
        tracing::warn!(error = %err, "initial cert sync failed, starting on fallback only");
    }

    let forward_ports = parse_forward_ports(&config.forward_ports)?;
    let forwarder = PassthroughForwarder::new(config.container_cidr.clone(), forward_ports);

    let control_addr = config.control_addr.clone();
    let sentinel = Arc::new(Sentinel::new(config, forwarder, cert_cache));

    let status_router = status::router(sentinel.status_handle());
    let control_listener = tokio::net::TcpListener::bind(&control_addr).await?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(control_listener, status_router).await {
            tracing::error!(error = %err, "control status server exited");
        }
    });

    let cancellation = CancellationToken::new();
    let shutdown_token = cancellation.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_token.cancel();
    });

    sentinel.run(cancellation).await;
    Ok(())
}
