mod config;
mod error;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use clap::Parser;
use containarium_accounts::{HostAccountManager, HostAccountManagerConfig};
use containarium_api::{ApiState, ControlService, GrpcControlService};
use containarium_core::domain::DaemonConfig;
use containarium_core::CancellationToken;
use containarium_data::{
    AppRepository, CollaboratorRepository, DaemonConfigRepository, PassthroughRepository,
    RouteRepository, TrafficRepository,
};
use containarium_events::EventBus;
use containarium_lifecycle::{CollaboratorManager, ContainerLifecycleManager, CoreServicesBootstrap, CoreServicesSpec};
use containarium_proxy::{PacketTables, ProxyAdminClient, RouteReconciler};
use containarium_runtime::{locate_binary, CliRuntimeAdapter, RuntimeAdapter};
use containarium_security::{JwtConfig, JwtIssuer, OriginAllowList, DEFAULT_MAX_TOKEN_EXPIRY_HOURS};
use containarium_traffic::TrafficCollector;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::DaemonCliConfig;
use crate::error::DaemonError;

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
    let config = DaemonCliConfig::parse();
    init_tracing(&config.log_filter, &config.log_format);

    if let Err(err) = run(config).await {
        tracing::error!(error = %err, "daemon exited with error");
        return Err(err.into());
    }
    Ok(())
}

async fn run(config: DaemonCliConfig) -> Result<(), DaemonError> {
    let runtime_binary = locate_binary()?;
    let runtime: Arc<dyn RuntimeAdapter> = Arc::new(CliRuntimeAdapter::new(runtime_binary.clone()));

    info!("ensuring core service containers are present and healthy");
    let bootstrap = CoreServicesBootstrap::new(runtime.clone());
    bootstrap
        .ensure(&CoreServicesSpec {
            datastore_image: config.datastore_image.clone(),
            proxy_image: config.proxy_image.clone(),
            datastore_static_ip: config.datastore_static_ip.clone(),
            proxy_static_ip: config.proxy_static_ip.clone(),
        })
        .await?;

    let database_url = config.database_url_or_default();
    let pool = containarium_data::connect_and_migrate(&database_url).await?;

    let config_repo = DaemonConfigRepository::new(pool.clone());
    let persisted = config_repo.load().await?;
    let effective = DaemonConfig::merge(persisted, &config.overrides());
    config_repo.save(&effective).await?;
    info!(
        base_domain = %effective.base_domain,
        http_port = effective.http_port,
        grpc_port = effective.grpc_port,
        "effective daemon config"
    );

    let events = EventBus::new();

    let accounts = Arc::new(HostAccountManager::new(HostAccountManagerConfig {
        host_agent_unit: config.host_agent_unit.clone(),
        ..HostAccountManagerConfig::default()
    }));

    let lifecycle = Arc::new(ContainerLifecycleManager::new(
        runtime.clone(),
        accounts.clone(),
        events.clone(),
    ));

    let collaborator_repo = CollaboratorRepository::new(pool.clone(), events.clone());
    let collaborators = CollaboratorManager::new(runtime.clone(), accounts.clone(), collaborator_repo);

    let routes_repo = RouteRepository::new(pool.clone(), events.clone());
    let apps_repo = AppRepository::new(pool.clone(), events.clone());
    let passthrough_repo = PassthroughRepository::new(pool.clone(), events.clone());

    let control_service = Arc::new(ControlService::new(
        runtime.clone(),
        lifecycle.clone(),
        collaborators,
        routes_repo.clone(),
        apps_repo,
        passthrough_repo.clone(),
        config.host_ssh_public_key.clone(),
    ));

    let jwt_config = JwtConfig::new(config.jwt_secret.clone())
        .with_max_expiry_hours(config.max_token_expiry_hours.unwrap_or(DEFAULT_MAX_TOKEN_EXPIRY_HOURS));
    let jwt = Arc::new(JwtIssuer::new(jwt_config));
    let origins = Arc::new(OriginAllowList::from_csv(&config.allowed_origins));

    let reconciler_last_tick = Arc::new(AtomicI64::new(0));

    let api_state = ApiState {
        service: control_service,
        events: events.clone(),
        jwt,
        origins,
        base_domain: effective.base_domain.clone(),
        certs_dir: config.certs_dir.clone(),
        runtime_binary,
        home_root: config.home_root.clone(),
        sentinel_account: config.sentinel_account.clone(),
        db_pool: pool.clone(),
        reconciler_last_tick: reconciler_last_tick.clone(),
    };

    let cancellation = CancellationToken::new();
    let mut background_tasks = Vec::new();

    if effective.enable_rest {
        let addr: SocketAddr = format!("{}:{}", effective.listen_address, effective.http_port)
            .parse()
            .map_err(|e| DaemonError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
        let router = containarium_api::router(api_state.clone());
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let rest_cancellation = cancellation.clone();
        info!(%addr, "REST server listening");
        background_tasks.push(tokio::spawn(async move {
            let shutdown = async move { rest_cancellation.cancelled().await };
            if let Err(err) = axum::serve(listener, router).with_graceful_shutdown(shutdown).await {
                warn!(error = %err, "REST server exited");
            }
        }));
    }

    let grpc_addr: SocketAddr = format!("{}:{}", effective.listen_address, effective.grpc_port)
        .parse()
        .map_err(|e| DaemonError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
    let grpc_service = GrpcControlService::new(api_state.service.clone());
    let grpc_server = containarium_api::proto::control_service_server::ControlServiceServer::new(grpc_service);
    let grpc_cancellation = cancellation.clone();
    info!(%grpc_addr, "gRPC server listening");
    background_tasks.push(tokio::spawn(async move {
        let shutdown = async move { grpc_cancellation.cancelled().await };
        if let Err(err) = tonic::transport::Server::builder()
            .add_service(grpc_server)
            .serve_with_shutdown(grpc_addr, shutdown)
            .await
        {
            warn!(error = %err, "gRPC server exited");
        }
    }));

    let admin = ProxyAdminClient::new(config.proxy_admin_url.clone(), config.proxy_server_name.clone());
    let packet_tables = PacketTables::new(config.container_cidr.clone());
    let reconciler = RouteReconciler::new(
        routes_repo,
        passthrough_repo,
        admin,
        packet_tables,
        effective.base_domain.clone(),
    );
    let reconciler_cancellation = cancellation.clone();
    background_tasks.push(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = reconciler_cancellation.cancelled() => {
                    info!("route reconciler shutting down");
                    return;
                }
                _ = tokio::time::sleep(containarium_proxy::DEFAULT_TICK_INTERVAL) => {
                    match reconciler.tick().await {
                        Ok(()) => reconciler_last_tick.store(chrono::Utc::now().timestamp(), Ordering::Relaxed),
                        Err(err) => warn!(error = %err, "reconciler tick failed, will retry next tick"),
                    }
                }
            }
        }
    }));

    let traffic_repo = TrafficRepository::new(pool.clone());
    let traffic_collector = TrafficCollector::new(events.clone(), traffic_repo);
    let traffic_cancellation = cancellation.clone();
    background_tasks.push(tokio::spawn(async move {
        traffic_collector.run(traffic_cancellation).await;
    }));

    let signal_cancellation = cancellation.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        signal_cancellation.cancel();
    });

    cancellation.cancelled().await;

    // §5's graceful shutdown sequencing: let background tasks observe the
    // cancellation and exit before we tear down the connection pool under
    // them.
    for task in background_tasks {
        let _ = task.await;
    }
    pool.close().await;

    info!("daemon shut down cleanly");
    Ok(())
}
