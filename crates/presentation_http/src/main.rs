//! Bridge HTTP server
//!
//! Main entry point for the webhook relay between the messaging
//! gateway and the support inbox.

use std::future::{Future, IntoFuture};
use std::{sync::Arc, time::Duration};

use application::{DispatchService, GatewayPort, InboxPort, RelayService};
use integration_chatwoot::{ChatwootClient, ChatwootClientConfig};
use integration_zapi::{ZapiClient, ZapiClientConfig};
use presentation_http::{AppConfig, AppState, config::sanitize_base_url, create_router};
use tokio::sync::Notify;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bridge_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    info!(
        host = %config.server.host,
        port = %config.server.port,
        inbox_account = config.inbox.account_id,
        inbox_id = config.inbox.inbox_id,
        "Configuration loaded"
    );

    let gateway_client = ZapiClient::new(ZapiClientConfig {
        base_url: sanitize_base_url(&config.gateway.base_url),
        instance_id: config.gateway.instance_id.clone(),
        instance_token: config.gateway.instance_token.clone(),
        client_token: config.gateway.client_token.clone(),
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize gateway client: {e}"))?;

    let inbox_client = ChatwootClient::new(ChatwootClientConfig {
        base_url: sanitize_base_url(&config.inbox.base_url),
        access_token: config.inbox.access_token.clone(),
        account_id: config.inbox.account_id,
        inbox_id: config.inbox.inbox_id,
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize inbox client: {e}"))?;

    let inbox: Arc<dyn InboxPort> = Arc::new(inbox_client);
    let gateway: Arc<dyn GatewayPort> = Arc::new(gateway_client);

    let state = AppState {
        relay: Arc::new(RelayService::new(inbox, config.relay.to_policy())),
        dispatch: Arc::new(DispatchService::new(gateway)),
    };

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Server listening on http://{addr}");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs.unwrap_or(30));

    let drain_started = Arc::new(Notify::new());
    let drain_signal = Arc::clone(&drain_started);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        drain_signal.notify_one();
    });

    serve_with_deadline(server.into_future(), &drain_started, shutdown_timeout).await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Run the server, cutting the drain off once the grace period after
/// the shutdown signal has elapsed
async fn serve_with_deadline<S>(
    server: S,
    drain_started: &Notify,
    grace: Duration,
) -> std::io::Result<()>
where
    S: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(server);
    tokio::select! {
        result = &mut server => result,
        () = async {
            drain_started.notified().await;
            info!("Waiting up to {grace:?} for connections to close...");
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!("Shutdown grace period of {grace:?} expired, dropping open connections");
            Ok(())
        }
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM) and handle graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        // Log error but continue waiting - this is a best-effort signal handler
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
