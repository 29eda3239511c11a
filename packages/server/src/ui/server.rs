//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use chrono::FixedOffset;
use survivors_shared::time::{Clock, SystemClock, offset_from_hours};
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;

use crate::{
    config::RelayConfig,
    domain::{ConnectionRegistry, IdentityProvider, TokenVerifier},
    infrastructure::{
        auth::{DisabledTokenVerifier, JwtTokenVerifier},
        cache::{DisplayNameCache, MerchandiseCache},
        registry::InMemoryConnectionRegistry,
    },
    usecase::{
        DisplayNameResolver, EnvelopeRouter, ForwardActionUseCase, HeartbeatMonitor, JoinUseCase,
        MessageBus, RateLimiter, StorekeeperUseCase, TrustGate,
    },
};

use super::{
    handler::{health_check, not_found, service_info, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Relay server
///
/// Owns the whole object graph of the relay: one registry, one rate limiter
/// and one set of caches per server.
///
/// # Example
///
/// ```ignore
/// let server = Server::from_config(RelayConfig::default(), Arc::new(NoopIdentityProvider));
/// server.run().await?;
/// ```
pub struct Server {
    config: RelayConfig,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    registry: Arc<dyn ConnectionRegistry>,
    router: Arc<EnvelopeRouter>,
    heartbeat: Arc<HeartbeatMonitor>,
    merchandise: Arc<MerchandiseCache>,
}

impl Server {
    /// Build a server on the system clock.
    pub fn from_config(config: RelayConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::new(config, identity, Arc::new(SystemClock))
    }

    pub fn new(
        config: RelayConfig,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let offset = offset_from_hours(config.utc_offset_hours);

        // 1. Registry and caches
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryConnectionRegistry::new());
        let display_names = Arc::new(DisplayNameCache::new());
        let merchandise = Arc::new(MerchandiseCache::new(clock.clone(), offset));

        // 2. Token verification
        let verifier: Arc<dyn TokenVerifier> = match config.jwt_secret() {
            Some(secret) => Arc::new(JwtTokenVerifier::new(secret)),
            None => {
                tracing::warn!("No extension secret configured, every token will be rejected");
                Arc::new(DisabledTokenVerifier)
            }
        };

        // 3. UseCases
        let bus = Arc::new(MessageBus::new(registry.clone(), display_names.clone()));
        let resolver = Arc::new(DisplayNameResolver::new(display_names, identity));
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_per_second,
            clock.clone(),
        ));
        let router = Arc::new(EnvelopeRouter::new(
            registry.clone(),
            bus.clone(),
            TrustGate::new(verifier),
            rate_limiter.clone(),
            merchandise.clone(),
            JoinUseCase::new(registry.clone(), bus.clone(), resolver.clone()),
            StorekeeperUseCase::new(bus.clone(), merchandise.clone()),
            ForwardActionUseCase::new(registry.clone(), bus, resolver),
        ));
        let heartbeat = Arc::new(HeartbeatMonitor::new(
            registry.clone(),
            rate_limiter,
            config.heartbeat_interval,
        ));

        Self {
            config,
            clock,
            offset,
            registry,
            router,
            heartbeat,
            merchandise,
        }
    }

    /// Bind to the configured host and port and serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the address or if
    /// there's an error during server execution.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let heartbeat_task = self.heartbeat.clone().start(shutdown_rx.clone());
        let midnight_task = self.merchandise.spawn_midnight_reset(shutdown_rx);

        let app_state = Arc::new(AppState {
            router: self.router,
            registry: self.registry.clone(),
            clock: self.clock.clone(),
            started_at: self.clock.now_millis(),
            offset: self.offset,
            max_message_size: self.config.max_message_size,
        });

        let app = Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/health", get(health_check))
            .route("/", get(service_info))
            .fallback(not_found)
            .layer(TraceLayer::new_for_http())
            .with_state(app_state);

        tracing::info!("Relay listening on {}", listener.local_addr()?);

        let registry = self.registry;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let _ = shutdown_tx.send(true);
                // Upgraded sockets outlive the HTTP connection; close them explicitly
                for connection in registry.connections().await {
                    connection.terminate();
                }
            })
            .await?;

        if let Some(task) = heartbeat_task {
            let _ = task.await;
        }
        let _ = midnight_task.await;
        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
