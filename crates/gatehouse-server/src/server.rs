//! The HTTP listener and gateway wiring.
//!
//! One [`GatewayServer`] owns the whole request path: it accepts
//! connections, buffers each request body, answers management paths
//! directly, and hands everything else to the interceptor pipeline with
//! the forwarder as the terminal.

use crate::management::Management;
use gatehouse_config::{default_rules, ConfigError, GatewayConfig, RulesFile, RulesWatcher};
use gatehouse_core::{envelope, RequestContext, Response};
use gatehouse_pipeline::stages::{
    AdmissionControl, AuthGate, CorsShortCircuit, RequestLog, ResponseLog, StatisticsStage,
    TokenVerifier,
};
use gatehouse_pipeline::{FixedWindowLimiter, Pipeline, StatisticsAggregator};
use gatehouse_proxy::{Forwarder, RuleError, RuleStore, StaticRegistry};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::PrometheusHandle;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const BODY_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

/// Fatal server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}")]
    Bind {
        /// The configured address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration or rules loading failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The initial rule set failed validation.
    #[error(transparent)]
    Rules(#[from] RuleError),
}

/// The assembled gateway: listener configuration, pipeline, forwarder
/// and management surface.
pub struct GatewayServer {
    bind_address: SocketAddr,
    pipeline: Arc<Pipeline>,
    forwarder: Forwarder,
    store: Arc<RuleStore>,
    management: Arc<Management>,
    rules_file: Option<PathBuf>,
}

impl GatewayServer {
    /// Wires the full gateway from configuration.
    ///
    /// Loads the rules file (or the built-in defaults), builds the rule
    /// store, registry, limiter and statistics, and assembles the
    /// interceptor chain in its fixed order.
    pub fn build(
        config: &GatewayConfig,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, ServerError> {
        let rules = match &config.rules_file {
            Some(path) => RulesFile::load(path)?,
            None => default_rules(),
        };

        let store = Arc::new(RuleStore::new(rules.rule_set())?);
        let limiter = Arc::new(FixedWindowLimiter::new());
        let statistics = Arc::new(StatisticsAggregator::new());

        let mut registry = StaticRegistry::new();
        for (service, instances) in &rules.services {
            registry = registry.with_service(service.clone(), instances.clone());
        }
        let forwarder = Forwarder::new(Arc::clone(&store), Arc::new(registry));

        let pipeline = Arc::new(
            Pipeline::builder()
                .register(CorsShortCircuit::new())
                .register(RequestLog::new())
                .register(AuthGate::new(
                    TokenVerifier::new(&config.jwt_secret),
                    Arc::clone(&store),
                ))
                .register(AdmissionControl::new(Arc::clone(&store), limiter))
                .register(StatisticsStage::new(Arc::clone(&statistics)))
                .register(ResponseLog::new())
                .build(),
        );

        let management = Arc::new(Management::new(
            Arc::clone(&pipeline),
            statistics,
            metrics,
        ));

        Ok(Self {
            bind_address: config.bind_address,
            pipeline,
            forwarder,
            store,
            management,
            rules_file: config.rules_file.clone(),
        })
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Serves connections from an already-bound listener until
    /// `shutdown` resolves, then drains in-flight connections.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send,
    ) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "gateway listening");
        }

        self.spawn_reload_task();

        let server = Arc::new(self);
        let (conn_tx, mut conn_rx) = mpsc::channel::<()>(1);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = conn_tx.clone();
                            tokio::spawn(async move {
                                server.handle_connection(stream, remote_addr).await;
                                drop(token);
                            });
                        }
                        Err(err) => {
                            error!(error = %err, "failed to accept connection");
                        }
                    }
                }
                () = &mut shutdown => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        // Wait for every connection task to drop its sender.
        drop(conn_tx);
        if tokio::time::timeout(SHUTDOWN_DRAIN, conn_rx.recv())
            .await
            .is_err()
        {
            warn!("drain timeout reached with connections still active");
        }

        info!("gateway stopped");
        Ok(())
    }

    fn spawn_reload_task(&self) {
        let Some(path) = self.rules_file.clone() else {
            return;
        };
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            let mut watcher = match RulesWatcher::watch(&path) {
                Ok(watcher) => watcher,
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "rules hot-reload disabled");
                    return;
                }
            };

            while let Some(changed) = watcher.next_change().await {
                match RulesFile::load(&changed) {
                    Ok(file) => match store.replace(file.rule_set()) {
                        Ok(()) => info!(path = %changed.display(), "rules reloaded"),
                        Err(err) => {
                            warn!(error = %err, "reloaded rules rejected, keeping previous set");
                        }
                    },
                    Err(err) => {
                        warn!(error = %err, "rules file unreadable, keeping previous set");
                    }
                }
            }
        });
    }

    async fn handle_connection(self: &Arc<Self>, stream: tokio::net::TcpStream, remote: SocketAddr) {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(req, remote).await) }
        });

        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
            // Client disconnects surface here; they are routine.
            tracing::debug!(%remote, error = %err, "connection closed with error");
        }
    }

    async fn handle_request(
        self: &Arc<Self>,
        req: http::Request<Incoming>,
        remote: SocketAddr,
    ) -> Response {
        if let Some(response) = self.management.dispatch(req.method(), req.uri().path()) {
            return response;
        }

        let (parts, body) = req.into_parts();
        let body = match tokio::time::timeout(BODY_TIMEOUT, body.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(err)) => {
                warn!(error = %err, "failed to read request body");
                return envelope::reject(StatusCode::BAD_REQUEST, "failed to read request body");
            }
            Err(_) => {
                warn!("request body read timed out");
                return envelope::reject(StatusCode::REQUEST_TIMEOUT, "request body read timed out");
            }
        };
        let request = http::Request::from_parts(parts, Full::new(body));

        let mut ctx = RequestContext::new(Some(remote));
        let forwarder = self.forwarder.clone();
        self.pipeline
            .process(&mut ctx, request, move |ctx, req| {
                let correlation_id = ctx.correlation_id();
                Box::pin(async move { forwarder.dispatch(correlation_id, req).await })
            })
            .await
    }
}
