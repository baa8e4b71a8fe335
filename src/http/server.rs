//! Ephemeral responder.
//!
//! # Responsibilities
//! - Bind the validation backend port before the ingress is touched
//! - Answer every request (or one configured path) with 200 and a fixed body
//! - Stop on the shutdown broadcast once the run ends
//!
//! # Design Decisions
//! - Binding and serving are separate so a port clash fails the run early
//! - No state beyond the response body

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ResponderConfig;

/// A bound, not yet serving, responder.
pub struct Responder {
    listener: TcpListener,
    addr: SocketAddr,
    router: Router,
}

impl Responder {
    /// Bind `bind_address` and prepare the router from `config`.
    pub async fn bind(bind_address: &str, config: &ResponderConfig) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(bind_address).await?;
        let addr = listener.local_addr()?;

        tracing::info!(address = %addr, path = ?config.path, "Responder bound");

        Ok(Self {
            listener,
            addr,
            router: Self::router(config),
        })
    }

    /// Build the responder router.
    ///
    /// The configured path is compared literally against the request path,
    /// never parsed as a route pattern.
    #[allow(deprecated)]
    pub fn router(config: &ResponderConfig) -> Router {
        let reply = Reply {
            body: Arc::from(config.body.as_str()),
            path: config.path.as_deref().map(Arc::from),
        };

        Router::new()
            .fallback(respond)
            .with_state(reply)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start serving until `shutdown` fires.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> ResponderHandle {
        let addr = self.addr;
        tracing::info!(address = %addr, "Starting the responder");

        let task = tokio::spawn(async move {
            let result = axum::serve(self.listener, self.router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.recv().await;
                })
                .await;
            tracing::info!(address = %addr, "Responder stopped");
            result
        });

        ResponderHandle { addr, task }
    }
}

/// A serving responder.
pub struct ResponderHandle {
    addr: SocketAddr,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl ResponderHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server task to finish.
    pub async fn join(self) {
        match self.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(address = %self.addr, error = %e, "Responder failed"),
            Err(e) => tracing::error!(address = %self.addr, error = %e, "Responder task panicked"),
        }
    }
}

#[derive(Clone)]
struct Reply {
    body: Arc<str>,
    path: Option<Arc<str>>,
}

async fn respond(State(reply): State<Reply>, uri: Uri) -> Response {
    match &reply.path {
        Some(path) if uri.path() != &**path => StatusCode::NOT_FOUND.into_response(),
        _ => (StatusCode::OK, reply.body.to_string()).into_response(),
    }
}
