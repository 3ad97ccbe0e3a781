//! # Mock Server Lifecycle
//!
//! Binds the listening socket, serves the assembled router on a background
//! task, and tears it down gracefully once replay is done.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Default cap on buffered request and response bodies (2 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Default time allowed for in-flight requests to finish at shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Listener configuration for the mock.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind. Port 0 picks an ephemeral port.
    pub bind: SocketAddr,
    /// Maximum body size buffered for validation.
    pub body_limit: usize,
    /// How long `shutdown` waits for in-flight requests.
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    /// Loopback on `port` with default limits.
    pub fn local(port: u16) -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], port)),
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            body_limit: DEFAULT_BODY_LIMIT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Lifecycle failures of the mock server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The socket could not be bound.
    #[error("cannot bind mock server to {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The serve loop stopped with an error.
    #[error("mock server failed: {0}")]
    Serve(String),

    /// In-flight requests did not finish within the grace period.
    #[error("mock server did not shut down within {0:?}")]
    ShutdownTimedOut(Duration),
}

/// A running mock server.
///
/// Dropping the handle signals shutdown without waiting for it.
#[derive(Debug)]
pub struct MockServer {
    local_addr: SocketAddr,
    shutdown_grace: Duration,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl MockServer {
    /// Bind `config.bind` and start serving `app`.
    ///
    /// The router is fully built before this is called, so every route is
    /// registered before the first connection is accepted.
    pub async fn start(config: &ServerConfig, app: Router) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
        });

        tracing::info!(addr = %local_addr, "mock server listening");
        Ok(Self {
            local_addr,
            shutdown_grace: config.shutdown_grace,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Port actually bound.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Stop accepting connections and wait for in-flight requests.
    ///
    /// # Errors
    ///
    /// [`ServerError::ShutdownTimedOut`] if the grace period elapses first;
    /// the serve task keeps draining in the background. [`ServerError::Serve`]
    /// if the serve loop had failed.
    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            tx.send(()).ok();
        }
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.shutdown_grace, task).await {
            Err(_) => Err(ServerError::ShutdownTimedOut(self.shutdown_grace)),
            Ok(Err(join)) => Err(ServerError::Serve(join.to_string())),
            Ok(Ok(Err(io))) => Err(ServerError::Serve(io.to_string())),
            Ok(Ok(Ok(()))) => {
                tracing::info!(addr = %self.local_addr, "mock server stopped");
                Ok(())
            }
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            tx.send(()).ok();
        }
    }
}
