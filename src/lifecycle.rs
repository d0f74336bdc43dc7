//! Server lifecycle: `Starting -> Accepting -> Draining -> Stopped`.
//!
//! - Binding is fatal on failure; there is no retry.
//! - On the shutdown signal the accept loop stops, every open connection is asked to
//!   shut down gracefully, and in-flight requests get the drain deadline to finish.
//!   Connections still open afterwards are aborted, which closes their sockets.
//! - Upgraded WebSocket connections leave the connection set once upgraded; their
//!   handlers close on `Draining` themselves.
//! - The current phase is published on a `watch` channel so the drain guard and
//!   WebSocket streams can react without polling.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ConnectInfo;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower_http::add_extension::AddExtension;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Starting,
    Accepting,
    Draining,
    Stopped,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Accepting => "accepting",
            Phase::Draining => "draining",
            Phase::Stopped => "stopped",
        }
    }
}

/// Shared handle on the lifecycle phase. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<Phase>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Phase::Starting);
        Self { tx: Arc::new(tx) }
    }

    pub fn phase(&self) -> Phase {
        *self.tx.borrow()
    }

    /// Requests may be admitted until draining starts.
    pub fn is_admitting(&self) -> bool {
        self.phase() < Phase::Draining
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.tx.subscribe()
    }

    /// Move forward to `next`. Backward moves are ignored; returns whether the phase changed.
    pub fn advance(&self, next: Phase) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
        if changed {
            info!(phase = next.as_str(), "lifecycle transition");
        }
        changed
    }

    /// Resolves once the phase is at least `target`.
    pub async fn reached(&self, target: Phase) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail while we wait.
        let _ = rx.wait_for(|phase| *phase >= target).await;
    }
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServeError> {
    TcpListener::bind(addr).await.map_err(|source| {
        error!(%addr, error = %source, "bind failed");
        ServeError::Bind { addr, source }
    })
}

/// Runs a router on a listener under the lifecycle rules above.
#[derive(Debug, Clone)]
pub struct Server {
    lifecycle: Lifecycle,
    drain_deadline: Duration,
}

/// How a completed drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed,
    /// Connections still open at the deadline were aborted.
    DeadlineElapsed,
}

impl Server {
    pub fn new(lifecycle: Lifecycle, drain_deadline: Duration) -> Self {
        Self {
            lifecycle,
            drain_deadline,
        }
    }

    /// Accept connections until `signal` resolves, then drain. Each connection runs
    /// in its own task so the drain can abort the stragglers.
    pub async fn serve<F>(&self, listener: TcpListener, router: Router, signal: F) -> DrainOutcome
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut connections = JoinSet::new();
        tokio::pin!(signal);

        self.lifecycle.advance(Phase::Accepting);

        loop {
            tokio::select! {
                _ = &mut signal => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            router.clone(),
                            self.lifecycle.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_connection_exit(joined);
                }
            }
        }

        drop(listener);
        info!(
            deadline_ms = self.drain_deadline.as_millis() as u64,
            open_connections = connections.len(),
            "draining"
        );
        self.lifecycle.advance(Phase::Draining);

        let drained = tokio::time::timeout(self.drain_deadline, async {
            while let Some(joined) = connections.join_next().await {
                log_connection_exit(joined);
            }
        })
        .await;

        let outcome = match drained {
            Ok(()) => {
                info!("drain completed");
                DrainOutcome::Completed
            }
            Err(_) => {
                warn!(
                    abandoned = connections.len(),
                    "drain deadline elapsed; aborting remaining connections"
                );
                connections.abort_all();
                while connections.join_next().await.is_some() {}
                DrainOutcome::DeadlineElapsed
            }
        };

        self.lifecycle.advance(Phase::Stopped);
        outcome
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    lifecycle: Lifecycle,
) {
    let service = TowerToHyperService::new(AddExtension::new(router, ConnectInfo(peer)));
    let builder = Builder::new(TokioExecutor::new());
    let connection = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = lifecycle.reached(Phase::Draining) => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(e) = result {
        debug!(%peer, error = %e, "connection closed with error");
    }
}

fn log_connection_exit(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined
        && e.is_panic()
    {
        error!(error = %e, "connection task panicked");
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("received SIGTERM, initiating graceful shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_only_move_forward() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.phase(), Phase::Starting);
        assert!(lifecycle.is_admitting());

        assert!(lifecycle.advance(Phase::Accepting));
        assert!(lifecycle.advance(Phase::Draining));
        assert!(!lifecycle.advance(Phase::Accepting));
        assert_eq!(lifecycle.phase(), Phase::Draining);
        assert!(!lifecycle.is_admitting());

        assert!(lifecycle.advance(Phase::Stopped));
        assert!(!lifecycle.advance(Phase::Stopped));
    }

    #[tokio::test]
    async fn test_reached_wakes_on_transition() {
        let lifecycle = Lifecycle::new();
        let waiter = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.reached(Phase::Draining).await })
        };

        lifecycle.advance(Phase::Accepting);
        lifecycle.advance(Phase::Draining);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .expect("waiter task");
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal_error() {
        let first = bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
        let addr = first.local_addr().unwrap();

        let err = bind(addr).await.unwrap_err();
        assert!(matches!(err, ServeError::Bind { .. }));
    }
}
