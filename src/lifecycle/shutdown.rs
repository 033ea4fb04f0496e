//! Shutdown coordination for the service.

use std::future::Future;
use std::io;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Coordinator for graceful shutdown.
///
/// The HTTP server and the rate limit sweeper each hold a receiver and stop
/// when [`trigger`](Shutdown::trigger) is called.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Returns how many were listening.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for either `signal` or the server task to finish.
///
/// On `signal` every subscriber is told to stop and the server task is
/// drained. A server task that ends first, successfully or not, ends the
/// wait immediately with its result.
pub async fn supervise<F>(
    mut server: JoinHandle<io::Result<()>>,
    shutdown: &Shutdown,
    signal: F,
) -> io::Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        result = signal => {
            result?;
            tracing::info!("Shutdown requested");
            shutdown.trigger();
            server.await.map_err(io::Error::other)?
        }
        result = &mut server => {
            tracing::warn!("HTTP server exited before shutdown was requested");
            result.map_err(io::Error::other)?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();

        assert_eq!(shutdown.trigger(), 2);
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn test_trigger_without_subscribers() {
        assert_eq!(Shutdown::default().trigger(), 0);
    }

    #[tokio::test]
    async fn test_supervise_returns_early_server_error() {
        let shutdown = Shutdown::new();
        let server = tokio::spawn(async {
            Err(io::Error::new(io::ErrorKind::AddrInUse, "listener failed"))
        });

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            supervise(server, &shutdown, std::future::pending()),
        )
        .await
        .expect("supervise waited for a signal that never came");

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::AddrInUse);
    }

    #[tokio::test]
    async fn test_supervise_triggers_shutdown_on_signal() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let server = tokio::spawn(async move {
            let _ = rx.recv().await;
            Ok(())
        });

        let result = supervise(server, &shutdown, async { Ok(()) }).await;
        assert!(result.is_ok());
    }
}
