// ABOUTME: Signal-driven shutdown: kills in-flight hooks and releases the all-done signal.
// ABOUTME: Attached batches park on AllDone until the coordinator fires.

use crate::hooks::HookRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Owns the "all done" signal and the shutdown sequence.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    hooks: Arc<HookRegistry>,
    done: watch::Sender<bool>,
    triggered: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(hooks: Arc<HookRegistry>) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            hooks,
            done,
            triggered: AtomicBool::new(false),
        }
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    pub fn subscribe(&self) -> AllDone {
        AllDone(self.done.subscribe())
    }

    /// Resolve on the next SIGINT or SIGTERM.
    pub async fn wait_for_signal() -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut terminate = signal(SignalKind::terminate())?;
            tokio::select! {
                result = tokio::signal::ctrl_c() => result,
                _ = terminate.recv() => Ok(()),
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await
        }
    }

    /// Kill every in-flight hook, then release everyone waiting on
    /// [`AllDone`]. Only the first call does anything; it returns the number
    /// of hooks killed.
    pub async fn shutdown(&self) -> usize {
        if self.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!("shutdown already in progress, ignoring signal");
            return 0;
        }
        tracing::info!("shutting down");
        let killed = self.hooks.kill_all().await;
        self.done.send_replace(true);
        killed
    }

    /// Run the shutdown sequence on every signal until the first one lands.
    /// Later signals are logged and ignored.
    pub async fn watch_signals(self: Arc<Self>) {
        loop {
            if let Err(error) = Self::wait_for_signal().await {
                tracing::warn!(%error, "cannot listen for signals");
                return;
            }
            self.shutdown().await;
        }
    }
}

/// Resolves once the shutdown coordinator has finished.
#[derive(Debug, Clone)]
pub struct AllDone(watch::Receiver<bool>);

impl AllDone {
    /// A signal that has already fired.
    pub fn released() -> Self {
        let (_, receiver) = watch::channel(true);
        Self(receiver)
    }

    pub fn is_released(&self) -> bool {
        *self.0.borrow()
    }

    pub async fn wait(&mut self) {
        // A dropped coordinator can never fire; treat that as done.
        let _ = self.0.wait_for(|done| *done).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_releases_waiters() {
        let coordinator = ShutdownCoordinator::new(Arc::new(HookRegistry::new()));
        let mut done = coordinator.subscribe();
        assert!(!done.is_released());

        let waiter = tokio::spawn(async move { done.wait().await });
        assert_eq!(coordinator.shutdown().await, 0);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn second_shutdown_is_ignored() {
        let coordinator = ShutdownCoordinator::new(Arc::new(HookRegistry::new()));
        coordinator.shutdown().await;
        assert_eq!(coordinator.shutdown().await, 0);
        assert!(coordinator.subscribe().is_released());
    }

    #[tokio::test]
    async fn released_signal_does_not_block() {
        let mut done = AllDone::released();
        tokio::time::timeout(Duration::from_millis(100), done.wait())
            .await
            .unwrap();
    }
}
