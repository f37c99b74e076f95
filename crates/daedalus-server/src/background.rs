//! The application-wide background scope.
//!
//! A [`Background`] is cancelled exactly once, by [`App::stop`] or a signal
//! listener; every clone observes the cancellation. The HTTP server stops
//! accepting connections when it fires, and tasks spawned through
//! [`Background::spawn`] are dropped at their next await point.
//!
//! [`App::stop`]: crate::App::stop

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A cancellable scope shared by the application and its tasks.
///
/// # Example
///
/// ```rust
/// use daedalus_server::Background;
///
/// let background = Background::new();
/// let observer = background.clone();
///
/// background.cancel();
/// background.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct Background {
    cancelled: Arc<AtomicBool>,
    sender: broadcast::Sender<()>,
}

impl Background {
    /// Creates a live scope.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Cancels the scope. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!("background scope cancelled");
            let _ = self.sender.send(());
        }
    }

    /// Returns true once [`Background::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Completes when the scope is cancelled, or immediately if it already
    /// is.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        if self.is_cancelled() {
            return;
        }
        let _ = receiver.recv().await;
    }

    /// Runs `task` on the tokio runtime until it finishes or the scope is
    /// cancelled, whichever comes first.
    ///
    /// The handle yields `None` if the task was cut short.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let background = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                output = task => Some(output),
                () = background.cancelled() => None,
            }
        })
    }

    /// Cancels the scope on SIGINT or SIGTERM (Ctrl+C off Unix).
    ///
    /// Must be called from within a tokio runtime.
    pub fn cancel_on_signal(&self) {
        let background = self.clone();
        tokio::spawn(async move {
            if wait_for_os_signal().await {
                background.cancel();
            }
        });
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns false if no signal handler could be installed.
async fn wait_for_os_signal() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(error = %e, "failed to install signal handlers");
                    return false;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        }
        true
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("received Ctrl+C, shutting down");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for Ctrl+C");
                false
            }
        }
    }
}
