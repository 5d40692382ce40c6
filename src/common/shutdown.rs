//! Cooperative cancellation for the polling loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::errors::{ClientError, Result};

/// Receiving half of a stop signal
///
/// Cloned into every component that suspends. Once the paired
/// [`ShutdownTrigger`] fires (or is dropped) every pending `guard` and
/// `sleep` returns immediately.
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
    /// Sender held open by signals from [`Shutdown::never`]
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

/// Sending half of a stop signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a linked trigger/signal pair
    pub fn new() -> (ShutdownTrigger, Shutdown) {
        let (sender, receiver) = watch::channel(false);
        let shutdown = Shutdown {
            receiver,
            _keepalive: None,
        };
        (ShutdownTrigger { sender }, shutdown)
    }

    /// A signal that never fires
    ///
    /// The channel closes once the last clone is dropped.
    pub fn never() -> Shutdown {
        let (sender, receiver) = watch::channel(false);
        Shutdown {
            receiver,
            _keepalive: Some(Arc::new(sender)),
        }
    }

    /// Whether a stop has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow() || self.receiver.has_changed().is_err()
    }

    /// Resolves once a stop has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }

    /// Run a remote call unless a stop arrives first
    pub async fn guard<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ClientError::Cancelled),
            result = call => result,
        }
    }

    /// Sleep for `duration`, returning `false` if interrupted by a stop
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

impl ShutdownTrigger {
    /// Request a stop
    pub fn trigger(&self) {
        let _ = self.sender.send(true);
    }
}
