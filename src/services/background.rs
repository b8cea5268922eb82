//! Bounded background writer for best-effort side effects.
//!
//! Items go through a bounded mpsc channel to one worker task. Enqueueing
//! never waits: a full or closed queue is reported and the item is dropped.

use std::future::Future;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of handing one item to a [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Queued,
    /// Channel at capacity.
    Full,
    /// Worker shut down.
    Closed,
}

pub struct Worker<T> {
    name: &'static str,
    sender: Mutex<Option<mpsc::Sender<T>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Worker<T> {
    /// Spawn the worker task. Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(name: &'static str, capacity: usize, mut write: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<T>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(item) = receiver.recv().await {
                write(item).await;
            }
            debug!(worker = name, "Background worker drained");
        });
        info!(worker = name, capacity, "Background worker started");

        Self {
            name,
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        }
    }

    pub async fn enqueue(&self, item: T) -> Enqueue {
        let sender = self.sender.lock().await;
        let Some(sender) = sender.as_ref() else {
            return Enqueue::Closed;
        };
        match sender.try_send(item) {
            Ok(()) => Enqueue::Queued,
            Err(TrySendError::Full(_)) => Enqueue::Full,
            Err(TrySendError::Closed(_)) => Enqueue::Closed,
        }
    }

    /// Close the queue and wait until everything already queued is written.
    pub async fn shutdown(&self) {
        self.sender.lock().await.take();
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(worker = self.name, error = %e, "Background worker ended abnormally");
            }
        }
    }
}
