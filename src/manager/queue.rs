//! Shared target queue for the worker pool.

use crate::core::ScanTarget;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// A closed, pre-loaded multi-consumer queue of scan targets.
///
/// All targets are enqueued up front and the sending side is dropped, so
/// [`TargetQueue::next`] never waits for producers: it yields the next target
/// or `None` once the queue is exhausted. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct TargetQueue {
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<ScanTarget>>>,
    /// Targets not yet handed to a worker.
    pending: Arc<AtomicUsize>,
}

impl TargetQueue {
    /// Creates a queue holding `targets` in order.
    pub fn preloaded(targets: Vec<ScanTarget>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut count = 0;
        for target in targets {
            if sender.send(target).is_err() {
                break;
            }
            count += 1;
        }
        drop(sender);

        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            pending: Arc::new(AtomicUsize::new(count)),
        }
    }

    /// Takes the next target, or `None` if the queue is empty.
    pub async fn next(&self) -> Option<ScanTarget> {
        let target = self.receiver.lock().await.recv().await;
        if target.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        target
    }

    /// Removes and returns every target still queued.
    pub async fn drain(&self) -> Vec<ScanTarget> {
        let mut receiver = self.receiver.lock().await;
        let mut remaining = Vec::new();
        while let Ok(target) = receiver.try_recv() {
            remaining.push(target);
        }
        self.pending.fetch_sub(remaining.len(), Ordering::SeqCst);
        remaining
    }

    /// Returns the number of targets not yet taken.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Returns `true` if every target has been taken.
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }
}
