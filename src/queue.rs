use std::sync::Mutex;
use std::time::Duration;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

/// Multi-producer, multi-consumer FIFO of pending work.
///
/// Each pushed item is handed to exactly one `pop` caller. Once the queue is
/// closed no new items can arrive, so an empty closed queue is finished.
pub struct WorkQueue<T> {
    sender: Mutex<Option<Sender<T>>>,
    receiver: Receiver<T>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// Build a queue holding `items` that is already closed for producers
    pub fn from_items<I: IntoIterator<Item = T>>(items: I) -> Self {
        let queue = Self::new();
        for item in items {
            // cannot fail: the queue was just opened
            let _ = queue.push(item);
        }
        queue.close();
        queue
    }

    /// Enqueue without blocking. Hands the item back if the queue is closed.
    pub fn push(&self, item: T) -> Result<(), T> {
        let guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.as_ref() {
            Some(sender) => sender.send(item).map_err(|err| err.into_inner()),
            None => Err(item),
        }
    }

    /// Wait up to `timeout` for an item. Returns `None` on timeout or when
    /// the queue is closed and drained.
    pub fn pop(&self, timeout: Duration) -> Option<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Stop accepting items. Workers drain whatever is left.
    pub fn close(&self) {
        let mut guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }

    pub fn is_closed(&self) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    /// Closed and empty: no item will ever be returned again
    pub fn is_finished(&self) -> bool {
        self.is_closed() && self.receiver.is_empty()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
