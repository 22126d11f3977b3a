//! Single-value, latest-wins hand-off between pipeline stages.
//!
//! A [`LatestSlot`] holds at most one value. `put` always overwrites,
//! so a slow consumer loses intermediate values instead of stalling
//! its producer. Waiting is done through a `Notify` and can be raced
//! against a `CancellationToken`, which is what lets `destroy` unpark
//! a stage whose upstream has already stopped.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// A one-element mailbox with overwrite semantics.
#[derive(Debug)]
pub struct LatestSlot<T> {
    value: Mutex<Option<T>>,
    available: Notify,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            available: Notify::new(),
        }
    }

    /// Store `value`, dropping any unconsumed one.
    ///
    /// Returns `true` if a previous value was overwritten.
    pub fn put(&self, value: T) -> bool {
        let replaced = self.lock().replace(value).is_some();
        self.available.notify_one();
        replaced
    }

    /// Take the current value without waiting.
    pub fn try_take(&self) -> Option<T> {
        self.lock().take()
    }

    /// Wait until a value is available and take it.
    pub async fn take(&self) -> T {
        loop {
            if let Some(value) = self.try_take() {
                return value;
            }
            self.available.notified().await;
        }
    }

    /// Like [`take`](Self::take), but gives up with `None` once
    /// `cancel` fires.
    pub async fn take_or_cancel(&self, cancel: &CancellationToken) -> Option<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            value = self.take() => Some(value),
        }
    }

    /// Drop the current value, if any.
    pub fn clear(&self) {
        self.lock().take();
    }

    /// Whether a value is waiting to be taken.
    pub fn is_occupied(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn put_overwrites_unconsumed_value() {
        let slot = LatestSlot::new();
        assert!(!slot.put(1));
        assert!(slot.put(2));
        assert_eq!(slot.try_take(), Some(2));
        assert_eq!(slot.try_take(), None);
    }

    #[test]
    fn clear_empties_slot() {
        let slot = LatestSlot::new();
        slot.put("frame");
        assert!(slot.is_occupied());
        slot.clear();
        assert!(!slot.is_occupied());
    }

    #[tokio::test]
    async fn take_waits_for_producer() {
        let slot = Arc::new(LatestSlot::new());
        let consumer = tokio::spawn({
            let slot = Arc::clone(&slot);
            async move { slot.take().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        slot.put(7u32);
        let value = tokio::time::timeout(Duration::from_secs(5), consumer)
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancel_unparks_waiting_consumer() {
        let slot = Arc::new(LatestSlot::<u32>::new());
        let cancel = CancellationToken::new();
        let consumer = tokio::spawn({
            let slot = Arc::clone(&slot);
            let cancel = cancel.clone();
            async move { slot.take_or_cancel(&cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        let value = tokio::time::timeout(Duration::from_secs(5), consumer)
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(value, None);
    }
}
