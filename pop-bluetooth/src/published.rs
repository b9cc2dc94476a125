use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A stream of values sent after subscribing.
///
/// Subscribers that fall behind skip to the most recent values; the next `recv` after a skip
/// reports [`async_broadcast::RecvError::Overflowed`].
pub type Subscription<T> = async_broadcast::Receiver<T>;

const HISTORY: usize = 1;

/// An observable value.
///
/// Every change made through [`set`](Self::set) or [`update`](Self::update) is pushed to all
/// current subscribers. Clones share the same value, so a wrapper can hand a clone to its
/// delegate and keep one for readers on other threads.
pub struct Published<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    value: Mutex<T>,
    sender: async_broadcast::Sender<T>,
    _keep_alive: async_broadcast::InactiveReceiver<T>,
}

impl<T> Clone for Published<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: std::fmt::Debug + Clone> std::fmt::Debug for Published<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Published").field(&*self.lock()).finish()
    }
}

impl<T: Default + Clone> Default for Published<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> Published<T> {
    pub fn new(value: T) -> Self {
        let (mut sender, receiver) = async_broadcast::broadcast(HISTORY);
        sender.set_overflow(true);
        Self {
            inner: Arc::new(Inner {
                value: Mutex::new(value),
                sender,
                _keep_alive: receiver.deactivate(),
            }),
        }
    }

    /// A copy of the current value.
    pub fn get(&self) -> T {
        self.lock().clone()
    }

    /// Reads the current value in place.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock())
    }

    /// Replaces the value and notifies subscribers.
    pub fn set(&self, value: T) {
        self.update(|current| *current = value);
    }

    /// Modifies the value in place and notifies subscribers with the result.
    ///
    /// Concurrent updates are broadcast in the order they were applied, so the last value a
    /// subscriber receives is the current one.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut value = self.lock();
        let ret = f(&mut value);
        // Sent under the lock. The channel overflows instead of blocking.
        let _ = self.inner.sender.try_broadcast(value.clone());
        ret
    }

    /// Values set from now on.
    pub fn subscribe(&self) -> Subscription<T> {
        self.inner.sender.new_receiver()
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.inner
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Signals a change to state that is read live from the platform rather than stored.
#[derive(Clone, Debug, Default)]
pub struct Notifier {
    changes: Published<u64>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        self.changes.update(|generation| *generation += 1);
    }

    /// The number of notifications sent so far.
    pub fn generation(&self) -> u64 {
        self.changes.get()
    }

    /// Receives the new generation after every notification.
    pub fn subscribe(&self) -> Subscription<u64> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_value() {
        let published = Published::new(1);
        published.set(2);
        assert_eq!(published.get(), 2);
    }

    #[test]
    fn clones_share_value() {
        let published = Published::new(String::from("a"));
        let other = published.clone();
        other.set(String::from("b"));
        assert_eq!(published.get(), "b");
    }

    #[test]
    fn update_returns_closure_result() {
        let published = Published::new(vec![1, 2]);
        let len = published.update(|v| {
            v.push(3);
            v.len()
        });
        assert_eq!(len, 3);
        assert_eq!(published.with(|v| v.clone()), vec![1, 2, 3]);
    }

    #[test]
    fn subscribers_only_see_later_values() {
        let published = Published::new(0);
        published.set(1);
        let mut subscription = published.subscribe();
        assert!(subscription.try_recv().is_err());
        published.set(2);
        assert_eq!(subscription.try_recv().unwrap(), 2);
    }

    #[test]
    fn set_without_subscribers_does_not_block() {
        let published = Published::new(0);
        for i in 0..100 {
            published.set(i);
        }
        assert_eq!(published.get(), 99);
    }

    #[tokio::test]
    async fn subscription_receives_across_tasks() {
        let published = Published::new(false);
        let mut subscription = published.subscribe();
        let writer = published.clone();
        tokio::spawn(async move { writer.set(true) });
        assert!(subscription.recv().await.unwrap());
    }

    #[test]
    fn subscription_is_a_stream() {
        use futures_lite::StreamExt;

        let published = Published::new(0);
        let subscription = published.subscribe();
        for i in 1..=3 {
            published.set(i);
        }
        drop(published);

        let values: Vec<i32> = futures_lite::future::block_on(subscription.collect());
        assert_eq!(values, vec![3]);
    }

    #[test]
    fn concurrent_updates_end_on_current_value() {
        let published = Published::new(0u32);
        let mut subscription = published.subscribe();

        let writers: Vec<_> = (0..8)
            .map(|_| {
                let published = published.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        published.update(|v| *v += 1);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let mut last = None;
        loop {
            match subscription.try_recv() {
                Ok(value) => last = Some(value),
                Err(async_broadcast::TryRecvError::Overflowed(_)) => continue,
                Err(_) => break,
            }
        }
        assert_eq!(published.get(), 800);
        assert_eq!(last, Some(800));
    }

    #[test]
    fn notifier_counts_generations() {
        let notifier = Notifier::new();
        let mut subscription = notifier.subscribe();
        notifier.notify();
        assert_eq!(notifier.generation(), 1);
        assert_eq!(subscription.try_recv().unwrap(), 1);
    }
}
