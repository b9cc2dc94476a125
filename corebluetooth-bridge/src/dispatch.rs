//! Dispatch queues that CoreBluetooth delivers delegate callbacks on.

use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::sync::Arc;

use dispatch2::{
    DispatchAutoReleaseFrequency, DispatchObject, DispatchQueue, DispatchQueueAttr,
    DispatchRetained,
};
use objc2::MainThreadMarker;

/// Quality of service for a background Bluetooth queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchQoS {
    class: dispatch2::DispatchQoS,
    relative_priority: i32,
}

impl Default for DispatchQoS {
    fn default() -> Self {
        Self {
            class: dispatch2::DispatchQoS::Unspecified,
            relative_priority: 0,
        }
    }
}

impl DispatchQoS {
    pub fn new(class: dispatch2::DispatchQoS, relative_priority: i32) -> Self {
        Self {
            class,
            relative_priority,
        }
    }

    /// Quality of service for work the user is waiting on, such as a visible device list.
    pub fn user_initiated() -> Self {
        Self::new(dispatch2::DispatchQoS::UserInitiated, 0)
    }

    fn to_attr(self) -> DispatchRetained<DispatchQueueAttr> {
        let attr = DispatchQueueAttr::with_autorelease_frequency(
            None,
            DispatchAutoReleaseFrequency::WORK_ITEM,
        );
        DispatchQueueAttr::with_qos_class(Some(&attr), self.class, self.relative_priority)
    }
}

/// The dispatch queue a manager was created on, available while running on that queue.
///
/// Values bound with [`bind`](Self::bind) stay on the queue: they can be handed to other
/// threads, but are only ever touched, and finally dropped, on the queue.
pub struct QueueContext {
    queue: DispatchRetained<DispatchQueue>,
    _not_send: PhantomData<*mut ()>,
}

impl std::fmt::Debug for QueueContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("QueueContext { .. }")
    }
}

impl QueueContext {
    fn new(queue: &DispatchQueue) -> Self {
        Self {
            queue: queue.retain(),
            _not_send: PhantomData,
        }
    }

    /// The main queue. Main-queue managers deliver their events here.
    pub fn main_thread(_mtm: MainThreadMarker) -> Self {
        Self::new(DispatchQueue::main())
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    /// Confines `value` to this queue.
    pub fn bind<T: 'static>(&self, value: T) -> QueueBound<T> {
        QueueBound {
            inner: Arc::new(Bound {
                queue: self.queue.clone(),
                value: ManuallyDrop::new(value),
            }),
        }
    }
}

/// A value owned by a dispatch queue.
///
/// `QueueBound` is `Send` and `Sync` whatever `T` is. The value is only reached through
/// [`with`](Self::with) and [`exec`](Self::exec), which run on the owning queue, and the last
/// clone to go away drops it there too. Clones share the value.
pub struct QueueBound<T: 'static> {
    inner: Arc<Bound<T>>,
}

struct Bound<T: 'static> {
    queue: DispatchRetained<DispatchQueue>,
    value: ManuallyDrop<T>,
}

// Safety: `value` is only accessed and dropped on `queue`, which runs one work item at a time.
unsafe impl<T: 'static> Send for Bound<T> {}
unsafe impl<T: 'static> Sync for Bound<T> {}

struct AssertSend<T>(T);

// Safety: only used to move a bound value into a work item on its own queue.
unsafe impl<T> Send for AssertSend<T> {}

impl<T: 'static> Drop for Bound<T> {
    fn drop(&mut self) {
        let value = AssertSend(unsafe { ManuallyDrop::take(&mut self.value) });
        self.queue.exec_async(move || drop(value));
    }
}

impl<T: 'static> Clone for QueueBound<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> std::fmt::Debug for QueueBound<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("QueueBound { .. }")
    }
}

impl<T: 'static> QueueBound<T> {
    /// Runs `func` with the value on the owning queue and waits for it to return.
    ///
    /// Calling this from the owning queue itself deadlocks; delegate callbacks and `entry`
    /// closures already have the value at hand.
    pub fn with<R: Send>(&self, func: impl FnOnce(&T) -> R + Send) -> R {
        let mut ret = None;
        self.inner.queue.barrier_sync(|| {
            ret = Some(func(&self.inner.value));
        });
        match ret {
            Some(ret) => ret,
            None => unreachable!("barrier_sync returned without running its work item"),
        }
    }

    /// Runs `func` with the value on the owning queue without waiting.
    pub fn exec(&self, func: impl FnOnce(&T) + Send + 'static) {
        let inner = self.inner.clone();
        self.inner.queue.barrier_async(move || func(&inner.value));
    }
}

/// Creates a serial queue and synchronously runs `entry` on it.
///
/// Managers created inside `entry` deliver their delegate callbacks on the same queue, so
/// `entry` observes no callbacks until it returns. Anything that must outlive `entry` is kept
/// with [`QueueContext::bind`].
pub(crate) fn on_serial_queue<R: Send>(
    label: &str,
    qos: DispatchQoS,
    entry: impl FnOnce(&QueueContext) -> R + Send,
) -> R {
    let queue = DispatchQueue::new(label, Some(&qos.to_attr()));
    let mut ret = None;
    queue.barrier_sync(|| {
        ret = Some(entry(&QueueContext::new(&queue)));
    });
    match ret {
        Some(ret) => ret,
        None => unreachable!("barrier_sync returned without running its work item"),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn bound_value_outlives_entry() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(dropped.clone());
        let bound = on_serial_queue("bluetooth.test", DispatchQoS::default(), move |context| {
            context.bind(flag)
        });

        assert!(!dropped.load(Ordering::SeqCst));
        assert!(bound.with(|flag| !flag.0.load(Ordering::SeqCst)));

        let queue = bound.inner.queue.clone();
        drop(bound);
        queue.barrier_sync(|| {});
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn clones_share_the_bound_value() {
        let bound = on_serial_queue("bluetooth.test", DispatchQoS::default(), |context| {
            context.bind(Cell::new(0))
        });
        let other = bound.clone();

        other.exec(|cell| cell.set(1));
        assert_eq!(bound.with(|cell| cell.get()), 1);
    }
}
