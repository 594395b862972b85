//! Tick broadcast channel
//!
//! The channel is the only state shared between the ticker thread and the
//! UI context. Subscribers are added and removed on the UI context while the
//! ticker delivers from its own thread, so delivery walks a snapshot of the
//! subscriber list and never holds the lock while a callback runs. Each entry
//! carries an `active` flag cleared on unsubscribe, which lets a pass skip
//! entries removed after the snapshot was taken.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{trace, warn};

/// One cadence event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1-based sequence number assigned by the ticker
    pub sequence: u64,
}

impl Tick {
    pub fn new(sequence: u64) -> Self {
        Self { sequence }
    }
}

/// Failure reported by a single subscriber for a single tick
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error("UI queue is closed")]
    QueueClosed,

    #[error("Tick handler failed: {0}")]
    Handler(String),
}

/// Callback invoked on every delivered tick
pub type TickCallback = Arc<dyn Fn(Tick) -> Result<(), TickError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

struct Subscriber {
    id: SubscriptionId,
    active: AtomicBool,
    callback: TickCallback,
}

struct Shared {
    subscribers: Mutex<Vec<Arc<Subscriber>>>,
    next_id: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Subscriber>>> {
        // Callbacks never run under this lock, so a poisoned list is still consistent
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut subscribers = self.lock();
            subscribers.iter().position(|s| s.id == id).map(|index| {
                let removed = subscribers.remove(index);
                removed.active.store(false, Ordering::Release);
                removed
            })
        };
        // The callback may own a Subscription, so it is dropped outside the lock
        removed.is_some()
    }
}

/// Outcome of one delivery pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    /// Callbacks that were called, whatever their result
    pub invoked: usize,
    /// Callbacks that returned an error
    pub failed: usize,
    /// Callbacks that panicked
    pub panicked: usize,
    /// Entries unsubscribed after the pass took its snapshot
    pub skipped: usize,
}

/// Registry of tick subscribers plus the delivery operation
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct BroadcastChannel {
    shared: Arc<Shared>,
}

impl BroadcastChannel {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a callback for future ticks.
    ///
    /// The returned handle unsubscribes when cancelled or dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Tick) -> Result<(), TickError> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(Subscriber {
            id,
            active: AtomicBool::new(true),
            callback: Arc::new(callback),
        });
        self.shared.lock().push(subscriber);
        trace!(subscription = %id, "subscribed");

        Subscription {
            id,
            channel: Arc::downgrade(&self.shared),
        }
    }

    /// Removes a subscriber; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.shared.remove(id);
        if removed {
            trace!(subscription = %id, "unsubscribed");
        }
        removed
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.shared.lock().iter().any(|s| s.id == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().len()
    }

    /// Invokes every registered callback once, in subscription order.
    ///
    /// Errors and panics from individual callbacks are logged and counted;
    /// they never stop the pass.
    pub fn deliver(&self, tick: Tick) -> DeliveryReport {
        let snapshot: Vec<Arc<Subscriber>> = self.shared.lock().clone();
        let mut report = DeliveryReport::default();

        for subscriber in snapshot {
            if !subscriber.active.load(Ordering::Acquire) {
                report.skipped += 1;
                continue;
            }

            report.invoked += 1;
            match panic::catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(tick))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    report.failed += 1;
                    warn!(subscription = %subscriber.id, tick = tick.sequence, %error, "tick handler failed");
                }
                Err(_) => {
                    report.panicked += 1;
                    warn!(subscription = %subscriber.id, tick = tick.sequence, "tick handler panicked");
                }
            }
        }

        report
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BroadcastChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastChannel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle to a registered callback
///
/// Holds only a weak reference, so an outstanding handle never keeps the
/// channel alive.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    channel: Weak<Shared>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unsubscribes now; returns false if already cancelled
    pub fn cancel(&mut self) -> bool {
        let channel = std::mem::take(&mut self.channel);
        match channel.upgrade() {
            Some(shared) => shared.remove(self.id),
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        match self.channel.upgrade() {
            Some(shared) => shared.lock().iter().any(|s| s.id == self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;
    use std::sync::atomic::AtomicUsize;

    fn counting(channel: &BroadcastChannel, counter: &Arc<AtomicUsize>) -> Subscription {
        let counter = Arc::clone(counter);
        channel.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn deliver_with_no_subscribers() {
        let channel = BroadcastChannel::new();
        let report = channel.deliver(Tick::new(1));
        assert_eq!(report, DeliveryReport::default());
    }

    #[test]
    fn deliver_invokes_each_subscriber_once() {
        let channel = BroadcastChannel::new();
        let counters: Vec<_> = (0..25).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let _subs: Vec<_> = counters.iter().map(|c| counting(&channel, c)).collect();

        let report = channel.deliver(Tick::new(1));

        assert_eq!(report.invoked, 25);
        assert!(counters.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn delivery_follows_subscription_order() {
        let channel = BroadcastChannel::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let _subs: Vec<_> = (0..5)
            .map(|i| {
                let order = Arc::clone(&order);
                channel.subscribe(move |_| {
                    order.lock().unwrap().push(i);
                    Ok(())
                })
            })
            .collect();

        channel.deliver(Tick::new(1));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn self_unsubscribe_during_delivery() {
        let channel = BroadcastChannel::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(OnceLock::new());

        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let _first = counting(&channel, &before);

        let subscription = {
            let inner = channel.clone();
            let calls = Arc::clone(&calls);
            let own_id = Arc::clone(&own_id);
            channel.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = own_id.get() {
                    inner.unsubscribe(*id);
                }
                Ok(())
            })
        };
        own_id.set(subscription.id()).unwrap();
        let _last = counting(&channel, &after);

        let report = channel.deliver(Tick::new(1));
        assert_eq!(report.invoked, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);
        assert!(!subscription.is_active());

        channel.deliver(Tick::new(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(before.load(Ordering::SeqCst), 2);
        assert_eq!(after.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removal_mid_pass_excludes_later_entry() {
        let channel = BroadcastChannel::new();
        let victim_calls = Arc::new(AtomicUsize::new(0));
        let victim_id = Arc::new(OnceLock::new());

        let _killer = {
            let inner = channel.clone();
            let victim_id = Arc::clone(&victim_id);
            channel.subscribe(move |_| {
                if let Some(id) = victim_id.get() {
                    inner.unsubscribe(*id);
                }
                Ok(())
            })
        };
        let victim = counting(&channel, &victim_calls);
        victim_id.set(victim.id()).unwrap();

        let report = channel.deliver(Tick::new(1));
        assert_eq!(report.invoked, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(victim_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscribe_during_delivery_waits_for_next_pass() {
        let channel = BroadcastChannel::new();
        let late_calls = Arc::new(AtomicUsize::new(0));
        let late = Arc::new(Mutex::new(Vec::new()));

        let _spawner = {
            let inner = channel.clone();
            let late_calls = Arc::clone(&late_calls);
            let late = Arc::clone(&late);
            channel.subscribe(move |_| {
                let late_calls = Arc::clone(&late_calls);
                let sub = inner.subscribe(move |_| {
                    late_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
                late.lock().unwrap().push(sub);
                Ok(())
            })
        };

        channel.deliver(Tick::new(1));
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(channel.subscriber_count(), 2);

        channel.deliver(Tick::new(2));
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_and_panicking_handlers_are_isolated() {
        let channel = BroadcastChannel::new();
        let healthy = Arc::new(AtomicUsize::new(0));

        let _failing = channel.subscribe(|_| Err(TickError::Handler("boom".to_string())));
        let _panicking = channel.subscribe(|_| panic!("handler exploded"));
        let _healthy = counting(&channel, &healthy);

        let report = channel.deliver(Tick::new(1));
        assert_eq!(report.invoked, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.panicked, 1);
        assert_eq!(healthy.load(Ordering::SeqCst), 1);

        channel.deliver(Tick::new(2));
        assert_eq!(healthy.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let channel = BroadcastChannel::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut subscription = counting(&channel, &counter);
        let id = subscription.id();
        assert!(channel.is_subscribed(id));

        assert!(subscription.cancel());
        assert!(!subscription.cancel());
        assert!(!channel.unsubscribe(id));

        let dropped = counting(&channel, &counter);
        assert_eq!(channel.subscriber_count(), 1);
        drop(dropped);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn subscription_outliving_channel() {
        let channel = BroadcastChannel::new();
        let mut subscription = channel.subscribe(|_| Ok(()));
        drop(channel);
        assert!(!subscription.is_active());
        assert!(!subscription.cancel());
    }
}
