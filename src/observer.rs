use core::cell::Cell;
use core::cell::RefCell;

use hashbrown::HashSet;

use crate::error::VerifyError;
use crate::key::InstrumentedKey;

/// Receives every equality comparison made with a subscribed
/// [`InstrumentedKey`].
///
/// Observers are shared behind an `Rc` and hand out `Weak` references to the
/// keys bound to them, so all state an observer mutates must live behind
/// interior mutability.
pub trait ProbeObserver<K> {
    /// Called once per comparison with the key on the *other* side of the
    /// comparison, i.e. the key whose storage was probed.
    fn on_compare(&self, compared: &InstrumentedKey<K>);

    /// Called exactly once after the table operation has returned.
    ///
    /// Reports the first failure seen during the operation, or a failure that
    /// can only be detected once the operation is complete.
    fn finalize(&self) -> Result<(), VerifyError>;

    /// The registry of keys currently bound to this observer.
    fn subscribers(&self) -> &SubscriberRegistry;
}

/// Identifies one live subscription of an [`InstrumentedKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Tracks the keys bound to an observer.
///
/// Dropping the registry (together with its observer) invalidates every key
/// still bound to it: their `Weak` handles stop upgrading, so they neither
/// notify nor unsubscribe afterwards.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    next: Cell<u64>,
    live: RefCell<HashSet<SubscriberId>>,
}

impl SubscriberRegistry {
    pub(crate) fn subscribe(&self) -> SubscriberId {
        let id = SubscriberId(self.next.get());
        self.next.set(id.0 + 1);
        self.live.borrow_mut().insert(id);
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.live.borrow_mut().remove(&id)
    }

    /// Number of keys currently bound to the observer.
    pub fn live(&self) -> usize {
        self.live.borrow().len()
    }

    /// Returns `true` if `id` is currently bound to the observer.
    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.live.borrow().contains(&id)
    }
}

impl Drop for SubscriberRegistry {
    fn drop(&mut self) {
        let live = self.live.get_mut().len();
        if live > 0 {
            tracing::trace!(live, "observer torn down with keys still bound");
        }
    }
}

/// An observer that ignores every comparison.
///
/// Used when a verification call does not assert on probe order. Keys still
/// subscribe to it so their lifecycle is the same in both modes.
#[derive(Debug, Default)]
pub struct NoopObserver {
    subscribers: SubscriberRegistry,
}

impl<K> ProbeObserver<K> for NoopObserver {
    fn on_compare(&self, _compared: &InstrumentedKey<K>) {}

    fn finalize(&self) -> Result<(), VerifyError> {
        Ok(())
    }

    fn subscribers(&self) -> &SubscriberRegistry {
        &self.subscribers
    }
}
