use alloc::rc::Rc;
use alloc::rc::Weak;
use core::fmt::Debug;
use core::hash::Hash;
use core::hash::Hasher;

use crate::observer::ProbeObserver;
use crate::observer::SubscriberId;

/// A key that reports each of its equality comparisons to an observer.
///
/// Comparing two instrumented keys reports to both sides' observers before
/// the wrapped keys are compared. Each side reports the *other* key, so an
/// observer always learns the address of the key the table probed, no matter
/// which operand the table under test puts on the left.
///
/// Hashing only looks at the wrapped key. Two keys wrapping equal values hash
/// identically whether or not they are bound to an observer.
///
/// # Subscription lifecycle
///
/// Binding a key to an observer, or cloning a bound key, registers a fresh
/// subscription with the observer. Dropping or overwriting a key removes its
/// subscription, but only while the observer is still alive. Moving a key
/// carries its subscription along unchanged. The key only holds a `Weak`
/// handle, so once the observer is gone the key is inert: it neither notifies
/// nor unsubscribes.
pub struct InstrumentedKey<K> {
    raw: K,
    subscription: Option<Subscription<K>>,
}

struct Subscription<K> {
    observer: Weak<dyn ProbeObserver<K>>,
    id: SubscriberId,
}

impl<K> InstrumentedKey<K> {
    /// Wraps `raw` and binds it to `observer`.
    pub fn new(raw: K, observer: &Rc<dyn ProbeObserver<K>>) -> Self {
        let id = observer.subscribers().subscribe();
        Self {
            raw,
            subscription: Some(Subscription {
                observer: Rc::downgrade(observer),
                id,
            }),
        }
    }

    /// Wraps `raw` without binding it to any observer.
    pub fn detached(raw: K) -> Self {
        Self {
            raw,
            subscription: None,
        }
    }

    /// The wrapped key.
    pub fn raw(&self) -> &K {
        &self.raw
    }

    /// Returns `true` if the key is bound to an observer that is still alive.
    pub fn is_attached(&self) -> bool {
        self.observer().is_some()
    }

    /// The id of this key's subscription, if it was ever bound.
    pub fn subscriber_id(&self) -> Option<SubscriberId> {
        self.subscription.as_ref().map(|s| s.id)
    }

    /// Releases the subscription, leaving the key detached.
    pub fn unsubscribe(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        // A dead observer has already dropped its registry.
        if let Some(observer) = subscription.observer.upgrade() {
            observer.subscribers().unsubscribe(subscription.id);
        }
    }

    fn observer(&self) -> Option<Rc<dyn ProbeObserver<K>>> {
        self.subscription.as_ref()?.observer.upgrade()
    }

    fn notify(&self, compared: &Self) {
        if let Some(observer) = self.observer() {
            observer.on_compare(compared);
        }
    }
}

impl<K> Drop for InstrumentedKey<K> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<K> Clone for InstrumentedKey<K>
where
    K: Clone,
{
    fn clone(&self) -> Self {
        let subscription = self.subscription.as_ref().and_then(|s| {
            let observer = s.observer.upgrade()?;
            let id = observer.subscribers().subscribe();
            Some(Subscription {
                observer: s.observer.clone(),
                id,
            })
        });

        Self {
            raw: self.raw.clone(),
            subscription,
        }
    }
}

impl<K> Default for InstrumentedKey<K>
where
    K: Default,
{
    fn default() -> Self {
        Self::detached(K::default())
    }
}

impl<K> PartialEq for InstrumentedKey<K>
where
    K: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.notify(other);
        other.notify(self);
        self.raw == other.raw
    }
}

impl<K> Eq for InstrumentedKey<K> where K: Eq {}

impl<K> Hash for InstrumentedKey<K>
where
    K: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K> Debug for InstrumentedKey<K>
where
    K: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InstrumentedKey")
            .field("raw", &self.raw)
            .field("attached", &self.is_attached())
            .finish()
    }
}
