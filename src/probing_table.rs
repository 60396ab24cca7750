use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::BuildHasherDefault;
use core::hash::Hash;
use core::hash::Hasher;
use core::marker::PhantomData;

use crate::layout::RecordShape;
use crate::table::BucketRecord;
use crate::table::OpenAddressingTable;
use crate::table::Status;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hash builder used by [`ProbingTable`] unless another one is named.
        pub type DefaultHashBuilder = foldhash::fast::FixedState;
    } else {
        /// Hash builder used by [`ProbingTable`] unless another one is named.
        pub type DefaultHashBuilder = IdentityHashBuilder;
    }
}

/// A hasher that passes integers through unchanged.
///
/// Lets tests put an integer key in a chosen home bucket: key `k` in a table
/// of `n` buckets starts probing at `k % n`. Every write is folded into the
/// state, so strings, tuples and other composite keys still hash to distinct
/// values, just not in any useful way.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityHasher(u64);

impl IdentityHasher {
    /// The first write is taken as is; later writes are mixed in.
    #[inline]
    fn fold(&mut self, n: u64) {
        self.0 = match self.0 {
            0 => n,
            state => state.wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ n,
        };
    }
}

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.fold(u64::from(byte));
        }
    }

    fn write_u8(&mut self, n: u8) {
        self.fold(u64::from(n));
    }

    fn write_u16(&mut self, n: u16) {
        self.fold(u64::from(n));
    }

    fn write_u32(&mut self, n: u32) {
        self.fold(u64::from(n));
    }

    fn write_u64(&mut self, n: u64) {
        self.fold(n);
    }

    fn write_usize(&mut self, n: usize) {
        self.fold(n as u64);
    }
}

/// Builds [`IdentityHasher`]s.
pub type IdentityHashBuilder = BuildHasherDefault<IdentityHasher>;

/// The order in which a [`ProbingTable`] visits buckets after the home bucket.
pub trait ProbeStep {
    /// Distance from the home bucket on the `attempt`-th probe (the home
    /// bucket itself is attempt 0) in a table of `len` buckets.
    fn offset(attempt: usize, len: usize) -> usize;

    /// Bucket visited on the `attempt`-th probe.
    #[inline]
    fn index(home: usize, attempt: usize, len: usize) -> usize {
        home.wrapping_add(Self::offset(attempt, len)) % len
    }
}

/// Visits `home, home + 1, home + 2, ...`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearProbe;

impl ProbeStep for LinearProbe {
    #[inline]
    fn offset(attempt: usize, _len: usize) -> usize {
        attempt
    }
}

/// Visits `home, home + 1, home + 3, home + 6, ...` (triangular numbers).
///
/// Covers every bucket when the bucket count is a power of two.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuadraticProbe;

impl ProbeStep for QuadraticProbe {
    #[inline]
    fn offset(attempt: usize, _len: usize) -> usize {
        attempt.wrapping_mul(attempt.wrapping_add(1)) / 2
    }
}

/// One bucket of a [`ProbingTable`].
#[derive(Debug, Default, Clone)]
#[repr(C)]
pub struct Slot<K, V> {
    /// Whether the slot is empty, holds an element, or is a tombstone.
    pub status: Status,
    /// The stored key. A default key for slots that never held an element.
    pub key: K,
    /// The stored value.
    pub value: V,
}

impl<K, V> BucketRecord for Slot<K, V>
where
    K: 'static,
    V: 'static,
{
    type Key = K;
    type Value = V;

    fn status(&self) -> Status {
        self.status
    }

    fn key(&self) -> &K {
        &self.key
    }

    fn value(&self) -> &V {
        &self.value
    }

    fn shape() -> RecordShape {
        crate::record_shape!(Slot<K, V> {
            status: Status,
            key: K,
            value: V,
        })
    }
}

/// A fixed-capacity open-addressing hash table with tombstones.
///
/// This is a straightforward table that satisfies the harness boundary. It
/// serves as a known-good table for the harness's own tests and as a model of
/// the shape a table under test must have.
///
/// Every visited bucket is probed through a key comparison, including the
/// empty bucket that ends a search, so the whole probe path of an operation
/// is observable. The table never grows on its own; [`rebuild`](Self::rebuild)
/// rehashes it into a new bucket count.
///
/// ## Example
///
/// ```rust
/// use probe_verify::IdentityHashBuilder;
/// use probe_verify::LinearProbe;
/// use probe_verify::OpenAddressingTable;
/// use probe_verify::ProbingTable;
///
/// let mut table: ProbingTable<u64, &str, LinearProbe, IdentityHashBuilder> =
///     ProbingTable::with_buckets(4);
/// assert!(table.insert(1, "one"));
/// assert!(table.insert(5, "five"));
/// assert!(!table.insert(5, "again"));
///
/// assert_eq!(table.lookup(&5), "five");
/// assert!(table.erase(&1));
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.deleted_count(), 1);
/// ```
#[repr(C)]
pub struct ProbingTable<K, V, P = LinearProbe, S = DefaultHashBuilder> {
    element_count: usize,
    deleted_count: usize,
    buckets: Vec<Slot<K, V>>,
    _marker: PhantomData<(P, S)>,
}

impl<K, V, P, S> Debug for ProbingTable<K, V, P, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProbingTable")
            .field("element_count", &self.element_count)
            .field("deleted_count", &self.deleted_count)
            .field(
                "buckets",
                &self
                    .buckets
                    .chunks(16)
                    .map(|w| {
                        w.iter()
                            .map(|slot| match slot.status {
                                Status::Empty => "..",
                                Status::Occupied => "##",
                                Status::Deleted => "xx",
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect::<Vec<String>>(),
            )
            .finish()
    }
}

impl<K, V, P, S> Clone for ProbingTable<K, V, P, S>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            element_count: self.element_count,
            deleted_count: self.deleted_count,
            buckets: self.buckets.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K, V, P, S> Default for ProbingTable<K, V, P, S>
where
    K: Default,
    V: Default,
{
    fn default() -> Self {
        Self::with_buckets(0)
    }
}

impl<K, V, P, S> ProbingTable<K, V, P, S>
where
    K: Default,
    V: Default,
{
    /// Creates a table with exactly `bucket_count` empty buckets.
    pub fn with_buckets(bucket_count: usize) -> Self {
        Self {
            element_count: 0,
            deleted_count: 0,
            buckets: (0..bucket_count).map(|_| Slot::default()).collect(),
            _marker: PhantomData,
        }
    }
}

impl<K, V, P, S> ProbingTable<K, V, P, S> {
    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.element_count
    }

    /// Returns `true` if the table holds no live elements.
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Iterates over the live elements in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets
            .iter()
            .filter(|slot| slot.status == Status::Occupied)
            .map(|slot| (&slot.key, &slot.value))
    }
}

impl<K, V, P, S> ProbingTable<K, V, P, S>
where
    K: Eq + Hash + Clone + Default,
    V: Clone + Default,
    P: ProbeStep,
    S: BuildHasher + Default,
{
    #[inline]
    fn home(key: &K, len: usize) -> usize {
        (S::default().hash_one(key) as usize) % len
    }

    /// Searches for `key`.
    ///
    /// Returns the bucket holding it, or else the bucket an insert should use:
    /// the first tombstone on the path, or the empty bucket that ended it.
    fn search(&self, key: &K) -> Search {
        let len = self.buckets.len();
        if len == 0 {
            return Search::Missing { vacancy: None };
        }

        let home = Self::home(key, len);
        let mut vacancy = None;
        for attempt in 0..len {
            let index = P::index(home, attempt, len);
            let slot = &self.buckets[index];
            let same = slot.key == *key;
            match slot.status {
                Status::Occupied if same => return Search::Found(index),
                Status::Occupied => {}
                Status::Deleted => {
                    vacancy.get_or_insert(index);
                }
                Status::Empty => {
                    vacancy.get_or_insert(index);
                    break;
                }
            }
        }

        Search::Missing { vacancy }
    }

    fn occupy(&mut self, index: usize, key: K, value: V) {
        if self.buckets[index].status == Status::Deleted {
            self.deleted_count -= 1;
        }
        self.buckets[index] = Slot {
            status: Status::Occupied,
            key,
            value,
        };
        self.element_count += 1;
    }

    /// Rehashes every live element into `bucket_count` buckets and drops all
    /// tombstones. Keys are placed by hash alone and never compared.
    ///
    /// Returns `false`, leaving the table untouched, if the elements do not
    /// fit.
    pub fn rebuild(&mut self, bucket_count: usize) -> bool {
        let mut taken = vec![false; bucket_count];
        let mut targets = Vec::with_capacity(self.buckets.len());
        for slot in &self.buckets {
            if slot.status != Status::Occupied {
                targets.push(None);
                continue;
            }

            let home = Self::home(&slot.key, bucket_count.max(1));
            let Some(index) = (0..bucket_count)
                .map(|attempt| P::index(home, attempt, bucket_count))
                .find(|&index| !taken[index])
            else {
                return false;
            };
            taken[index] = true;
            targets.push(Some(index));
        }

        let mut buckets: Vec<Slot<K, V>> = (0..bucket_count).map(|_| Slot::default()).collect();
        for (slot, target) in core::mem::take(&mut self.buckets).into_iter().zip(targets) {
            if let Some(index) = target {
                buckets[index] = slot;
            }
        }

        self.buckets = buckets;
        self.deleted_count = 0;
        true
    }
}

impl<K, V, P, S> OpenAddressingTable for ProbingTable<K, V, P, S>
where
    K: Eq + Hash + Clone + Default + 'static,
    V: Clone + Default + 'static,
    P: ProbeStep,
    S: BuildHasher + Default,
{
    type Key = K;
    type Value = V;
    type Bucket = Slot<K, V>;

    fn element_count(&self) -> usize {
        self.element_count
    }

    fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    fn buckets(&self) -> &[Slot<K, V>] {
        &self.buckets
    }

    fn insert(&mut self, key: K, value: V) -> bool {
        match self.search(&key) {
            Search::Found(_) | Search::Missing { vacancy: None } => false,
            Search::Missing {
                vacancy: Some(index),
            } => {
                self.occupy(index, key, value);
                true
            }
        }
    }

    fn erase(&mut self, key: &K) -> bool {
        let Search::Found(index) = self.search(key) else {
            return false;
        };

        self.buckets[index].status = Status::Deleted;
        self.element_count -= 1;
        self.deleted_count += 1;
        true
    }

    fn lookup(&mut self, key: &K) -> V {
        match self.search(key) {
            Search::Found(index) => self.buckets[index].value.clone(),
            Search::Missing {
                vacancy: Some(index),
            } => {
                self.occupy(index, key.clone(), V::default());
                V::default()
            }
            Search::Missing { vacancy: None } => V::default(),
        }
    }

    fn shape() -> RecordShape {
        crate::record_shape!(ProbingTable<K, V, P, S> {
            element_count: usize,
            deleted_count: usize,
            buckets: Vec<Slot<K, V>>,
        })
    }
}

enum Search {
    Found(usize),
    Missing { vacancy: Option<usize> },
}
