//! Labeled arguments for verification calls.
//!
//! Each call is described by a small builder whose labels may be supplied in
//! any order. A label can be supplied at most once, and a call does not accept
//! a builder that lacks one of its required labels. Both rules are enforced by
//! the type system, so mistakes surface when the test is compiled.
//!
//! ```rust
//! use probe_verify::args::Insert;
//!
//! let insert = Insert::new().probes([1, 3]).value("v").key(5).returns(true);
//! # let _ = insert;
//! ```
//!
//! Supplying a label twice does not compile:
//!
//! ```compile_fail
//! use probe_verify::args::Insert;
//!
//! let insert = Insert::new().key(1).value(2).key(3);
//! ```
//!
//! Neither does calling an operation with a required label missing:
//!
//! ```compile_fail
//! use probe_verify::args::Insert;
//! use probe_verify::ProbingTable;
//! use probe_verify::InstrumentedKey;
//! use probe_verify::TableVerifier;
//!
//! let mut verifier =
//!     TableVerifier::new(ProbingTable::<InstrumentedKey<u64>, u64>::with_buckets(4)).unwrap();
//! verifier.insert(Insert::new().key(1)).unwrap();
//! ```

use alloc::vec::Vec;

/// A label that has not been supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unset;

/// A label that has been supplied with a value.
#[derive(Debug, Clone, Copy)]
pub struct Set<T>(pub T);

/// Either state of a label slot.
pub trait Label<T> {
    /// The supplied value, if any.
    fn into_option(self) -> Option<T>;
}

impl<T> Label<T> for Unset {
    fn into_option(self) -> Option<T> {
        None
    }
}

impl<T> Label<T> for Set<T> {
    fn into_option(self) -> Option<T> {
        Some(self.0)
    }
}

impl<T> Set<T> {
    /// The supplied value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Arguments of an insert: `key` and `value` are required, `probes` and
/// `returns` are optional.
#[derive(Debug, Clone)]
pub struct Insert<K = Unset, V = Unset, P = Unset, R = Unset> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) probes: P,
    pub(crate) returns: R,
}

impl Insert {
    /// An insert with no labels supplied.
    pub fn new() -> Self {
        Self {
            key: Unset,
            value: Unset,
            probes: Unset,
            returns: Unset,
        }
    }
}

impl Default for Insert {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, P, R> Insert<Unset, V, P, R> {
    /// The key to insert.
    pub fn key<K>(self, key: K) -> Insert<Set<K>, V, P, R> {
        Insert {
            key: Set(key),
            value: self.value,
            probes: self.probes,
            returns: self.returns,
        }
    }
}

impl<K, P, R> Insert<K, Unset, P, R> {
    /// The value to insert.
    pub fn value<V>(self, value: V) -> Insert<K, Set<V>, P, R> {
        Insert {
            key: self.key,
            value: Set(value),
            probes: self.probes,
            returns: self.returns,
        }
    }
}

impl<K, V, R> Insert<K, V, Unset, R> {
    /// The bucket indices the insert must probe, in order.
    pub fn probes(self, probes: impl IntoIterator<Item = usize>) -> Insert<K, V, Set<Vec<usize>>, R> {
        Insert {
            key: self.key,
            value: self.value,
            probes: Set(probes.into_iter().collect()),
            returns: self.returns,
        }
    }
}

impl<K, V, P> Insert<K, V, P, Unset> {
    /// The result the insert must return.
    pub fn returns(self, returns: bool) -> Insert<K, V, P, Set<bool>> {
        Insert {
            key: self.key,
            value: self.value,
            probes: self.probes,
            returns: Set(returns),
        }
    }
}

/// Arguments of an erase: `key` is required, `probes` and `returns` are
/// optional.
#[derive(Debug, Clone)]
pub struct Erase<K = Unset, P = Unset, R = Unset> {
    pub(crate) key: K,
    pub(crate) probes: P,
    pub(crate) returns: R,
}

impl Erase {
    /// An erase with no labels supplied.
    pub fn new() -> Self {
        Self {
            key: Unset,
            probes: Unset,
            returns: Unset,
        }
    }
}

impl Default for Erase {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R> Erase<Unset, P, R> {
    /// The key to erase.
    pub fn key<K>(self, key: K) -> Erase<Set<K>, P, R> {
        Erase {
            key: Set(key),
            probes: self.probes,
            returns: self.returns,
        }
    }
}

impl<K, R> Erase<K, Unset, R> {
    /// The bucket indices the erase must probe, in order.
    pub fn probes(self, probes: impl IntoIterator<Item = usize>) -> Erase<K, Set<Vec<usize>>, R> {
        Erase {
            key: self.key,
            probes: Set(probes.into_iter().collect()),
            returns: self.returns,
        }
    }
}

impl<K, P> Erase<K, P, Unset> {
    /// The result the erase must return.
    pub fn returns(self, returns: bool) -> Erase<K, P, Set<bool>> {
        Erase {
            key: self.key,
            probes: self.probes,
            returns: Set(returns),
        }
    }
}

/// Arguments of a lookup: `key` is required, `probes` and `returns` are
/// optional.
#[derive(Debug, Clone)]
pub struct Lookup<K = Unset, P = Unset, R = Unset> {
    pub(crate) key: K,
    pub(crate) probes: P,
    pub(crate) returns: R,
}

impl Lookup {
    /// A lookup with no labels supplied.
    pub fn new() -> Self {
        Self {
            key: Unset,
            probes: Unset,
            returns: Unset,
        }
    }
}

impl Default for Lookup {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R> Lookup<Unset, P, R> {
    /// The key to look up.
    pub fn key<K>(self, key: K) -> Lookup<Set<K>, P, R> {
        Lookup {
            key: Set(key),
            probes: self.probes,
            returns: self.returns,
        }
    }
}

impl<K, R> Lookup<K, Unset, R> {
    /// The bucket indices the lookup must probe, in order.
    pub fn probes(self, probes: impl IntoIterator<Item = usize>) -> Lookup<K, Set<Vec<usize>>, R> {
        Lookup {
            key: self.key,
            probes: Set(probes.into_iter().collect()),
            returns: self.returns,
        }
    }
}

impl<K, P> Lookup<K, P, Unset> {
    /// The value the lookup must return.
    pub fn returns<V>(self, returns: V) -> Lookup<K, P, Set<V>> {
        Lookup {
            key: self.key,
            probes: self.probes,
            returns: Set(returns),
        }
    }
}
