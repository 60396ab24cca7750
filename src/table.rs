//! The boundary between the harness and a table under test.
//!
//! The harness never looks inside a table beyond what these traits expose,
//! and never mutates it except through [`OpenAddressingTable::insert`],
//! [`OpenAddressingTable::erase`] and [`OpenAddressingTable::lookup`].

use crate::layout::RecordShape;

/// State of a single bucket.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Never held an element; terminates a probe sequence.
    #[default]
    Empty,
    /// Holds a live element.
    Occupied,
    /// Held an element that was erased (a tombstone).
    Deleted,
}

/// One record of a table's bucket array.
///
/// Implementors must be laid out as `status`, `key`, `value` with nothing
/// else in the record, which in practice means `#[repr(C)]`. The claim is
/// checked by [`validate_layout`](crate::layout::validate_layout) before any
/// table holding these buckets is verified.
pub trait BucketRecord {
    /// Key type stored in the bucket.
    type Key;
    /// Value type stored in the bucket.
    type Value;

    /// The bucket's status tag.
    fn status(&self) -> Status;

    /// The stored key. Meaningless for empty buckets.
    fn key(&self) -> &Self::Key;

    /// The stored value. Meaningless for empty buckets.
    fn value(&self) -> &Self::Value;

    /// The declared shape of the bucket record, normally built with
    /// [`record_shape!`](crate::record_shape).
    fn shape() -> RecordShape;
}

/// An open-addressing hash table that can be driven by the harness.
///
/// The table must resolve every probe through `==` on [`Self::Key`];
/// probes that are not routed through key equality cannot be observed.
pub trait OpenAddressingTable {
    /// Key type. Verified tables use [`InstrumentedKey`](crate::InstrumentedKey).
    type Key;
    /// Value type.
    type Value;
    /// Record type of the bucket array.
    type Bucket: BucketRecord<Key = Self::Key, Value = Self::Value>;

    /// Number of live elements.
    fn element_count(&self) -> usize;

    /// Number of tombstones.
    fn deleted_count(&self) -> usize;

    /// The bucket array the table probes.
    fn buckets(&self) -> &[Self::Bucket];

    /// Inserts `key` with `value`. Returns `false` if nothing was inserted.
    fn insert(&mut self, key: Self::Key, value: Self::Value) -> bool;

    /// Erases `key`. Returns `true` if it was present.
    fn erase(&mut self, key: &Self::Key) -> bool;

    /// Returns the value stored under `key`, inserting a default value first
    /// if the key is absent.
    fn lookup(&mut self, key: &Self::Key) -> Self::Value;

    /// The declared shape of the table record, normally built with
    /// [`record_shape!`](crate::record_shape).
    fn shape() -> RecordShape;
}
