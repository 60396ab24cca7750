//! Tables with classic open-addressing bugs, driven through the public API.

use std::marker::PhantomData;

use probe_verify::BucketRecord;
use probe_verify::InstrumentedKey;
use probe_verify::LayoutMismatch;
use probe_verify::OpenAddressingTable;
use probe_verify::RecordShape;
use probe_verify::Status;
use probe_verify::TableVerifier;
use probe_verify::VerifyError;
use probe_verify::args::Erase;
use probe_verify::args::Insert;
use probe_verify::args::Lookup;
use probe_verify::record_shape;

type Key = InstrumentedKey<u32>;

trait Fault {
    /// Treats a tombstone as the end of the probe sequence.
    const STOPS_AT_TOMBSTONE: bool = false;
    /// Compares the home bucket twice.
    const RECHECKS_HOME: bool = false;
    /// Stops at the end of the array instead of wrapping around.
    const NO_WRAP: bool = false;
}

#[derive(Debug)]
struct Correct;
impl Fault for Correct {}

#[derive(Debug)]
struct StopsAtTombstone;
impl Fault for StopsAtTombstone {
    const STOPS_AT_TOMBSTONE: bool = true;
}

#[derive(Debug)]
struct RechecksHome;
impl Fault for RechecksHome {
    const RECHECKS_HOME: bool = true;
}

#[derive(Debug)]
struct NoWrap;
impl Fault for NoWrap {
    const NO_WRAP: bool = true;
}

#[derive(Debug, Default)]
#[repr(C)]
struct Bucket {
    status: Status,
    key: Key,
    value: u32,
}

impl BucketRecord for Bucket {
    type Key = Key;
    type Value = u32;

    fn status(&self) -> Status {
        self.status
    }

    fn key(&self) -> &Key {
        &self.key
    }

    fn value(&self) -> &u32 {
        &self.value
    }

    fn shape() -> RecordShape {
        record_shape!(Bucket { status: Status, key: Key, value: u32 })
    }
}

#[derive(Debug)]
#[repr(C)]
struct FaultyTable<F> {
    element_count: usize,
    deleted_count: usize,
    buckets: Vec<Bucket>,
    _fault: PhantomData<F>,
}

impl<F: Fault> FaultyTable<F> {
    fn with_buckets(len: usize) -> Self {
        Self {
            element_count: 0,
            deleted_count: 0,
            buckets: (0..len).map(|_| Bucket::default()).collect(),
            _fault: PhantomData,
        }
    }

    fn path(&self, key: &Key) -> Vec<usize> {
        let len = self.buckets.len();
        let home = *key.raw() as usize % len;
        let mut path = Vec::new();
        if F::RECHECKS_HOME {
            path.push(home);
        }
        for attempt in 0..len {
            if F::NO_WRAP && home + attempt >= len {
                break;
            }
            path.push((home + attempt) % len);
        }
        path
    }

    /// Returns the bucket holding `key`, or the first free bucket on its path.
    fn search(&self, key: &Key) -> Result<usize, Option<usize>> {
        let mut vacancy = None;
        for index in self.path(key) {
            let bucket = &self.buckets[index];
            let same = bucket.key == *key;
            match bucket.status {
                Status::Occupied if same => return Ok(index),
                Status::Occupied => {}
                Status::Deleted if F::STOPS_AT_TOMBSTONE => return Err(Some(index)),
                Status::Deleted => {
                    vacancy.get_or_insert(index);
                }
                Status::Empty => return Err(vacancy.or(Some(index))),
            }
        }
        Err(vacancy)
    }
}

impl<F: Fault> OpenAddressingTable for FaultyTable<F> {
    type Key = Key;
    type Value = u32;
    type Bucket = Bucket;

    fn element_count(&self) -> usize {
        self.element_count
    }

    fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    fn insert(&mut self, key: Key, value: u32) -> bool {
        let Err(Some(index)) = self.search(&key) else {
            return false;
        };
        if self.buckets[index].status == Status::Deleted {
            self.deleted_count -= 1;
        }
        self.buckets[index] = Bucket {
            status: Status::Occupied,
            key,
            value,
        };
        self.element_count += 1;
        true
    }

    fn erase(&mut self, key: &Key) -> bool {
        let Ok(index) = self.search(key) else {
            return false;
        };
        self.buckets[index].status = Status::Deleted;
        self.element_count -= 1;
        self.deleted_count += 1;
        true
    }

    fn lookup(&mut self, key: &Key) -> u32 {
        match self.search(key) {
            Ok(index) => self.buckets[index].value,
            Err(_) => 0,
        }
    }

    fn shape() -> RecordShape {
        record_shape!(FaultyTable<F> {
            element_count: usize,
            deleted_count: usize,
            buckets: Vec<Bucket>,
        })
    }
}

/// Fills buckets 2, 3 and 0 with keys that all start at bucket 2, then erases
/// the one in bucket 3.
fn with_tombstone<F: Fault>() -> TableVerifier<FaultyTable<F>> {
    let mut verifier = TableVerifier::new(FaultyTable::<F>::with_buckets(4)).unwrap();
    verifier
        .insert(Insert::new().key(2).value(20))
        .unwrap()
        .insert(Insert::new().key(6).value(60))
        .unwrap()
        .insert(Insert::new().key(10).value(100))
        .unwrap()
        .erase(Erase::new().key(6).returns(true))
        .unwrap();
    verifier
}

#[test]
fn correct_table_passes() {
    let mut verifier = with_tombstone::<Correct>();
    verifier
        .lookup(Lookup::new().key(10).probes([2, 3, 0]).returns(100))
        .unwrap()
        .erase(Erase::new().key(14).probes([2, 3, 0, 1]).returns(false))
        .unwrap()
        .insert(Insert::new().key(14).value(140).probes([2, 3, 0, 1]).returns(true))
        .unwrap()
        .size(3)
        .unwrap();
    assert_eq!(verifier.table().deleted_count(), 0);
}

#[test]
fn stopping_at_tombstone_is_too_short() {
    let mut verifier = with_tombstone::<StopsAtTombstone>();
    let err = verifier
        .lookup(Lookup::new().key(10).probes([2, 3, 0]).returns(100))
        .unwrap_err();
    assert_eq!(
        err,
        VerifyError::ProbeSequenceTooShort {
            expected_len: 3,
            observed: 2,
        }
    );
}

#[test]
fn stopping_at_tombstone_without_probes_is_a_wrong_result() {
    let mut verifier = with_tombstone::<StopsAtTombstone>();
    let err = verifier
        .lookup(Lookup::new().key(10).returns(100))
        .unwrap_err();
    assert_eq!(
        err,
        VerifyError::UnexpectedResult {
            expected: "100".into(),
            actual: "0".into(),
        }
    );
}

#[test]
fn rechecking_home_is_a_mismatch() {
    let mut verifier = TableVerifier::new(FaultyTable::<RechecksHome>::with_buckets(4)).unwrap();
    verifier.insert(Insert::new().key(1).value(1)).unwrap();
    let err = verifier
        .lookup(Lookup::new().key(5).probes([1, 2]))
        .unwrap_err();
    assert_eq!(
        err,
        VerifyError::ProbeSequenceMismatch {
            position: 1,
            expected: 2,
            actual: 1,
        }
    );
}

#[test]
fn rechecking_home_is_too_long() {
    let mut verifier = TableVerifier::new(FaultyTable::<RechecksHome>::with_buckets(4)).unwrap();
    verifier.insert(Insert::new().key(1).value(1)).unwrap();
    let err = verifier
        .lookup(Lookup::new().key(5).probes([1]))
        .unwrap_err();
    assert_eq!(
        err,
        VerifyError::ProbeSequenceTooLong {
            expected_len: 1,
            actual: 1,
        }
    );
}

#[test]
fn missing_wrap_around_is_caught() {
    let mut verifier = TableVerifier::new(FaultyTable::<NoWrap>::with_buckets(4)).unwrap();
    verifier.insert(Insert::new().key(3).value(3)).unwrap();

    let (inserted, probes) = verifier.trace_insert(7, 7);
    assert!(!inserted);
    assert_eq!(probes, vec![3]);

    let err = verifier
        .insert(Insert::new().key(7).value(7).probes([3, 0]).returns(true))
        .unwrap_err();
    assert_eq!(
        err,
        VerifyError::ProbeSequenceTooShort {
            expected_len: 2,
            observed: 1,
        }
    );
}

#[test]
fn size_checks() {
    let mut verifier = with_tombstone::<Correct>();
    assert_eq!(
        verifier.size(5).unwrap_err(),
        VerifyError::SizeExceedsCapacity {
            expected: 5,
            capacity: 4,
        }
    );
    assert_eq!(
        verifier.size(3).unwrap_err(),
        VerifyError::SizeMismatch {
            expected: 3,
            actual: 2,
        }
    );
    verifier.size(2).unwrap();
}

#[derive(Debug)]
#[repr(C)]
struct CachingTable {
    element_count: usize,
    deleted_count: usize,
    buckets: Vec<Bucket>,
    last_hit: usize,
}

impl OpenAddressingTable for CachingTable {
    type Key = Key;
    type Value = u32;
    type Bucket = Bucket;

    fn element_count(&self) -> usize {
        self.element_count
    }

    fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    fn insert(&mut self, _key: Key, _value: u32) -> bool {
        false
    }

    fn erase(&mut self, _key: &Key) -> bool {
        false
    }

    fn lookup(&mut self, _key: &Key) -> u32 {
        self.buckets.get(self.last_hit).map_or(0, |b| b.value)
    }

    fn shape() -> RecordShape {
        record_shape!(CachingTable {
            element_count: usize,
            deleted_count: usize,
            buckets: Vec<Bucket>,
        })
    }
}

#[test]
fn hidden_table_field_is_a_setup_error() {
    let table = CachingTable {
        element_count: 0,
        deleted_count: 0,
        buckets: Vec::new(),
        last_hit: 0,
    };
    let err = TableVerifier::new(table).unwrap_err();
    assert!(
        matches!(
            err,
            LayoutMismatch::RecordSize {
                expected: 40,
                actual: 48,
                ..
            }
        ),
        "{err}"
    );
}

/// Carries a cached hash the declared shape leaves out.
#[derive(Debug, Default)]
#[repr(C)]
struct HashedBucket {
    status: Status,
    key: Key,
    value: u32,
    hash: u64,
}

impl BucketRecord for HashedBucket {
    type Key = Key;
    type Value = u32;

    fn status(&self) -> Status {
        self.status
    }

    fn key(&self) -> &Key {
        &self.key
    }

    fn value(&self) -> &u32 {
        &self.value
    }

    fn shape() -> RecordShape {
        record_shape!(Bucket { status: Status, key: Key, value: u32 })
    }
}

#[derive(Debug)]
#[repr(C)]
struct HashedTable {
    element_count: usize,
    deleted_count: usize,
    buckets: Vec<HashedBucket>,
}

impl OpenAddressingTable for HashedTable {
    type Key = Key;
    type Value = u32;
    type Bucket = HashedBucket;

    fn element_count(&self) -> usize {
        self.element_count
    }

    fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    fn buckets(&self) -> &[HashedBucket] {
        &self.buckets
    }

    fn insert(&mut self, key: Key, value: u32) -> bool {
        let hash = u64::from(*key.raw());
        let Some(bucket) = self.buckets.iter_mut().find(|b| b.status == Status::Empty) else {
            return false;
        };
        *bucket = HashedBucket {
            status: Status::Occupied,
            key,
            value,
            hash,
        };
        self.element_count += 1;
        true
    }

    fn erase(&mut self, _key: &Key) -> bool {
        false
    }

    fn lookup(&mut self, key: &Key) -> u32 {
        self.buckets
            .iter()
            .find(|b| b.status == Status::Occupied && b.hash == u64::from(*key.raw()))
            .map_or(0, |b| b.value)
    }

    fn shape() -> RecordShape {
        record_shape!(HashedTable {
            element_count: usize,
            deleted_count: usize,
            buckets: Vec<HashedBucket>,
        })
    }
}

#[test]
fn bucket_shape_of_a_look_alike_is_rejected() {
    let table = HashedTable {
        element_count: 0,
        deleted_count: 0,
        buckets: (0..4).map(|_| HashedBucket::default()).collect(),
    };
    let err = TableVerifier::new(table).unwrap_err();
    assert_eq!(
        err,
        LayoutMismatch::ForeignShape {
            record: std::any::type_name::<HashedBucket>(),
            declared: std::any::type_name::<Bucket>(),
            actual_size: size_of::<HashedBucket>(),
            declared_size: size_of::<Bucket>(),
        }
    );
}

/// Declares the shape of another table with the same fields.
#[derive(Debug)]
#[repr(C)]
struct BorrowedShapeTable(FaultyTable<Correct>);

impl OpenAddressingTable for BorrowedShapeTable {
    type Key = Key;
    type Value = u32;
    type Bucket = Bucket;

    fn element_count(&self) -> usize {
        self.0.element_count()
    }

    fn deleted_count(&self) -> usize {
        self.0.deleted_count()
    }

    fn buckets(&self) -> &[Bucket] {
        self.0.buckets()
    }

    fn insert(&mut self, key: Key, value: u32) -> bool {
        self.0.insert(key, value)
    }

    fn erase(&mut self, key: &Key) -> bool {
        self.0.erase(key)
    }

    fn lookup(&mut self, key: &Key) -> u32 {
        self.0.lookup(key)
    }

    fn shape() -> RecordShape {
        FaultyTable::<Correct>::shape()
    }
}

#[test]
fn table_shape_of_another_type_is_rejected() {
    let table = BorrowedShapeTable(FaultyTable::with_buckets(4));
    let err = TableVerifier::new(table).unwrap_err();
    assert!(
        matches!(
            err,
            LayoutMismatch::ForeignShape {
                actual_size: 40,
                declared_size: 40,
                ..
            }
        ),
        "{err}"
    );
}
