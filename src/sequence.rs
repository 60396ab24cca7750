use alloc::vec::Vec;
use core::cell::Cell;
use core::cell::OnceCell;
use core::cell::RefCell;

use crate::error::VerifyError;
use crate::key::InstrumentedKey;
use crate::layout::BucketGeometry;
use crate::observer::ProbeObserver;
use crate::observer::SubscriberRegistry;

/// Maps the address of a key field back to the index of the bucket holding
/// it.
///
/// `base_addr` is the address of the first bucket, `stride` the size of one
/// bucket record, `key_offset` the offset of the key field within it and
/// `len` the number of buckets. Returns `None` if the key does not live in
/// the key field of one of those buckets, which is the case for any key that
/// is not stored in the table (the probe key itself, temporaries, copies).
///
/// Only integer arithmetic is performed; nothing is dereferenced.
#[inline]
pub fn recover_bucket_index(
    key_addr: usize,
    base_addr: usize,
    key_offset: usize,
    stride: usize,
    len: usize,
) -> Option<usize> {
    if stride == 0 {
        return None;
    }

    let record_addr = key_addr.checked_sub(key_offset)?;
    let distance = record_addr.checked_sub(base_addr)?;
    if distance % stride != 0 {
        return None;
    }

    let index = distance / stride;
    (index < len).then_some(index)
}

/// The address range of a bucket array, captured right before an operation.
#[derive(Debug, Clone, Copy)]
pub struct BucketSpan {
    base: usize,
    len: usize,
    geometry: BucketGeometry,
}

impl BucketSpan {
    /// Captures the span of `buckets`, whose records have `geometry`.
    pub fn of<B>(buckets: &[B], geometry: BucketGeometry) -> Self {
        debug_assert_eq!(geometry.stride, size_of::<B>());
        Self {
            base: buckets.as_ptr().addr(),
            len: buckets.len(),
            geometry,
        }
    }

    /// Number of buckets in the span.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the span holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the bucket whose key field is `key`, if any.
    pub fn index_of<K>(&self, key: &InstrumentedKey<K>) -> Option<usize> {
        recover_bucket_index(
            core::ptr::from_ref(key).addr(),
            self.base,
            self.geometry.key_offset,
            self.geometry.stride,
            self.len,
        )
    }
}

/// Checks that a table probes exactly an expected sequence of buckets.
///
/// Each comparison against a stored key is resolved to a bucket index and
/// matched against the next expected index. Comparisons against keys that do
/// not live in the bucket array are ignored. The first failure is kept and
/// reported by [`ProbeObserver::finalize`]; later comparisons in the same
/// operation are not checked.
#[derive(Debug)]
pub struct ProbeSequenceVerifier {
    span: BucketSpan,
    expected: Vec<usize>,
    cursor: Cell<usize>,
    failure: OnceCell<VerifyError>,
    subscribers: SubscriberRegistry,
}

impl ProbeSequenceVerifier {
    /// Creates a verifier expecting the buckets in `span` to be probed in the
    /// order given by `expected`.
    pub fn new(span: BucketSpan, expected: Vec<usize>) -> Self {
        Self {
            span,
            expected,
            cursor: Cell::new(0),
            failure: OnceCell::new(),
            subscribers: SubscriberRegistry::default(),
        }
    }

    /// The expected probe sequence.
    pub fn expected(&self) -> &[usize] {
        &self.expected
    }

    /// Number of probes matched so far.
    pub fn matched(&self) -> usize {
        self.cursor.get()
    }

    fn handle_probe(&self, index: usize) -> Result<(), VerifyError> {
        let position = self.cursor.get();
        let Some(&expected) = self.expected.get(position) else {
            return Err(VerifyError::ProbeSequenceTooLong {
                expected_len: self.expected.len(),
                actual: index,
            });
        };

        if index != expected {
            return Err(VerifyError::ProbeSequenceMismatch {
                position,
                expected,
                actual: index,
            });
        }

        self.cursor.set(position + 1);
        Ok(())
    }
}

impl<K> ProbeObserver<K> for ProbeSequenceVerifier {
    fn on_compare(&self, compared: &InstrumentedKey<K>) {
        if self.failure.get().is_some() {
            return;
        }

        let Some(index) = self.span.index_of(compared) else {
            tracing::trace!("ignoring comparison against a key outside the bucket array");
            return;
        };

        tracing::trace!(index, position = self.cursor.get(), "observed probe");
        if let Err(error) = self.handle_probe(index) {
            tracing::debug!(%error, "probe sequence check failed");
            let _ = self.failure.set(error);
        }
    }

    fn finalize(&self) -> Result<(), VerifyError> {
        if let Some(error) = self.failure.get() {
            return Err(error.clone());
        }

        let observed = self.cursor.get();
        if observed != self.expected.len() {
            return Err(VerifyError::ProbeSequenceTooShort {
                expected_len: self.expected.len(),
                observed,
            });
        }

        Ok(())
    }

    fn subscribers(&self) -> &SubscriberRegistry {
        &self.subscribers
    }
}

/// Records which buckets a table probes, without checking anything.
///
/// Useful for finding out what a table actually does before writing the
/// expected sequence for it.
#[derive(Debug)]
pub struct ProbeRecorder {
    span: BucketSpan,
    recorded: RefCell<Vec<usize>>,
    subscribers: SubscriberRegistry,
}

impl ProbeRecorder {
    /// Creates a recorder for the buckets in `span`.
    pub fn new(span: BucketSpan) -> Self {
        Self {
            span,
            recorded: RefCell::new(Vec::new()),
            subscribers: SubscriberRegistry::default(),
        }
    }

    /// The bucket indices probed so far, in order.
    pub fn recorded(&self) -> Vec<usize> {
        self.recorded.borrow().clone()
    }
}

impl<K> ProbeObserver<K> for ProbeRecorder {
    fn on_compare(&self, compared: &InstrumentedKey<K>) {
        if let Some(index) = self.span.index_of(compared) {
            self.recorded.borrow_mut().push(index);
        }
    }

    fn finalize(&self) -> Result<(), VerifyError> {
        Ok(())
    }

    fn subscribers(&self) -> &SubscriberRegistry {
        &self.subscribers
    }
}
