use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::args::Erase;
use crate::args::Insert;
use crate::args::Label;
use crate::args::Lookup;
use crate::args::Set;
use crate::assertion::ExpectEq;
use crate::assertion::NoAssertion;
use crate::assertion::ResultAssertion;
use crate::error::LayoutMismatch;
use crate::error::VerifyError;
use crate::key::InstrumentedKey;
use crate::layout::BucketGeometry;
use crate::layout::validate_layout;
use crate::observer::NoopObserver;
use crate::observer::ProbeObserver;
use crate::sequence::BucketSpan;
use crate::sequence::ProbeRecorder;
use crate::sequence::ProbeSequenceVerifier;
use crate::table::BucketRecord;
use crate::table::OpenAddressingTable;
use crate::table::Status;

/// Drives a table under test and checks what it does.
///
/// Every verification call binds a fresh [`InstrumentedKey`] to a fresh
/// observer, runs one table operation, finalizes the observer and then checks
/// the operation's result. The first failure ends the call.
///
/// A failed probe check does not interrupt the table operation, which always
/// runs to completion. A call that returned `Err` may therefore still have
/// mutated the table.
///
/// The table's layout is validated once, when the verifier is created.
///
/// ## Example
///
/// ```rust
/// use probe_verify::IdentityHashBuilder;
/// use probe_verify::InstrumentedKey;
/// use probe_verify::LinearProbe;
/// use probe_verify::ProbingTable;
/// use probe_verify::TableVerifier;
/// use probe_verify::args::Erase;
/// use probe_verify::args::Insert;
///
/// type Table = ProbingTable<InstrumentedKey<u64>, u64, LinearProbe, IdentityHashBuilder>;
///
/// let mut verifier = TableVerifier::new(Table::with_buckets(4))?;
/// verifier
///     .insert(Insert::new().key(1).value(10).probes([1]).returns(true))?
///     .insert(Insert::new().key(5).value(50).probes([1, 2]).returns(true))?
///     .erase(Erase::new().key(5).probes([1, 2]).returns(true))?
///     .size(1)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct TableVerifier<T> {
    table: T,
    geometry: BucketGeometry,
}

impl<T> Debug for TableVerifier<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TableVerifier")
            .field("table", &self.table)
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl<T, K, V> TableVerifier<T>
where
    T: OpenAddressingTable<Key = InstrumentedKey<K>, Value = V>,
    T::Bucket: 'static,
    K: 'static,
    V: 'static,
{
    /// Wraps `table` after validating its layout.
    ///
    /// A layout mismatch means probe indices cannot be recovered for this table
    /// type, so no verifier is created.
    pub fn new(table: T) -> Result<Self, LayoutMismatch> {
        let geometry = validate_layout::<T>()?;
        Ok(Self { table, geometry })
    }

    /// The table under test.
    pub fn table(&self) -> &T {
        &self.table
    }

    /// Unwraps the table under test.
    pub fn into_inner(self) -> T {
        self.table
    }

    /// Where keys live inside the table's buckets.
    pub fn geometry(&self) -> BucketGeometry {
        self.geometry
    }

    /// The status of every bucket, in index order.
    pub fn statuses(&self) -> Vec<Status> {
        self.table.buckets().iter().map(BucketRecord::status).collect()
    }

    /// Checks that the table holds exactly `expected` elements.
    ///
    /// An `expected` larger than the bucket count can never hold and is
    /// reported as [`VerifyError::SizeExceedsCapacity`] before the element
    /// count is looked at.
    pub fn check_size(&self, expected: usize) -> Result<(), VerifyError> {
        let capacity = self.table.buckets().len();
        if expected > capacity {
            return Err(VerifyError::SizeExceedsCapacity { expected, capacity });
        }

        let actual = self.table.element_count();
        if actual != expected {
            return Err(VerifyError::SizeMismatch { expected, actual });
        }

        Ok(())
    }

    /// Chaining form of [`check_size`](Self::check_size).
    pub fn size(&mut self, expected: usize) -> Result<&mut Self, VerifyError> {
        self.check_size(expected)?;
        Ok(self)
    }

    /// Inserts a key and value, checking the probe sequence and result if
    /// they were supplied.
    pub fn insert<P, R>(&mut self, args: Insert<Set<K>, Set<V>, P, R>) -> Result<&mut Self, VerifyError>
    where
        P: Label<Vec<usize>>,
        R: Label<bool>,
    {
        let value = args.value.into_inner();
        self.verified(
            "insert",
            args.key.into_inner(),
            args.probes.into_option(),
            args.returns.into_option(),
            |table, key| table.insert(key, value),
        )
    }

    /// Erases a key, checking the probe sequence and result if they were
    /// supplied.
    pub fn erase<P, R>(&mut self, args: Erase<Set<K>, P, R>) -> Result<&mut Self, VerifyError>
    where
        P: Label<Vec<usize>>,
        R: Label<bool>,
    {
        self.verified(
            "erase",
            args.key.into_inner(),
            args.probes.into_option(),
            args.returns.into_option(),
            |table, key| table.erase(&key),
        )
    }

    /// Looks up a key, checking the probe sequence and returned value if they
    /// were supplied.
    pub fn lookup<P, R>(&mut self, args: Lookup<Set<K>, P, R>) -> Result<&mut Self, VerifyError>
    where
        P: Label<Vec<usize>>,
        R: Label<V>,
        V: PartialEq + Debug,
    {
        self.verified(
            "lookup",
            args.key.into_inner(),
            args.probes.into_option(),
            args.returns.into_option(),
            |table, key| table.lookup(&key),
        )
    }

    /// Inserts a key and value, returning the result and the buckets probed.
    pub fn trace_insert(&mut self, key: K, value: V) -> (bool, Vec<usize>) {
        self.recorded(key, |table, key| table.insert(key, value))
    }

    /// Erases a key, returning the result and the buckets probed.
    pub fn trace_erase(&mut self, key: K) -> (bool, Vec<usize>) {
        self.recorded(key, |table, key| table.erase(&key))
    }

    /// Looks up a key, returning the value and the buckets probed.
    pub fn trace_lookup(&mut self, key: K) -> (V, Vec<usize>) {
        self.recorded(key, |table, key| table.lookup(&key))
    }

    fn span(&self) -> BucketSpan {
        BucketSpan::of(self.table.buckets(), self.geometry)
    }

    fn observer(&self, probes: Option<Vec<usize>>) -> Rc<dyn ProbeObserver<K>> {
        if let Some(expected) = probes {
            return Rc::new(ProbeSequenceVerifier::new(self.span(), expected));
        }
        Rc::new(NoopObserver::default())
    }

    fn verified<Out>(
        &mut self,
        op: &'static str,
        key: K,
        probes: Option<Vec<usize>>,
        expected: Option<Out>,
        run: impl FnOnce(&mut T, InstrumentedKey<K>) -> Out,
    ) -> Result<&mut Self, VerifyError>
    where
        Out: PartialEq + Debug + 'static,
    {
        tracing::debug!(op, probes = ?probes, "verifying table operation");
        let observer = self.observer(probes);
        let assertion = assertion_for(expected);

        let key = InstrumentedKey::new(key, &observer);
        let result = run(&mut self.table, key);

        let outcome = observer
            .finalize()
            .and_then(|()| assertion.check(&result));
        if let Err(error) = &outcome {
            tracing::debug!(op, %error, "table operation failed verification");
        }
        outcome.map(|()| self)
    }

    fn recorded<Out>(&mut self, key: K, run: impl FnOnce(&mut T, InstrumentedKey<K>) -> Out) -> (Out, Vec<usize>) {
        let recorder = Rc::new(ProbeRecorder::new(self.span()));
        let observer: Rc<dyn ProbeObserver<K>> = recorder.clone();

        let key = InstrumentedKey::new(key, &observer);
        let result = run(&mut self.table, key);
        (result, recorder.recorded())
    }
}

fn assertion_for<T>(expected: Option<T>) -> Box<dyn ResultAssertion<T>>
where
    T: PartialEq + Debug + 'static,
{
    if let Some(expected) = expected {
        return Box::new(ExpectEq(expected));
    }
    Box::new(NoAssertion)
}
