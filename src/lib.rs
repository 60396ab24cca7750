#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod args;

/// Checks applied to the value a table operation returns.
pub mod assertion;

pub mod error;

/// Keys that report their own equality comparisons.
pub mod key;

pub mod layout;

/// Observers that instrumented keys report to.
pub mod observer;

/// A reference open-addressing table that satisfies the harness boundary.
pub mod probing_table;

/// Recovery of bucket indices from compared keys, and the observers built on
/// it.
pub mod sequence;

pub mod table;

/// The entry point that drives a table under test.
pub mod verifier;

pub use error::LayoutMismatch;
pub use error::VerifyError;
pub use key::InstrumentedKey;
pub use layout::BucketGeometry;
pub use layout::RecordShape;
pub use layout::validate_layout;
pub use observer::NoopObserver;
pub use observer::ProbeObserver;
pub use observer::SubscriberRegistry;
pub use probing_table::DefaultHashBuilder;
pub use probing_table::IdentityHashBuilder;
pub use probing_table::LinearProbe;
pub use probing_table::ProbeStep;
pub use probing_table::ProbingTable;
pub use probing_table::QuadraticProbe;
pub use probing_table::Slot;
pub use sequence::BucketSpan;
pub use sequence::ProbeRecorder;
pub use sequence::ProbeSequenceVerifier;
pub use sequence::recover_bucket_index;
pub use table::BucketRecord;
pub use table::OpenAddressingTable;
pub use table::Status;
pub use verifier::TableVerifier;
