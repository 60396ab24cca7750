//! Structural checks on the record shapes of a table under test.
//!
//! Bucket index recovery works backwards from the address of a compared key
//! to the bucket that holds it. That arithmetic is only sound if the bucket
//! record is exactly `status`, `key`, `value` and the table keeps its buckets
//! in a plain `Vec`, so both shapes are compared against `#[repr(C)]`
//! reference records before any table of that type is exercised.

use alloc::vec::Vec;
use core::any::TypeId;

use crate::error::LayoutMismatch;
use crate::table::BucketRecord;
use crate::table::OpenAddressingTable;
use crate::table::Status;

/// Builds the [`RecordShape`] of a struct from a list of its fields.
///
/// Every listed field is type-checked against the struct, so a shape cannot
/// claim a field the record does not have or give it the wrong type.
///
/// ```rust
/// use probe_verify::Status;
/// use probe_verify::record_shape;
///
/// #[repr(C)]
/// struct Bucket {
///     status: Status,
///     key: u64,
///     value: u32,
/// }
///
/// let shape = record_shape!(Bucket { status: Status, key: u64, value: u32 });
/// assert_eq!(shape.field_names(), ["status", "key", "value"]);
/// assert_eq!(shape.field("key").unwrap().offset, 8);
/// ```
#[macro_export]
macro_rules! record_shape {
    ($record:ty { $($field:ident : $ty:ty),* $(,)? }) => {{
        $( let _: fn(&$record) -> &$ty = |record| &record.$field; )*
        $crate::layout::RecordShape::new::<$record>(&[
            $(
                $crate::layout::FieldShape::of::<$ty>(
                    ::core::stringify!($field),
                    ::core::mem::offset_of!($record, $field),
                ),
            )*
        ])
    }};
}

/// One field of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShape {
    /// Field name.
    pub name: &'static str,
    /// Identity of the field's type.
    pub type_id: TypeId,
    /// Human readable name of the field's type.
    pub type_name: &'static str,
    /// Byte offset of the field within the record.
    pub offset: usize,
    /// Size of the field in bytes.
    pub size: usize,
}

impl FieldShape {
    /// Describes a field of type `T` named `name` at `offset`.
    pub fn of<T: 'static>(name: &'static str, offset: usize) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            offset,
            size: size_of::<T>(),
        }
    }
}

/// The declared fields and total size of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordShape {
    /// Name of the record type.
    pub name: &'static str,
    /// Total size of the record in bytes.
    pub size: usize,
    /// Declared fields, in declaration order.
    pub fields: Vec<FieldShape>,
}

impl RecordShape {
    /// Describes record `R` with the given fields.
    pub fn new<R>(fields: &[FieldShape]) -> Self {
        Self {
            name: core::any::type_name::<R>(),
            size: size_of::<R>(),
            fields: fields.to_vec(),
        }
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
}

/// Where the key lives inside a bucket, and how far apart buckets are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketGeometry {
    /// Byte offset of the key field within a bucket record.
    pub key_offset: usize,
    /// Size of one bucket record, which is the array stride.
    pub stride: usize,
}

#[allow(dead_code)]
#[repr(C)]
struct ReferenceTable<B> {
    element_count: usize,
    deleted_count: usize,
    buckets: Vec<B>,
}

#[allow(dead_code)]
#[repr(C)]
struct ReferenceBucket<K, V> {
    status: Status,
    key: K,
    value: V,
}

/// The shape a table record holding buckets of type `B` must have.
pub fn expected_table_shape<B: 'static>() -> RecordShape {
    crate::record_shape!(ReferenceTable<B> {
        element_count: usize,
        deleted_count: usize,
        buckets: Vec<B>,
    })
}

/// The shape a bucket record holding `K` and `V` must have.
pub fn expected_bucket_shape<K: 'static, V: 'static>() -> RecordShape {
    crate::record_shape!(ReferenceBucket<K, V> {
        status: Status,
        key: K,
        value: V,
    })
}

/// Compares a declared shape against the reference shape.
pub fn check_record(actual: &RecordShape, expected: &RecordShape) -> Result<(), LayoutMismatch> {
    let record = actual.name;

    if actual.field_names() != expected.field_names() {
        return Err(LayoutMismatch::FieldNames {
            record,
            expected: expected.field_names(),
            actual: actual.field_names(),
        });
    }

    for (have, want) in actual.fields.iter().zip(&expected.fields) {
        if have.type_id != want.type_id {
            return Err(LayoutMismatch::FieldType {
                record,
                field: have.name,
                expected: want.type_name,
                actual: have.type_name,
            });
        }
        if have.offset != want.offset {
            return Err(LayoutMismatch::FieldOffset {
                record,
                field: have.name,
                expected: want.offset,
                actual: have.offset,
            });
        }
    }

    if actual.size != expected.size {
        return Err(LayoutMismatch::RecordSize {
            record,
            expected: expected.size,
            actual: actual.size,
        });
    }

    Ok(())
}

/// Checks that `shape` was built for `R` and not for a look-alike type.
pub fn check_declared<R>(shape: &RecordShape) -> Result<(), LayoutMismatch> {
    let record = core::any::type_name::<R>();
    let actual_size = size_of::<R>();
    if shape.name != record || shape.size != actual_size {
        return Err(LayoutMismatch::ForeignShape {
            record,
            declared: shape.name,
            actual_size,
            declared_size: shape.size,
        });
    }

    Ok(())
}

/// Validates both record shapes of table type `T`.
///
/// Each declared shape must describe `T` and `T::Bucket` themselves, and must
/// match the reference records. On success returns the bucket geometry that
/// bucket index recovery for `T` relies on.
pub fn validate_layout<T>() -> Result<BucketGeometry, LayoutMismatch>
where
    T: OpenAddressingTable,
    T::Key: 'static,
    T::Value: 'static,
    T::Bucket: 'static,
{
    let table = <T as OpenAddressingTable>::shape();
    check_declared::<T>(&table)?;
    check_record(&table, &expected_table_shape::<T::Bucket>())?;

    let bucket = <T::Bucket as BucketRecord>::shape();
    check_declared::<T::Bucket>(&bucket)?;
    check_record(&bucket, &expected_bucket_shape::<T::Key, T::Value>())?;

    // Present and at the reference offset, or check_record would have failed.
    let key_offset = bucket.field("key").map_or(0, |f| f.offset);
    tracing::trace!(
        table = table.name,
        key_offset,
        stride = bucket.size,
        "validated table layout"
    );

    Ok(BucketGeometry {
        key_offset,
        stride: bucket.size,
    })
}
