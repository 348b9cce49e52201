//! # Layout Builder
//!
//! Accumulates field types in registration order, then freezes them into a
//! [`RecordLayout`] using C struct layout rules: fields are placed in the
//! order given, each at the next offset aligned for it, and the record is
//! padded to a multiple of its largest alignment.
//!
//! ```text
//! add_field::<u8>().add_field::<u32>().add_field::<u16>()
//!
//! | u8 | pad pad pad | u32 u32 u32 u32 | u16 u16 | pad pad |
//!   0                 4                  8         stride = 12
//! ```
//!
//! Fields are never reordered or deduplicated: two fields of the same type
//! occupy two columns.

use std::alloc::Layout;
use std::any::{type_name, TypeId};
use std::sync::Arc;

use bytemuck::Pod;

use super::field::FieldDescriptor;
use crate::config::StoreConfig;
use crate::error::{IndexKind, StoreError, StoreResult};
use crate::store::MixedStore;

/// Collects the field list of a store before its layout is frozen.
///
/// # Example
///
/// ```rust
/// use mixed_store::LayoutBuilder;
///
/// let mut store = LayoutBuilder::new()
///     .add_field::<[f32; 3]>()
///     .add_field::<String>()
///     .build()
///     .unwrap();
///
/// let row = store.add(([1.0f32, 2.0, 3.0], String::from("tag"))).unwrap();
/// assert_eq!(store.index_row_col::<String>(row, 1).unwrap(), "tag");
/// ```
#[derive(Debug, Default, Clone)]
pub struct LayoutBuilder {
    fields: Vec<FieldDescriptor>,
}

impl LayoutBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field of type `T`, copied through `T::clone`.
    #[must_use]
    pub fn add_field<T: Clone + 'static>(self) -> Self {
        self.add_descriptor(FieldDescriptor::of::<T>())
    }

    /// Appends a plain-data field of type `T`, copied bytewise.
    #[must_use]
    pub fn add_plain_field<T: Pod>(self) -> Self {
        self.add_descriptor(FieldDescriptor::plain::<T>())
    }

    /// Appends an already-built descriptor.
    #[must_use]
    pub fn add_descriptor(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Number of fields registered so far.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Freezes the field list into a record layout.
    ///
    /// # Errors
    ///
    /// - [`StoreError::BuildOrderViolation`] if no field was added
    /// - [`StoreError::LayoutOverflow`] if the record does not fit in `isize`
    pub fn freeze(self) -> StoreResult<RecordLayout> {
        RecordLayout::new(self.fields)
    }

    /// Freezes the layout and creates an empty store with capacity 1.
    ///
    /// # Errors
    ///
    /// Same as [`LayoutBuilder::freeze`].
    pub fn build(self) -> StoreResult<MixedStore> {
        self.build_with(&StoreConfig::default())
    }

    /// Freezes the layout and creates an empty store sized by `config`.
    ///
    /// # Errors
    ///
    /// Same as [`LayoutBuilder::freeze`], plus
    /// - [`StoreError::InvalidConfig`] if `config` fails validation
    /// - [`StoreError::CapacityOverflow`] if the initial buffer is too large
    pub fn build_with(self, config: &StoreConfig) -> StoreResult<MixedStore> {
        config.validate()?;
        let layout = self.freeze()?;
        MixedStore::with_capacity(Arc::new(layout), config.initial_capacity)
    }
}

/// A frozen record layout: per-field offsets plus the record stride.
#[derive(Debug, Clone)]
pub struct RecordLayout {
    fields: Vec<FieldDescriptor>,
    offsets: Vec<usize>,
    record: Layout,
}

impl RecordLayout {
    fn new(fields: Vec<FieldDescriptor>) -> StoreResult<Self> {
        if fields.is_empty() {
            return Err(StoreError::BuildOrderViolation(
                "build called before any field was added",
            ));
        }

        let mut record = Layout::new::<()>();
        let mut offsets = Vec::with_capacity(fields.len());
        for field in &fields {
            let (extended, offset) = record
                .extend(field.layout())
                .map_err(|_| StoreError::LayoutOverflow)?;
            record = extended;
            offsets.push(offset);
        }
        let record = record.pad_to_align();

        tracing::debug!(
            fields = fields.len(),
            stride = record.size(),
            align = record.align(),
            "record layout frozen"
        );

        Ok(Self {
            fields,
            offsets,
            record,
        })
    }

    /// Number of fields (columns).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false: a frozen layout has at least one field.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total byte size of one record, including padding.
    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.record.size()
    }

    /// Alignment of one record (the largest field alignment).
    #[inline]
    #[must_use]
    pub fn align(&self) -> usize {
        self.record.align()
    }

    /// Allocation layout of a single record.
    #[inline]
    #[must_use]
    pub fn record_layout(&self) -> Layout {
        self.record
    }

    /// Byte offset of column `col` within a record.
    #[inline]
    #[must_use]
    pub fn offset(&self, col: usize) -> Option<usize> {
        self.offsets.get(col).copied()
    }

    /// Byte offsets of every column, in column order.
    #[inline]
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Descriptor of column `col`.
    #[inline]
    #[must_use]
    pub fn field(&self, col: usize) -> Option<&FieldDescriptor> {
        self.fields.get(col)
    }

    /// Iterates over `(offset, descriptor)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &FieldDescriptor)> {
        self.offsets.iter().copied().zip(self.fields.iter())
    }

    /// Index of the first column holding `T`, in registration order.
    #[must_use]
    pub fn col_of<T: 'static>(&self) -> Option<usize> {
        let wanted = TypeId::of::<T>();
        self.fields.iter().position(|f| f.type_id() == wanted)
    }

    /// Checks that `col` exists and holds `T`; returns its offset.
    ///
    /// # Errors
    ///
    /// [`StoreError::IndexOutOfRange`] or [`StoreError::TypeMismatch`].
    pub fn expect_type<T: 'static>(&self, col: usize) -> StoreResult<usize> {
        let field = self.field(col).ok_or(StoreError::IndexOutOfRange {
            kind: IndexKind::Column,
            index: col,
            len: self.len(),
        })?;
        if !field.is::<T>() {
            return Err(StoreError::TypeMismatch {
                column: col,
                expected: field.type_name(),
                found: type_name::<T>(),
            });
        }
        Ok(self.offsets[col])
    }

    /// True if any field has drop glue.
    pub(crate) fn needs_drop(&self) -> bool {
        self.fields.iter().any(FieldDescriptor::needs_drop)
    }
}
