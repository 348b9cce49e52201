//! # Mixed Store
//!
//! One contiguous buffer of records shaped by a frozen [`RecordLayout`].
//!
//! ```text
//! Layout [Position, Velocity, Rc<Name>]:
//! [P0 V0 N0 | P1 V1 N1 | P2 V2 N2 | .... spare capacity ....]
//!  ^ row 0    ^ row 1    ^ row 2
//!  base + row * stride + offset(col)
//! ```
//!
//! Every field read or write is bounds-checked and type-checked against the
//! column's recorded `TypeId`. References handed out borrow the store, so
//! the borrow checker rejects any insertion or deletion while they are alive:
//! a reallocation can never leave a dangling reference behind.

// SAFETY: This module requires unsafe for the raw record buffer.
// All unsafe blocks are documented; pointers are derived only from
// `row_ptr` after a bounds check.
#![allow(unsafe_code)]

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::any::{type_name, Any};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use super::growth::next_capacity;
use super::row::IntoRow;
use super::view::{RowViewCopy, RowViewMut};
use crate::error::{IndexKind, StoreError, StoreResult};
use crate::layout::RecordLayout;

/// Allocates `layout`, or hands back an aligned dangling pointer for
/// zero-sized buffers.
pub(crate) fn allocate(layout: Layout) -> NonNull<u8> {
    if layout.size() == 0 {
        // Aligned, non-null, never dereferenced for more than zero bytes.
        return NonNull::new(layout.align() as *mut u8).unwrap_or(NonNull::dangling());
    }
    // SAFETY: layout has a non-zero size.
    let ptr = unsafe { alloc(layout) };
    match NonNull::new(ptr) {
        Some(ptr) => ptr,
        None => handle_alloc_error(layout),
    }
}

/// Frees a buffer obtained from [`allocate`] with the same layout.
///
/// # Safety
///
/// `ptr` came from `allocate(layout)` and is not used afterwards.
pub(crate) unsafe fn release(ptr: NonNull<u8>, layout: Layout) {
    if layout.size() != 0 {
        dealloc(ptr.as_ptr(), layout);
    }
}

/// Found-type name reported when a boxed value does not match its column.
pub const BOXED_MISMATCH: &str = "boxed value of a different type";

/// A growable, contiguous buffer of runtime-composed records.
///
/// Created by [`LayoutBuilder::build`](crate::LayoutBuilder::build).
pub struct MixedStore {
    /// Frozen layout shared with snapshots.
    layout: Arc<RecordLayout>,
    /// Record storage - `capacity * stride` bytes.
    storage: NonNull<u8>,
    /// Allocation layout of `storage`.
    storage_layout: Layout,
    /// Number of initialized records.
    len: usize,
    /// Records that fit before the next reallocation.
    capacity: usize,
}

impl MixedStore {
    /// Creates an empty store able to hold `capacity` records.
    pub(crate) fn with_capacity(layout: Arc<RecordLayout>, capacity: usize) -> StoreResult<Self> {
        let storage_layout = Self::buffer_layout(&layout, capacity)?;
        let storage = allocate(storage_layout);
        Ok(Self {
            layout,
            storage,
            storage_layout,
            len: 0,
            capacity,
        })
    }

    fn buffer_layout(layout: &RecordLayout, capacity: usize) -> StoreResult<Layout> {
        let overflow = StoreError::CapacityOverflow {
            requested: capacity,
        };
        let size = layout.stride().checked_mul(capacity).ok_or(overflow.clone())?;
        Layout::from_size_align(size, layout.align()).map_err(|_| overflow)
    }

    /// Returns the number of records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the capacity in records.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of fields per record.
    #[inline]
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.layout.len()
    }

    /// Returns the frozen record layout.
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub(crate) fn shared_layout(&self) -> &Arc<RecordLayout> {
        &self.layout
    }

    /// Gets the base pointer of a record slot.
    ///
    /// # Safety
    ///
    /// `row` must be < capacity.
    #[inline]
    pub(crate) unsafe fn row_ptr(&self, row: usize) -> *mut u8 {
        self.storage.as_ptr().add(row * self.layout.stride())
    }

    fn check_row(&self, row: usize) -> StoreResult<()> {
        if row < self.len {
            Ok(())
        } else {
            Err(StoreError::IndexOutOfRange {
                kind: IndexKind::Row,
                index: row,
                len: self.len,
            })
        }
    }

    /// Makes room for `extra` more records, reallocating if needed.
    ///
    /// On reallocation every field of every live record is moved into the
    /// new buffer one field at a time; padding is never read.
    fn ensure_capacity(&mut self, extra: usize) -> StoreResult<()> {
        let needed = self
            .len
            .checked_add(extra)
            .ok_or(StoreError::CapacityOverflow { requested: usize::MAX })?;
        if needed <= self.capacity {
            return Ok(());
        }

        let new_capacity = next_capacity(needed, self.capacity);
        let new_layout = Self::buffer_layout(&self.layout, new_capacity)?;
        let new_storage = allocate(new_layout);
        let stride = self.layout.stride();

        // SAFETY: rows < len are initialized in the old buffer; the new
        // buffer holds at least `len` rows; the buffers are distinct
        // allocations (or both zero-sized, where no bytes are copied).
        unsafe {
            for row in 0..self.len {
                let src = self.row_ptr(row);
                let dst = new_storage.as_ptr().add(row * stride);
                for (offset, field) in self.layout.iter() {
                    field.relocate(src.add(offset), dst.add(offset));
                }
            }
            release(self.storage, self.storage_layout);
        }

        tracing::trace!(
            old_capacity = self.capacity,
            new_capacity,
            bytes = new_layout.size(),
            "store reallocated"
        );

        self.storage = new_storage;
        self.storage_layout = new_layout;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Reserves the next row and returns its index and base pointer.
    ///
    /// The caller must initialize every field of the returned row before
    /// the store is used again.
    fn push_row(&mut self) -> StoreResult<(usize, *mut u8)> {
        self.ensure_capacity(1)?;
        let row = self.len;
        self.len = row + 1;
        // SAFETY: ensure_capacity guarantees row < capacity.
        let base = unsafe { self.row_ptr(row) };
        Ok((row, base))
    }

    /// Appends one record from a tuple of values, one per column.
    ///
    /// Returns the new row index.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ArityMismatch`] if the tuple length differs from the field count
    /// - [`StoreError::TypeMismatch`] if a value's type differs from its column
    /// - [`StoreError::CapacityOverflow`] if the buffer cannot grow
    ///
    /// On error the values are dropped and the store is unchanged.
    pub fn add<R: IntoRow>(&mut self, values: R) -> StoreResult<usize> {
        if R::ARITY != self.field_count() {
            return Err(StoreError::ArityMismatch {
                expected: self.field_count(),
                given: R::ARITY,
            });
        }
        R::check(&self.layout)?;

        let (row, base) = self.push_row()?;
        // SAFETY: arity and column types were checked above; `base` points
        // at a fresh, uninitialized row of this layout.
        unsafe {
            values.write_into(&self.layout, base);
        }
        Ok(row)
    }

    /// Appends one record from boxed values of any type.
    ///
    /// The dynamic counterpart of [`MixedStore::add`] for rows whose arity
    /// is only known at runtime. Each box's contents are moved into the
    /// store and the box allocation is freed.
    ///
    /// # Errors
    ///
    /// Same as [`MixedStore::add`]. A `Box<dyn Any>` does not carry its
    /// type name, so a [`StoreError::TypeMismatch`] from this path reports
    /// [`BOXED_MISMATCH`] as the found type.
    pub fn add_boxed(&mut self, values: Vec<Box<dyn Any>>) -> StoreResult<usize> {
        if values.len() != self.field_count() {
            return Err(StoreError::ArityMismatch {
                expected: self.field_count(),
                given: values.len(),
            });
        }
        for (col, (value, (_, field))) in values.iter().zip(self.layout.iter()).enumerate() {
            if Any::type_id(&**value) != field.type_id() {
                return Err(StoreError::TypeMismatch {
                    column: col,
                    expected: field.type_name(),
                    found: BOXED_MISMATCH,
                });
            }
        }

        let (row, base) = self.push_row()?;
        for (value, (offset, field)) in values.into_iter().zip(self.layout.iter()) {
            let raw = Box::into_raw(value).cast::<u8>();
            // SAFETY: the box holds a value of exactly this field's type
            // (checked above), so its allocation has `field.layout()`.
            // The value is moved out bytewise, then only the allocation
            // is freed; the value itself now lives in the store.
            unsafe {
                field.relocate(raw, base.add(offset));
                release(NonNull::new_unchecked(raw), field.layout());
            }
        }
        Ok(row)
    }

    /// Removes a record by moving the last record into its slot.
    ///
    /// O(1). Row identity is not preserved: after the call, `row` holds
    /// what used to be the last record. The removed values are dropped.
    ///
    /// # Errors
    ///
    /// [`StoreError::IndexOutOfRange`] if `row >= len`.
    pub fn swap_delete(&mut self, row: usize) -> StoreResult<()> {
        self.check_row(row)?;
        let last = self.len - 1;

        // SAFETY: row and last are < len, so both records are initialized.
        // After the swap the removed record sits at `last`, which is no
        // longer counted by `len` when its fields are dropped; a panicking
        // drop can only leak, never double-drop.
        unsafe {
            if row != last {
                let dst = self.row_ptr(row);
                let src = self.row_ptr(last);
                for (offset, field) in self.layout.iter() {
                    field.swap(dst.add(offset), src.add(offset));
                }
                tracing::trace!(row, last, "relocated last record");
            }
            self.len = last;
            let removed = self.row_ptr(last);
            for (offset, field) in self.layout.iter() {
                field.drop_value(removed.add(offset));
            }
        }
        Ok(())
    }

    /// Returns the column of the first field registered with type `T`.
    #[must_use]
    pub fn col_of<T: 'static>(&self) -> Option<usize> {
        self.layout.col_of::<T>()
    }

    /// Returns the `T` at `row` in the first column holding `T`.
    ///
    /// # Errors
    ///
    /// [`StoreError::FieldNotFound`] if no column holds `T`, otherwise as
    /// [`MixedStore::index_row_col`].
    pub fn index<T: 'static>(&self, row: usize) -> StoreResult<&T> {
        let col = self
            .col_of::<T>()
            .ok_or(StoreError::FieldNotFound(type_name::<T>()))?;
        self.index_row_col(row, col)
    }

    /// Mutable variant of [`MixedStore::index`].
    ///
    /// # Errors
    ///
    /// Same as [`MixedStore::index`].
    pub fn index_mut<T: 'static>(&mut self, row: usize) -> StoreResult<&mut T> {
        let col = self
            .col_of::<T>()
            .ok_or(StoreError::FieldNotFound(type_name::<T>()))?;
        self.index_row_col_mut(row, col)
    }

    /// Returns the value at (`row`, `col`).
    ///
    /// # Errors
    ///
    /// - [`StoreError::IndexOutOfRange`] for a bad row or column
    /// - [`StoreError::TypeMismatch`] if the column does not hold `T`
    pub fn index_row_col<T: 'static>(&self, row: usize, col: usize) -> StoreResult<&T> {
        self.check_row(row)?;
        let offset = self.layout.expect_type::<T>(col)?;
        // SAFETY: row < len and the column holds an initialized `T`,
        // aligned because offsets and stride honour T's alignment.
        unsafe { Ok(&*self.row_ptr(row).add(offset).cast::<T>()) }
    }

    /// Mutable variant of [`MixedStore::index_row_col`].
    ///
    /// # Errors
    ///
    /// Same as [`MixedStore::index_row_col`].
    pub fn index_row_col_mut<T: 'static>(&mut self, row: usize, col: usize) -> StoreResult<&mut T> {
        self.check_row(row)?;
        let offset = self.layout.expect_type::<T>(col)?;
        // SAFETY: as in index_row_col; `&mut self` guarantees exclusivity.
        unsafe { Ok(&mut *self.row_ptr(row).add(offset).cast::<T>()) }
    }

    /// Returns mutable references to two distinct columns of one row.
    ///
    /// # Errors
    ///
    /// [`StoreError::AliasedColumn`] if `col_a == col_b`, otherwise as
    /// [`MixedStore::index_row_col`].
    pub fn index_pair_mut<A: 'static, B: 'static>(
        &mut self,
        row: usize,
        col_a: usize,
        col_b: usize,
    ) -> StoreResult<(&mut A, &mut B)> {
        if col_a == col_b {
            return Err(StoreError::AliasedColumn(col_a));
        }
        self.check_row(row)?;
        let offset_a = self.layout.expect_type::<A>(col_a)?;
        let offset_b = self.layout.expect_type::<B>(col_b)?;
        // SAFETY: distinct columns of one record never overlap; both are
        // initialized and correctly typed.
        unsafe {
            let base = self.row_ptr(row);
            Ok((
                &mut *base.add(offset_a).cast::<A>(),
                &mut *base.add(offset_b).cast::<B>(),
            ))
        }
    }

    /// Returns a live cursor over the store, positioned at row 0.
    pub fn row_view_mut(&mut self) -> RowViewMut<'_> {
        RowViewMut::new(self)
    }

    /// Returns a copy-out cursor over the store, positioned at row 0.
    #[must_use]
    pub fn row_view_copy(&self) -> RowViewCopy<'_> {
        RowViewCopy::new(self)
    }
}

impl Drop for MixedStore {
    fn drop(&mut self) {
        // SAFETY: rows < len are initialized; the buffer came from `allocate`.
        unsafe {
            if self.layout.needs_drop() {
                for row in 0..self.len {
                    let base = self.row_ptr(row);
                    for (offset, field) in self.layout.iter() {
                        field.drop_value(base.add(offset));
                    }
                }
            }
            release(self.storage, self.storage_layout);
        }
    }
}

impl fmt::Debug for MixedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixedStore")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("stride", &self.layout.stride())
            .field("fields", &self.layout.len())
            .finish()
    }
}
