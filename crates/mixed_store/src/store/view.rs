//! # Row Views
//!
//! Cursors over the rows of a [`MixedStore`].
//!
//! - [`RowViewMut`] hands out live references into the store buffer. It
//!   borrows the store mutably, so nothing can grow or shrink the store
//!   while the view or any reference obtained from it is alive.
//! - [`RowViewCopy`] clones the current row into a private, stride-sized
//!   record whenever the cursor moves. Reads come from that copy, never from
//!   the live buffer; [`RowViewCopy::snapshot`] detaches it entirely.

// SAFETY: RecordSnapshot owns a raw, stride-sized record buffer.
#![allow(unsafe_code)]

use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use super::table::{allocate, release, MixedStore};
use crate::error::{IndexKind, StoreError, StoreResult};
use crate::layout::RecordLayout;

fn row_out_of_range(index: usize, len: usize) -> StoreError {
    StoreError::IndexOutOfRange {
        kind: IndexKind::Row,
        index,
        len,
    }
}

/// A live, mutable cursor into a store.
pub struct RowViewMut<'s> {
    store: &'s mut MixedStore,
    row: usize,
}

impl<'s> RowViewMut<'s> {
    pub(crate) fn new(store: &'s mut MixedStore) -> Self {
        Self { store, row: 0 }
    }

    /// Current row of the cursor.
    #[inline]
    #[must_use]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Moves the cursor to row `index`.
    ///
    /// # Errors
    ///
    /// [`StoreError::IndexOutOfRange`] if `index >= len`; the cursor stays put.
    pub fn set_index(&mut self, index: usize) -> StoreResult<()> {
        if index >= self.store.len() {
            return Err(row_out_of_range(index, self.store.len()));
        }
        self.row = index;
        Ok(())
    }

    /// Advances to the next row. Returns `false` (and stays) on the last row.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.row + 1 < self.store.len() {
            self.row += 1;
            true
        } else {
            false
        }
    }

    /// Returns a live reference to column `col` of the current row.
    ///
    /// Writes through it are visible to every later read of the store.
    ///
    /// # Errors
    ///
    /// Same as [`MixedStore::index_row_col`].
    pub fn get<T: 'static>(&mut self, col: usize) -> StoreResult<&mut T> {
        self.store.index_row_col_mut(self.row, col)
    }

    /// Shared variant of [`RowViewMut::get`].
    ///
    /// # Errors
    ///
    /// Same as [`MixedStore::index_row_col`].
    pub fn get_ref<T: 'static>(&self, col: usize) -> StoreResult<&T> {
        self.store.index_row_col(self.row, col)
    }

    /// Returns live references to two distinct columns of the current row.
    ///
    /// # Errors
    ///
    /// Same as [`MixedStore::index_pair_mut`].
    pub fn get_pair<A: 'static, B: 'static>(
        &mut self,
        col_a: usize,
        col_b: usize,
    ) -> StoreResult<(&mut A, &mut B)> {
        self.store.index_pair_mut(self.row, col_a, col_b)
    }
}

/// A cursor that reads field values out by copy.
///
/// The current row is cloned into a private scratch record on construction
/// and on every [`set_index`](Self::set_index)/[`next`](Self::next).
pub struct RowViewCopy<'s> {
    store: &'s MixedStore,
    row: usize,
    scratch: RecordSnapshot,
}

impl<'s> RowViewCopy<'s> {
    pub(crate) fn new(store: &'s MixedStore) -> Self {
        let mut view = Self {
            store,
            row: 0,
            scratch: RecordSnapshot::empty(Arc::clone(store.shared_layout())),
        };
        if !store.is_empty() {
            view.refresh();
        }
        view
    }

    fn refresh(&mut self) {
        // SAFETY: callers only refresh for row < len, so the source record
        // is initialized and laid out by the same layout as the scratch.
        unsafe {
            let src = self.store.row_ptr(self.row);
            self.scratch.fill_from(src);
        }
    }

    /// Current row of the cursor.
    #[inline]
    #[must_use]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Moves the cursor to row `index` and copies that row.
    ///
    /// # Errors
    ///
    /// [`StoreError::IndexOutOfRange`] if `index >= len`; the cursor stays put.
    pub fn set_index(&mut self, index: usize) -> StoreResult<()> {
        if index >= self.store.len() {
            return Err(row_out_of_range(index, self.store.len()));
        }
        self.row = index;
        self.refresh();
        Ok(())
    }

    /// Advances to the next row. Returns `false` (and stays) on the last row.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.row + 1 < self.store.len() {
            self.row += 1;
            self.refresh();
            true
        } else {
            false
        }
    }

    /// Returns a clone of column `col` of the copied row.
    ///
    /// # Errors
    ///
    /// - [`StoreError::IndexOutOfRange`] if the store is empty or `col` is bad
    /// - [`StoreError::TypeMismatch`] if the column does not hold `T`
    pub fn get<T: Clone + 'static>(&self, col: usize) -> StoreResult<T> {
        if !self.scratch.filled {
            return Err(row_out_of_range(self.row, self.store.len()));
        }
        self.scratch.get(col)
    }

    /// Detaches a copy of the current row that outlives the view and the
    /// borrow of the store.
    ///
    /// # Errors
    ///
    /// [`StoreError::IndexOutOfRange`] if the store is empty.
    pub fn snapshot(&self) -> StoreResult<RecordSnapshot> {
        if !self.scratch.filled {
            return Err(row_out_of_range(self.row, self.store.len()));
        }
        Ok(self.scratch.clone())
    }
}

/// One owned record, laid out exactly like a row of its store.
pub struct RecordSnapshot {
    layout: Arc<RecordLayout>,
    data: NonNull<u8>,
    /// True while `data` holds initialized field values.
    filled: bool,
}

impl RecordSnapshot {
    fn empty(layout: Arc<RecordLayout>) -> Self {
        let data = allocate(layout.record_layout());
        Self {
            layout,
            data,
            filled: false,
        }
    }

    /// Drops the held values, if any.
    fn clear(&mut self) {
        if !self.filled {
            return;
        }
        self.filled = false;
        // SAFETY: `filled` was set, so every field is initialized.
        unsafe {
            for (offset, field) in self.layout.iter() {
                field.drop_value(self.data.as_ptr().add(offset));
            }
        }
    }

    /// Replaces the held values with clones of the record at `src`.
    ///
    /// # Safety
    ///
    /// `src` points at an initialized record of `self.layout`.
    unsafe fn fill_from(&mut self, src: *const u8) {
        self.clear();
        for (offset, field) in self.layout.iter() {
            field.clone_value(src.add(offset), self.data.as_ptr().add(offset));
        }
        self.filled = true;
    }

    /// The layout this record follows.
    #[must_use]
    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Returns a reference to column `col`.
    ///
    /// # Errors
    ///
    /// [`StoreError::IndexOutOfRange`] or [`StoreError::TypeMismatch`].
    pub fn get_ref<T: 'static>(&self, col: usize) -> StoreResult<&T> {
        let offset = self.layout.expect_type::<T>(col)?;
        debug_assert!(self.filled, "snapshot read before fill: {}", type_name::<T>());
        // SAFETY: public snapshots are always filled; the column holds `T`.
        unsafe { Ok(&*self.data.as_ptr().add(offset).cast::<T>()) }
    }

    /// Returns a clone of column `col`.
    ///
    /// # Errors
    ///
    /// [`StoreError::IndexOutOfRange`] or [`StoreError::TypeMismatch`].
    pub fn get<T: Clone + 'static>(&self, col: usize) -> StoreResult<T> {
        self.get_ref::<T>(col).cloned()
    }
}

impl Clone for RecordSnapshot {
    fn clone(&self) -> Self {
        let mut copy = Self::empty(Arc::clone(&self.layout));
        if self.filled {
            // SAFETY: self holds an initialized record of the same layout.
            unsafe {
                copy.fill_from(self.data.as_ptr());
            }
        }
        copy
    }
}

impl Drop for RecordSnapshot {
    fn drop(&mut self) {
        self.clear();
        // SAFETY: `data` came from `allocate` with this record layout.
        unsafe {
            release(self.data, self.layout.record_layout());
        }
    }
}

impl fmt::Debug for RecordSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSnapshot")
            .field("fields", &self.layout.len())
            .field("stride", &self.layout.stride())
            .field("filled", &self.filled)
            .finish()
    }
}
