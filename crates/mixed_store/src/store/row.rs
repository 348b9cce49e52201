//! # Row Values
//!
//! Tuples of owned values that can be written as one record.
//!
//! `(A,)` through `(A, B, ..., L)` implement [`IntoRow`]. The tuple's
//! arity and element types are checked against the layout before any byte
//! of the store is touched.

// SAFETY: `write_into` writes raw field values at layout offsets.
#![allow(unsafe_code)]

use std::ptr;

use crate::error::StoreResult;
use crate::layout::RecordLayout;

mod sealed {
    pub trait Sealed {}
}

/// A full record's worth of values, one per column.
///
/// Sealed: implemented for tuples of 1 to 12 elements.
pub trait IntoRow: sealed::Sealed {
    /// Number of values in the row.
    const ARITY: usize;

    /// Checks every element type against its column.
    ///
    /// # Errors
    ///
    /// [`StoreError::TypeMismatch`](crate::StoreError::TypeMismatch) or
    /// [`StoreError::IndexOutOfRange`](crate::StoreError::IndexOutOfRange).
    fn check(layout: &RecordLayout) -> StoreResult<()>;

    /// Moves every element into its column at `base`.
    ///
    /// # Safety
    ///
    /// `check(layout)` succeeded, `ARITY == layout.len()`, and `base` points
    /// at an uninitialized record slot of `layout`.
    #[doc(hidden)]
    unsafe fn write_into(self, layout: &RecordLayout, base: *mut u8);
}

macro_rules! impl_into_row {
    ($arity:expr; $($name:ident $idx:tt),+) => {
        impl<$($name: 'static),+> sealed::Sealed for ($($name,)+) {}

        impl<$($name: 'static),+> IntoRow for ($($name,)+) {
            const ARITY: usize = $arity;

            fn check(layout: &RecordLayout) -> StoreResult<()> {
                $( layout.expect_type::<$name>($idx)?; )+
                Ok(())
            }

            unsafe fn write_into(self, layout: &RecordLayout, base: *mut u8) {
                let offsets = layout.offsets();
                $(
                    debug_assert!(layout.field($idx).is_some_and(|f| f.is::<$name>()));
                    // Indexing panics rather than aliasing column 0 if the
                    // caller skipped `check`.
                    ptr::write(base.add(offsets[$idx]).cast::<$name>(), self.$idx);
                )+
            }
        }
    };
}

impl_into_row!(1; A 0);
impl_into_row!(2; A 0, B 1);
impl_into_row!(3; A 0, B 1, C 2);
impl_into_row!(4; A 0, B 1, C 2, D 3);
impl_into_row!(5; A 0, B 1, C 2, D 3, E 4);
impl_into_row!(6; A 0, B 1, C 2, D 3, E 4, F 5);
impl_into_row!(7; A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_into_row!(8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
impl_into_row!(9; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8);
impl_into_row!(10; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9);
impl_into_row!(11; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10);
impl_into_row!(12; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11);
