//! # Field Descriptors
//!
//! A [`FieldDescriptor`] is the type-erased shape of one column: its
//! `TypeId`, its size and alignment, and the copy strategy picked for that
//! type when the column was registered.
//!
//! ## Copy Strategies
//!
//! ```text
//! Bitwise : plain data (bytemuck::Pod). Clone = memcpy, nothing to drop.
//! Typed   : anything Clone. Clone goes through T::clone, drop through
//!           drop_in_place::<T>, so Rc/Arc/Box fields keep their counts
//!           and ownership straight.
//! ```
//!
//! Relocation (growth, swap-delete) is a move for both strategies: the bytes
//! of exactly one field are transferred and the source slot is treated as
//! uninitialized afterwards.

// SAFETY: This module hands out raw copy/drop functions over erased memory.
// Callers in `store` guarantee pointers are valid and aligned for the field.
#![allow(unsafe_code)]

use std::alloc::Layout;
use std::any::{type_name, TypeId};
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;

use bytemuck::Pod;

/// Clones the `T` at `src` into the uninitialized slot at `dst`.
unsafe fn clone_typed<T: Clone>(src: *const u8, dst: *mut u8) {
    let value = &*src.cast::<T>();
    ptr::write(dst.cast::<T>(), value.clone());
}

/// Drops the `T` at `slot` in place.
unsafe fn drop_typed<T>(slot: *mut u8) {
    ptr::drop_in_place(slot.cast::<T>());
}

/// How values of a field type are duplicated and released.
#[derive(Clone, Copy)]
pub(crate) enum CopyStrategy {
    /// Plain old data: duplicate by copying bytes, never dropped.
    Bitwise,
    /// Duplicate through the type's `Clone`, release through its `Drop`.
    Typed {
        clone_into: unsafe fn(*const u8, *mut u8),
        drop_in_place: Option<unsafe fn(*mut u8)>,
    },
}

/// Type-erased description of one column.
#[derive(Clone, Copy)]
pub struct FieldDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    layout: Layout,
    strategy: CopyStrategy,
}

impl FieldDescriptor {
    /// Describes a field of type `T`, copied through `T::clone`.
    #[must_use]
    pub fn of<T: Clone + 'static>() -> Self {
        let drop_in_place = if std::mem::needs_drop::<T>() {
            Some(drop_typed::<T> as unsafe fn(*mut u8))
        } else {
            None
        };
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            layout: Layout::new::<T>(),
            strategy: CopyStrategy::Typed {
                clone_into: clone_typed::<T>,
                drop_in_place,
            },
        }
    }

    /// Describes a plain-data field of type `T`, copied bytewise.
    #[must_use]
    pub fn plain<T: Pod>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            layout: Layout::new::<T>(),
            strategy: CopyStrategy::Bitwise,
        }
    }

    /// Returns the `TypeId` of the field type.
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the name of the field type.
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Size of one value in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Alignment of one value in bytes.
    #[inline]
    #[must_use]
    pub fn align(&self) -> usize {
        self.layout.align()
    }

    /// Returns the allocation layout of one value.
    #[inline]
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// True if values of this field go through the bytewise path.
    #[inline]
    #[must_use]
    pub fn is_plain(&self) -> bool {
        matches!(self.strategy, CopyStrategy::Bitwise)
    }

    /// Checks whether the field holds values of type `T`.
    #[inline]
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Moves one value from `src` to `dst`.
    ///
    /// # Safety
    ///
    /// - `src` holds an initialized value of this field's type
    /// - `dst` is valid for writes of `size()` bytes and does not overlap `src`
    /// - after the call `src` must be treated as uninitialized
    #[inline]
    pub(crate) unsafe fn relocate(&self, src: *const u8, dst: *mut u8) {
        ptr::copy_nonoverlapping(src, dst, self.layout.size());
    }

    /// Exchanges the values at `a` and `b`.
    ///
    /// # Safety
    ///
    /// Both slots hold initialized values of this field's type and do not overlap.
    #[inline]
    pub(crate) unsafe fn swap(&self, a: *mut u8, b: *mut u8) {
        ptr::swap_nonoverlapping(
            a.cast::<MaybeUninit<u8>>(),
            b.cast::<MaybeUninit<u8>>(),
            self.layout.size(),
        );
    }

    /// Writes a duplicate of the value at `src` into `dst`.
    ///
    /// # Safety
    ///
    /// - `src` holds an initialized value of this field's type
    /// - `dst` is valid and aligned for this type and currently uninitialized
    #[inline]
    pub(crate) unsafe fn clone_value(&self, src: *const u8, dst: *mut u8) {
        match self.strategy {
            CopyStrategy::Bitwise => ptr::copy_nonoverlapping(src, dst, self.layout.size()),
            CopyStrategy::Typed { clone_into, .. } => clone_into(src, dst),
        }
    }

    /// Drops the value at `slot` in place.
    ///
    /// # Safety
    ///
    /// `slot` holds an initialized value of this field's type. It is
    /// uninitialized afterwards.
    #[inline]
    pub(crate) unsafe fn drop_value(&self, slot: *mut u8) {
        if let CopyStrategy::Typed {
            drop_in_place: Some(drop_fn),
            ..
        } = self.strategy
        {
            drop_fn(slot);
        }
    }

    /// True if dropping a value of this type does anything.
    #[inline]
    pub(crate) fn needs_drop(&self) -> bool {
        matches!(
            self.strategy,
            CopyStrategy::Typed {
                drop_in_place: Some(_),
                ..
            }
        )
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("type_name", &self.type_name)
            .field("size", &self.layout.size())
            .field("align", &self.layout.align())
            .field("plain", &self.is_plain())
            .finish()
    }
}
