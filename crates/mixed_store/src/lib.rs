//! # Mixed Store
//!
//! Contiguous, row-major storage for records whose field list is only known
//! at runtime, designed for:
//! - Entity/component style per-entity data
//! - Cache-friendly iteration over whole records
//! - Component sets chosen by configuration, not by a struct declaration
//!
//! ## Architecture
//!
//! ```text
//! LayoutBuilder --freeze--> RecordLayout --build--> MixedStore
//!   add_field::<T>()          offsets, stride          add / swap_delete
//!                                                      index_row_col
//!                                                      RowViewMut / RowViewCopy
//! ```
//!
//! ## Example
//!
//! ```rust
//! use mixed_store::LayoutBuilder;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Position { x: f32, y: f32, z: f32 }
//!
//! let mut store = LayoutBuilder::new()
//!     .add_field::<Position>()
//!     .add_field::<u32>()
//!     .build()
//!     .unwrap();
//!
//! store.add((Position { x: 1.0, y: 2.0, z: 3.0 }, 7u32)).unwrap();
//!
//! let mut view = store.row_view_mut();
//! view.get::<Position>(0).unwrap().x = 11.0;
//! assert_eq!(store.index_row_col::<Position>(0, 0).unwrap().x, 11.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod layout;
pub mod store;

pub use config::StoreConfig;
pub use error::{IndexKind, StoreError, StoreResult};
pub use layout::{FieldDescriptor, LayoutBuilder, RecordLayout};
pub use store::{
    next_capacity, IntoRow, MixedStore, RecordSnapshot, RowViewCopy, RowViewMut, BOXED_MISMATCH,
    GROWTH_THRESHOLD,
};
