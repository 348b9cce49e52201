//! # Record Store
//!
//! Growable row-major storage for records of a frozen layout.
//!
//! ## Design Philosophy
//!
//! - One allocation holds every record; rows sit back to back at `stride`
//! - Growth follows a fixed, independently tested capacity policy
//! - Deletion is swap-remove: O(1), row indices are not stable
//! - Borrowing ties every handed-out reference to the current buffer

mod growth;
mod row;
mod table;
mod view;

pub use growth::{next_capacity, GROWTH_THRESHOLD};
pub use row::IntoRow;
pub use table::{MixedStore, BOXED_MISMATCH};
pub use view::{RecordSnapshot, RowViewCopy, RowViewMut};
