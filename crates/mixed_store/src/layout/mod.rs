//! # Record Layout
//!
//! Turns a field list known only at runtime into a fixed record shape.
//!
//! ## Design Philosophy
//!
//! - Field types are captured once, at registration, as erased descriptors
//! - Offsets follow declaration order; nothing is packed or reordered
//! - A frozen layout is immutable and shared by the store and its snapshots

mod builder;
mod field;

pub use builder::{LayoutBuilder, RecordLayout};
pub use field::FieldDescriptor;
