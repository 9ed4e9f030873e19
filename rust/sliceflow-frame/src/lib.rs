//! Columnar batches and the per-type operations needed to sort, hash and merge them.
//!
//! # Core Concepts
//!
//! ## Columns and Frames
//!
//! A [`column::Column`] holds the values of one element type; a [`frame::Frame`] is
//! a fixed-arity set of equal-length columns, i.e. one in-memory batch of rows. The
//! element type of a column is described at runtime by a [`column::ColumnType`],
//! and the ordered column types of a frame form its [`schema::Schema`].
//!
//! ## Ops
//!
//! Everything that needs to look at values without knowing their type (sorting,
//! combining, partitioning, merging) goes through [`ops::Ops`]: a strict total
//! order and a seeded 32-bit hash. Ops are resolved per element type through the
//! global [`registry`].
//!
//! ## Sorting and Hashing
//!
//! - [`sorter::Sorter`] sorts frames by a key column and compares rows across frames.
//! - [`hasher::FrameHasher`] routes rows to partitions by key hash.

pub mod column;
pub mod frame;
pub mod hasher;
pub mod ops;
pub mod registry;
pub mod schema;
pub mod sorter;

pub use column::{Column, ColumnType, ColumnValue, TypedColumn};
pub use frame::Frame;
pub use hasher::FrameHasher;
pub use ops::{KeyValue, Ops};
pub use schema::Schema;
pub use sorter::Sorter;
