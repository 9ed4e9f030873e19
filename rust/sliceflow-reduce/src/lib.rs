//! Keyed reduction of sharded `(key, value)` datasets.
//!
//! [`reduce`] turns a two-column [`Slice`] into a slice holding one row per
//! distinct key, the values of each key folded with a commutative, associative
//! function. Evaluation happens in two stages connected by a key-partitioned
//! shuffle:
//!
//! 1. [`combine::CombineSlice`] aggregates every input shard in memory with a
//!    [`CombiningFrame`] and emits its keys in ascending order.
//! 2. [`reduce::ReduceSlice`] merges, per output shard, the sorted streams of
//!    every upstream shard with a k-way heap merge and folds equal keys.
//!
//! All operators are pulled through the [`Reader`] protocol; end-of-stream is a
//! flag on [`ReadStatus`], errors are fatal and cached, and cancellation is
//! observed through the [`Context`] passed to every read.

pub mod combine;
pub mod combining_frame;
pub mod config;
pub mod context;
pub mod key_index;
mod merge;
pub mod reader;
pub mod reduce;
pub mod reducer;
pub mod slice;

pub use combining_frame::CombiningFrame;
pub use config::ReduceConfig;
pub use context::Context;
pub use reader::{ReadStatus, Reader};
pub use reduce::{reduce, reduce_with_config};
pub use reducer::{Reducer, reduce_fn};
pub use slice::{Dep, Slice, SliceRef};
