//! Lazily-defined, sharded datasets and their dependencies.
//!
//! A [`Slice`] describes how to produce one shard of a dataset given readers for
//! its dependencies. Building the dependency graph, scheduling shards and moving
//! shuffled data between machines is the job of an external executor; a slice only
//! declares what it needs through [`Dep`].

use std::sync::Arc;

use sliceflow_frame::{FrameHasher, Schema};

use crate::reader::Reader;

pub type SliceRef = Arc<dyn Slice>;

/// A dependency of a slice on an upstream slice.
#[derive(Clone)]
pub struct Dep {
    pub slice: SliceRef,
    /// The upstream output must be partitioned by the dependent slice's
    /// [`Slice::hasher`]. Shard `i` of the dependent receives one reader per
    /// upstream shard, each yielding that shard's rows of partition `i`.
    pub shuffle: bool,
    /// Each reader handed to the dependent yields rows sorted by key.
    pub sorted: bool,
}

impl Dep {
    /// Shard `i` reads shard `i` of `slice`, in arbitrary order.
    pub fn pipelined(slice: SliceRef) -> Dep {
        Dep {
            slice,
            shuffle: false,
            sorted: false,
        }
    }

    /// Key-partitioned, per-reader sorted dependency.
    pub fn shuffled_sorted(slice: SliceRef) -> Dep {
        Dep {
            slice,
            shuffle: true,
            sorted: true,
        }
    }
}

/// A sharded dataset.
pub trait Slice: Send + Sync {
    /// Name of the operation this slice performs (e.g. `"reduce"`).
    fn op(&self) -> &str;

    /// Column types of every frame this slice produces.
    fn schema(&self) -> &Schema;

    fn num_shard(&self) -> usize;

    fn num_dep(&self) -> usize;

    fn dep(&self, index: usize) -> Dep;

    /// Hasher used to partition this slice's input when it declares a shuffle
    /// dependency.
    fn hasher(&self) -> Option<FrameHasher> {
        None
    }

    /// Creates the reader for shard `shard`, given the readers of its
    /// dependencies (see [`Dep`] for their arrangement).
    fn reader(&self, shard: usize, deps: Vec<Box<dyn Reader>>) -> Box<dyn Reader>;
}
