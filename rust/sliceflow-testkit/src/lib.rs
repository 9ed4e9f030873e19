//! Test utilities for the sliceflow crates.
//!
//! This crate provides:
//! - In-memory source slices and fault-injecting readers
//! - Seeded data generation with reference results
//! - A single-process evaluator that wires slices, shuffles included
//!
//! It is intended for the integration tests of the operator crates and is not
//! a production executor.

pub mod data_gen;
pub mod local_exec;
pub mod memory_slice;
pub mod readers;

pub use local_exec::LocalExecutor;
pub use memory_slice::MemorySlice;
