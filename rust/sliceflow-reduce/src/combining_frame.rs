//! Hash-indexed in-memory aggregation of `(key, value)` rows.

use std::{ops::Range, sync::Arc};

use sliceflow_common::{Result, error::Error, verify_type};
use sliceflow_frame::{Frame, Ops, Schema, registry};

use crate::{key_index::KeyIndex, reducer::Reducer};

pub(crate) const KEY_COLUMN: usize = 0;
pub(crate) const VALUE_COLUMN: usize = 1;

/// Aggregates `(key, value)` rows into one row per distinct key.
///
/// Rows are stored in a backing [`Frame`] in first-seen order; a [`KeyIndex`]
/// maps key hashes to rows of that frame. Combining a row whose key is already
/// present replaces the stored value with `reduce(stored, new)`.
///
/// The reduce function must be commutative and associative: rows are folded in
/// arrival order, and the result must not depend on how the input was chunked or
/// ordered. This is a contract on the caller and is not checked.
///
/// The whole working set is held in memory. An optional key limit turns an
/// oversized working set into a [`ResourceExhausted`] error instead of unbounded
/// growth.
///
/// [`ResourceExhausted`]: sliceflow_common::error::ErrorKind::ResourceExhausted
pub struct CombiningFrame {
    frame: Frame,
    index: KeyIndex,
    key_ops: Arc<dyn Ops>,
    reducer: Arc<dyn Reducer>,
    seed: u32,
    max_keys: Option<usize>,
}

impl CombiningFrame {
    /// Creates a combining frame for `schema`, resolving key ops from the
    /// registry.
    ///
    /// Fails with a type error unless `schema` has exactly two columns, the key
    /// type has registered ops and the reducer operates on the value type.
    pub fn try_new(schema: &Schema, reducer: Arc<dyn Reducer>, seed: u32) -> Result<CombiningFrame> {
        verify_type!(
            schema.len() == 2,
            "combining requires (key, value) columns, got {schema}"
        );
        verify_type!(
            reducer.value_type() == schema.column(VALUE_COLUMN),
            "reduce function combines values of type {}, not {}",
            reducer.value_type(),
            schema.column(VALUE_COLUMN)
        );
        let key_ops = registry::get(schema.column(KEY_COLUMN))?;
        Ok(CombiningFrame::new(schema, key_ops, reducer, seed))
    }

    /// Creates a combining frame with explicit key ops. The caller is
    /// responsible for the ops and reducer matching `schema`.
    pub fn new(
        schema: &Schema,
        key_ops: Arc<dyn Ops>,
        reducer: Arc<dyn Reducer>,
        seed: u32,
    ) -> CombiningFrame {
        debug_assert_eq!(key_ops.column_type(), schema.column(KEY_COLUMN));
        CombiningFrame {
            frame: Frame::make(schema, 0),
            index: KeyIndex::new(),
            key_ops,
            reducer,
            seed,
            max_keys: None,
        }
    }

    /// Limits the number of distinct keys this frame may hold.
    pub fn with_max_keys(mut self, max_keys: Option<usize>) -> CombiningFrame {
        self.max_keys = max_keys;
        self
    }

    /// Combines every row of `chunk`.
    pub fn combine(&mut self, chunk: &Frame) -> Result<()> {
        self.combine_rows(chunk, 0..chunk.len())
    }

    /// Combines rows `rows` of `chunk`.
    pub fn combine_rows(&mut self, chunk: &Frame, rows: Range<usize>) -> Result<()> {
        debug_assert_eq!(chunk.schema(), self.frame.schema());
        let chunk_keys = chunk.column(KEY_COLUMN);
        for row in rows {
            let hash = self.key_ops.hash_with_seed(chunk_keys, row, self.seed);
            let stored_keys = self.frame.column(KEY_COLUMN);
            let existing = self
                .index
                .rows(hash)
                .iter()
                .copied()
                .find(|&stored| self.key_ops.equal(stored_keys, stored, chunk_keys, row));
            match existing {
                Some(stored) => {
                    self.reducer.reduce_into(
                        self.frame.column_mut(VALUE_COLUMN),
                        stored,
                        chunk.column(VALUE_COLUMN),
                        row,
                    );
                }
                None => {
                    if let Some(max_keys) = self.max_keys {
                        if self.frame.len() >= max_keys {
                            return Err(Error::resource_exhausted("combined keys", max_keys));
                        }
                    }
                    let new_row = self.frame.len();
                    self.frame.push_row_from(chunk, row);
                    self.index.insert(hash, new_row);
                }
            }
        }
        Ok(())
    }

    /// Consumes the combining frame and returns its backing frame.
    pub fn into_frame(self) -> Frame {
        self.frame
    }
}
