//! Frame implementation for columnar record batches.
//!
//! A Frame encapsulates a batch of rows in columnar format, where each column is
//! represented as a type-erased [`Column`].
//!
//! Frames are value-like: a frame has a single owner at a time and ownership moves
//! between the producer and the consumer of a read call. A frame handed to a reader
//! as an output buffer determines, through its length, the maximum number of rows
//! the reader may produce in that call.
//!
//! # Performance Considerations
//!
//! - Frames are designed for batch processing, typically containing 100-64K records
//! - Column storage is heap-allocated to support dynamic dispatch
//! - Type validation occurs only during construction, not during data access
//! - Clone operations perform deep copies of all columns

use std::{fmt, ops::Range};

use sliceflow_common::{Result, verify_arg};

use crate::{
    column::{Column, ColumnValue, TypedColumn, downcast, downcast_mut},
    schema::Schema,
};

/// A columnar batch of rows.
///
/// # Guarantees
///
/// 1. All columns have exactly `len` rows.
/// 2. `schema` lists the column types in column order.
pub struct Frame {
    schema: Schema,
    columns: Vec<Box<dyn Column>>,
    len: usize,
}

impl Frame {
    /// Allocates a frame of `len` rows holding default values.
    pub fn make(schema: &Schema, len: usize) -> Frame {
        Frame {
            schema: schema.clone(),
            columns: schema
                .columns()
                .iter()
                .map(|ty| ty.make_column(len))
                .collect(),
            len,
        }
    }

    /// Creates a new frame, panicking on failure.
    ///
    /// # Panics
    /// Panics if the columns have different lengths.
    pub fn new(columns: Vec<Box<dyn Column>>) -> Frame {
        Frame::try_new(columns).expect("Frame::try_new")
    }

    /// Creates a new frame from its columns, verifying that all of them have the
    /// same length.
    pub fn try_new(columns: Vec<Box<dyn Column>>) -> Result<Frame> {
        let len = columns.first().map_or(0, |column| column.len());
        verify_arg!(columns, columns.iter().all(|column| column.len() == len));
        let schema = Schema::new(
            columns
                .iter()
                .map(|column| column.column_type())
                .collect::<Vec<_>>(),
        );
        Ok(Frame {
            schema,
            columns,
            len,
        })
    }

    /// Builds a two-column `(key, value)` frame.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Frame
    where
        K: ColumnValue,
        V: ColumnValue,
    {
        let (keys, values): (Vec<K>, Vec<V>) = pairs.into_iter().unzip();
        Frame::new(vec![
            Box::new(TypedColumn::from_vec(keys)),
            Box::new(TypedColumn::from_vec(values)),
        ])
    }

    /// Returns the rows of a two-column frame as `(key, value)` tuples.
    ///
    /// # Panics
    /// Panics if the column types are not `K` and `V`.
    pub fn to_pairs<K, V>(&self) -> Vec<(K, V)>
    where
        K: ColumnValue,
        V: ColumnValue,
    {
        self.values::<K>(0)
            .iter()
            .cloned()
            .zip(self.values::<V>(1).iter().cloned())
            .collect()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the number of rows in this frame.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the frame contains no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> &dyn Column {
        self.columns[index].as_ref()
    }

    pub fn column_mut(&mut self, index: usize) -> &mut dyn Column {
        self.columns[index].as_mut()
    }

    /// Typed view of column `index`.
    ///
    /// # Panics
    /// Panics if the column does not hold values of type `T`.
    pub fn values<T: ColumnValue>(&self, index: usize) -> &[T] {
        downcast::<T>(self.column(index)).values()
    }

    /// Mutable typed view of column `index`.
    ///
    /// # Panics
    /// Panics if the column does not hold values of type `T`.
    pub fn values_mut<T: ColumnValue>(&mut self, index: usize) -> &mut [T] {
        downcast_mut::<T>(self.column_mut(index)).values_mut()
    }

    /// Grows (with default values) or shrinks every column to `len` rows.
    pub fn resize(&mut self, len: usize) {
        for column in self.columns.iter_mut() {
            column.resize(len);
        }
        self.len = len;
    }

    /// Shortens the frame to `len` rows; no-op if the frame is already shorter.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.resize(len);
        }
    }

    /// Returns a copy of rows `range`.
    pub fn slice(&self, range: Range<usize>) -> Frame {
        assert!(range.end <= self.len, "slice {range:?} out of bounds {}", self.len);
        Frame {
            schema: self.schema.clone(),
            columns: self
                .columns
                .iter()
                .map(|column| column.slice(range.clone()))
                .collect(),
            len: range.len(),
        }
    }

    /// Overwrites rows `dst_start..dst_start + src_range.len()` of this frame with
    /// rows `src_range` of `src`.
    pub fn copy_rows(&mut self, dst_start: usize, src: &Frame, src_range: Range<usize>) {
        debug_assert_eq!(self.schema, src.schema);
        debug_assert!(dst_start + src_range.len() <= self.len);
        for (dst, src) in self.columns.iter_mut().zip(src.columns.iter()) {
            dst.copy_from(dst_start, src.as_ref(), src_range.clone());
        }
    }

    /// Overwrites row `dst_row` of this frame with row `src_row` of `src`.
    pub fn set_row_from(&mut self, dst_row: usize, src: &Frame, src_row: usize) {
        self.copy_rows(dst_row, src, src_row..src_row + 1);
    }

    /// Appends row `src_row` of `src` to this frame.
    pub fn push_row_from(&mut self, src: &Frame, src_row: usize) {
        debug_assert_eq!(self.schema, src.schema);
        for (dst, src) in self.columns.iter_mut().zip(src.columns.iter()) {
            dst.push_from(src.as_ref(), src_row);
        }
        self.len += 1;
    }

    /// Reorders the rows in place so that row `i` becomes the former row
    /// `order[i]`. `order` must be a permutation of `0..len`; it is consumed as
    /// scratch space.
    pub fn permute(&mut self, mut order: Vec<usize>) {
        assert_eq!(order.len(), self.len, "permutation length mismatch");
        for start in 0..order.len() {
            let mut current = start;
            loop {
                let next = order[current];
                order[current] = current;
                if next == start {
                    break;
                }
                for column in self.columns.iter_mut() {
                    column.swap(current, next);
                }
                current = next;
            }
        }
    }

    /// Returns a new frame whose row `i` is this frame's row `indices[i]`.
    pub fn take(&self, indices: &[usize]) -> Frame {
        Frame {
            schema: self.schema.clone(),
            columns: self
                .columns
                .iter()
                .map(|column| column.take(indices))
                .collect(),
            len: indices.len(),
        }
    }
}

/// Creates a deep copy by cloning all columns.
impl Clone for Frame {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            columns: self
                .columns
                .iter()
                .map(|column| column.clone_boxed())
                .collect(),
            len: self.len,
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for row in 0..self.len {
            let cells = self
                .columns
                .iter()
                .map(|column| column.fmt_value(row))
                .collect::<Vec<_>>();
            list.entry(&format_args!("({})", cells.join(", ")));
        }
        list.finish()
    }
}
