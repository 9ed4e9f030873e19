//! Ordered list of column types describing a slice or a frame.

use std::{fmt, sync::Arc};

use crate::column::{ColumnType, ColumnValue};

/// The column types of a frame, in column order.
///
/// Schemas are immutable and cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct Schema(Arc<[ColumnType]>);

impl Schema {
    pub fn new(columns: impl Into<Vec<ColumnType>>) -> Schema {
        let columns: Vec<ColumnType> = columns.into();
        Schema(columns.into())
    }

    /// Schema of a `(key, value)` frame.
    pub fn pair<K: ColumnValue, V: ColumnValue>() -> Schema {
        Schema::new(vec![ColumnType::of::<K>(), ColumnType::of::<V>()])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn column(&self, index: usize) -> ColumnType {
        self.0[index]
    }

    pub fn columns(&self) -> &[ColumnType] {
        &self.0
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, column) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{column}")?;
        }
        f.write_str(")")
    }
}
