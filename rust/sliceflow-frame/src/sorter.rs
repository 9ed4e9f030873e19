//! Key-column sorting of frames.

use std::{cmp::Ordering, sync::Arc};

use sliceflow_common::Result;

use crate::{frame::Frame, ops::Ops, registry, schema::Schema};

/// Sorts frames by one designated key column and compares rows across frames
/// under the same order.
///
/// `sort` and `less` agree: after sorting, `less(f, i, f, i + 1)` never holds
/// in reverse.
#[derive(Clone)]
pub struct Sorter {
    column: usize,
    ops: Arc<dyn Ops>,
}

impl Sorter {
    pub fn new(column: usize, ops: Arc<dyn Ops>) -> Sorter {
        Sorter { column, ops }
    }

    /// Resolves the ops of column `column` of `schema` from the registry.
    pub fn for_schema(schema: &Schema, column: usize) -> Result<Sorter> {
        sliceflow_common::verify_arg!(column, column < schema.len());
        let ops = registry::get(schema.column(column))?;
        Ok(Sorter::new(column, ops))
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn ops(&self) -> &Arc<dyn Ops> {
        &self.ops
    }

    /// Sorts the rows of `frame` in place by the key column. The sort is not
    /// stable.
    ///
    /// Rows are moved by swapping; the only allocation is the row order.
    pub fn sort(&self, frame: &mut Frame) {
        if frame.len() < 2 {
            return;
        }
        let mut order = (0..frame.len()).collect::<Vec<_>>();
        self.ops.sort_indices(frame.column(self.column), &mut order);
        frame.permute(order);
    }

    /// Compares row `i` of `a` with row `j` of `b` by the key column.
    #[inline]
    pub fn compare(&self, a: &Frame, i: usize, b: &Frame, j: usize) -> Ordering {
        self.ops
            .compare(a.column(self.column), i, b.column(self.column), j)
    }

    /// Reports whether row `i` of `a` orders strictly before row `j` of `b`.
    #[inline]
    pub fn less(&self, a: &Frame, i: usize, b: &Frame, j: usize) -> bool {
        self.compare(a, i, b, j) == Ordering::Less
    }

    /// Reports whether `frame` is sorted ascending by the key column.
    pub fn is_sorted(&self, frame: &Frame) -> bool {
        (1..frame.len()).all(|row| !self.less(frame, row, frame, row - 1))
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::column::TypedColumn;

    #[test]
    fn test_sort_by_key() {
        let mut frame = Frame::from_pairs(vec![(3i64, "c"), (1, "a"), (2, "b")].into_iter().map(
            |(k, v)| (k, v.to_string()),
        ));
        let sorter = Sorter::for_schema(frame.schema(), 0).unwrap();
        assert!(!sorter.is_sorted(&frame));
        sorter.sort(&mut frame);
        assert!(sorter.is_sorted(&frame));
        assert_eq!(
            frame.to_pairs::<i64, String>(),
            vec![
                (1, "a".to_string()),
                (2, "b".to_string()),
                (3, "c".to_string())
            ]
        );
    }

    #[test]
    fn test_sort_random() {
        let mut rng = fastrand::Rng::with_seed(42);
        let pairs = (0..1000)
            .map(|_| (rng.i32(-500..500), rng.u8(..)))
            .collect::<Vec<_>>();
        let mut frame = Frame::from_pairs(pairs.clone());
        let sorter = Sorter::for_schema(frame.schema(), 0).unwrap();
        sorter.sort(&mut frame);
        let keys = frame.values::<i32>(0).to_vec();
        let expected = pairs.iter().map(|(k, _)| *k).sorted().collect::<Vec<_>>();
        assert_eq!(keys, expected);
        // Rows travel together.
        let mut rows = frame.to_pairs::<i32, u8>();
        let mut original = pairs;
        rows.sort();
        original.sort();
        assert_eq!(rows, original);
    }

    #[test]
    fn test_sort_moves_every_column() {
        let keys = vec![4i64, 2, 0, 3, 1];
        let mut frame = Frame::new(vec![
            Box::new(TypedColumn::from_vec(keys.clone())),
            Box::new(TypedColumn::from_vec(
                keys.iter().map(|k| format!("v{k}")).collect::<Vec<_>>(),
            )),
            Box::new(TypedColumn::from_vec(keys.iter().map(|k| k * 10).collect::<Vec<_>>())),
        ]);
        let sorter = Sorter::for_schema(frame.schema(), 0).unwrap();
        sorter.sort(&mut frame);
        assert_eq!(frame.values::<i64>(0), &[0, 1, 2, 3, 4]);
        assert_eq!(frame.values::<String>(1), &["v0", "v1", "v2", "v3", "v4"]);
        assert_eq!(frame.values::<i64>(2), &[0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_cross_frame_less() {
        let a = Frame::from_pairs(vec![(1u64, 0u8), (5, 0)]);
        let b = Frame::from_pairs(vec![(3u64, 0u8)]);
        let sorter = Sorter::for_schema(a.schema(), 0).unwrap();
        assert!(sorter.less(&a, 0, &b, 0));
        assert!(sorter.less(&b, 0, &a, 1));
        assert!(!sorter.less(&a, 1, &b, 0));
        assert_eq!(sorter.compare(&b, 0, &b, 0), Ordering::Equal);
    }

    #[test]
    fn test_sort_by_value_column() {
        let mut frame = Frame::from_pairs(vec![(1u8, 30i16), (2, 10), (3, 20)]);
        let sorter = Sorter::for_schema(frame.schema(), 1).unwrap();
        sorter.sort(&mut frame);
        assert_eq!(frame.values::<u8>(0), &[2, 3, 1]);
    }

    #[test]
    fn test_missing_column() {
        let schema = Schema::pair::<u8, u8>();
        assert!(Sorter::for_schema(&schema, 2).is_err());
    }
}
