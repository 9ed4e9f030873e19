//! Per-type comparison and hashing.
//!
//! [`Ops`] is the single polymorphism boundary used by sorting, combining,
//! partitioning and merging: everything above this module treats columns as
//! opaque and only compares or hashes their rows through an `Ops` instance
//! obtained from the [registry](crate::registry).
//!
//! Element types opt in by implementing [`KeyValue`], which provides a strict
//! total order and a seeded 32-bit hash that agrees with it (equal keys hash
//! identically for a fixed seed).

use std::{cmp::Ordering, marker::PhantomData};

use crate::column::{Column, ColumnType, ColumnValue, downcast};

/// A column element type usable as an aggregation key.
pub trait KeyValue: ColumnValue {
    /// Strict total order over the values of this type.
    fn key_cmp(&self, other: &Self) -> Ordering;

    /// Well-distributed 32-bit hash; equal values must hash identically for a
    /// given seed.
    fn hash_with_seed(&self, seed: u32) -> u32;
}

/// Hashes a byte string with XXH3-64 and folds the result to 32 bits.
#[inline]
pub fn hash_bytes(bytes: &[u8], seed: u32) -> u32 {
    let h = xxhash_rust::xxh3::xxh3_64_with_seed(bytes, seed as u64);
    (h as u32) ^ ((h >> 32) as u32)
}

macro_rules! impl_key_value_for_int {
    ($($ty:ty),*) => {
        $(
            impl KeyValue for $ty {
                #[inline]
                fn key_cmp(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }

                #[inline]
                fn hash_with_seed(&self, seed: u32) -> u32 {
                    hash_bytes(bytemuck::bytes_of(self), seed)
                }
            }
        )*
    };
}

impl_key_value_for_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! impl_key_value_for_float {
    ($($ty:ty),*) => {
        $(
            impl KeyValue for $ty {
                #[inline]
                fn key_cmp(&self, other: &Self) -> Ordering {
                    self.total_cmp(other)
                }

                #[inline]
                fn hash_with_seed(&self, seed: u32) -> u32 {
                    hash_bytes(bytemuck::bytes_of(&self.to_bits()), seed)
                }
            }
        )*
    };
}

impl_key_value_for_float!(f32, f64);

impl KeyValue for bool {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn hash_with_seed(&self, seed: u32) -> u32 {
        hash_bytes(&[*self as u8], seed)
    }
}

impl KeyValue for char {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn hash_with_seed(&self, seed: u32) -> u32 {
        hash_bytes(&(*self as u32).to_le_bytes(), seed)
    }
}

impl KeyValue for String {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn hash_with_seed(&self, seed: u32) -> u32 {
        hash_bytes(self.as_bytes(), seed)
    }
}

impl KeyValue for Vec<u8> {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn hash_with_seed(&self, seed: u32) -> u32 {
        hash_bytes(self, seed)
    }
}

impl<A: KeyValue, B: KeyValue> KeyValue for (A, B) {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.0
            .key_cmp(&other.0)
            .then_with(|| self.1.key_cmp(&other.1))
    }

    fn hash_with_seed(&self, seed: u32) -> u32 {
        self.1.hash_with_seed(self.0.hash_with_seed(seed))
    }
}

/// Comparison and hashing over the rows of columns of one element type.
pub trait Ops: Send + Sync + 'static {
    /// The element type these ops apply to.
    fn column_type(&self) -> ColumnType;

    /// Compares row `i` of `a` with row `j` of `b`.
    fn compare(&self, a: &dyn Column, i: usize, b: &dyn Column, j: usize) -> Ordering;

    /// Seeded 32-bit hash of row `i` of `col`.
    fn hash_with_seed(&self, col: &dyn Column, i: usize, seed: u32) -> u32;

    /// Reports whether row `i` orders before row `j` within one column.
    fn less(&self, col: &dyn Column, i: usize, j: usize) -> bool {
        self.compare(col, i, col, j) == Ordering::Less
    }

    fn equal(&self, a: &dyn Column, i: usize, b: &dyn Column, j: usize) -> bool {
        self.compare(a, i, b, j) == Ordering::Equal
    }

    /// Reorders `indices` so that the rows they reference are ascending.
    fn sort_indices(&self, col: &dyn Column, indices: &mut [usize]) {
        indices.sort_unstable_by(|&i, &j| self.compare(col, i, col, j));
    }
}

/// [`Ops`] implementation for any [`KeyValue`] element type.
pub struct TypedOps<T>(PhantomData<fn() -> T>);

impl<T: KeyValue> TypedOps<T> {
    pub fn new() -> TypedOps<T> {
        TypedOps(PhantomData)
    }
}

impl<T: KeyValue> Default for TypedOps<T> {
    fn default() -> Self {
        TypedOps::new()
    }
}

impl<T: KeyValue> Ops for TypedOps<T> {
    fn column_type(&self) -> ColumnType {
        ColumnType::of::<T>()
    }

    #[inline]
    fn compare(&self, a: &dyn Column, i: usize, b: &dyn Column, j: usize) -> Ordering {
        let a = downcast::<T>(a).values();
        let b = downcast::<T>(b).values();
        a[i].key_cmp(&b[j])
    }

    #[inline]
    fn hash_with_seed(&self, col: &dyn Column, i: usize, seed: u32) -> u32 {
        downcast::<T>(col).values()[i].hash_with_seed(seed)
    }

    fn sort_indices(&self, col: &dyn Column, indices: &mut [usize]) {
        let values = downcast::<T>(col).values();
        indices.sort_unstable_by(|&i, &j| values[i].key_cmp(&values[j]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::TypedColumn;

    #[test]
    fn test_int_ops() {
        let ops = TypedOps::<i64>::new();
        let col = TypedColumn::from_vec(vec![5i64, -3, 5, 12]);
        assert!(ops.less(&col, 1, 0));
        assert!(!ops.less(&col, 0, 2));
        assert!(!ops.less(&col, 2, 0));
        assert!(ops.equal(&col, 0, &col, 2));
        assert_eq!(
            ops.hash_with_seed(&col, 0, 7),
            ops.hash_with_seed(&col, 2, 7)
        );

        let mut indices = vec![0, 1, 2, 3];
        ops.sort_indices(&col, &mut indices);
        let sorted = indices
            .iter()
            .map(|&i| col.values()[i])
            .collect::<Vec<_>>();
        assert_eq!(sorted, vec![-3, 5, 5, 12]);
    }

    #[test]
    fn test_compare_across_columns() {
        let ops = TypedOps::<String>::new();
        let a = TypedColumn::from_vec(vec!["apple".to_string(), "pear".to_string()]);
        let b = TypedColumn::from_vec(vec!["banana".to_string()]);
        assert_eq!(ops.compare(&a, 0, &b, 0), Ordering::Less);
        assert_eq!(ops.compare(&a, 1, &b, 0), Ordering::Greater);
        assert!(ops.equal(&a, 1, &a, 1));
    }

    #[test]
    fn test_float_total_order() {
        let values = [f64::NAN, 1.0, -0.0, 0.0, f64::NEG_INFINITY];
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.key_cmp(b));
        assert_eq!(sorted[0], f64::NEG_INFINITY);
        assert!(sorted[1].is_sign_negative() && sorted[1] == 0.0);
        assert!(sorted[4].is_nan());
        assert_eq!(1.5f64.hash_with_seed(0), 1.5f64.hash_with_seed(0));
    }

    #[test]
    fn test_seed_changes_hash() {
        let key = "the quick brown fox".to_string();
        assert_ne!(key.hash_with_seed(0), key.hash_with_seed(1));
        assert_eq!(key.hash_with_seed(3), key.clone().hash_with_seed(3));
    }

    #[test]
    fn test_hash_distribution() {
        let mut rng = fastrand::Rng::with_seed(17);
        let mut buckets = [0usize; 16];
        for _ in 0..16_000 {
            let key = rng.u64(..);
            buckets[(key.hash_with_seed(0) % 16) as usize] += 1;
        }
        assert!(buckets.iter().all(|&count| count > 800 && count < 1200));
    }

    #[test]
    fn test_tuple_keys() {
        let a = (1u32, "b".to_string());
        let b = (1u32, "c".to_string());
        assert_eq!(a.key_cmp(&b), Ordering::Less);
        assert_eq!(a.hash_with_seed(5), a.clone().hash_with_seed(5));
        assert_ne!(a.hash_with_seed(5), b.hash_with_seed(5));
    }
}
